use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Outcome descriptor understood by the grading platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorType {
    #[serde(rename = "internal error")]
    InternalError,
    #[serde(rename = "compilation error")]
    CompilationError,
    #[serde(rename = "memory limit exceeded")]
    MemoryLimitExceeded,
    #[serde(rename = "time limit exceeded")]
    TimeLimitExceeded,
    #[serde(rename = "output limit exceeded")]
    OutputLimitExceeded,
    #[serde(rename = "runtime error")]
    RuntimeError,
    #[serde(rename = "wrong")]
    Wrong,
    #[serde(rename = "wrong answer")]
    WrongAnswer,
    #[serde(rename = "correct")]
    Correct,
    #[serde(rename = "correct answer")]
    CorrectAnswer,
}

impl ErrorType {
    pub const ALL: [ErrorType; 10] = [
        ErrorType::InternalError,
        ErrorType::CompilationError,
        ErrorType::MemoryLimitExceeded,
        ErrorType::TimeLimitExceeded,
        ErrorType::OutputLimitExceeded,
        ErrorType::RuntimeError,
        ErrorType::Wrong,
        ErrorType::WrongAnswer,
        ErrorType::Correct,
        ErrorType::CorrectAnswer,
    ];

    /// Wire value of the descriptor.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorType::InternalError => "internal error",
            ErrorType::CompilationError => "compilation error",
            ErrorType::MemoryLimitExceeded => "memory limit exceeded",
            ErrorType::TimeLimitExceeded => "time limit exceeded",
            ErrorType::OutputLimitExceeded => "output limit exceeded",
            ErrorType::RuntimeError => "runtime error",
            ErrorType::Wrong => "wrong",
            ErrorType::WrongAnswer => "wrong answer",
            ErrorType::Correct => "correct",
            ErrorType::CorrectAnswer => "correct answer",
        }
    }

    /// Whether a block that ends with this outcome counts as accepted.
    pub fn is_accepted(self) -> bool {
        matches!(self, ErrorType::Correct | ErrorType::CorrectAnswer)
    }
}

impl fmt::Display for ErrorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<ErrorType> for Value {
    fn from(status: ErrorType) -> Self {
        Value::String(status.as_str().to_string())
    }
}

/// Audience of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessagePermission {
    Student,
    Staff,
    Zeus,
}

/// Rendering hint for message and description bodies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MessageFormat {
    Plain,
    Text,
    Html,
    Markdown,
    Callout,
    CalloutInfo,
    CalloutWarning,
    CalloutDanger,
    Code,
    Python,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnnotationSeverity {
    Error,
    Warning,
    Info,
}

// The auxiliary enums are plain strings on the wire; they never fail to serialize.
macro_rules! into_value {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Value {
                fn from(value: $ty) -> Self {
                    serde_json::to_value(value).unwrap_or(Value::Null)
                }
            }
        )*
    };
}

into_value!(MessagePermission, MessageFormat, AnnotationSeverity);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_strings_match_serde() {
        for status in ErrorType::ALL {
            assert_eq!(
                serde_json::to_value(status).unwrap(),
                Value::String(status.as_str().into())
            );
        }
    }

    #[test]
    fn only_correct_variants_are_accepted() {
        let accepted: Vec<_> = ErrorType::ALL
            .into_iter()
            .filter(|s| s.is_accepted())
            .collect();
        assert_eq!(accepted, vec![ErrorType::Correct, ErrorType::CorrectAnswer]);
    }

    #[test]
    fn kebab_case_formats() {
        assert_eq!(Value::from(MessageFormat::CalloutInfo), "callout-info");
        assert_eq!(Value::from(MessagePermission::Staff), "staff");
        assert_eq!(Value::from(AnnotationSeverity::Warning), "warning");
    }
}
