use std::fmt;
use std::ops::Range;
use std::time::Duration;

use codespan_reporting::diagnostic::{Diagnostic, Label};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RuntimeError {
    #[error("type error: expected {expected}, got {got}")]
    TypeError { expected: &'static str, got: &'static str },

    #[error("undefined variable: :{0}")]
    UndefinedVariable(String),

    #[error("unknown colour: \"{0}\"")]
    UnknownColor(String),

    #[error("invalid argument for '{command}': {reason}")]
    InvalidArgument {
        command: &'static str,
        reason: String,
    },

    #[error("division by zero")]
    DivisionByZero,

    #[error("repcount used outside of repeat")]
    RepCountOutsideRepeat,

    #[error("stack overflow: procedures nested more than {0} deep")]
    StackOverflow(usize),

    #[error("blocks nested more than {0} deep")]
    NestingLimit(usize),

    #[error("step limit of {0} exceeded")]
    StepLimit(u64),

    #[error("time limit of {0:?} exceeded")]
    Deadline(Duration),

    #[error("drawing has more than {0} strokes")]
    StrokeLimit(usize),

    #[error("printed more than {0} bytes")]
    OutputLimit(usize),

    #[error("drawing too expensive to render: covers more than {0} pixels")]
    RenderLimit(u64),
}

/// Broad class of a runtime error, as the grading side sees it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// The program itself is at fault.
    Crash,
    /// The program ran out of steps or time, or its drawing would take
    /// too long to render.
    Time,
    /// The drawing grew past its budget.
    Memory,
    /// The program printed too much.
    Output,
}

impl RuntimeError {
    pub fn class(&self) -> ErrorClass {
        match self {
            RuntimeError::StepLimit(_) | RuntimeError::Deadline(_) | RuntimeError::RenderLimit(_) => {
                ErrorClass::Time
            }
            RuntimeError::StrokeLimit(_) => ErrorClass::Memory,
            RuntimeError::OutputLimit(_) => ErrorClass::Output,
            _ => ErrorClass::Crash,
        }
    }
}

/// A runtime error enriched with the span of the statement or expression
/// that raised it.
#[derive(Debug, Clone, PartialEq)]
pub struct RunError {
    pub error: RuntimeError,
    pub span: Option<Range<usize>>,
    pub source_id: usize,
}

impl RunError {
    pub fn at(error: RuntimeError, span: Range<usize>, source_id: usize) -> Self {
        RunError {
            error,
            span: Some(span),
            source_id,
        }
    }

    pub fn to_diagnostic(&self) -> Diagnostic<usize> {
        let diagnostic = Diagnostic::error().with_message(self.error.to_string());
        match &self.span {
            Some(span) => diagnostic.with_labels(vec![Label::primary(self.source_id, span.clone())]),
            None => diagnostic,
        }
    }
}

impl From<RuntimeError> for RunError {
    fn from(error: RuntimeError) -> Self {
        RunError {
            error,
            span: None,
            source_id: 0,
        }
    }
}

impl fmt::Display for RunError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.error.fmt(f)
    }
}

impl std::error::Error for RunError {}
