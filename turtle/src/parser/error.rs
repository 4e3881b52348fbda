use std::ops::Range;

use codespan_reporting::diagnostic::{Diagnostic, Label};

/// A syntax error in a turtle script. Parse errors always reject the script;
/// the parser collects as many as it can before giving up.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{message}")]
pub struct ParseError {
    pub message: String,
    /// Byte range of the offending tokens.
    pub span: Range<usize>,
    pub file_id: usize,
    /// Other places in the script that explain the error.
    pub related: Vec<(Range<usize>, String)>,
    pub notes: Vec<String>,
}

impl ParseError {
    pub fn error(message: impl Into<String>, span: Range<usize>, file_id: usize) -> Self {
        ParseError {
            message: message.into(),
            span,
            file_id,
            related: Vec::new(),
            notes: Vec::new(),
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    /// Point at a second location, e.g. an earlier definition.
    pub fn with_related(mut self, span: Range<usize>, label: impl Into<String>) -> Self {
        self.related.push((span, label.into()));
        self
    }

    pub fn to_diagnostic(&self) -> Diagnostic<usize> {
        let mut labels = vec![Label::primary(self.file_id, self.span.clone())];
        labels.extend(
            self.related
                .iter()
                .map(|(span, label)| Label::secondary(self.file_id, span.clone()).with_message(label)),
        );
        Diagnostic::error()
            .with_message(&self.message)
            .with_labels(labels)
            .with_notes(self.notes.clone())
    }
}
