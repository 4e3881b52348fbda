pub mod error;
mod lexer;
mod statement;

pub use error::ParseError;

use crate::program::Program;

/// Parser entry point.
pub struct Parser {
    source: String,
    file_id: usize,
}

impl Parser {
    pub fn new(source: String, file_id: usize) -> Self {
        Parser { source, file_id }
    }

    /// Parse the whole script. All syntax errors found are returned together.
    pub fn parse(&self) -> Result<Program, Vec<ParseError>> {
        let tokens = lexer::tokenize(&self.source, self.file_id)?;
        let (statements, procedures) = statement::parse_program(tokens, self.file_id)?;
        Ok(Program {
            statements,
            procedures,
            source_id: self.file_id,
        })
    }
}

/// Convert a byte offset in `source` to a 0-based (line, column) pair.
pub fn line_column(source: &str, offset: usize) -> (usize, usize) {
    let before = &source[..offset.min(source.len())];
    let line = before.bytes().filter(|&b| b == b'\n').count();
    let column = before
        .rfind('\n')
        .map_or(before.chars().count(), |nl| before[nl + 1..].chars().count());
    (line, column)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_column_counts_from_zero() {
        let source = "fd 10\n  rt 90\n";
        assert_eq!(line_column(source, 0), (0, 0));
        assert_eq!(line_column(source, 8), (1, 2));
        assert_eq!(line_column(source, 999), (2, 0));
    }
}
