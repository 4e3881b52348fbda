use std::ops::Range;

use crate::parser::error::ParseError;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Token {
    Number(f64),
    StringLit(String),
    Word(String),
    /// `:name`
    Variable(String),

    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Eq,
    BangEq,
    Lt,
    Gt,
    LtEq,
    GtEq,

    LBracket,
    RBracket,
    LParen,
    RParen,
}

impl Token {
    pub(crate) fn describe(&self) -> String {
        match self {
            Token::Number(n) => format!("number {}", n),
            Token::StringLit(s) => format!("string \"{}\"", s),
            Token::Word(w) => format!("'{}'", w),
            Token::Variable(v) => format!("variable :{}", v),
            Token::LBracket => "'['".into(),
            Token::RBracket => "']'".into(),
            Token::LParen => "'('".into(),
            Token::RParen => "')'".into(),
            _ => "operator".into(),
        }
    }
}

pub(crate) type Spanned = (Token, Range<usize>);

/// Split source text into tokens. Comments run from `#` or `;` to the end of the line.
pub(crate) fn tokenize(source: &str, file_id: usize) -> Result<Vec<Spanned>, Vec<ParseError>> {
    let bytes = source.as_bytes();
    let mut tokens = Vec::new();
    let mut errors = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        let c = bytes[i];
        let start = i;

        if c.is_ascii_whitespace() {
            i += 1;
            continue;
        }

        if c == b'#' || c == b';' {
            while i < bytes.len() && bytes[i] != b'\n' {
                i += 1;
            }
            continue;
        }

        if c.is_ascii_digit() || (c == b'.' && bytes.get(i + 1).is_some_and(u8::is_ascii_digit)) {
            while i < bytes.len() && (bytes[i].is_ascii_digit() || bytes[i] == b'.') {
                i += 1;
            }
            let text = &source[start..i];
            match text.parse::<f64>() {
                Ok(n) => tokens.push((Token::Number(n), start..i)),
                Err(_) => errors.push(ParseError::error(
                    format!("invalid number '{}'", text),
                    start..i,
                    file_id,
                )),
            }
            continue;
        }

        if c == b'"' {
            i += 1;
            while i < bytes.len() && bytes[i] != b'"' && bytes[i] != b'\n' {
                i += 1;
            }
            if i < bytes.len() && bytes[i] == b'"' {
                tokens.push((Token::StringLit(source[start + 1..i].to_string()), start..i + 1));
                i += 1;
            } else {
                errors.push(
                    ParseError::error("unterminated string", start..i, file_id)
                        .with_note("strings end with a closing \" on the same line"),
                );
            }
            continue;
        }

        if c == b':' {
            i += 1;
            while i < bytes.len() && is_word_byte(bytes[i]) {
                i += 1;
            }
            if i == start + 1 {
                errors.push(ParseError::error(
                    "expected a variable name after ':'",
                    start..i,
                    file_id,
                ));
            } else {
                tokens.push((Token::Variable(source[start + 1..i].to_string()), start..i));
            }
            continue;
        }

        if is_word_byte(c) {
            while i < bytes.len() && is_word_byte(bytes[i]) {
                i += 1;
            }
            tokens.push((Token::Word(source[start..i].to_string()), start..i));
            continue;
        }

        let (token, len) = match (c, bytes.get(i + 1).copied()) {
            (b'<', Some(b'=')) => (Token::LtEq, 2),
            (b'>', Some(b'=')) => (Token::GtEq, 2),
            (b'!', Some(b'=')) => (Token::BangEq, 2),
            (b'+', _) => (Token::Plus, 1),
            (b'-', _) => (Token::Minus, 1),
            (b'*', _) => (Token::Star, 1),
            (b'/', _) => (Token::Slash, 1),
            (b'%', _) => (Token::Percent, 1),
            (b'=', _) => (Token::Eq, 1),
            (b'<', _) => (Token::Lt, 1),
            (b'>', _) => (Token::Gt, 1),
            (b'[', _) => (Token::LBracket, 1),
            (b']', _) => (Token::RBracket, 1),
            (b'(', _) => (Token::LParen, 1),
            (b')', _) => (Token::RParen, 1),
            _ => {
                let ch = source[i..].chars().next().unwrap_or('?');
                let len = ch.len_utf8();
                errors.push(ParseError::error(
                    format!("unexpected character '{}'", ch),
                    start..start + len,
                    file_id,
                ));
                i += len;
                continue;
            }
        };
        tokens.push((token, start..start + len));
        i += len;
    }

    if errors.is_empty() {
        Ok(tokens)
    } else {
        Err(errors)
    }
}

fn is_word_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}
