use std::collections::HashMap;
use std::ops::Range;

use crate::parser::error::ParseError;
use crate::parser::lexer::{Spanned, Token};
use crate::program::{BinaryOperator, Command, Expr, Procedure, Statement, UnaryOperator};

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

type Parsed = (Vec<Statement>, HashMap<String, Procedure>);

/// Parse a token stream into top-level statements and procedure definitions.
pub(crate) fn parse_program(tokens: Vec<Spanned>, file_id: usize) -> Result<Parsed, Vec<ParseError>> {
    let arities = procedure_arities(&tokens);
    let mut state = ParseState {
        tokens,
        pos: 0,
        file_id,
        arities,
        procedures: HashMap::new(),
        errors: Vec::new(),
        depth: 0,
        too_deep: false,
    };

    let mut statements = Vec::new();
    while !state.at_end() && !state.too_deep {
        let start = state.pos;
        state.depth = 0;
        if state.peek_word("to") {
            match state.parse_procedure() {
                Ok(procedure) => {
                    let key = procedure.name.to_ascii_lowercase();
                    if let Some(previous) = state.procedures.get(&key) {
                        let error = ParseError::error(
                            format!("procedure '{}' is defined twice", procedure.name),
                            procedure.span.clone(),
                            file_id,
                        )
                        .with_related(previous.span.clone(), "first defined here");
                        state.errors.push(error);
                    } else {
                        state.procedures.insert(key, procedure);
                    }
                }
                Err(error) => state.recover(error, start),
            }
            continue;
        }

        match state.parse_statement() {
            Ok(statement) => statements.push(statement),
            Err(error) => state.recover(error, start),
        }
    }

    if state.errors.is_empty() {
        Ok((statements, state.procedures))
    } else {
        Err(state.errors)
    }
}

/// Procedures may be called before their definition, so their arity is
/// collected up front from every `to name :a :b` header.
fn procedure_arities(tokens: &[Spanned]) -> HashMap<String, usize> {
    let mut arities = HashMap::new();
    let mut i = 0;
    while i < tokens.len() {
        if let Token::Word(w) = &tokens[i].0 {
            if w.eq_ignore_ascii_case("to") {
                if let Some((Token::Word(name), _)) = tokens.get(i + 1) {
                    let parameters = tokens[i + 2..]
                        .iter()
                        .take_while(|(t, _)| matches!(t, Token::Variable(_)))
                        .count();
                    arities.insert(name.to_ascii_lowercase(), parameters);
                }
            }
        }
        i += 1;
    }
    arities
}

// ---------------------------------------------------------------------------
// Parse state
// ---------------------------------------------------------------------------

struct ParseState {
    tokens: Vec<Spanned>,
    pos: usize,
    file_id: usize,
    arities: HashMap<String, usize>,
    procedures: HashMap<String, Procedure>,
    errors: Vec<ParseError>,
    /// Open brackets, parentheses and operators around the current token.
    depth: usize,
    /// Set once nesting hits `MAX_NESTING`; parsing stops there.
    too_deep: bool,
}

/// Deepest nesting of blocks and expressions the parser accepts.
pub(crate) const MAX_NESTING: usize = 256;

const KEYWORDS: &[&str] = &["to", "end", "repeat", "if", "else", "make", "repcount"];

impl ParseState {
    fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn peek(&self) -> Option<&Spanned> {
        self.tokens.get(self.pos)
    }

    fn peek_word(&self, word: &str) -> bool {
        matches!(self.peek(), Some((Token::Word(w), _)) if w.eq_ignore_ascii_case(word))
    }

    fn advance(&mut self) -> Option<Spanned> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    /// Span of the previously consumed token.
    fn last_end(&self) -> usize {
        self.pos
            .checked_sub(1)
            .and_then(|i| self.tokens.get(i))
            .map_or(0, |(_, span)| span.end)
    }

    fn eof_span(&self) -> Range<usize> {
        let end = self.tokens.last().map_or(0, |(_, span)| span.end);
        end..end
    }

    fn error(&self, message: impl Into<String>, span: Range<usize>) -> ParseError {
        ParseError::error(message, span, self.file_id)
    }

    /// Record `error` and skip ahead to something that can start a statement.
    /// At least one token is consumed since `start`.
    fn recover(&mut self, error: ParseError, start: usize) {
        self.errors.push(error);
        if self.pos == start && !self.at_end() {
            self.pos += 1;
        }
        while let Some((token, _)) = self.peek() {
            if let Token::Word(w) = token {
                if self.starts_statement(w) {
                    break;
                }
            }
            self.pos += 1;
        }
    }

    /// Go one level deeper. Callers restore `depth` on success; after an
    /// error the top-level loop resets it.
    fn nest(&mut self, what: &str) -> Result<(), ParseError> {
        if self.depth >= MAX_NESTING {
            self.too_deep = true;
            let span = self
                .peek()
                .map_or_else(|| self.eof_span(), |(_, span)| span.clone());
            return Err(self
                .error(format!("{} nested too deeply", what), span)
                .with_note(format!("at most {} levels are allowed", MAX_NESTING)));
        }
        self.depth += 1;
        Ok(())
    }

    fn starts_statement(&self, word: &str) -> bool {
        let lower = word.to_ascii_lowercase();
        Command::lookup(&lower).is_some()
            || self.arities.contains_key(&lower)
            || matches!(lower.as_str(), "to" | "repeat" | "if" | "make")
    }

    fn expect(&mut self, expected: Token, what: &str) -> Result<Range<usize>, ParseError> {
        match self.advance() {
            Some((token, span)) if token == expected => Ok(span),
            Some((token, span)) => Err(self.error(
                format!("expected {}, found {}", what, token.describe()),
                span,
            )),
            None => Err(self.error(format!("expected {}, found end of file", what), self.eof_span())),
        }
    }

    // -----------------------------------------------------------------------
    // Statements
    // -----------------------------------------------------------------------

    fn parse_statement(&mut self) -> Result<Statement, ParseError> {
        let Some((token, span)) = self.advance() else {
            return Err(self.error("expected a command, found end of file", self.eof_span()));
        };
        let word = match token {
            Token::Word(word) => word,
            other => {
                return Err(self.error(
                    format!("expected a command, found {}", other.describe()),
                    span,
                ));
            }
        };
        let lower = word.to_ascii_lowercase();
        let start = span.start;

        match lower.as_str() {
            "repeat" => {
                let count = self.parse_expr(0)?;
                let body = self.parse_bracketed("repeat")?;
                Ok(Statement::Repeat {
                    count,
                    body,
                    span: start..self.last_end(),
                })
            }
            "if" => {
                let condition = self.parse_expr(0)?;
                let then_branch = self.parse_bracketed("if")?;
                let else_branch = if self.peek_word("else") {
                    self.advance();
                    self.parse_bracketed("else")?
                } else {
                    Vec::new()
                };
                Ok(Statement::If {
                    condition,
                    then_branch,
                    else_branch,
                    span: start..self.last_end(),
                })
            }
            "make" => {
                let variable = match self.advance() {
                    Some((Token::Variable(name), _)) => name,
                    Some((other, span)) => {
                        return Err(self.error(
                            format!("'make' expects a :variable, found {}", other.describe()),
                            span,
                        ));
                    }
                    None => {
                        return Err(self.error("'make' expects a :variable", span));
                    }
                };
                let value = self.parse_expr(0)?;
                Ok(Statement::Make {
                    variable,
                    value,
                    span: start..self.last_end(),
                })
            }
            "to" => Err(self
                .error("procedures can only be defined at the top level", span)
                .with_note("move this 'to ... end' out of the enclosing block")),
            "end" | "else" | "repcount" => {
                Err(self.error(format!("unexpected '{}'", word), span))
            }
            _ => {
                if let Some(command) = Command::lookup(&lower) {
                    let arguments = self.parse_arguments(command.name(), command.arity(), &span)?;
                    Ok(Statement::Command {
                        command,
                        arguments,
                        span: start..self.last_end(),
                    })
                } else if let Some(&arity) = self.arities.get(&lower) {
                    let arguments = self.parse_arguments(&word, arity, &span)?;
                    Ok(Statement::Call {
                        name: lower,
                        arguments,
                        span: start..self.last_end(),
                    })
                } else {
                    Err(self
                        .error(format!("unknown command '{}'", word), span)
                        .with_note(format!(
                            "define it first with 'to {} ... end'",
                            word
                        )))
                }
            }
        }
    }

    fn parse_arguments(
        &mut self,
        name: &str,
        arity: usize,
        span: &Range<usize>,
    ) -> Result<Vec<Expr>, ParseError> {
        let mut arguments = Vec::with_capacity(arity);
        for _ in 0..arity {
            if !self.starts_expr() {
                let plural = if arity == 1 { "" } else { "s" };
                return Err(self.error(
                    format!(
                        "'{}' expects {} argument{}, found {}",
                        name,
                        arity,
                        plural,
                        arguments.len()
                    ),
                    span.clone(),
                ));
            }
            arguments.push(self.parse_expr(0)?);
        }
        Ok(arguments)
    }

    fn parse_bracketed(&mut self, owner: &str) -> Result<Vec<Statement>, ParseError> {
        self.expect(Token::LBracket, &format!("'[' after '{}'", owner))?;
        self.nest("blocks")?;
        let mut body = Vec::new();
        loop {
            match self.peek() {
                Some((Token::RBracket, _)) => {
                    self.advance();
                    self.depth -= 1;
                    return Ok(body);
                }
                Some(_) => body.push(self.parse_statement()?),
                None => {
                    return Err(self
                        .error(format!("unclosed '[' in '{}'", owner), self.eof_span())
                        .with_note("add a matching ']'"));
                }
            }
        }
    }

    fn parse_procedure(&mut self) -> Result<Procedure, ParseError> {
        let Some((_, to_span)) = self.advance() else {
            return Err(self.error("expected 'to'", self.eof_span()));
        };
        let name = match self.advance() {
            Some((Token::Word(name), span)) => {
                let lower = name.to_ascii_lowercase();
                if KEYWORDS.contains(&lower.as_str()) || Command::lookup(&lower).is_some() {
                    return Err(self.error(
                        format!("'{}' is a builtin and cannot be redefined", name),
                        span,
                    ));
                }
                name
            }
            Some((other, span)) => {
                return Err(self.error(
                    format!("expected a procedure name, found {}", other.describe()),
                    span,
                ));
            }
            None => return Err(self.error("expected a procedure name", to_span)),
        };

        let mut parameters = Vec::new();
        while let Some((Token::Variable(parameter), _)) = self.peek() {
            parameters.push(parameter.clone());
            self.advance();
        }

        let mut body = Vec::new();
        loop {
            if self.peek_word("end") {
                self.advance();
                break;
            }
            if self.at_end() {
                return Err(self
                    .error(format!("procedure '{}' is missing 'end'", name), to_span)
                    .with_note("every 'to' needs a matching 'end'"));
            }
            body.push(self.parse_statement()?);
        }

        Ok(Procedure {
            name,
            parameters,
            body,
            span: to_span.start..self.last_end(),
        })
    }

    // -----------------------------------------------------------------------
    // Expressions
    // -----------------------------------------------------------------------

    fn starts_expr(&self) -> bool {
        match self.peek() {
            Some((Token::Number(_), _))
            | Some((Token::StringLit(_), _))
            | Some((Token::Variable(_), _))
            | Some((Token::LParen, _))
            | Some((Token::Minus, _)) => true,
            Some((Token::Word(w), _)) => w.eq_ignore_ascii_case("repcount"),
            _ => false,
        }
    }

    fn peek_binary(&self) -> Option<BinaryOperator> {
        let operator = match self.peek()?.0 {
            Token::Plus => BinaryOperator::Add,
            Token::Minus => BinaryOperator::Subtract,
            Token::Star => BinaryOperator::Multiply,
            Token::Slash => BinaryOperator::Divide,
            Token::Percent => BinaryOperator::Modulo,
            Token::Eq => BinaryOperator::Equal,
            Token::BangEq => BinaryOperator::NotEqual,
            Token::Lt => BinaryOperator::Less,
            Token::Gt => BinaryOperator::Greater,
            Token::LtEq => BinaryOperator::LessEqual,
            Token::GtEq => BinaryOperator::GreaterEqual,
            _ => return None,
        };
        Some(operator)
    }

    /// Precedence climbing: only operators binding at least `min_precedence` are consumed.
    fn parse_expr(&mut self, min_precedence: u8) -> Result<Expr, ParseError> {
        let start = self.peek().map_or(self.eof_span().start, |(_, span)| span.start);
        let depth = self.depth;
        let mut left = self.parse_prefix()?;

        // Each operator deepens the left-leaning tree by one.
        while let Some(operator) = self.peek_binary() {
            let precedence = operator.precedence();
            if precedence < min_precedence {
                break;
            }
            self.nest("expression")?;
            self.advance();
            let right = self.parse_expr(precedence + 1)?;
            left = Expr::Binary {
                operator,
                left: Box::new(left),
                right: Box::new(right),
                span: start..self.last_end(),
            };
        }

        self.depth = depth;
        Ok(left)
    }

    fn parse_prefix(&mut self) -> Result<Expr, ParseError> {
        let Some((token, span)) = self.advance() else {
            return Err(self.error("expected a value, found end of file", self.eof_span()));
        };
        match token {
            Token::Number(n) => Ok(Expr::Number(n)),
            Token::StringLit(s) => Ok(Expr::String(s)),
            Token::Variable(name) => Ok(Expr::Variable(name, span)),
            Token::Word(w) if w.eq_ignore_ascii_case("repcount") => Ok(Expr::RepCount(span)),
            Token::Minus => {
                self.nest("expression")?;
                let operand = self.parse_prefix()?;
                self.depth -= 1;
                Ok(Expr::Unary {
                    operator: UnaryOperator::Negate,
                    operand: Box::new(operand),
                })
            }
            Token::LParen => {
                self.nest("expression")?;
                let inner = self.parse_expr(0)?;
                self.expect(Token::RParen, "')'")?;
                self.depth -= 1;
                Ok(inner)
            }
            other => Err(self.error(
                format!("expected a value, found {}", other.describe()),
                span,
            )),
        }
    }
}
