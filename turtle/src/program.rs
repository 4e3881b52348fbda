use std::collections::HashMap;
use std::ops::Range;

/// A parsed turtle script.
#[derive(Debug, Clone)]
pub struct Program {
    /// Top-level statements, executed in order.
    pub statements: Vec<Statement>,
    /// Procedures declared with `to ... end`, by lower-cased name.
    pub procedures: HashMap<String, Procedure>,
    /// The source file ID (for error reporting with codespan-reporting).
    pub source_id: usize,
}

/// A user procedure: `to name :a :b ... end`.
#[derive(Debug, Clone)]
pub struct Procedure {
    pub name: String,
    pub parameters: Vec<String>,
    pub body: Vec<Statement>,
    pub span: Range<usize>,
}

#[derive(Debug, Clone)]
pub enum Statement {
    /// A builtin turtle command such as `forward 10`.
    Command {
        command: Command,
        arguments: Vec<Expr>,
        span: Range<usize>,
    },
    /// Call of a user procedure.
    Call {
        name: String,
        arguments: Vec<Expr>,
        span: Range<usize>,
    },
    /// `repeat count [ body ]`
    Repeat {
        count: Expr,
        body: Vec<Statement>,
        span: Range<usize>,
    },
    /// `if condition [ then ] else [ otherwise ]`
    If {
        condition: Expr,
        then_branch: Vec<Statement>,
        else_branch: Vec<Statement>,
        span: Range<usize>,
    },
    /// `make :name value`
    Make {
        variable: String,
        value: Expr,
        span: Range<usize>,
    },
}

impl Statement {
    pub fn span(&self) -> &Range<usize> {
        match self {
            Statement::Command { span, .. } => span,
            Statement::Call { span, .. } => span,
            Statement::Repeat { span, .. } => span,
            Statement::If { span, .. } => span,
            Statement::Make { span, .. } => span,
        }
    }
}

/// Builtin turtle commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Forward,
    Back,
    Left,
    Right,
    PenUp,
    PenDown,
    Goto,
    SetHeading,
    Home,
    PenColor,
    PenSize,
    Circle,
    Print,
}

impl Command {
    /// Look up a builtin by name or alias (case-insensitive).
    pub fn lookup(name: &str) -> Option<Command> {
        let command = match name.to_ascii_lowercase().as_str() {
            "forward" | "fd" => Command::Forward,
            "back" | "backward" | "bk" => Command::Back,
            "left" | "lt" => Command::Left,
            "right" | "rt" => Command::Right,
            "penup" | "pu" => Command::PenUp,
            "pendown" | "pd" => Command::PenDown,
            "goto" | "setpos" => Command::Goto,
            "setheading" | "seth" => Command::SetHeading,
            "home" => Command::Home,
            "pencolor" | "color" => Command::PenColor,
            "pensize" | "width" => Command::PenSize,
            "circle" => Command::Circle,
            "print" => Command::Print,
            _ => return None,
        };
        Some(command)
    }

    pub fn arity(self) -> usize {
        match self {
            Command::PenUp | Command::PenDown | Command::Home => 0,
            Command::Goto => 2,
            _ => 1,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Command::Forward => "forward",
            Command::Back => "back",
            Command::Left => "left",
            Command::Right => "right",
            Command::PenUp => "penup",
            Command::PenDown => "pendown",
            Command::Goto => "goto",
            Command::SetHeading => "setheading",
            Command::Home => "home",
            Command::PenColor => "pencolor",
            Command::PenSize => "pensize",
            Command::Circle => "circle",
            Command::Print => "print",
        }
    }
}

#[derive(Debug, Clone)]
pub enum Expr {
    Number(f64),
    String(String),
    /// `:name`
    Variable(String, Range<usize>),
    /// Iteration counter of the innermost `repeat`, starting at 1.
    RepCount(Range<usize>),
    Unary {
        operator: UnaryOperator,
        operand: Box<Expr>,
    },
    Binary {
        operator: BinaryOperator,
        left: Box<Expr>,
        right: Box<Expr>,
        span: Range<usize>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
    Negate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    Equal,
    NotEqual,
    Less,
    Greater,
    LessEqual,
    GreaterEqual,
}

impl BinaryOperator {
    /// Binding power; higher binds tighter.
    pub fn precedence(self) -> u8 {
        match self {
            BinaryOperator::Equal
            | BinaryOperator::NotEqual
            | BinaryOperator::Less
            | BinaryOperator::Greater
            | BinaryOperator::LessEqual
            | BinaryOperator::GreaterEqual => 1,
            BinaryOperator::Add | BinaryOperator::Subtract => 2,
            BinaryOperator::Multiply | BinaryOperator::Divide | BinaryOperator::Modulo => 3,
        }
    }
}
