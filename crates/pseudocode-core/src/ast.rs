//! Abstract Syntax Tree for pseudocode programs.
//!
//! The tree is strict: every node owns its children and nothing is shared.

use std::fmt;

use crate::span::Span;
use serde::{Deserialize, Serialize};

/// A complete program.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Program {
    /// Top-level statements, in source order
    pub statements: Vec<Statement>,
    /// Source span
    pub span: Span,
}

/// A statement together with the span starting at its first token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Statement {
    pub kind: StatementKind,
    pub span: Span,
}

impl Statement {
    pub fn new(kind: StatementKind, span: Span) -> Self {
        Self { kind, span }
    }

    pub fn line(&self) -> usize {
        self.span.line()
    }
}

/// Statement variants.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum StatementKind {
    /// `DECLARE name : [ARRAY[l:u[, l:u]] OF] TYPE`
    VariableDeclaration {
        name: Identifier,
        data_type: DataType,
        /// Empty for scalars, one or two entries for arrays
        dimensions: Vec<Dimension>,
    },
    /// `CONSTANT name ← value`
    ConstantDeclaration { name: Identifier, value: Expression },
    /// `target ← value`
    Assignment { target: Target, value: Expression },
    /// `INPUT target`
    Input { target: Target },
    /// `OUTPUT expression`
    Output { expression: Expression },
    If {
        condition: Expression,
        then_branch: Vec<Statement>,
        else_branch: Option<Vec<Statement>>,
    },
    Case {
        subject: Expression,
        branches: Vec<CaseBranch>,
        otherwise: Option<Box<Statement>>,
    },
    For {
        variable: Identifier,
        start: Expression,
        end: Expression,
        step: Expression,
        body: Vec<Statement>,
        /// The identifier written after `NEXT`
        next: Identifier,
    },
    Repeat {
        body: Vec<Statement>,
        condition: Expression,
    },
    While {
        condition: Expression,
        body: Vec<Statement>,
    },
    ProcedureDeclaration(Callable),
    FunctionDeclaration(Callable),
    /// `CALL name(arguments)`
    Call {
        name: Identifier,
        arguments: Vec<Expression>,
    },
    Return { value: Expression },
    OpenFile { file: Expression, mode: FileMode },
    ReadFile { file: Expression, target: Target },
    WriteFile { file: Expression, value: Expression },
    CloseFile { file: Expression },
    /// Placeholder for a statement the parser could not make sense of
    Error { message: String },
}

/// A procedure or function declaration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Callable {
    pub name: Identifier,
    pub parameters: Vec<Parameter>,
    /// Declared return type; `None` for procedures
    pub return_type: Option<DataType>,
    pub body: Vec<Statement>,
}

/// A `name : TYPE` parameter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Parameter {
    pub name: Identifier,
    pub data_type: DataType,
}

/// One `lower : upper` array dimension.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dimension {
    pub lower: Expression,
    pub upper: Expression,
}

/// One `label : statement` arm of a CASE statement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseBranch {
    pub label: Expression,
    pub statement: Statement,
}

/// Something a value can be stored into: a variable or an array cell.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Target {
    pub name: Identifier,
    /// Empty for a plain variable, one or two entries for an array cell
    pub indices: Vec<Expression>,
    pub span: Span,
}

impl Target {
    pub fn is_element(&self) -> bool {
        !self.indices.is_empty()
    }
}

/// Built-in data types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataType {
    Integer,
    Real,
    Char,
    String,
    Boolean,
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DataType::Integer => "INTEGER",
            DataType::Real => "REAL",
            DataType::Char => "CHAR",
            DataType::String => "STRING",
            DataType::Boolean => "BOOLEAN",
        };
        f.write_str(name)
    }
}

/// Mode a file is opened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FileMode {
    Read,
    Write,
}

impl fmt::Display for FileMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileMode::Read => f.write_str("READ"),
            FileMode::Write => f.write_str("WRITE"),
        }
    }
}

/// An expression.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Expression {
    /// `left operator right`
    Binary {
        operator: BinaryOperator,
        left: Box<Expression>,
        right: Box<Expression>,
        span: Span,
    },
    /// `operator operand`
    Unary {
        operator: UnaryOperator,
        operand: Box<Expression>,
        span: Span,
    },
    Literal { value: Literal, span: Span },
    /// Variable or constant reference
    Variable(Identifier),
    /// `name[i]` or `name[i, j]`
    ArrayAccess {
        name: Identifier,
        indices: Vec<Expression>,
        span: Span,
    },
    /// `name(arguments)`
    FunctionCall {
        name: Identifier,
        arguments: Vec<Expression>,
        span: Span,
    },
    /// `(expression)`
    Grouping {
        expression: Box<Expression>,
        span: Span,
    },
}

impl Expression {
    pub fn span(&self) -> Span {
        match self {
            Expression::Binary { span, .. } => *span,
            Expression::Unary { span, .. } => *span,
            Expression::Literal { span, .. } => *span,
            Expression::Variable(id) => id.span,
            Expression::ArrayAccess { span, .. } => *span,
            Expression::FunctionCall { span, .. } => *span,
            Expression::Grouping { span, .. } => *span,
        }
    }
}

/// A literal value as written in the source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Literal {
    Integer(i64),
    Real(f64),
    Char(char),
    String(String),
    Boolean(bool),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOperator {
    Or,
    And,
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    Add,
    Subtract,
    Multiply,
    Divide,
    Power,
}

impl fmt::Display for BinaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            BinaryOperator::Or => "OR",
            BinaryOperator::And => "AND",
            BinaryOperator::Equal => "=",
            BinaryOperator::NotEqual => "<>",
            BinaryOperator::Less => "<",
            BinaryOperator::LessEqual => "<=",
            BinaryOperator::Greater => ">",
            BinaryOperator::GreaterEqual => ">=",
            BinaryOperator::Add => "+",
            BinaryOperator::Subtract => "-",
            BinaryOperator::Multiply => "*",
            BinaryOperator::Divide => "/",
            BinaryOperator::Power => "^",
        };
        f.write_str(symbol)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOperator {
    Negate,
    Not,
}

impl fmt::Display for UnaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnaryOperator::Negate => f.write_str("-"),
            UnaryOperator::Not => f.write_str("NOT"),
        }
    }
}

/// An identifier, spelled as in the source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Identifier {
    pub name: String,
    pub span: Span,
}

impl Identifier {
    pub fn new(name: impl Into<String>, span: Span) -> Self {
        Self {
            name: name.into(),
            span,
        }
    }
}
