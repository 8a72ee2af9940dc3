//! Error taxonomy shared by the lexer, parser and interpreter.

use std::fmt;

use miette::{LabeledSpan, SourceSpan};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::span::Span;

/// Classification of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Lexical or grammatical error.
    Syntax,
    /// Undeclared/redeclared names, bad array access, division by zero,
    /// file-state violations.
    Runtime,
    /// Non-boolean conditions, operand and argument type mismatches.
    Type,
    /// Unknown procedure or function.
    Reference,
    /// Failures reported by the file store.
    File,
    /// States that should be unreachable.
    Internal,
    /// A governor tripped. Always stops the whole run.
    Limit,
}

impl ErrorKind {
    /// Name used when rendering the error.
    pub fn name(self) -> &'static str {
        match self {
            ErrorKind::Syntax => "SyntaxError",
            ErrorKind::Runtime => "RuntimeError",
            ErrorKind::Type => "TypeError",
            ErrorKind::Reference => "ReferenceError",
            ErrorKind::File => "FileError",
            ErrorKind::Internal => "InternalError",
            ErrorKind::Limit => "LimitExceeded",
        }
    }

    /// Stable diagnostic code.
    pub fn code(self) -> &'static str {
        match self {
            ErrorKind::Syntax => "pseudocode::syntax",
            ErrorKind::Runtime => "pseudocode::runtime",
            ErrorKind::Type => "pseudocode::type",
            ErrorKind::Reference => "pseudocode::reference",
            ErrorKind::File => "pseudocode::file",
            ErrorKind::Internal => "pseudocode::internal",
            ErrorKind::Limit => "pseudocode::limit",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// An error raised while lexing, parsing or running a program.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{kind}: {message}{}", location(.kind, .span))]
pub struct Error {
    pub kind: ErrorKind,
    pub message: String,
    /// Where the error happened, once known. Runtime errors raised deep in
    /// expression evaluation get the span of the statement being executed.
    pub span: Option<Span>,
}

fn location(kind: &ErrorKind, span: &Option<Span>) -> String {
    match span {
        Some(span) if *kind == ErrorKind::Syntax => {
            format!(" at line {}, column {}", span.line(), span.column())
        }
        Some(span) => format!(" at line {}", span.line()),
        None => String::new(),
    }
}

/// Result alias for interpreter operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            span: None,
        }
    }

    pub fn syntax(message: impl Into<String>, span: Span) -> Self {
        Self::new(ErrorKind::Syntax, message).with_span(span)
    }

    pub fn runtime(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Runtime, message)
    }

    pub fn type_error(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Type, message)
    }

    pub fn reference(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Reference, message)
    }

    pub fn file(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::File, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }

    pub fn limit(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Limit, message)
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }

    /// Attach a span unless one is already set.
    pub fn or_span(mut self, span: Span) -> Self {
        if self.span.is_none() {
            self.span = Some(span);
        }
        self
    }

    /// Whether the error must stop the whole run rather than a single
    /// top-level statement.
    pub fn is_fatal(&self) -> bool {
        self.kind == ErrorKind::Limit
    }

    pub fn line(&self) -> Option<usize> {
        self.span.map(|span| span.line())
    }
}

impl miette::Diagnostic for Error {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        Some(Box::new(self.kind.code()))
    }

    fn help<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        let help = match self.kind {
            ErrorKind::Limit => "the run was stopped; check loop conditions or raise the limit in pseudocode.toml",
            ErrorKind::Reference => "procedures and functions must be declared before they are called",
            _ => return None,
        };
        Some(Box::new(help))
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        let span = self.span?;
        let source_span = SourceSpan::new(span.start.offset.into(), span.len().max(1));
        Some(Box::new(std::iter::once(LabeledSpan::new_with_span(
            Some(self.kind.name().to_string()),
            source_span,
        ))))
    }
}
