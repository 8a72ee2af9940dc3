//! Pseudocode Core Library
//!
//! This crate provides the core functionality for the pseudocode teaching
//! language: lexing, parsing with error recovery and tree-walking
//! evaluation against host-supplied input, output and file collaborators.

pub mod ast;
pub mod config;
pub mod diagnostics;
pub mod doc;
pub mod environment;
pub mod error;
pub mod host;
pub mod interpreter;
pub mod lexer;
pub mod parser;
pub mod span;
pub mod value;

pub use ast::*;
pub use config::{Config, Limits};
pub use diagnostics::{Diagnostic, DiagnosticSeverity, Diagnostics};
pub use error::{Error, ErrorKind, Result};
pub use host::{BufferSink, FileStore, InputSource, OutputKind, OutputSink, QueueInput};
pub use interpreter::{interpret, run, Interpreter, OutputLine, RunOptions, RunOutput};
pub use lexer::{Lexer, Token, TokenKind};
pub use parser::Parser;
pub use span::Span;
pub use value::Value;
