//! Lexer for the pseudocode language.
//!
//! Uses the `logos` crate for tokenization. Identifiers are matched first and
//! then upper-cased for keyword lookup, so keywords are case-insensitive while
//! the token text keeps its original spelling.

use logos::Logos;

use crate::ast::Literal;
use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::error::ErrorKind;
use crate::span::{LineIndex, Span};

/// Token kinds for the pseudocode language.
#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[logos(skip r"[ \t\r\n]+")]
#[logos(skip r"//[^\n]*")]
pub enum TokenKind {
    // Keywords (resolved from identifiers, see `keyword`)
    Declare,
    Constant,
    Array,
    Of,
    Input,
    Output,
    If,
    Then,
    Else,
    EndIf,
    Case,
    Otherwise,
    EndCase,
    For,
    To,
    Step,
    Next,
    Repeat,
    Until,
    While,
    Do,
    EndWhile,
    Procedure,
    EndProcedure,
    Function,
    Returns,
    Return,
    EndFunction,
    Call,
    OpenFile,
    ReadFile,
    WriteFile,
    CloseFile,
    Read,
    Write,

    // Data types
    IntegerType,
    RealType,
    CharType,
    StringType,
    BooleanType,

    // Boolean literals and operators
    True,
    False,
    And,
    Or,
    Not,

    // Assignment arrow (the host transliterates `<-` before we see it)
    #[token("←")]
    #[token("⟵")]
    Assign,

    // Arithmetic
    #[token("+")]
    Plus,

    #[token("-")]
    Minus,

    #[token("*")]
    Star,

    #[token("/")]
    Slash,

    #[token("^")]
    Caret,

    // Relational
    #[token("=")]
    Equal,

    #[token("<>")]
    NotEqual,

    #[token("<")]
    Less,

    #[token("<=")]
    LessEqual,

    #[token(">")]
    Greater,

    #[token(">=")]
    GreaterEqual,

    // Punctuation
    #[token(":")]
    Colon,

    #[token(",")]
    Comma,

    #[token("(")]
    LParen,

    #[token(")")]
    RParen,

    #[token("[")]
    LBracket,

    #[token("]")]
    RBracket,

    // Identifiers
    #[regex(r"[A-Za-z_][A-Za-z0-9_]*")]
    Identifier,

    // Literals
    #[regex(r"[0-9]+")]
    IntegerLiteral,

    #[regex(r"[0-9]+\.[0-9]+")]
    RealLiteral,

    #[regex(r"'[^']'")]
    CharLiteral,

    #[regex(r#""[^"]*""#)]
    StringLiteral,

    // A string that runs to the end of the input without a closing quote
    #[regex(r#""[^"]*"#)]
    UnterminatedString,

    // End of input
    Eof,
}

impl TokenKind {
    /// Whether a token of this kind can start a statement.
    pub fn starts_statement(&self) -> bool {
        matches!(
            self,
            TokenKind::Declare
                | TokenKind::Constant
                | TokenKind::Procedure
                | TokenKind::Function
                | TokenKind::If
                | TokenKind::Case
                | TokenKind::For
                | TokenKind::Repeat
                | TokenKind::While
                | TokenKind::Input
                | TokenKind::Output
                | TokenKind::Call
                | TokenKind::Return
                | TokenKind::OpenFile
                | TokenKind::ReadFile
                | TokenKind::WriteFile
                | TokenKind::CloseFile
        )
    }

    /// Whether a token of this kind closes (or splits) a block.
    pub fn ends_block(&self) -> bool {
        matches!(
            self,
            TokenKind::Else
                | TokenKind::EndIf
                | TokenKind::Otherwise
                | TokenKind::EndCase
                | TokenKind::Next
                | TokenKind::Until
                | TokenKind::EndWhile
                | TokenKind::EndProcedure
                | TokenKind::EndFunction
        )
    }

    /// How the token is named in messages.
    pub fn describe(&self) -> &'static str {
        match self {
            TokenKind::Declare => "DECLARE",
            TokenKind::Constant => "CONSTANT",
            TokenKind::Array => "ARRAY",
            TokenKind::Of => "OF",
            TokenKind::Input => "INPUT",
            TokenKind::Output => "OUTPUT",
            TokenKind::If => "IF",
            TokenKind::Then => "THEN",
            TokenKind::Else => "ELSE",
            TokenKind::EndIf => "ENDIF",
            TokenKind::Case => "CASE",
            TokenKind::Otherwise => "OTHERWISE",
            TokenKind::EndCase => "ENDCASE",
            TokenKind::For => "FOR",
            TokenKind::To => "TO",
            TokenKind::Step => "STEP",
            TokenKind::Next => "NEXT",
            TokenKind::Repeat => "REPEAT",
            TokenKind::Until => "UNTIL",
            TokenKind::While => "WHILE",
            TokenKind::Do => "DO",
            TokenKind::EndWhile => "ENDWHILE",
            TokenKind::Procedure => "PROCEDURE",
            TokenKind::EndProcedure => "ENDPROCEDURE",
            TokenKind::Function => "FUNCTION",
            TokenKind::Returns => "RETURNS",
            TokenKind::Return => "RETURN",
            TokenKind::EndFunction => "ENDFUNCTION",
            TokenKind::Call => "CALL",
            TokenKind::OpenFile => "OPENFILE",
            TokenKind::ReadFile => "READFILE",
            TokenKind::WriteFile => "WRITEFILE",
            TokenKind::CloseFile => "CLOSEFILE",
            TokenKind::Read => "READ",
            TokenKind::Write => "WRITE",
            TokenKind::IntegerType => "INTEGER",
            TokenKind::RealType => "REAL",
            TokenKind::CharType => "CHAR",
            TokenKind::StringType => "STRING",
            TokenKind::BooleanType => "BOOLEAN",
            TokenKind::True => "TRUE",
            TokenKind::False => "FALSE",
            TokenKind::And => "AND",
            TokenKind::Or => "OR",
            TokenKind::Not => "NOT",
            TokenKind::Assign => "\"←\"",
            TokenKind::Plus => "\"+\"",
            TokenKind::Minus => "\"-\"",
            TokenKind::Star => "\"*\"",
            TokenKind::Slash => "\"/\"",
            TokenKind::Caret => "\"^\"",
            TokenKind::Equal => "\"=\"",
            TokenKind::NotEqual => "\"<>\"",
            TokenKind::Less => "\"<\"",
            TokenKind::LessEqual => "\"<=\"",
            TokenKind::Greater => "\">\"",
            TokenKind::GreaterEqual => "\">=\"",
            TokenKind::Colon => "\":\"",
            TokenKind::Comma => "\",\"",
            TokenKind::LParen => "\"(\"",
            TokenKind::RParen => "\")\"",
            TokenKind::LBracket => "\"[\"",
            TokenKind::RBracket => "\"]\"",
            TokenKind::Identifier => "identifier",
            TokenKind::IntegerLiteral => "integer literal",
            TokenKind::RealLiteral => "real literal",
            TokenKind::CharLiteral => "character literal",
            TokenKind::StringLiteral | TokenKind::UnterminatedString => "string literal",
            TokenKind::Eof => "end of input",
        }
    }
}

/// Map an upper-cased identifier to its reserved word, if any.
///
/// `DIV` and `MOD` are deliberately absent: they are ordinary identifiers
/// resolved as built-in functions at call time.
pub fn keyword(upper: &str) -> Option<TokenKind> {
    let kind = match upper {
        "DECLARE" => TokenKind::Declare,
        "CONSTANT" => TokenKind::Constant,
        "ARRAY" => TokenKind::Array,
        "OF" => TokenKind::Of,
        "INPUT" => TokenKind::Input,
        "OUTPUT" => TokenKind::Output,
        "IF" => TokenKind::If,
        "THEN" => TokenKind::Then,
        "ELSE" => TokenKind::Else,
        "ENDIF" => TokenKind::EndIf,
        "CASE" => TokenKind::Case,
        "OTHERWISE" => TokenKind::Otherwise,
        "ENDCASE" => TokenKind::EndCase,
        "FOR" => TokenKind::For,
        "TO" => TokenKind::To,
        "STEP" => TokenKind::Step,
        "NEXT" => TokenKind::Next,
        "REPEAT" => TokenKind::Repeat,
        "UNTIL" => TokenKind::Until,
        "WHILE" => TokenKind::While,
        "DO" => TokenKind::Do,
        "ENDWHILE" => TokenKind::EndWhile,
        "PROCEDURE" => TokenKind::Procedure,
        "ENDPROCEDURE" => TokenKind::EndProcedure,
        "FUNCTION" => TokenKind::Function,
        "RETURNS" => TokenKind::Returns,
        "RETURN" => TokenKind::Return,
        "ENDFUNCTION" => TokenKind::EndFunction,
        "CALL" => TokenKind::Call,
        "OPENFILE" => TokenKind::OpenFile,
        "READFILE" => TokenKind::ReadFile,
        "WRITEFILE" => TokenKind::WriteFile,
        "CLOSEFILE" => TokenKind::CloseFile,
        "READ" => TokenKind::Read,
        "WRITE" => TokenKind::Write,
        "INTEGER" => TokenKind::IntegerType,
        "REAL" => TokenKind::RealType,
        "CHAR" => TokenKind::CharType,
        "STRING" => TokenKind::StringType,
        "BOOLEAN" => TokenKind::BooleanType,
        "TRUE" => TokenKind::True,
        "FALSE" => TokenKind::False,
        "AND" => TokenKind::And,
        "OR" => TokenKind::Or,
        "NOT" => TokenKind::Not,
        _ => return None,
    };
    Some(kind)
}

/// A token with its kind, text, decoded literal and source span.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    /// Exact source text
    pub text: String,
    /// Decoded value for literal tokens
    pub literal: Option<Literal>,
    pub span: Span,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>, span: Span) -> Self {
        Self {
            kind,
            text: text.into(),
            literal: None,
            span,
        }
    }

    pub fn with_literal(mut self, literal: Literal) -> Self {
        self.literal = Some(literal);
        self
    }

    pub fn line(&self) -> usize {
        self.span.line()
    }
}

/// Lexer for the pseudocode language.
pub struct Lexer<'a> {
    source: &'a str,
    inner: logos::Lexer<'a, TokenKind>,
    index: LineIndex<'a>,
    diagnostics: Diagnostics,
    finished: bool,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            inner: TokenKind::lexer(source),
            index: LineIndex::new(source),
            diagnostics: Diagnostics::new(),
            finished: false,
        }
    }

    /// Get the next token. Once the input is exhausted every call returns
    /// an end-of-input token.
    pub fn next_token(&mut self) -> Token {
        loop {
            if self.finished {
                let span = self.index.span(self.source.len(), self.source.len());
                return Token::new(TokenKind::Eof, "", span);
            }

            match self.inner.next() {
                Some(Ok(kind)) => {
                    let range = self.inner.span();
                    let text = self.inner.slice();
                    let span = self.index.span(range.start, range.end);
                    if let Some(token) = self.classify(kind, text, span) {
                        return token;
                    }
                }
                Some(Err(())) => {
                    let range = self.inner.span();
                    let span = self.index.span(range.start, range.end);
                    let found = self.source[range.start..].chars().next().unwrap_or('?');
                    let message = if found == '\'' {
                        "Unterminated character literal".to_string()
                    } else {
                        format!("Unexpected character '{}'", found)
                    };
                    self.report(message, span);
                }
                None => {
                    self.finished = true;
                }
            }
        }
    }

    /// Turn a raw logos match into a token, or report it and return `None`.
    fn classify(&mut self, kind: TokenKind, text: &str, span: Span) -> Option<Token> {
        let token = match kind {
            TokenKind::Identifier => {
                let kind = keyword(&text.to_ascii_uppercase()).unwrap_or(TokenKind::Identifier);
                Token::new(kind, text, span)
            }
            TokenKind::IntegerLiteral => match text.parse::<i64>() {
                Ok(value) => Token::new(kind, text, span).with_literal(Literal::Integer(value)),
                Err(_) => {
                    self.report(format!("Integer literal {} is out of range", text), span);
                    return None;
                }
            },
            TokenKind::RealLiteral => match text.parse::<f64>() {
                Ok(value) => Token::new(kind, text, span).with_literal(Literal::Real(value)),
                Err(_) => {
                    self.report(format!("Invalid real literal {}", text), span);
                    return None;
                }
            },
            TokenKind::CharLiteral => {
                let value = text.chars().nth(1).unwrap_or_default();
                Token::new(kind, text, span).with_literal(Literal::Char(value))
            }
            TokenKind::StringLiteral => {
                let value = text[1..text.len() - 1].to_string();
                Token::new(kind, text, span).with_literal(Literal::String(value))
            }
            TokenKind::UnterminatedString => {
                self.report("Unterminated string", span);
                return None;
            }
            _ => Token::new(kind, text, span),
        };
        Some(token)
    }

    fn report(&mut self, message: impl Into<String>, span: Span) {
        self.diagnostics.push(
            Diagnostic::error(ErrorKind::Syntax, message)
                .with_span(span)
                .build(),
        );
    }

    /// Tokenize the entire source. The result always ends with an
    /// end-of-input token.
    pub fn tokenize(&mut self) -> Vec<Token> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token();
            let is_eof = token.kind == TokenKind::Eof;
            tokens.push(token);
            if is_eof {
                break;
            }
        }
        tokens
    }

    /// Problems found so far.
    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub fn into_diagnostics(self) -> Diagnostics {
        self.diagnostics
    }
}

/// Tokenize `source`, returning the tokens and any lexical diagnostics.
pub fn tokenize(source: &str) -> (Vec<Token>, Diagnostics) {
    let mut lexer = Lexer::new(source);
    let tokens = lexer.tokenize();
    (tokens, lexer.into_diagnostics())
}
