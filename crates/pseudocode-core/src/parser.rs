//! Recursive-descent parser for the pseudocode language.
//!
//! Every statement is parsed inside a recovery boundary: a syntax error is
//! recorded as a diagnostic, an [`StatementKind::Error`] placeholder takes the
//! statement's place, and the cursor is moved to the next plausible statement
//! start. Parsing therefore always yields a complete program.

use crate::ast::*;
use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::error::{Error, Result};
use crate::lexer::{Lexer, Token, TokenKind};
use crate::span::Span;

/// Diagnostic code for a `NEXT` identifier that names a different variable.
pub const NEXT_MISMATCH: &str = "pseudocode::next-mismatch";

/// Deepest nesting of blocks, and of operators, parentheses and calls
/// within one expression, that the parser accepts.
pub const MAX_NESTING: usize = 100;

#[derive(Clone, Copy)]
enum Nesting {
    Block,
    Expression,
}

impl Nesting {
    fn message(self) -> &'static str {
        match self {
            Nesting::Block => "Statements are nested too deeply",
            Nesting::Expression => "Expression is nested too deeply",
        }
    }
}

/// Parser for the pseudocode language.
pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    block_depth: usize,
    expression_depth: usize,
    diagnostics: Diagnostics,
}

impl Parser {
    /// Lex `source` and prepare to parse it. Lexical diagnostics are carried
    /// over into the parser's diagnostics.
    pub fn new(source: &str) -> Self {
        let mut lexer = Lexer::new(source);
        let tokens = lexer.tokenize();
        let mut parser = Self::from_tokens(tokens);
        parser.diagnostics = lexer.into_diagnostics();
        parser
    }

    /// Parse an already lexed token sequence.
    pub fn from_tokens(mut tokens: Vec<Token>) -> Self {
        if tokens.last().map(|t| t.kind) != Some(TokenKind::Eof) {
            let span = tokens.last().map(|t| t.span).unwrap_or_default();
            tokens.push(Token::new(TokenKind::Eof, "", span));
        }
        Self {
            tokens,
            pos: 0,
            block_depth: 0,
            expression_depth: 0,
            diagnostics: Diagnostics::new(),
        }
    }

    /// Parse the entire program.
    pub fn parse(mut self) -> (Program, Diagnostics) {
        let start_span = self.current_span();
        let statements = self.parse_block(&[]);
        let end_span = self.previous_span();

        let program = Program {
            statements,
            span: start_span.merge(&end_span),
        };
        (program, self.diagnostics)
    }

    /// Parse statements until one of `terminators` (or end of input) is the
    /// current token. The terminator itself is not consumed.
    fn parse_block(&mut self, terminators: &[TokenKind]) -> Vec<Statement> {
        let mut statements = Vec::new();
        while !self.is_at_end() && !terminators.contains(&self.current().kind) {
            statements.push(self.parse_recovering(true));
        }
        statements
    }

    /// Parse one statement, turning a failure into an error placeholder.
    fn parse_recovering(&mut self, allow_declarations: bool) -> Statement {
        let start = self.pos;
        let recorded = self.diagnostics.len();

        let span = self.current_span();
        let parsed = self.nested(Nesting::Block, span, |parser| {
            parser.parse_statement(allow_declarations)
        });
        match parsed {
            Ok(statement) => statement,
            Err(error) => {
                // Anything the failed attempt recorded describes tokens we
                // are about to parse again.
                self.diagnostics.truncate(recorded);
                self.diagnostics.push(Diagnostic::from(&error));

                self.pos = (start + 1).min(self.tokens.len() - 1);
                self.synchronize();

                let span = error.span.unwrap_or_else(|| self.tokens[start].span);
                Statement::new(
                    StatementKind::Error {
                        message: error.message,
                    },
                    span,
                )
            }
        }
    }

    /// Run `parse` one nesting level deeper, failing once the level passes
    /// [`MAX_NESTING`].
    fn nested<T>(
        &mut self,
        nesting: Nesting,
        span: Span,
        parse: impl FnOnce(&mut Self) -> Result<T>,
    ) -> Result<T> {
        let depth = match nesting {
            Nesting::Block => &mut self.block_depth,
            Nesting::Expression => &mut self.expression_depth,
        };
        if *depth >= MAX_NESTING {
            return Err(Error::syntax(nesting.message(), span));
        }
        *depth += 1;
        let result = parse(self);
        match nesting {
            Nesting::Block => self.block_depth -= 1,
            Nesting::Expression => self.expression_depth -= 1,
        }
        result
    }

    /// Skip tokens until something that can begin a statement or close a
    /// block.
    fn synchronize(&mut self) {
        while !self.is_at_end() {
            let kind = self.current().kind;
            if kind.starts_statement() || kind.ends_block() {
                return;
            }
            if kind == TokenKind::Identifier && self.starts_line() {
                return;
            }
            self.advance();
        }
    }

    /// Whether the current token is the first one on its line.
    fn starts_line(&self) -> bool {
        match self.pos.checked_sub(1).and_then(|i| self.tokens.get(i)) {
            Some(previous) => previous.span.end.line < self.current().span.line(),
            None => true,
        }
    }

    fn parse_statement(&mut self, allow_declarations: bool) -> Result<Statement> {
        let token = self.current().clone();

        let kind = match token.kind {
            TokenKind::Declare if allow_declarations => self.parse_variable_declaration()?,
            TokenKind::Constant if allow_declarations => self.parse_constant_declaration()?,
            TokenKind::Procedure if allow_declarations => self.parse_procedure()?,
            TokenKind::Function if allow_declarations => self.parse_function()?,
            TokenKind::Input => {
                self.advance();
                StatementKind::Input {
                    target: self.parse_target()?,
                }
            }
            TokenKind::Output => {
                self.advance();
                StatementKind::Output {
                    expression: self.parse_expression()?,
                }
            }
            TokenKind::If => self.parse_if()?,
            TokenKind::Case => self.parse_case()?,
            TokenKind::For => self.parse_for()?,
            TokenKind::Repeat => self.parse_repeat()?,
            TokenKind::While => self.parse_while()?,
            TokenKind::Call => self.parse_call()?,
            TokenKind::Return => {
                self.advance();
                StatementKind::Return {
                    value: self.parse_expression()?,
                }
            }
            TokenKind::OpenFile => self.parse_open_file()?,
            TokenKind::ReadFile => {
                self.advance();
                let file = self.parse_expression()?;
                self.expect(TokenKind::Comma, "Expected \",\" after file name")?;
                let target = self.parse_target()?;
                StatementKind::ReadFile { file, target }
            }
            TokenKind::WriteFile => {
                self.advance();
                let file = self.parse_expression()?;
                self.expect(TokenKind::Comma, "Expected \",\" after file name")?;
                let value = self.parse_expression()?;
                StatementKind::WriteFile { file, value }
            }
            TokenKind::CloseFile => {
                self.advance();
                StatementKind::CloseFile {
                    file: self.parse_expression()?,
                }
            }
            TokenKind::Identifier => {
                let target = self.parse_target()?;
                self.expect(TokenKind::Assign, "Expected \"←\" in assignment")?;
                let value = self.parse_expression()?;
                StatementKind::Assignment { target, value }
            }
            TokenKind::Declare | TokenKind::Constant | TokenKind::Procedure | TokenKind::Function => {
                return Err(Error::syntax(
                    format!("{} is not allowed here", token.kind.describe()),
                    token.span,
                ));
            }
            _ => return Err(self.error_here("Expected a statement")),
        };

        Ok(Statement::new(kind, token.span))
    }

    fn parse_variable_declaration(&mut self) -> Result<StatementKind> {
        self.expect(TokenKind::Declare, "Expected DECLARE")?;
        let name = self.parse_identifier("Expected variable name")?;
        self.expect(TokenKind::Colon, "Expected \":\" after variable name")?;

        let mut dimensions = Vec::new();
        if self.matches(TokenKind::Array) {
            self.expect(TokenKind::LBracket, "Expected \"[\" after ARRAY")?;
            dimensions.push(self.parse_dimension()?);
            if self.matches(TokenKind::Comma) {
                dimensions.push(self.parse_dimension()?);
            }
            self.expect(TokenKind::RBracket, "Expected \"]\" after array dimensions")?;
            self.expect(TokenKind::Of, "Expected OF after array dimensions")?;
        }

        let data_type = self.parse_data_type()?;
        Ok(StatementKind::VariableDeclaration {
            name,
            data_type,
            dimensions,
        })
    }

    fn parse_dimension(&mut self) -> Result<Dimension> {
        let lower = self.parse_expression()?;
        self.expect(TokenKind::Colon, "Expected \":\" in array dimension")?;
        let upper = self.parse_expression()?;
        Ok(Dimension { lower, upper })
    }

    fn parse_constant_declaration(&mut self) -> Result<StatementKind> {
        self.expect(TokenKind::Constant, "Expected CONSTANT")?;
        let name = self.parse_identifier("Expected constant name")?;
        self.expect(TokenKind::Assign, "Expected \"←\" after constant name")?;
        let value = self.parse_expression()?;
        Ok(StatementKind::ConstantDeclaration { name, value })
    }

    fn parse_procedure(&mut self) -> Result<StatementKind> {
        self.expect(TokenKind::Procedure, "Expected PROCEDURE")?;
        let name = self.parse_identifier("Expected procedure name")?;
        let parameters = self.parse_parameters()?;
        let body = self.parse_block(&[TokenKind::EndProcedure]);
        self.expect(TokenKind::EndProcedure, "Expected ENDPROCEDURE")?;

        Ok(StatementKind::ProcedureDeclaration(Callable {
            name,
            parameters,
            return_type: None,
            body,
        }))
    }

    fn parse_function(&mut self) -> Result<StatementKind> {
        self.expect(TokenKind::Function, "Expected FUNCTION")?;
        let name = self.parse_identifier("Expected function name")?;
        let parameters = self.parse_parameters()?;
        self.expect(TokenKind::Returns, "Expected RETURNS after function parameters")?;
        let return_type = self.parse_data_type()?;
        let body = self.parse_block(&[TokenKind::EndFunction]);
        self.expect(TokenKind::EndFunction, "Expected ENDFUNCTION")?;

        Ok(StatementKind::FunctionDeclaration(Callable {
            name,
            parameters,
            return_type: Some(return_type),
            body,
        }))
    }

    /// Parse an optional parenthesised `name : TYPE` list.
    fn parse_parameters(&mut self) -> Result<Vec<Parameter>> {
        let mut parameters = Vec::new();
        if !self.matches(TokenKind::LParen) {
            return Ok(parameters);
        }

        if !self.check(TokenKind::RParen) {
            loop {
                let name = self.parse_identifier("Expected parameter name")?;
                self.expect(TokenKind::Colon, "Expected \":\" after parameter name")?;
                let data_type = self.parse_data_type()?;
                parameters.push(Parameter { name, data_type });
                if !self.matches(TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(TokenKind::RParen, "Expected \")\" after parameters")?;
        Ok(parameters)
    }

    fn parse_if(&mut self) -> Result<StatementKind> {
        self.expect(TokenKind::If, "Expected IF")?;
        let condition = self.parse_expression()?;
        self.expect(TokenKind::Then, "Expected THEN after IF condition")?;

        let then_branch = self.parse_block(&[TokenKind::Else, TokenKind::EndIf]);
        let else_branch = if self.matches(TokenKind::Else) {
            Some(self.parse_block(&[TokenKind::EndIf]))
        } else {
            None
        };
        self.expect(TokenKind::EndIf, "Expected ENDIF")?;

        Ok(StatementKind::If {
            condition,
            then_branch,
            else_branch,
        })
    }

    fn parse_case(&mut self) -> Result<StatementKind> {
        self.expect(TokenKind::Case, "Expected CASE")?;
        let subject = self.parse_expression()?;
        self.expect(TokenKind::Of, "Expected OF after CASE expression")?;

        let mut branches = Vec::new();
        while !self.check(TokenKind::Otherwise) && !self.check(TokenKind::EndCase) && !self.is_at_end() {
            let label = self.parse_expression()?;
            self.expect(TokenKind::Colon, "Expected \":\" after case value")?;
            let statement = self.parse_recovering(false);
            branches.push(CaseBranch { label, statement });
        }

        let otherwise = if self.matches(TokenKind::Otherwise) {
            self.expect(TokenKind::Colon, "Expected \":\" after OTHERWISE")?;
            Some(Box::new(self.parse_recovering(false)))
        } else {
            None
        };
        self.expect(TokenKind::EndCase, "Expected ENDCASE")?;

        Ok(StatementKind::Case {
            subject,
            branches,
            otherwise,
        })
    }

    fn parse_for(&mut self) -> Result<StatementKind> {
        let for_token = self.expect(TokenKind::For, "Expected FOR")?;
        let variable = self.parse_identifier("Expected loop variable name")?;
        self.expect(TokenKind::Assign, "Expected \"←\" after loop variable")?;
        let start = self.parse_expression()?;
        self.expect(TokenKind::To, "Expected TO after start value")?;
        let end = self.parse_expression()?;

        let step = if self.matches(TokenKind::Step) {
            self.parse_expression()?
        } else {
            Expression::Literal {
                value: Literal::Integer(1),
                span: for_token.span,
            }
        };

        let body = self.parse_block(&[TokenKind::Next]);
        self.expect(TokenKind::Next, "Expected NEXT")?;
        let next = self.parse_identifier("Expected variable name after NEXT")?;

        if next.name != variable.name {
            self.diagnostics.push(
                Diagnostic::warning(
                    NEXT_MISMATCH,
                    format!("NEXT {} does not match loop variable {}", next.name, variable.name),
                )
                .with_span(next.span)
                .with_help(format!("write NEXT {}", variable.name))
                .build(),
            );
        }

        Ok(StatementKind::For {
            variable,
            start,
            end,
            step,
            body,
            next,
        })
    }

    fn parse_repeat(&mut self) -> Result<StatementKind> {
        self.expect(TokenKind::Repeat, "Expected REPEAT")?;
        let body = self.parse_block(&[TokenKind::Until]);
        self.expect(TokenKind::Until, "Expected UNTIL")?;
        let condition = self.parse_expression()?;
        Ok(StatementKind::Repeat { body, condition })
    }

    fn parse_while(&mut self) -> Result<StatementKind> {
        self.expect(TokenKind::While, "Expected WHILE")?;
        let condition = self.parse_expression()?;
        self.expect(TokenKind::Do, "Expected DO after WHILE condition")?;
        let body = self.parse_block(&[TokenKind::EndWhile]);
        self.expect(TokenKind::EndWhile, "Expected ENDWHILE")?;
        Ok(StatementKind::While { condition, body })
    }

    fn parse_call(&mut self) -> Result<StatementKind> {
        self.expect(TokenKind::Call, "Expected CALL")?;
        let name = self.parse_identifier("Expected procedure name")?;
        let arguments = if self.matches(TokenKind::LParen) {
            self.parse_arguments()?
        } else {
            Vec::new()
        };
        Ok(StatementKind::Call { name, arguments })
    }

    fn parse_open_file(&mut self) -> Result<StatementKind> {
        self.expect(TokenKind::OpenFile, "Expected OPENFILE")?;
        let file = self.parse_expression()?;
        self.expect(TokenKind::For, "Expected FOR after file name")?;
        let mode = if self.matches(TokenKind::Read) {
            FileMode::Read
        } else if self.matches(TokenKind::Write) {
            FileMode::Write
        } else {
            return Err(self.error_here("Expected READ or WRITE"));
        };
        Ok(StatementKind::OpenFile { file, mode })
    }

    /// Parse `name` or `name[i]` or `name[i, j]`.
    fn parse_target(&mut self) -> Result<Target> {
        let name = self.parse_identifier("Expected variable name")?;
        let indices = if self.matches(TokenKind::LBracket) {
            self.parse_indices()?
        } else {
            Vec::new()
        };
        let span = name.span.merge(&self.previous_span());
        Ok(Target { name, indices, span })
    }

    /// Parse the indices of an array access; the `[` is already consumed.
    fn parse_indices(&mut self) -> Result<Vec<Expression>> {
        let mut indices = vec![self.parse_expression()?];
        if self.matches(TokenKind::Comma) {
            indices.push(self.parse_expression()?);
        }
        self.expect(TokenKind::RBracket, "Expected \"]\" after array indices")?;
        Ok(indices)
    }

    /// Parse a comma separated argument list; the `(` is already consumed.
    fn parse_arguments(&mut self) -> Result<Vec<Expression>> {
        let mut arguments = Vec::new();
        if !self.check(TokenKind::RParen) {
            loop {
                arguments.push(self.parse_expression()?);
                if !self.matches(TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(TokenKind::RParen, "Expected \")\" after arguments")?;
        Ok(arguments)
    }

    fn parse_data_type(&mut self) -> Result<DataType> {
        let data_type = match self.current().kind {
            TokenKind::IntegerType => DataType::Integer,
            TokenKind::RealType => DataType::Real,
            TokenKind::CharType => DataType::Char,
            TokenKind::StringType => DataType::String,
            TokenKind::BooleanType => DataType::Boolean,
            _ => return Err(self.error_here("Expected data type")),
        };
        self.advance();
        Ok(data_type)
    }

    fn parse_identifier(&mut self, message: &str) -> Result<Identifier> {
        let token = self.expect(TokenKind::Identifier, message)?;
        Ok(Identifier::new(token.text, token.span))
    }

    // Expressions, lowest precedence first

    /// Parse an expression.
    pub fn parse_expression(&mut self) -> Result<Expression> {
        let span = self.current_span();
        self.nested(Nesting::Expression, span, Self::parse_or)
    }

    fn parse_or(&mut self) -> Result<Expression> {
        let mut left = self.parse_and()?;
        while self.matches(TokenKind::Or) {
            let right = self.parse_and()?;
            left = binary(BinaryOperator::Or, left, right);
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expression> {
        let mut left = self.parse_equality()?;
        while self.matches(TokenKind::And) {
            let right = self.parse_equality()?;
            left = binary(BinaryOperator::And, left, right);
        }
        Ok(left)
    }

    fn parse_equality(&mut self) -> Result<Expression> {
        let mut left = self.parse_comparison()?;
        loop {
            let operator = match self.current().kind {
                TokenKind::Equal => BinaryOperator::Equal,
                TokenKind::NotEqual => BinaryOperator::NotEqual,
                _ => break,
            };
            self.advance();
            let right = self.parse_comparison()?;
            left = binary(operator, left, right);
        }
        Ok(left)
    }

    fn parse_comparison(&mut self) -> Result<Expression> {
        let mut left = self.parse_term()?;
        loop {
            let operator = match self.current().kind {
                TokenKind::Less => BinaryOperator::Less,
                TokenKind::LessEqual => BinaryOperator::LessEqual,
                TokenKind::Greater => BinaryOperator::Greater,
                TokenKind::GreaterEqual => BinaryOperator::GreaterEqual,
                _ => break,
            };
            self.advance();
            let right = self.parse_term()?;
            left = binary(operator, left, right);
        }
        Ok(left)
    }

    fn parse_term(&mut self) -> Result<Expression> {
        let mut left = self.parse_factor()?;
        loop {
            let operator = match self.current().kind {
                TokenKind::Plus => BinaryOperator::Add,
                TokenKind::Minus => BinaryOperator::Subtract,
                _ => break,
            };
            self.advance();
            let right = self.parse_factor()?;
            left = binary(operator, left, right);
        }
        Ok(left)
    }

    fn parse_factor(&mut self) -> Result<Expression> {
        let mut left = self.parse_power()?;
        loop {
            let operator = match self.current().kind {
                TokenKind::Star => BinaryOperator::Multiply,
                TokenKind::Slash => BinaryOperator::Divide,
                _ => break,
            };
            self.advance();
            let right = self.parse_power()?;
            left = binary(operator, left, right);
        }
        Ok(left)
    }

    /// `^` is right-associative and its operands are unary expressions.
    fn parse_power(&mut self) -> Result<Expression> {
        let base = self.parse_unary()?;
        if self.matches(TokenKind::Caret) {
            let span = self.current_span();
            let exponent = self.nested(Nesting::Expression, span, Self::parse_power)?;
            return Ok(binary(BinaryOperator::Power, base, exponent));
        }
        Ok(base)
    }

    fn parse_unary(&mut self) -> Result<Expression> {
        let operator = match self.current().kind {
            TokenKind::Minus => UnaryOperator::Negate,
            TokenKind::Not => UnaryOperator::Not,
            _ => return self.parse_call_expression(),
        };
        let start_span = self.advance().span;
        let operand = self.nested(Nesting::Expression, start_span, Self::parse_unary)?;
        let span = start_span.merge(&operand.span());
        Ok(Expression::Unary {
            operator,
            operand: Box::new(operand),
            span,
        })
    }

    fn parse_call_expression(&mut self) -> Result<Expression> {
        if self.check(TokenKind::Identifier) && self.peek_kind(1) == TokenKind::LParen {
            let name = self.parse_identifier("Expected function name")?;
            self.advance();
            let arguments = self.parse_arguments()?;
            let span = name.span.merge(&self.previous_span());
            return Ok(Expression::FunctionCall {
                name,
                arguments,
                span,
            });
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<Expression> {
        let token = self.current().clone();
        match token.kind {
            TokenKind::IntegerLiteral
            | TokenKind::RealLiteral
            | TokenKind::CharLiteral
            | TokenKind::StringLiteral => {
                self.advance();
                let value = token.literal.ok_or_else(|| {
                    Error::internal(format!("literal token '{}' carries no value", token.text))
                        .with_span(token.span)
                })?;
                Ok(Expression::Literal {
                    value,
                    span: token.span,
                })
            }
            TokenKind::True | TokenKind::False => {
                self.advance();
                Ok(Expression::Literal {
                    value: Literal::Boolean(token.kind == TokenKind::True),
                    span: token.span,
                })
            }
            TokenKind::Identifier => {
                let name = self.parse_identifier("Expected identifier")?;
                if self.matches(TokenKind::LBracket) {
                    let indices = self.parse_indices()?;
                    let span = name.span.merge(&self.previous_span());
                    return Ok(Expression::ArrayAccess {
                        name,
                        indices,
                        span,
                    });
                }
                Ok(Expression::Variable(name))
            }
            TokenKind::LParen => {
                self.advance();
                let expression = self.parse_expression()?;
                self.expect(TokenKind::RParen, "Expected \")\" after expression")?;
                Ok(Expression::Grouping {
                    expression: Box::new(expression),
                    span: token.span.merge(&self.previous_span()),
                })
            }
            _ => Err(self.error_here("Expected expression")),
        }
    }

    // Helper methods

    fn current(&self) -> &Token {
        let last = self.tokens.len() - 1;
        &self.tokens[self.pos.min(last)]
    }

    fn current_span(&self) -> Span {
        self.current().span
    }

    fn previous_span(&self) -> Span {
        if self.pos > 0 {
            self.tokens[self.pos - 1].span
        } else {
            self.current_span()
        }
    }

    fn peek_kind(&self, distance: usize) -> TokenKind {
        self.tokens
            .get(self.pos + distance)
            .map(|t| t.kind)
            .unwrap_or(TokenKind::Eof)
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.current().kind == kind
    }

    fn matches(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn is_at_end(&self) -> bool {
        self.current().kind == TokenKind::Eof
    }

    fn advance(&mut self) -> Token {
        let token = self.current().clone();
        if !self.is_at_end() {
            self.pos += 1;
        }
        token
    }

    fn expect(&mut self, kind: TokenKind, message: &str) -> Result<Token> {
        if self.check(kind) {
            Ok(self.advance())
        } else {
            Err(self.error_here(message))
        }
    }

    /// A syntax error located at the current token.
    fn error_here(&self, message: &str) -> Error {
        let token = self.current();
        let found = match token.kind {
            TokenKind::Eof => "end of input".to_string(),
            _ => format!("'{}'", token.text),
        };
        Error::syntax(format!("{}, found {}", message, found), token.span)
    }
}

fn binary(operator: BinaryOperator, left: Expression, right: Expression) -> Expression {
    let span = left.span().merge(&right.span());
    Expression::Binary {
        operator,
        left: Box::new(left),
        right: Box::new(right),
        span,
    }
}

/// Parse a token sequence into a program.
pub fn parse(tokens: Vec<Token>) -> (Program, Diagnostics) {
    Parser::from_tokens(tokens).parse()
}

/// Lex and parse `source`, returning lexical and syntax diagnostics together.
pub fn parse_source(source: &str) -> (Program, Diagnostics) {
    Parser::new(source).parse()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::DiagnosticSeverity;

    fn parse_ok(source: &str) -> Program {
        let (program, diagnostics) = parse_source(source);
        assert!(!diagnostics.has_errors(), "Errors: {:?}", diagnostics);
        program
    }

    fn single_expression(source: &str) -> Expression {
        let program = parse_ok(&format!("OUTPUT {}", source));
        match program.statements.into_iter().next().map(|s| s.kind) {
            Some(StatementKind::Output { expression }) => expression,
            other => panic!("expected OUTPUT, got {:?}", other),
        }
    }

    /// Render an expression with explicit grouping for precedence checks.
    fn shape(expression: &Expression) -> String {
        match expression {
            Expression::Binary {
                operator,
                left,
                right,
                ..
            } => format!("({} {} {})", shape(left), operator, shape(right)),
            Expression::Unary {
                operator, operand, ..
            } => format!("({} {})", operator, shape(operand)),
            Expression::Literal { value, .. } => match value {
                Literal::Integer(i) => i.to_string(),
                Literal::Real(r) => r.to_string(),
                Literal::Char(c) => format!("'{}'", c),
                Literal::String(s) => format!("\"{}\"", s),
                Literal::Boolean(b) => b.to_string().to_uppercase(),
            },
            Expression::Variable(id) => id.name.clone(),
            Expression::ArrayAccess { name, indices, .. } => format!(
                "{}[{}]",
                name.name,
                indices.iter().map(shape).collect::<Vec<_>>().join(", ")
            ),
            Expression::FunctionCall {
                name, arguments, ..
            } => format!(
                "{}({})",
                name.name,
                arguments.iter().map(shape).collect::<Vec<_>>().join(", ")
            ),
            Expression::Grouping { expression, .. } => shape(expression),
        }
    }

    #[test]
    fn test_parse_declarations() {
        let program = parse_ok(
            "DECLARE Count : INTEGER\nDECLARE Grid : ARRAY[1:3, 0:N] OF REAL\nCONSTANT Max ← 10",
        );
        assert_eq!(program.statements.len(), 3);
        match &program.statements[1].kind {
            StatementKind::VariableDeclaration {
                name,
                data_type,
                dimensions,
            } => {
                assert_eq!(name.name, "Grid");
                assert_eq!(*data_type, DataType::Real);
                assert_eq!(dimensions.len(), 2);
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(matches!(
            program.statements[2].kind,
            StatementKind::ConstantDeclaration { .. }
        ));
        assert_eq!(program.statements[2].line(), 3);
    }

    #[test]
    fn test_precedence() {
        assert_eq!(shape(&single_expression("1 + 2 * 3")), "(1 + (2 * 3))");
        assert_eq!(shape(&single_expression("1 - 2 - 3")), "((1 - 2) - 3)");
        assert_eq!(shape(&single_expression("2 ^ 3 ^ 2")), "(2 ^ (3 ^ 2))");
        assert_eq!(shape(&single_expression("-2 ^ 2")), "((- 2) ^ 2)");
        assert_eq!(shape(&single_expression("2 * 3 ^ 2")), "(2 * (3 ^ 2))");
        assert_eq!(
            shape(&single_expression("a < b AND NOT c OR d = 1")),
            "(((a < b) AND (NOT c)) OR (d = 1))"
        );
    }

    #[test]
    fn test_calls_and_array_access() {
        assert_eq!(
            shape(&single_expression("DIV(A[i, j + 1], LENGTH(s))")),
            "DIV(A[i, (j + 1)], LENGTH(s))"
        );
        assert_eq!(shape(&single_expression("RANDOM()")), "RANDOM()");
    }

    #[test]
    fn test_parse_control_flow() {
        let source = r#"
IF x > 1 THEN
    OUTPUT "big"
ELSE
    IF x = 1 THEN
        OUTPUT "one"
    ENDIF
ENDIF
CASE x OF
    1 : OUTPUT "a"
    2 : y ← 3
    OTHERWISE : OUTPUT "c"
ENDCASE
FOR i ← 10 TO 1 STEP -2
    OUTPUT i
NEXT i
REPEAT
    x ← x + 1
UNTIL x >= 10
WHILE x > 0 DO
    x ← x - 1
ENDWHILE
"#;
        let program = parse_ok(source);
        assert_eq!(program.statements.len(), 5);

        match &program.statements[0].kind {
            StatementKind::If { else_branch, .. } => {
                assert_eq!(else_branch.as_ref().map(Vec::len), Some(1));
            }
            other => panic!("unexpected {:?}", other),
        }
        match &program.statements[1].kind {
            StatementKind::Case {
                branches, otherwise, ..
            } => {
                assert_eq!(branches.len(), 2);
                assert!(otherwise.is_some());
            }
            other => panic!("unexpected {:?}", other),
        }
        match &program.statements[2].kind {
            StatementKind::For { step, .. } => assert_eq!(shape(step), "(- 2)"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_for_step_defaults_to_one() {
        let program = parse_ok("FOR i ← 1 TO 5\nOUTPUT i\nNEXT i");
        match &program.statements[0].kind {
            StatementKind::For { step, body, .. } => {
                assert_eq!(shape(step), "1");
                assert_eq!(body.len(), 1);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_parse_callables() {
        let source = r#"
PROCEDURE Greet(Name : STRING, Times : INTEGER)
    OUTPUT Name
ENDPROCEDURE
PROCEDURE Hello
    OUTPUT "hi"
ENDPROCEDURE
FUNCTION Square(N : INTEGER) RETURNS INTEGER
    RETURN N * N
ENDFUNCTION
FUNCTION Zero RETURNS REAL
ENDFUNCTION
CALL Greet("a", 2)
CALL Hello
"#;
        let program = parse_ok(source);
        assert_eq!(program.statements.len(), 6);
        match &program.statements[0].kind {
            StatementKind::ProcedureDeclaration(callable) => {
                assert_eq!(callable.parameters.len(), 2);
                assert_eq!(callable.parameters[1].data_type, DataType::Integer);
            }
            other => panic!("unexpected {:?}", other),
        }
        match &program.statements[3].kind {
            StatementKind::FunctionDeclaration(callable) => {
                assert!(callable.parameters.is_empty());
                assert_eq!(callable.return_type, Some(DataType::Real));
            }
            other => panic!("unexpected {:?}", other),
        }
        match &program.statements[5].kind {
            StatementKind::Call { arguments, .. } => assert!(arguments.is_empty()),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_parse_file_statements() {
        let source = r#"
OPENFILE "data.txt" FOR WRITE
WRITEFILE "data.txt", "line"
CLOSEFILE "data.txt"
OPENFILE "data.txt" FOR READ
READFILE "data.txt", Line
"#;
        let program = parse_ok(source);
        assert!(matches!(
            program.statements[0].kind,
            StatementKind::OpenFile {
                mode: FileMode::Write,
                ..
            }
        ));
        assert!(matches!(
            program.statements[4].kind,
            StatementKind::ReadFile { .. }
        ));
    }

    #[test]
    fn test_missing_endif_does_not_swallow_later_statements() {
        let source = "IF x > 1 THEN\nOUTPUT 1\nOUTPUT 2\n";
        let (program, diagnostics) = parse_source(source);

        assert_eq!(diagnostics.errors().count(), 1);
        let error = diagnostics.errors().next().expect("error");
        assert_eq!(error.message, "Expected ENDIF, found end of input");

        let kinds: Vec<_> = program.statements.iter().map(|s| &s.kind).collect();
        assert_eq!(kinds.len(), 3);
        assert!(matches!(kinds[0], StatementKind::Error { .. }));
        assert!(matches!(kinds[1], StatementKind::Output { .. }));
        assert!(matches!(kinds[2], StatementKind::Output { .. }));
    }

    #[test]
    fn test_error_inside_block_is_contained() {
        let source = "WHILE x > 0 DO\n  x ← \n  OUTPUT x\nENDWHILE\nOUTPUT \"done\"";
        let (program, diagnostics) = parse_source(source);

        assert_eq!(diagnostics.errors().count(), 1);
        assert_eq!(program.statements.len(), 2);
        match &program.statements[0].kind {
            StatementKind::While { body, .. } => {
                assert!(matches!(body[0].kind, StatementKind::Error { .. }));
                assert!(matches!(body[1].kind, StatementKind::Output { .. }));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_synchronize_stops_at_identifier_starting_a_line() {
        let source = "DECLARE : INTEGER\nx ← 1";
        let (program, diagnostics) = parse_source(source);
        assert!(diagnostics.has_errors());
        assert_eq!(program.statements.len(), 2);
        assert!(matches!(
            program.statements[1].kind,
            StatementKind::Assignment { .. }
        ));
        assert_eq!(program.statements[0].span.line(), 1);
    }

    #[test]
    fn test_stray_terminator_at_top_level() {
        let (program, diagnostics) = parse_source("ENDIF\nOUTPUT 1");
        assert_eq!(diagnostics.errors().count(), 1);
        assert_eq!(program.statements.len(), 2);
        let error = diagnostics.errors().next().expect("error");
        assert_eq!(error.message, "Expected a statement, found 'ENDIF'");
    }

    #[test]
    fn test_declarations_not_allowed_in_case_branch() {
        let source = "CASE x OF\n1 : DECLARE y : INTEGER\nENDCASE";
        let (_, diagnostics) = parse_source(source);
        assert!(diagnostics
            .errors()
            .any(|d| d.message == "DECLARE is not allowed here"));
    }

    #[test]
    fn test_next_mismatch_is_a_warning() {
        let (program, diagnostics) = parse_source("FOR i ← 1 TO 2\nOUTPUT i\nNEXT j");
        assert!(!diagnostics.has_errors());
        let warning = diagnostics.warnings().next().expect("warning");
        assert_eq!(warning.severity, DiagnosticSeverity::Warning);
        assert_eq!(warning.code, NEXT_MISMATCH);
        assert_eq!(warning.span.line(), 3);
        assert_eq!(program.statements.len(), 1);
    }

    #[test]
    fn test_lexer_diagnostics_are_included() {
        let (program, diagnostics) = parse_source("OUTPUT 1 $\nOUTPUT 2");
        assert_eq!(diagnostics.errors().count(), 1);
        assert_eq!(program.statements.len(), 2);
    }

    #[test]
    fn test_syntax_error_position() {
        let (_, diagnostics) = parse_source("OUTPUT 1\nIF x THEN OUTPUT 1 ELSE");
        let error = diagnostics.errors().next().and_then(Diagnostic::to_error).expect("error");
        assert_eq!(
            error.to_string(),
            "SyntaxError: Expected ENDIF, found end of input at line 2, column 24"
        );
    }

    #[test]
    fn test_deep_parentheses_become_a_syntax_error() {
        let depth = 10_000;
        let source = format!("OUTPUT {}1{}\nOUTPUT 2", "(".repeat(depth), ")".repeat(depth));
        let (program, diagnostics) = parse_source(&source);

        let errors: Vec<_> = diagnostics.errors().collect();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].message, "Expression is nested too deeply");
        assert_eq!(program.statements.len(), 2);
        assert!(matches!(program.statements[0].kind, StatementKind::Error { .. }));
        assert!(matches!(program.statements[1].kind, StatementKind::Output { .. }));
    }

    #[test]
    fn test_deep_unary_chain_becomes_a_syntax_error() {
        let (_, diagnostics) = parse_source(&format!("OUTPUT {}1", "-".repeat(50_000)));
        let error = diagnostics.errors().next().expect("error");
        assert_eq!(error.message, "Expression is nested too deeply");

        let (_, diagnostics) = parse_source(&format!("OUTPUT {}TRUE", "NOT ".repeat(50_000)));
        assert_eq!(diagnostics.errors().count(), 1);
    }

    #[test]
    fn test_nesting_below_the_limit_parses() {
        let depth = MAX_NESTING / 2;
        parse_ok(&format!("OUTPUT {}1{}", "(".repeat(depth), ")".repeat(depth)));
        parse_ok(&format!("OUTPUT {}1", "-".repeat(depth)));

        let source = format!("{}OUTPUT 1\n{}", "IF TRUE THEN\n".repeat(depth), "ENDIF\n".repeat(depth));
        parse_ok(&source);
    }

    #[test]
    fn test_deep_blocks_become_syntax_errors() {
        let depth = 5_000;
        let source = format!("{}OUTPUT 1\n{}", "IF TRUE THEN\n".repeat(depth), "ENDIF\n".repeat(depth));
        let (program, diagnostics) = parse_source(&source);

        let first = diagnostics.errors().next().expect("error");
        assert_eq!(first.message, "Statements are nested too deeply");
        assert!(!program.statements.is_empty());
    }
}
