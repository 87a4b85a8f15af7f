use std::rc::Rc;

use anyhow::{Context, Result};

use crate::ast::{BinaryOperator, Expression, FunctionDecl, Statement, UnaryOperator};
use crate::lexer;
use crate::token::{Span, Token, TokenKind};

pub mod error;

pub use error::{ParseError, ParseResult};

/// Recursive-descent parser over a token sequence.
///
/// The language has no statement terminators and no indentation tokens.
/// Layout is read from token spans instead: a token that begins a new line
/// ends the current statement, and an indented block is the run of
/// statements that begin lines at one shared column.
pub struct Parser {
    tokens: Vec<Token>,
    current: usize,
    /// Index of the first token of the statement being parsed.
    statement_start: usize,
}

impl Parser {
    pub fn new(mut tokens: Vec<Token>) -> Self {
        if !matches!(tokens.last(), Some(token) if token.kind == TokenKind::Eof) {
            let span = tokens
                .last()
                .map(|token| Span {
                    start: token.span.end,
                    end: token.span.end,
                    line: token.span.end_line,
                    column: token.span.column + token.lexeme.chars().count(),
                    end_line: token.span.end_line,
                })
                .unwrap_or_default();
            tokens.push(Token::new(TokenKind::Eof, "", span));
        }
        Self {
            tokens,
            current: 0,
            statement_start: 0,
        }
    }

    /// Parses every top-level statement into one root block.
    pub fn parse_program(&mut self) -> ParseResult<Statement> {
        let column = self.peek().span.column;
        let statements = self.parse_statements_at(column)?;
        if !self.is_at_end() {
            // Only a line starting left of the first statement stops the loop.
            return Err(self.error(self.peek(), "statement at the top-level indentation"));
        }
        Ok(Statement::Block(statements))
    }

    /// Like `parse_program`, but keeps going after a malformed statement and
    /// reports every error found.
    pub fn parse_program_recovering(&mut self) -> Result<Statement, Vec<ParseError>> {
        let column = self.peek().span.column;
        let mut statements = Vec::new();
        let mut errors = Vec::new();

        while !self.is_at_end() {
            let result = if self.starts_line() && self.peek().span.column != column {
                Err(ParseError::UnexpectedIndent {
                    line: self.peek().span.line,
                    column: self.peek().span.column,
                })
            } else {
                self.parse_statement()
            };

            match result {
                Ok(statement) => statements.push(statement),
                Err(error) => {
                    errors.push(error);
                    self.synchronize();
                    // Drop the rest of an indented body that belonged to the
                    // broken statement.
                    while !self.is_at_end()
                        && !(self.starts_line() && self.peek().span.column <= column)
                    {
                        self.synchronize();
                    }
                }
            }
        }

        if errors.is_empty() {
            Ok(Statement::Block(statements))
        } else {
            Err(errors)
        }
    }

    fn parse_statements_at(&mut self, column: usize) -> ParseResult<Vec<Statement>> {
        let mut statements = Vec::new();
        while !self.is_at_end() {
            if self.starts_line() {
                let span = self.peek().span;
                if span.column < column {
                    break;
                }
                if span.column > column {
                    return Err(ParseError::UnexpectedIndent {
                        line: span.line,
                        column: span.column,
                    });
                }
            }
            statements.push(self.parse_statement()?);
        }
        Ok(statements)
    }

    fn parse_statement(&mut self) -> ParseResult<Statement> {
        self.statement_start = self.current;
        let statement = match self.peek().kind {
            TokenKind::Print => self.parse_print_statement()?,
            TokenKind::If => self.parse_if_statement()?,
            TokenKind::Def => self.parse_function_definition()?,
            TokenKind::Return => self.parse_return_statement()?,
            TokenKind::Identifier if self.assignment_ahead() => {
                let name = self.advance().lexeme;
                self.advance(); // '='
                let value = self.parse_expression()?;
                Statement::Assign { name, value }
            }
            _ => Statement::Expression(self.parse_expression()?),
        };
        self.expect_statement_end()?;
        Ok(statement)
    }

    /// A statement owns the rest of its line. Only an `else` closing an
    /// inline `if` body may follow on the same line.
    fn expect_statement_end(&self) -> ParseResult<()> {
        if self.ends_statement() || self.check(TokenKind::Else) {
            Ok(())
        } else {
            Err(self.error(self.peek(), "end of line"))
        }
    }

    fn parse_print_statement(&mut self) -> ParseResult<Statement> {
        self.advance(); // 'print'
        let mut expressions = Vec::new();
        if !self.ends_statement() {
            loop {
                expressions.push(self.parse_expression()?);
                if !self.match_kind(&[TokenKind::Comma]) {
                    break;
                }
            }
        }
        Ok(Statement::Print(expressions))
    }

    fn parse_if_statement(&mut self) -> ParseResult<Statement> {
        let keyword = self.advance();
        let condition = self.parse_expression()?;
        let then_branch = self.parse_body(&keyword, "'if'")?;

        let else_branch = if self.check(TokenKind::Else) && self.else_belongs_to(&keyword) {
            let else_keyword = self.advance();
            Some(Box::new(self.parse_body(&else_keyword, "'else'")?))
        } else {
            None
        };

        Ok(Statement::If {
            condition,
            then_branch: Box::new(then_branch),
            else_branch,
        })
    }

    /// An `else` on a later line pairs with the `if` written at its column,
    /// so an inner `if` never takes an outer `else`.
    fn else_belongs_to(&self, if_keyword: &Token) -> bool {
        !self.starts_line() || self.peek().span.column == if_keyword.span.column
    }

    fn parse_function_definition(&mut self) -> ParseResult<Statement> {
        let keyword = self.advance();
        let name = self.consume(TokenKind::Identifier, "function name")?.lexeme;
        self.consume(TokenKind::LParen, "'(' after function name")?;

        let mut parameters: Vec<String> = Vec::new();
        if !self.check(TokenKind::RParen) {
            loop {
                let parameter = self.consume(TokenKind::Identifier, "parameter name")?;
                if parameters.contains(&parameter.lexeme) {
                    return Err(ParseError::DuplicateParameter {
                        name: parameter.lexeme,
                        function: name,
                        line: parameter.span.line,
                        column: parameter.span.column,
                    });
                }
                parameters.push(parameter.lexeme);
                if !self.match_kind(&[TokenKind::Comma]) {
                    break;
                }
            }
        }
        self.consume(TokenKind::RParen, "')' after parameters")?;

        let body = self.parse_body(&keyword, &format!("function '{name}'"))?;
        Ok(Statement::FunctionDef(Rc::new(FunctionDecl {
            name,
            parameters,
            body,
        })))
    }

    fn parse_return_statement(&mut self) -> ParseResult<Statement> {
        self.advance(); // 'return'
        let value = if self.ends_statement() {
            None
        } else {
            Some(self.parse_expression()?)
        };
        Ok(Statement::Return(value))
    }

    /// Body of `if`, `else` or `def`: either one statement on the header line
    /// or an indented block on the following lines.
    fn parse_body(&mut self, header: &Token, construct: &str) -> ParseResult<Statement> {
        if !self.starts_line() {
            self.match_kind(&[TokenKind::Colon]);
        }
        if !self.ends_statement() {
            return self.parse_statement();
        }

        let span = self.peek().span;
        if self.is_at_end() || span.column <= header.span.column {
            return Err(ParseError::ExpectedIndentedBlock {
                construct: construct.to_string(),
                line: span.line,
                column: span.column,
            });
        }
        Ok(Statement::Block(self.parse_statements_at(span.column)?))
    }

    fn parse_expression(&mut self) -> ParseResult<Expression> {
        self.expect_operand_on_line()?;
        if self.check(TokenKind::Identifier) && self.assignment_ahead() {
            let name = self.advance().lexeme;
            self.advance(); // '='
            let value = self.parse_expression()?;
            return Ok(Expression::Assign {
                name,
                value: Box::new(value),
            });
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> ParseResult<Expression> {
        let mut expr = self.parse_term()?;
        while let Some(op) = self.operator_on_line(comparison_operator) {
            self.advance();
            let right = self.parse_term()?;
            expr = binary(expr, op, right);
        }
        Ok(expr)
    }

    fn parse_term(&mut self) -> ParseResult<Expression> {
        let mut expr = self.parse_factor()?;
        while let Some(op) = self.operator_on_line(term_operator) {
            self.advance();
            let right = self.parse_factor()?;
            expr = binary(expr, op, right);
        }
        Ok(expr)
    }

    fn parse_factor(&mut self) -> ParseResult<Expression> {
        let mut expr = self.parse_unary()?;
        while let Some(op) = self.operator_on_line(factor_operator) {
            self.advance();
            let right = self.parse_unary()?;
            expr = binary(expr, op, right);
        }
        Ok(expr)
    }

    fn parse_unary(&mut self) -> ParseResult<Expression> {
        self.expect_operand_on_line()?;
        if self.match_kind(&[TokenKind::Minus]) {
            let operand = self.parse_unary()?;
            return Ok(Expression::Unary {
                op: UnaryOperator::Negate,
                operand: Box::new(operand),
            });
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> ParseResult<Expression> {
        let token = self.peek().clone();
        match token.kind {
            TokenKind::Integer => {
                self.advance();
                let value = token.lexeme.parse::<i64>().map_err(|_| {
                    ParseError::InvalidIntegerLiteral {
                        literal: token.lexeme.clone(),
                        line: token.span.line,
                        column: token.span.column,
                    }
                })?;
                Ok(Expression::Integer(value))
            }
            TokenKind::String => {
                self.advance();
                Ok(Expression::String(token.lexeme))
            }
            TokenKind::Identifier => {
                self.advance();
                if self.check(TokenKind::LParen) && !self.starts_line() {
                    self.parse_function_call(token.lexeme)
                } else {
                    Ok(Expression::Variable(token.lexeme))
                }
            }
            TokenKind::LParen => {
                self.advance();
                let expr = self.parse_expression()?;
                self.consume(TokenKind::RParen, "')' after expression")?;
                Ok(expr)
            }
            _ => Err(self.error(&token, "expression")),
        }
    }

    fn parse_function_call(&mut self, name: String) -> ParseResult<Expression> {
        self.advance(); // '('
        let mut args = Vec::new();
        if !self.check(TokenKind::RParen) {
            loop {
                args.push(self.parse_expression()?);
                if !self.match_kind(&[TokenKind::Comma]) {
                    break;
                }
            }
        }
        self.consume(TokenKind::RParen, "')' after arguments")?;
        Ok(Expression::Call { name, args })
    }

    /// Discards tokens up to the next statement boundary: the start of a
    /// line, a statement keyword, or the end of input.
    fn synchronize(&mut self) {
        self.advance();
        while !self.is_at_end() {
            if self.starts_line() {
                return;
            }
            match self.peek().kind {
                TokenKind::Print | TokenKind::If | TokenKind::Def | TokenKind::Return => return,
                _ => {}
            }
            self.advance();
        }
    }

    /// Operands never continue a statement onto the next line, so a trailing
    /// operator or comma is an error rather than a join with the next line.
    fn expect_operand_on_line(&self) -> ParseResult<()> {
        if self.current != self.statement_start && self.starts_line() {
            Err(self.error(self.peek(), "expression"))
        } else {
            Ok(())
        }
    }

    fn assignment_ahead(&self) -> bool {
        let next = self.peek_next();
        next.kind == TokenKind::Assign && next.span.line == self.peek().span.end_line
    }

    fn operator_on_line(
        &self,
        operator: fn(TokenKind) -> Option<BinaryOperator>,
    ) -> Option<BinaryOperator> {
        if self.starts_line() {
            return None;
        }
        operator(self.peek().kind)
    }

    fn ends_statement(&self) -> bool {
        self.is_at_end() || self.starts_line()
    }

    /// True when the current token is the first one on its source line.
    /// A string literal spanning lines ends on its closing quote's line.
    fn starts_line(&self) -> bool {
        self.current == 0 || self.previous().span.end_line < self.peek().span.line
    }

    /// Consumes a token of `kind` on the current line.
    fn consume(&mut self, kind: TokenKind, expected: &str) -> ParseResult<Token> {
        if self.check(kind) && !self.starts_line() {
            Ok(self.advance())
        } else {
            Err(self.error(self.peek(), expected))
        }
    }

    fn match_kind(&mut self, kinds: &[TokenKind]) -> bool {
        if kinds.iter().any(|kind| self.check(*kind)) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.peek().kind == kind
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if !self.is_at_end() {
            self.current += 1;
        }
        token
    }

    fn is_at_end(&self) -> bool {
        self.peek().kind == TokenKind::Eof
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.current]
    }

    fn peek_next(&self) -> &Token {
        let index = (self.current + 1).min(self.tokens.len() - 1);
        &self.tokens[index]
    }

    fn previous(&self) -> &Token {
        &self.tokens[self.current.saturating_sub(1)]
    }

    fn error(&self, token: &Token, expected: &str) -> ParseError {
        let found = match token.kind {
            TokenKind::Eof => token.kind.describe().to_string(),
            kind => format!("{} '{}'", kind.describe(), token.lexeme),
        };
        ParseError::UnexpectedToken {
            expected: expected.to_string(),
            found,
            line: token.span.line,
            column: token.span.column,
        }
    }
}

fn binary(left: Expression, op: BinaryOperator, right: Expression) -> Expression {
    Expression::Binary {
        left: Box::new(left),
        op,
        right: Box::new(right),
    }
}

fn comparison_operator(kind: TokenKind) -> Option<BinaryOperator> {
    match kind {
        TokenKind::Less => Some(BinaryOperator::Less),
        TokenKind::LessEqual => Some(BinaryOperator::LessEqual),
        TokenKind::Greater => Some(BinaryOperator::Greater),
        TokenKind::GreaterEqual => Some(BinaryOperator::GreaterEqual),
        TokenKind::EqualEqual => Some(BinaryOperator::Equal),
        TokenKind::BangEqual => Some(BinaryOperator::NotEqual),
        _ => None,
    }
}

fn term_operator(kind: TokenKind) -> Option<BinaryOperator> {
    match kind {
        TokenKind::Plus => Some(BinaryOperator::Add),
        TokenKind::Minus => Some(BinaryOperator::Sub),
        _ => None,
    }
}

fn factor_operator(kind: TokenKind) -> Option<BinaryOperator> {
    match kind {
        TokenKind::Star => Some(BinaryOperator::Mul),
        TokenKind::Slash => Some(BinaryOperator::Div),
        _ => None,
    }
}

pub fn parse_tokens(tokens: Vec<Token>) -> ParseResult<Statement> {
    Parser::new(tokens).parse_program()
}

pub fn parse_tokens_recovering(tokens: Vec<Token>) -> Result<Statement, Vec<ParseError>> {
    Parser::new(tokens).parse_program_recovering()
}

pub fn parse(source: &str) -> Result<Statement> {
    let tokens = lexer::tokenize(source).context("Tokenizing")?;
    parse_tokens(tokens).context("Parsing")
}
