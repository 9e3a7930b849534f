//! Registry-driven Pratt parser
//!
//! Precedence climbing over the token stream: `.` and `[` are handled as
//! postfix invocations, every other binary operator's precedence and
//! associativity comes from the registry. Two modes share one
//! implementation: fail-fast propagates the first fault as a
//! [`ParseError`]; recovery mode records diagnostics, synthesizes
//! `Error`/`Incomplete` nodes and resumes at synchronization points
//! (`,` `)` `]` `}` `|` `and` `or`, end of input).

use super::error::ParseError;
use super::lexer::{Channel, LexerOptions, Token, TokenKind, lex, unescape_string};
use crate::ast::{BinaryOperator, Expression, LiteralValue, UnaryOperator, Variable};
use crate::diagnostics::{Diagnostic, DiagnosticCode};
use crate::model::temporal::{CalendarUnit, Date, DateTime, Time};
use crate::registry::{precedence, registry, Associativity};
use crate::span::TextRange;
use rust_decimal::Decimal;
use smallvec::SmallVec;
use std::str::FromStr;

const MAX_DEPTH: usize = 512;

/// Parser configuration.
#[derive(Debug, Clone, Copy)]
pub struct ParserOptions {
    /// Stop at the first fault instead of collecting diagnostics
    pub fail_fast: bool,
    /// Accepted for API compatibility; node ranges are always tracked and
    /// this flag only forces trivia retention during lexing
    pub track_ranges: bool,
    /// Recover at synchronization points, producing a partial AST
    pub error_recovery: bool,
    /// Stop recording diagnostics beyond this count
    pub max_errors: usize,
}

impl Default for ParserOptions {
    fn default() -> Self {
        Self {
            fail_fast: false,
            track_ranges: false,
            error_recovery: false,
            max_errors: 25,
        }
    }
}

impl ParserOptions {
    /// Options for diagnostic mode: recovery on, ranges tracked.
    pub fn diagnostic() -> Self {
        Self {
            error_recovery: true,
            track_ranges: true,
            ..Self::default()
        }
    }
}

/// Outcome of a parse.
#[derive(Debug, Clone)]
pub struct ParseResult {
    /// The AST; always present in recovery mode, absent when a
    /// non-recovering parse failed
    pub ast: Option<Expression>,
    /// Everything found wrong with the input
    pub diagnostics: Vec<Diagnostic>,
    /// Whether the AST contains `Error`/`Incomplete` nodes or trailing
    /// input was skipped
    pub is_partial: bool,
}

/// Parse in fail-fast mode: the first fault is returned as a typed error.
pub fn parse(source: &str) -> Result<Expression, ParseError> {
    let (tokens, lex_diagnostics) = lex(
        source,
        LexerOptions {
            keep_trivia: false,
            fail_fast: true,
        },
    );
    if let Some(diagnostic) = lex_diagnostics.into_iter().next() {
        return Err(ParseError::Lexical(diagnostic));
    }
    let mut parser = Parser::new(source, tokens, ParserOptions::default());
    let expression = parser.parse_expression(0)?;
    parser.expect_end()?;
    Ok(expression)
}

/// Parse with explicit options, collecting diagnostics.
pub fn parse_with_options(source: &str, options: ParserOptions) -> ParseResult {
    let (tokens, lex_diagnostics) = lex(
        source,
        LexerOptions {
            keep_trivia: options.error_recovery || options.track_ranges,
            fail_fast: options.fail_fast,
        },
    );

    if !options.error_recovery {
        // No recovery: any lexical fault ends the parse
        if !lex_diagnostics.is_empty() {
            return ParseResult {
                ast: None,
                diagnostics: lex_diagnostics,
                is_partial: false,
            };
        }
        let mut parser = Parser::new(source, tokens, options);
        return match parser
            .parse_expression(0)
            .and_then(|expr| parser.expect_end().map(|()| expr))
        {
            Ok(expression) => ParseResult {
                ast: Some(expression),
                diagnostics: parser.diagnostics,
                is_partial: false,
            },
            Err(error) => {
                let mut diagnostics = parser.diagnostics;
                diagnostics.push(error.into_diagnostic());
                ParseResult {
                    ast: None,
                    diagnostics,
                    is_partial: false,
                }
            }
        };
    }

    let mut parser = Parser::new(source, tokens, options);
    parser.recovered = !lex_diagnostics.is_empty();
    parser.diagnostics = lex_diagnostics;
    parser.diagnostics.truncate(options.max_errors);
    parser.run_with_recovery()
}

struct Parser<'src> {
    source: &'src str,
    tokens: Vec<Token<'src>>,
    pos: usize,
    options: ParserOptions,
    diagnostics: Vec<Diagnostic>,
    recovered: bool,
    depth: usize,
}

impl<'src> Parser<'src> {
    fn new(source: &'src str, tokens: Vec<Token<'src>>, options: ParserOptions) -> Self {
        let tokens: Vec<Token<'src>> = tokens
            .into_iter()
            .filter(|token| token.channel == Channel::Default)
            .collect();
        Self {
            source,
            tokens,
            pos: 0,
            options,
            diagnostics: Vec::new(),
            recovered: false,
            depth: 0,
        }
    }

    fn run_with_recovery(mut self) -> ParseResult {
        let mut ast = match self.parse_expression(0) {
            Ok(expression) => expression,
            Err(error) => {
                let anchor = self.error_anchor();
                self.record(error);
                self.sync();
                Expression::error(vec!["expression"], anchor)
            }
        };

        // Anything left over (including lexer error tokens) makes the
        // result partial and unusable as a whole.
        if !self.at_eof() {
            let token = self.current();
            if token.kind != TokenKind::Error {
                self.report(
                    DiagnosticCode::UnexpectedToken,
                    format!("unexpected {} after expression", token.kind.describe()),
                    token.range,
                );
            }
            let end = TextRange::new(ast.span.start, self.source.len());
            ast = Expression::incomplete(ast, vec!["end of input"], end);
            self.recovered = true;
        }

        let is_partial = self.recovered || ast.has_errors();
        ParseResult {
            ast: Some(ast),
            diagnostics: self.diagnostics,
            is_partial,
        }
    }

    // --- token access -----------------------------------------------------

    fn current(&self) -> &Token<'src> {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn advance(&mut self) {
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
    }

    fn at_eof(&self) -> bool {
        self.current().kind == TokenKind::Eof
    }

    fn previous_end(&self) -> usize {
        self.tokens[self.pos.saturating_sub(1)].range.end
    }

    /// A non-empty range to anchor an error on: the current token, or the
    /// previous one at end of input.
    fn error_anchor(&self) -> TextRange {
        if self.at_eof() && self.pos > 0 {
            self.tokens[self.pos - 1].range
        } else {
            self.current().range
        }
    }

    // --- diagnostics ------------------------------------------------------

    fn syntax_error(
        &self,
        code: DiagnosticCode,
        message: impl Into<String>,
        range: TextRange,
    ) -> ParseError {
        ParseError::Syntax(Diagnostic::error(code, message, range))
    }

    fn unexpected(&self, expected: &str) -> ParseError {
        let token = self.current();
        let message = if self.at_eof() {
            format!("expected {expected}, found end of input")
        } else {
            format!("expected {expected}, found {}", token.kind.describe())
        };
        self.syntax_error(DiagnosticCode::UnexpectedToken, message, self.error_anchor())
    }

    fn record(&mut self, error: ParseError) {
        self.recovered = true;
        if self.diagnostics.len() < self.options.max_errors {
            self.diagnostics.push(error.into_diagnostic());
        }
    }

    fn report(&mut self, code: DiagnosticCode, message: String, range: TextRange) {
        self.recovered = true;
        if self.diagnostics.len() < self.options.max_errors {
            self.diagnostics.push(Diagnostic::error(code, message, range));
        }
    }

    fn too_many_errors(&self) -> bool {
        self.diagnostics.len() >= self.options.max_errors
    }

    /// Advance to the next synchronization point.
    fn sync(&mut self) {
        loop {
            match self.current().kind {
                TokenKind::Comma
                | TokenKind::RightParen
                | TokenKind::RightBracket
                | TokenKind::RightBrace
                | TokenKind::Union
                | TokenKind::And
                | TokenKind::Or
                | TokenKind::Eof => break,
                _ => self.advance(),
            }
        }
    }

    fn expect_end(&mut self) -> Result<(), ParseError> {
        if self.at_eof() {
            Ok(())
        } else {
            Err(self.unexpected("end of input"))
        }
    }

    // --- expression parsing ----------------------------------------------

    fn parse_expression(&mut self, min_precedence: u8) -> Result<Expression, ParseError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            self.depth -= 1;
            return Err(self.syntax_error(
                DiagnosticCode::UnexpectedToken,
                "expression nesting too deep".to_string(),
                self.error_anchor(),
            ));
        }
        let result = self.parse_expression_inner(min_precedence);
        self.depth -= 1;
        result
    }

    fn parse_expression_inner(&mut self, min_precedence: u8) -> Result<Expression, ParseError> {
        let mut left = self.parse_unary()?;
        left = self.parse_postfix(left)?;

        loop {
            if self.options.error_recovery && self.too_many_errors() {
                break;
            }
            let Some(op) = binary_operator(&self.current().kind) else {
                break;
            };
            let Some((op_precedence, associativity)) = registry().infix_binding(op) else {
                break;
            };
            if op_precedence < min_precedence {
                break;
            }

            let op_range = self.current().range;
            self.advance();

            if matches!(op, BinaryOperator::Is | BinaryOperator::As) {
                match self.parse_type_name() {
                    Ok(type_node) => {
                        left = Expression::binary(op, left, type_node);
                        continue;
                    }
                    Err(error) if self.options.error_recovery => {
                        self.record(error);
                        let span = left.span.cover(op_range);
                        left = Expression::incomplete(left, vec!["type name"], span);
                        break;
                    }
                    Err(error) => return Err(error),
                }
            }

            let next_min = match associativity {
                Associativity::Right => op_precedence,
                Associativity::Left => op_precedence + 1,
            };
            match self.parse_expression(next_min) {
                Ok(right) => {
                    left = Expression::binary(op, left, right);
                }
                Err(error) if self.options.error_recovery => {
                    self.record(error);
                    let span = left.span.cover(op_range);
                    left = Expression::incomplete(left, vec!["expression"], span);
                    break;
                }
                Err(error) => return Err(error),
            }
        }

        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expression, ParseError> {
        let token = *self.current();
        let op = match token.kind {
            TokenKind::Plus => Some(UnaryOperator::Plus),
            TokenKind::Minus => Some(UnaryOperator::Minus),
            TokenKind::Not => Some(UnaryOperator::Not),
            _ => None,
        };
        match op {
            Some(op) => {
                self.advance();
                let operand = self.parse_expression(precedence::UNARY)?;
                let span = token.range.cover(operand.span);
                Ok(Expression::unary(op, operand, span))
            }
            None => self.parse_primary(),
        }
    }

    fn parse_primary(&mut self) -> Result<Expression, ParseError> {
        let token = *self.current();
        match token.kind {
            TokenKind::Integer(value) => {
                self.advance();
                self.parse_quantity_or_number(Decimal::from(value), Some(value), token.range)
            }
            TokenKind::Decimal(text) => {
                self.advance();
                let value = Decimal::from_str(text).map_err(|_| {
                    self.syntax_error(
                        DiagnosticCode::UnexpectedToken,
                        format!("invalid decimal literal '{text}'"),
                        token.range,
                    )
                })?;
                self.parse_quantity_or_number(value, None, token.range)
            }
            TokenKind::String(raw) => {
                self.advance();
                Ok(Expression::literal(
                    LiteralValue::String(unescape_string(raw)),
                    token.range,
                ))
            }
            TokenKind::True => {
                self.advance();
                Ok(Expression::literal(LiteralValue::Boolean(true), token.range))
            }
            TokenKind::False => {
                self.advance();
                Ok(Expression::literal(
                    LiteralValue::Boolean(false),
                    token.range,
                ))
            }
            TokenKind::Date(text) => {
                self.advance();
                let date = Date::parse(text).ok_or_else(|| {
                    self.syntax_error(
                        DiagnosticCode::UnexpectedToken,
                        format!("invalid date literal '@{text}'"),
                        token.range,
                    )
                })?;
                Ok(Expression::literal(LiteralValue::Date(date), token.range))
            }
            TokenKind::DateTime(text) => {
                self.advance();
                let datetime = DateTime::parse(text).ok_or_else(|| {
                    self.syntax_error(
                        DiagnosticCode::UnexpectedToken,
                        format!("invalid datetime literal '@{text}'"),
                        token.range,
                    )
                })?;
                Ok(Expression::literal(
                    LiteralValue::DateTime(datetime),
                    token.range,
                ))
            }
            TokenKind::Time(text) => {
                self.advance();
                let time = Time::parse(text).ok_or_else(|| {
                    self.syntax_error(
                        DiagnosticCode::UnexpectedToken,
                        format!("invalid time literal '@T{text}'"),
                        token.range,
                    )
                })?;
                Ok(Expression::literal(LiteralValue::Time(time), token.range))
            }
            TokenKind::Identifier(name) => {
                self.advance();
                self.parse_name(name, token.range)
            }
            TokenKind::DelimitedIdentifier(name) => {
                self.advance();
                self.parse_name(name, token.range)
            }
            TokenKind::DollarThis => {
                self.advance();
                Ok(Expression::variable(Variable::This, token.range))
            }
            TokenKind::DollarIndex => {
                self.advance();
                Ok(Expression::variable(Variable::Index, token.range))
            }
            TokenKind::DollarTotal => {
                self.advance();
                Ok(Expression::variable(Variable::Total, token.range))
            }
            TokenKind::EnvVariable(name) => {
                self.advance();
                Ok(Expression::variable(
                    Variable::Environment(name.to_string()),
                    token.range,
                ))
            }
            TokenKind::LeftParen => {
                self.advance();
                let inner = self.parse_nested_expression(TokenKind::RightParen, token.range)?;
                Ok(inner)
            }
            TokenKind::LeftBrace => {
                self.advance();
                self.parse_collection_literal(token.range)
            }
            TokenKind::Error => {
                // The lexer already reported this fault
                self.advance();
                self.recovered = true;
                Ok(Expression::error(vec!["expression"], token.range))
            }
            _ => Err(self.unexpected("an expression")),
        }
    }

    /// A number literal, or a quantity when a unit follows: a quoted UCUM
    /// string, or an unquoted calendar-duration keyword.
    fn parse_quantity_or_number(
        &mut self,
        value: Decimal,
        integer: Option<i64>,
        range: TextRange,
    ) -> Result<Expression, ParseError> {
        let token = *self.current();
        match token.kind {
            TokenKind::String(unit) => {
                self.advance();
                let span = range.cover(token.range);
                Ok(Expression::literal(
                    LiteralValue::Quantity {
                        value,
                        unit: unescape_string(unit),
                    },
                    span,
                ))
            }
            TokenKind::Identifier(word) if CalendarUnit::parse(word).is_some() => {
                self.advance();
                let span = range.cover(token.range);
                Ok(Expression::literal(
                    LiteralValue::Quantity {
                        value,
                        unit: word.to_string(),
                    },
                    span,
                ))
            }
            _ => match integer {
                Some(int) => Ok(Expression::literal(LiteralValue::Integer(int), range)),
                None => Ok(Expression::literal(LiteralValue::Decimal(value), range)),
            },
        }
    }

    fn parse_name(&mut self, name: &str, range: TextRange) -> Result<Expression, ParseError> {
        if self.current().kind == TokenKind::LeftParen {
            let open = self.current().range;
            self.advance();
            let (args, close_end) = self.parse_arguments(open)?;
            let span = TextRange::new(range.start, close_end);
            return Ok(Expression::function(name, range, args, span));
        }
        if name.chars().next().is_some_and(char::is_uppercase) {
            Ok(Expression::type_identifier(name, range))
        } else {
            Ok(Expression::identifier(name, range))
        }
    }

    /// `( expression )` with recovery inside the parentheses.
    fn parse_nested_expression(
        &mut self,
        closer: TokenKind<'static>,
        open: TextRange,
    ) -> Result<Expression, ParseError> {
        let inner = match self.parse_expression(0) {
            Ok(expression) => expression,
            Err(error) if self.options.error_recovery => {
                let anchor = self.error_anchor();
                self.record(error);
                self.sync();
                Expression::error(vec!["expression"], anchor)
            }
            Err(error) => return Err(error),
        };
        self.close_bracket(closer, open)?;
        Ok(inner)
    }

    fn parse_collection_literal(&mut self, open: TextRange) -> Result<Expression, ParseError> {
        let mut elements = Vec::new();
        if self.current().kind == TokenKind::RightBrace {
            let close = self.current().range;
            self.advance();
            return Ok(Expression::collection(elements, open.cover(close)));
        }
        loop {
            match self.parse_expression(0) {
                Ok(element) => elements.push(element),
                Err(error) if self.options.error_recovery => {
                    let anchor = self.error_anchor();
                    self.record(error);
                    self.sync();
                    elements.push(Expression::error(vec!["expression"], anchor));
                }
                Err(error) => return Err(error),
            }
            match self.current().kind {
                TokenKind::Comma => {
                    self.advance();
                }
                TokenKind::RightBrace => break,
                _ => {
                    let error = self.unexpected("',' or '}'");
                    if !self.options.error_recovery {
                        return Err(error);
                    }
                    self.record(error);
                    self.sync();
                    match self.current().kind {
                        TokenKind::Comma => self.advance(),
                        _ => break,
                    }
                }
            }
        }
        self.close_bracket(TokenKind::RightBrace, open)?;
        let end = self.previous_end();
        Ok(Expression::collection(
            elements,
            TextRange::new(open.start, end),
        ))
    }

    fn parse_postfix(&mut self, mut left: Expression) -> Result<Expression, ParseError> {
        loop {
            match self.current().kind {
                TokenKind::Dot => {
                    self.advance();
                    match self.parse_member(left) {
                        Ok(node) => left = node,
                        Err((node, error)) => {
                            if !self.options.error_recovery {
                                return Err(error);
                            }
                            self.record(error);
                            return Ok(node);
                        }
                    }
                }
                TokenKind::LeftBracket => {
                    let open = self.current().range;
                    self.advance();
                    let index = match self.parse_expression(0) {
                        Ok(expression) => expression,
                        Err(error) if self.options.error_recovery => {
                            let anchor = self.error_anchor();
                            self.record(error);
                            self.sync();
                            Expression::error(vec!["expression"], anchor)
                        }
                        Err(error) => return Err(error),
                    };
                    self.close_bracket(TokenKind::RightBracket, open)?;
                    let span = TextRange::new(left.span.start, self.previous_end());
                    left = Expression::index(left, index, span);
                }
                _ => break,
            }
        }
        Ok(left)
    }

    /// The name (or call) after a `.`. Keyword tokens are re-read as plain
    /// names here. On failure returns the `Incomplete` replacement node
    /// together with the error, so recovery can keep the left side.
    fn parse_member(
        &mut self,
        left: Expression,
    ) -> Result<Expression, (Expression, ParseError)> {
        let token = *self.current();
        let name: &str = match token.kind {
            TokenKind::Identifier(name) => name,
            TokenKind::DelimitedIdentifier(name) => name,
            ref kind if kind.keyword_text().is_some() => {
                kind.keyword_text().expect("checked above")
            }
            _ => {
                let error = self.unexpected("an identifier after '.'");
                let span = TextRange::new(left.span.start, self.previous_end());
                let node = Expression::incomplete(left, vec!["identifier"], span);
                return Err((node, error));
            }
        };
        self.advance();

        let member = match self.parse_name(name, token.range) {
            Ok(node) => node,
            Err(error) => {
                let span = TextRange::new(left.span.start, self.previous_end());
                let node = Expression::incomplete(left, vec!["arguments"], span);
                return Err((node, error));
            }
        };
        Ok(Expression::binary(BinaryOperator::Dot, left, member))
    }

    fn parse_arguments(
        &mut self,
        open: TextRange,
    ) -> Result<(SmallVec<[Expression; 4]>, usize), ParseError> {
        let mut args = SmallVec::new();
        if self.current().kind == TokenKind::RightParen {
            let close = self.current().range;
            self.advance();
            return Ok((args, close.end));
        }
        loop {
            if self.options.error_recovery && self.too_many_errors() {
                break;
            }
            match self.parse_expression(0) {
                Ok(argument) => args.push(argument),
                Err(error) if self.options.error_recovery => {
                    let anchor = self.error_anchor();
                    self.record(error);
                    self.sync();
                    args.push(Expression::error(vec!["expression"], anchor));
                }
                Err(error) => return Err(error),
            }
            match self.current().kind {
                TokenKind::Comma => {
                    self.advance();
                }
                TokenKind::RightParen => break,
                _ => {
                    let error = self.unexpected("',' or ')'");
                    if !self.options.error_recovery {
                        return Err(error);
                    }
                    self.record(error);
                    self.sync();
                    match self.current().kind {
                        TokenKind::Comma => self.advance(),
                        _ => break,
                    }
                }
            }
        }
        self.close_bracket(TokenKind::RightParen, open)?;
        Ok((args, self.previous_end()))
    }

    /// The type name after `is`/`as`: a possibly dotted qualified name,
    /// optionally parenthesized.
    fn parse_type_name(&mut self) -> Result<Expression, ParseError> {
        if self.current().kind == TokenKind::LeftParen {
            let open = self.current().range;
            self.advance();
            let inner = self.parse_type_name()?;
            self.close_bracket(TokenKind::RightParen, open)?;
            return Ok(inner);
        }

        let token = *self.current();
        let first = match token.kind {
            TokenKind::Identifier(name) => name,
            TokenKind::DelimitedIdentifier(name) => name,
            _ => return Err(self.unexpected("a type name")),
        };
        self.advance();

        let mut name = first.to_string();
        let mut end = token.range.end;
        while self.current().kind == TokenKind::Dot {
            self.advance();
            let part_token = *self.current();
            let part = match part_token.kind {
                TokenKind::Identifier(part) => part,
                TokenKind::DelimitedIdentifier(part) => part,
                _ => return Err(self.unexpected("an identifier in qualified type name")),
            };
            self.advance();
            name.push('.');
            name.push_str(part);
            end = part_token.range.end;
        }

        Ok(Expression::type_identifier(
            name,
            TextRange::new(token.range.start, end),
        ))
    }

    fn close_bracket(
        &mut self,
        closer: TokenKind<'static>,
        open: TextRange,
    ) -> Result<(), ParseError> {
        if self.current().kind == closer {
            self.advance();
            return Ok(());
        }
        if self.at_eof() {
            let error = self.syntax_error(
                DiagnosticCode::UnclosedBracket,
                format!("'{}' is never closed", open.text(self.source)),
                open,
            );
            if self.options.error_recovery {
                self.record(error);
                return Ok(());
            }
            return Err(error);
        }
        let error = self.unexpected(closer.describe());
        if self.options.error_recovery {
            self.record(error);
            self.sync();
            if self.current().kind == closer {
                self.advance();
            }
            return Ok(());
        }
        Err(error)
    }
}

fn binary_operator(kind: &TokenKind<'_>) -> Option<BinaryOperator> {
    match kind {
        TokenKind::Equal => Some(BinaryOperator::Equal),
        TokenKind::NotEqual => Some(BinaryOperator::NotEqual),
        TokenKind::Equivalent => Some(BinaryOperator::Equivalent),
        TokenKind::NotEquivalent => Some(BinaryOperator::NotEquivalent),
        TokenKind::LessThan => Some(BinaryOperator::LessThan),
        TokenKind::LessThanOrEqual => Some(BinaryOperator::LessThanOrEqual),
        TokenKind::GreaterThan => Some(BinaryOperator::GreaterThan),
        TokenKind::GreaterThanOrEqual => Some(BinaryOperator::GreaterThanOrEqual),
        TokenKind::Plus => Some(BinaryOperator::Add),
        TokenKind::Minus => Some(BinaryOperator::Subtract),
        TokenKind::Multiply => Some(BinaryOperator::Multiply),
        TokenKind::Divide => Some(BinaryOperator::Divide),
        TokenKind::Div => Some(BinaryOperator::IntegerDivide),
        TokenKind::Mod => Some(BinaryOperator::Modulo),
        TokenKind::Ampersand => Some(BinaryOperator::Concatenate),
        TokenKind::Union => Some(BinaryOperator::Union),
        TokenKind::And => Some(BinaryOperator::And),
        TokenKind::Or => Some(BinaryOperator::Or),
        TokenKind::Xor => Some(BinaryOperator::Xor),
        TokenKind::Implies => Some(BinaryOperator::Implies),
        TokenKind::In => Some(BinaryOperator::In),
        TokenKind::Contains => Some(BinaryOperator::Contains),
        TokenKind::Is => Some(BinaryOperator::Is),
        TokenKind::As => Some(BinaryOperator::As),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::ExpressionKind;

    fn parsed(source: &str) -> Expression {
        parse(source).unwrap_or_else(|e| panic!("parse failed for {source:?}: {e}"))
    }

    fn binary_parts(expr: &Expression) -> (&BinaryOperator, &Expression, &Expression) {
        match &expr.kind {
            ExpressionKind::Binary(b) => (&b.op, &b.left, &b.right),
            other => panic!("expected binary node, got {other:?}"),
        }
    }

    #[test]
    fn multiplication_binds_tighter_than_addition() {
        let expr = parsed("2 + 3 * 4");
        let (op, left, right) = binary_parts(&expr);
        assert_eq!(*op, BinaryOperator::Add);
        assert!(matches!(
            left.kind,
            ExpressionKind::Literal(LiteralValue::Integer(2))
        ));
        let (inner, _, _) = binary_parts(right);
        assert_eq!(*inner, BinaryOperator::Multiply);
    }

    #[test]
    fn implies_is_right_associative() {
        let expr = parsed("a implies b implies c");
        let (op, _, right) = binary_parts(&expr);
        assert_eq!(*op, BinaryOperator::Implies);
        let (inner, _, _) = binary_parts(right);
        assert_eq!(*inner, BinaryOperator::Implies);
    }

    #[test]
    fn dot_chains_left_associate() {
        let expr = parsed("a.b.c");
        let (op, left, _) = binary_parts(&expr);
        assert_eq!(*op, BinaryOperator::Dot);
        let (inner, _, _) = binary_parts(left);
        assert_eq!(*inner, BinaryOperator::Dot);
    }

    #[test]
    fn keywords_become_names_after_dot() {
        let expr = parsed("value.contains('x')");
        let (op, _, right) = binary_parts(&expr);
        assert_eq!(*op, BinaryOperator::Dot);
        match &right.kind {
            ExpressionKind::Function(call) => assert_eq!(call.name, "contains"),
            other => panic!("expected call, got {other:?}"),
        }
    }

    #[test]
    fn keyword_operators_still_parse_infix() {
        let expr = parsed("list contains 4");
        let (op, _, _) = binary_parts(&expr);
        assert_eq!(*op, BinaryOperator::Contains);
    }

    #[test]
    fn is_takes_a_qualified_type_name() {
        let expr = parsed("value is System.Boolean");
        let (op, _, right) = binary_parts(&expr);
        assert_eq!(*op, BinaryOperator::Is);
        match &right.kind {
            ExpressionKind::TypeIdentifier(name) => assert_eq!(name, "System.Boolean"),
            other => panic!("expected type identifier, got {other:?}"),
        }
    }

    #[test]
    fn quantity_literals_compose_number_and_unit() {
        let expr = parsed("5 'mg'");
        match &expr.kind {
            ExpressionKind::Literal(LiteralValue::Quantity { value, unit }) => {
                assert_eq!(*value, Decimal::from(5));
                assert_eq!(unit, "mg");
            }
            other => panic!("expected quantity, got {other:?}"),
        }
        let expr = parsed("2 years");
        assert!(matches!(
            expr.kind,
            ExpressionKind::Literal(LiteralValue::Quantity { .. })
        ));
    }

    #[test]
    fn collection_literals() {
        let expr = parsed("{}");
        assert!(matches!(&expr.kind, ExpressionKind::Collection(e) if e.is_empty()));
        let expr = parsed("{1, 2, 3}");
        assert!(matches!(&expr.kind, ExpressionKind::Collection(e) if e.len() == 3));
    }

    #[test]
    fn uppercase_names_become_type_identifiers() {
        let expr = parsed("Patient.name");
        let (_, left, right) = binary_parts(&expr);
        assert!(matches!(left.kind, ExpressionKind::TypeIdentifier(_)));
        assert!(matches!(right.kind, ExpressionKind::Identifier(_)));
    }

    #[test]
    fn spans_cover_the_source() {
        let source = "name.where(use = 'official')";
        let expr = parsed(source);
        assert_eq!(expr.span, TextRange::new(0, source.len()));
        assert_eq!(expr.span.text(source), source);
    }

    #[test]
    fn reparsing_yields_identical_ast() {
        let source = "name.where(use = 'official').given | telecom.value";
        assert_eq!(parsed(source), parsed(source));
    }

    #[test]
    fn fail_fast_raises_on_first_error() {
        let error = parse("name.where(").unwrap_err();
        assert_eq!(error.code(), DiagnosticCode::UnexpectedToken);
        let error = parse("1 + + ").unwrap_err();
        assert_eq!(error.code(), DiagnosticCode::UnexpectedToken);
        let error = parse("(1 + 2").unwrap_err();
        assert_eq!(error.code(), DiagnosticCode::UnclosedBracket);
    }

    #[test]
    fn fail_fast_surfaces_lexical_faults() {
        let error = parse("2 + 2 /* oops").unwrap_err();
        assert_eq!(error.code(), DiagnosticCode::UnclosedComment);
    }

    #[test]
    fn recovery_produces_partial_ast_with_error_nodes() {
        let result = parse_with_options("name.where(use = ) ", ParserOptions::diagnostic());
        assert!(result.is_partial);
        assert!(!result.diagnostics.is_empty());
        let ast = result.ast.expect("recovery always yields an AST");
        assert!(ast.has_errors());
    }

    #[test]
    fn recovery_error_nodes_have_nonempty_ranges() {
        for source in ["1 + ", "name.", "f(,)", "a and ) b", "{1, , 2}"] {
            let result = parse_with_options(source, ParserOptions::diagnostic());
            assert!(result.is_partial, "{source:?} should be partial");
            assert!(
                !result.diagnostics.is_empty(),
                "{source:?} should have diagnostics"
            );
            let ast = result.ast.expect("ast");
            let mut stack = vec![&ast];
            while let Some(node) = stack.pop() {
                if let ExpressionKind::Error(_) = &node.kind {
                    assert!(!node.span.is_empty(), "{source:?} produced empty error span");
                }
                match &node.kind {
                    ExpressionKind::Binary(b) => {
                        stack.push(&b.left);
                        stack.push(&b.right);
                    }
                    ExpressionKind::Unary(u) => stack.push(&u.operand),
                    ExpressionKind::Function(f) => stack.extend(f.args.iter()),
                    ExpressionKind::Index(i) => {
                        stack.push(&i.base);
                        stack.push(&i.index);
                    }
                    ExpressionKind::Collection(e) => stack.extend(e.iter()),
                    ExpressionKind::Incomplete(i) => stack.push(&i.partial),
                    _ => {}
                }
            }
        }
    }

    #[test]
    fn recovery_keeps_unclosed_comment_ast() {
        let result = parse_with_options("2 + 2 /* unterminated", ParserOptions::diagnostic());
        assert!(result.is_partial);
        assert!(
            result
                .diagnostics
                .iter()
                .any(|d| d.code == DiagnosticCode::UnclosedComment)
        );
        assert!(result.ast.is_some());
    }

    #[test]
    fn no_recovery_mode_collects_single_diagnostic() {
        let result = parse_with_options("1 + ", ParserOptions::default());
        assert!(result.ast.is_none());
        assert_eq!(result.diagnostics.len(), 1);
    }

    #[test]
    fn successful_parse_has_no_error_nodes() {
        let result = parse_with_options(
            "name.where(use = 'official').given",
            ParserOptions::diagnostic(),
        );
        assert!(!result.is_partial);
        assert!(result.diagnostics.is_empty());
        assert!(!result.ast.unwrap().has_errors());
    }

    #[test]
    fn comments_do_not_affect_the_ast() {
        assert_eq!(
            parsed("2 + 2 /* comment */ = 4"),
            parsed("2 + 2 /* comment */ = 4")
        );
        let with = parsed("2 + /* c */ 2");
        let (op, _, _) = binary_parts(&with);
        assert_eq!(*op, BinaryOperator::Add);
    }

    #[test]
    fn max_errors_caps_diagnostics() {
        let source = "f(#, #, #, #, #, #, #, #)";
        let options = ParserOptions {
            error_recovery: true,
            max_errors: 3,
            ..ParserOptions::default()
        };
        let result = parse_with_options(source, options);
        assert!(result.diagnostics.len() <= 3);
    }

    #[test]
    fn backtick_identifiers_escape_keywords() {
        let expr = parsed("`div`.value");
        let (_, left, _) = binary_parts(&expr);
        assert!(matches!(left.kind, ExpressionKind::Identifier(_)));
    }

    #[test]
    fn unary_minus_binds_tighter_than_multiplication() {
        let expr = parsed("-a * b");
        let (op, left, _) = binary_parts(&expr);
        assert_eq!(*op, BinaryOperator::Multiply);
        assert!(matches!(left.kind, ExpressionKind::Unary(_)));
    }
}
