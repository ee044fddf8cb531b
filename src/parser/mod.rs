//! Parser for the text-format program document
//!
//! Reads the protobuf text rendering of a `VisualScript` message. Each
//! statement and expression message is lowered to the program model as soon
//! as its closing brace is consumed, so structural errors point at the
//! message that caused them.

use crate::ast::desc::{special_float, ConstantDesc, ExpressionDesc, StatementDesc, TypeDesc};
use crate::ast::*;
use crate::lexer::tokens::{Token, TokenType};

#[derive(Debug, thiserror::Error)]
#[error("{file}:{line}:{column}: {message}")]
pub struct ParseError {
    pub message: String,
    pub line: usize,
    pub column: usize,
    pub file: String,
    #[source]
    pub malformed: Option<ModelError>,
}

impl ParseError {
    /// True when the document was well-formed text but described an invalid program.
    pub fn is_malformed(&self) -> bool {
        self.malformed.is_some()
    }
}

type BodyParser<T> = fn(&mut Parser, TokenType) -> Result<T, ParseError>;

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            pos: 0,
            depth: 0,
        }
    }

    fn enter_depth(&mut self) -> Result<(), ParseError> {
        self.depth += 1;
        if self.depth > MAX_NESTING_DEPTH {
            Err(self.error(format!(
                "Maximum nesting depth ({}) exceeded",
                MAX_NESTING_DEPTH
            )))
        } else {
            Ok(())
        }
    }

    fn exit_depth(&mut self) {
        self.depth -= 1;
    }

    // ── Public API ──────────────────────────────────────────────────────

    pub fn parse(&mut self) -> Result<VisualScript, ParseError> {
        let mut nodes = Vec::new();

        while !self.at_end() {
            let field = self.expect(TokenType::Identifier)?.clone();
            match field.value.as_str() {
                "nodes" => self.parse_message_field(Parser::parse_node_body, &mut nodes)?,
                other => return Err(unknown_field(&field, "VisualScript", other)),
            }
            self.skip_separator();
        }

        Ok(VisualScript { nodes })
    }

    // ── Messages ────────────────────────────────────────────────────────

    fn parse_node_body(&mut self, close: TokenType) -> Result<Node, ParseError> {
        let mut statements = Vec::new();

        while !self.check(close) {
            let field = self.expect_field()?;
            match field.value.as_str() {
                "statements" => {
                    self.parse_message_field(Parser::parse_statement_body, &mut statements)?
                }
                other => return Err(unknown_field(&field, "Node", other)),
            }
            self.skip_separator();
        }
        self.advance();

        Ok(Node { statements })
    }

    fn parse_statement_body(&mut self, close: TokenType) -> Result<Statement, ParseError> {
        let start = self.previous().clone();
        let mut desc = StatementDesc::default();

        while !self.check(close) {
            let field = self.expect_field()?;
            match field.value.as_str() {
                "type" => {
                    desc.kind = Some(self.parse_enum_value(StatementType::from_name, "StatementType")?)
                }
                "expression" => {
                    desc.expression = Some(self.parse_message(Parser::parse_expression_body)?)
                }
                "statements" => {
                    self.parse_message_field(Parser::parse_statement_body, &mut desc.statements)?
                }
                "else_statements" => self.parse_message_field(
                    Parser::parse_statement_body,
                    &mut desc.else_statements,
                )?,
                "variable" => desc.variable = Some(self.parse_string_value()?),
                other => return Err(unknown_field(&field, "Statement", other)),
            }
            self.skip_separator();
        }
        self.advance();

        Statement::try_from(desc).map_err(|e| malformed(&start, e))
    }

    fn parse_expression_body(&mut self, close: TokenType) -> Result<Expression, ParseError> {
        let start = self.previous().clone();
        let mut desc = ExpressionDesc::default();

        while !self.check(close) {
            let field = self.expect_field()?;
            match field.value.as_str() {
                "type" => {
                    desc.kind =
                        Some(self.parse_enum_value(ExpressionType::from_name, "ExpressionType")?)
                }
                "expressions" => self
                    .parse_message_field(Parser::parse_expression_body, &mut desc.expressions)?,
                "constant" => desc.constant = Some(self.parse_message(Parser::parse_constant_body)?),
                "variable" => desc.variable = Some(self.parse_string_value()?),
                other => return Err(unknown_field(&field, "Expression", other)),
            }
            self.skip_separator();
        }
        self.advance();

        Expression::try_from(desc).map_err(|e| malformed(&start, e))
    }

    fn parse_constant_body(&mut self, close: TokenType) -> Result<ConstantDesc, ParseError> {
        let mut desc = ConstantDesc::default();

        while !self.check(close) {
            let field = self.expect_field()?;
            match field.value.as_str() {
                "type" => desc.value_type = Some(self.parse_message(Parser::parse_type_body)?),
                "float_value" => desc.float_value = Some(self.parse_float_value()?),
                "string_value" => desc.string_value = Some(self.parse_string_value()?),
                other => return Err(unknown_field(&field, "Constant", other)),
            }
            self.skip_separator();
        }
        self.advance();

        Ok(desc)
    }

    fn parse_type_body(&mut self, close: TokenType) -> Result<TypeDesc, ParseError> {
        let mut desc = TypeDesc::default();

        while !self.check(close) {
            let field = self.expect_field()?;
            match field.value.as_str() {
                "basic_type" => {
                    desc.basic_type = Some(self.parse_enum_value(BasicType::from_name, "BasicType")?)
                }
                other => return Err(unknown_field(&field, "Type", other)),
            }
            self.skip_separator();
        }
        self.advance();

        Ok(desc)
    }

    /// A repeated message field: `name { .. }`, `name: { .. }` or `name: [{ .. }, { .. }]`.
    fn parse_message_field<T>(
        &mut self,
        body: BodyParser<T>,
        out: &mut Vec<T>,
    ) -> Result<(), ParseError> {
        if self.match_token(TokenType::Colon) && self.match_token(TokenType::LBracket) {
            if !self.check(TokenType::RBracket) {
                loop {
                    out.push(self.parse_message(body)?);
                    if !self.match_token(TokenType::Comma) {
                        break;
                    }
                }
            }
            self.expect(TokenType::RBracket)?;
            return Ok(());
        }
        out.push(self.parse_message(body)?);
        Ok(())
    }

    /// A single message value; the colon before it is optional.
    fn parse_message<T>(&mut self, body: BodyParser<T>) -> Result<T, ParseError> {
        self.match_token(TokenType::Colon);
        let open = self.current().clone();
        let close = open.token_type.closing().ok_or_else(|| {
            error_at(
                &open,
                format!("Expected '{{' or '<', got {:?} ({:?})", open.token_type, open.value),
            )
        })?;
        self.advance();

        self.enter_depth()?;
        let result = body(self, close);
        self.exit_depth();
        result
    }

    // ── Scalars ─────────────────────────────────────────────────────────

    fn parse_enum_value<E>(
        &mut self,
        from_name: fn(&str) -> Option<E>,
        enum_name: &str,
    ) -> Result<E, ParseError> {
        self.expect(TokenType::Colon)?;
        if self.check(TokenType::Number) || self.check(TokenType::Minus) {
            return Err(self.error(format!(
                "Numeric {} values are not supported; write the value by name",
                enum_name
            )));
        }
        let tok = self.expect(TokenType::Identifier)?;
        from_name(&tok.value).ok_or_else(|| {
            error_at(tok, format!("Unknown {} value '{}'", enum_name, tok.value))
        })
    }

    /// Adjacent string literals concatenate.
    fn parse_string_value(&mut self) -> Result<String, ParseError> {
        self.expect(TokenType::Colon)?;
        let mut value = self.expect(TokenType::StringLit)?.value.clone();
        while self.check(TokenType::StringLit) {
            value.push_str(&self.advance().value);
        }
        Ok(value)
    }

    fn parse_float_value(&mut self) -> Result<f64, ParseError> {
        self.expect(TokenType::Colon)?;
        let negative = self.match_token(TokenType::Minus);
        let tok = self.current().clone();

        let magnitude = match tok.token_type {
            TokenType::Number => tok
                .value
                .parse::<f64>()
                .map_err(|_| error_at(&tok, format!("Invalid number '{}'", tok.value)))?,
            TokenType::Identifier => special_float(&tok.value)
                .ok_or_else(|| error_at(&tok, format!("Expected number, got '{}'", tok.value)))?,
            _ => {
                return Err(error_at(
                    &tok,
                    format!("Expected number, got {:?} ({:?})", tok.token_type, tok.value),
                ))
            }
        };
        self.advance();

        Ok(if negative { -magnitude } else { magnitude })
    }

    // ── Helpers ─────────────────────────────────────────────────────────

    fn current(&self) -> &Token {
        if self.pos >= self.tokens.len() {
            &self.tokens[self.tokens.len() - 1] // EOF
        } else {
            &self.tokens[self.pos]
        }
    }

    fn previous(&self) -> &Token {
        &self.tokens[self.pos.saturating_sub(1)]
    }

    fn advance(&mut self) -> &Token {
        let pos = self.pos;
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        &self.tokens[pos]
    }

    fn check(&self, token_type: TokenType) -> bool {
        self.current().token_type == token_type
    }

    fn match_token(&mut self, token_type: TokenType) -> bool {
        if self.check(token_type) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token_type: TokenType) -> Result<&Token, ParseError> {
        let tok = self.current();
        if tok.token_type != token_type {
            return Err(error_at(
                tok,
                format!(
                    "Expected {:?}, got {:?} ({:?})",
                    token_type, tok.token_type, tok.value
                ),
            ));
        }
        Ok(self.advance())
    }

    /// A field name inside a message; running out of input here means a missing close.
    fn expect_field(&mut self) -> Result<Token, ParseError> {
        if self.at_end() {
            return Err(self.error("Unterminated message: expected '}' or '>'".to_string()));
        }
        self.expect(TokenType::Identifier).cloned()
    }

    fn skip_separator(&mut self) {
        if !self.match_token(TokenType::Comma) {
            self.match_token(TokenType::Semicolon);
        }
    }

    fn at_end(&self) -> bool {
        self.current().token_type == TokenType::Eof
    }

    fn error(&self, message: String) -> ParseError {
        error_at(self.current(), message)
    }
}

fn error_at(tok: &Token, message: String) -> ParseError {
    ParseError {
        message,
        line: tok.line,
        column: tok.column,
        file: tok.file.clone(),
        malformed: None,
    }
}

fn unknown_field(tok: &Token, message: &str, field: &str) -> ParseError {
    error_at(tok, format!("Unknown field '{}' in {}", field, message))
}

fn malformed(start: &Token, err: ModelError) -> ParseError {
    ParseError {
        message: err.to_string(),
        line: start.line,
        column: start.column,
        file: start.file.clone(),
        malformed: Some(err),
    }
}
