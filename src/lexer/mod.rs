//! Tokenizer for the text-format program document

pub mod tokens;

use tokens::{Token, TokenType};

#[derive(Debug, thiserror::Error)]
#[error("{file}:{line}:{column}: {message}")]
pub struct LexerError {
    pub message: String,
    pub line: usize,
    pub column: usize,
    pub file: String,
}

pub struct Lexer {
    source: Vec<char>,
    filename: String,
    pos: usize,
    line: usize,
    column: usize,
    tokens: Vec<Token>,
}

impl Lexer {
    pub fn new(source: &str, filename: &str) -> Self {
        Self {
            source: source.chars().collect(),
            filename: filename.to_string(),
            pos: 0,
            line: 1,
            column: 1,
            tokens: Vec::new(),
        }
    }

    pub fn tokenize(mut self) -> Result<Vec<Token>, LexerError> {
        loop {
            self.skip_trivia();
            if self.at_end() {
                break;
            }
            self.scan_token()?;
        }

        self.tokens.push(self.make_token(TokenType::Eof, ""));
        Ok(self.tokens)
    }

    fn scan_token(&mut self) -> Result<(), LexerError> {
        let ch = self.peek();

        if ch == '"' || ch == '\'' {
            return self.scan_string(ch);
        }

        if ch.is_ascii_digit()
            || (ch == '.' && self.peek_ahead(1).is_some_and(|c| c.is_ascii_digit()))
        {
            return self.scan_number();
        }

        let single = match ch {
            ':' => Some(TokenType::Colon),
            ',' => Some(TokenType::Comma),
            ';' => Some(TokenType::Semicolon),
            '-' => Some(TokenType::Minus),
            '{' => Some(TokenType::LBrace),
            '}' => Some(TokenType::RBrace),
            '<' => Some(TokenType::LAngle),
            '>' => Some(TokenType::RAngle),
            '[' => Some(TokenType::LBracket),
            ']' => Some(TokenType::RBracket),
            _ => None,
        };

        if let Some(tt) = single {
            let s = ch.to_string();
            self.tokens.push(self.make_token(tt, &s));
            self.advance();
            return Ok(());
        }

        if ch.is_ascii_alphabetic() || ch == '_' {
            return self.scan_identifier();
        }

        Err(self.error(format!("Unexpected character: {:?}", ch)))
    }

    fn scan_string(&mut self, quote: char) -> Result<(), LexerError> {
        let start_line = self.line;
        let start_col = self.column;
        self.advance(); // opening quote
        let mut bytes = Vec::new();
        let mut buf = [0u8; 4];

        while !self.at_end() && self.peek() != quote {
            if self.peek() == '\n' {
                break;
            }
            if self.peek() == '\\' {
                self.advance();
                if self.at_end() {
                    break;
                }
                self.scan_escape(&mut bytes)?;
            } else {
                bytes.extend_from_slice(self.advance().encode_utf8(&mut buf).as_bytes());
            }
        }

        if self.at_end() || self.peek() != quote {
            return Err(self.error_at(
                start_line,
                start_col,
                "Unterminated string literal".to_string(),
            ));
        }
        self.advance(); // closing quote

        let value = String::from_utf8(bytes).map_err(|_| {
            self.error_at(
                start_line,
                start_col,
                "String literal is not valid UTF-8".to_string(),
            )
        })?;
        self.tokens.push(Token {
            token_type: TokenType::StringLit,
            value,
            line: start_line,
            column: start_col,
            file: self.filename.clone(),
        });
        Ok(())
    }

    /// The character after a backslash. Octal `\NNN` and hex `\xHH` escapes
    /// each name a single byte, so multi-byte UTF-8 can be spelled out.
    fn scan_escape(&mut self, out: &mut Vec<u8>) -> Result<(), LexerError> {
        let (line, column) = (self.line, self.column - 1);
        let simple = match self.peek() {
            'n' => Some(b'\n'),
            't' => Some(b'\t'),
            'r' => Some(b'\r'),
            'a' => Some(0x07),
            'b' => Some(0x08),
            'f' => Some(0x0c),
            'v' => Some(0x0b),
            '\\' => Some(b'\\'),
            '\'' => Some(b'\''),
            '"' => Some(b'"'),
            '?' => Some(b'?'),
            _ => None,
        };
        if let Some(byte) = simple {
            self.advance();
            out.push(byte);
            return Ok(());
        }

        let (radix, max_digits, prefix) = match self.peek() {
            '0'..='7' => (8, 3, ""),
            'x' | 'X' => {
                self.advance();
                (16, 2, "x")
            }
            other => {
                return Err(self.error_at(
                    line,
                    column,
                    format!("Unknown escape sequence '\\{}'", other),
                ))
            }
        };
        let mut digits = String::new();
        while digits.len() < max_digits && !self.at_end() && self.peek().is_digit(radix) {
            digits.push(self.advance());
        }
        let byte = u32::from_str_radix(&digits, radix)
            .ok()
            .and_then(|v| u8::try_from(v).ok())
            .ok_or_else(|| {
                self.error_at(
                    line,
                    column,
                    format!("Invalid escape sequence '\\{}{}'", prefix, digits),
                )
            })?;
        out.push(byte);
        Ok(())
    }

    fn scan_number(&mut self) -> Result<(), LexerError> {
        let start_col = self.column;
        let mut num_chars = String::new();

        self.take_digits(&mut num_chars);
        if !self.at_end() && self.peek() == '.' {
            num_chars.push('.');
            self.advance();
            self.take_digits(&mut num_chars);
        }
        if !self.at_end() && matches!(self.peek(), 'e' | 'E') {
            num_chars.push('e');
            self.advance();
            if !self.at_end() && matches!(self.peek(), '+' | '-') {
                num_chars.push(self.peek());
                self.advance();
            }
            if self.at_end() || !self.peek().is_ascii_digit() {
                return Err(self.error("Missing exponent digits in number literal".to_string()));
            }
            self.take_digits(&mut num_chars);
        }
        // Float suffix
        if !self.at_end() && matches!(self.peek(), 'f' | 'F') {
            self.advance();
        }

        if !self.at_end() && (self.peek().is_ascii_alphanumeric() || self.peek() == '_') {
            return Err(self.error(format!(
                "Invalid number literal '{}{}'",
                num_chars,
                self.peek()
            )));
        }

        self.tokens.push(Token {
            token_type: TokenType::Number,
            value: num_chars,
            line: self.line,
            column: start_col,
            file: self.filename.clone(),
        });
        Ok(())
    }

    fn scan_identifier(&mut self) -> Result<(), LexerError> {
        let start_col = self.column;
        let mut word = String::new();

        while !self.at_end() && (self.peek().is_ascii_alphanumeric() || self.peek() == '_') {
            word.push(self.peek());
            self.advance();
        }

        self.tokens.push(Token {
            token_type: TokenType::Identifier,
            value: word,
            line: self.line,
            column: start_col,
            file: self.filename.clone(),
        });
        Ok(())
    }

    // ── Helpers ─────────────────────────────────────────────────────────

    fn peek(&self) -> char {
        self.source[self.pos]
    }

    fn peek_ahead(&self, offset: usize) -> Option<char> {
        self.source.get(self.pos + offset).copied()
    }

    fn advance(&mut self) -> char {
        let ch = self.source[self.pos];
        self.pos += 1;
        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        ch
    }

    fn at_end(&self) -> bool {
        self.pos >= self.source.len()
    }

    fn take_digits(&mut self, out: &mut String) {
        while !self.at_end() && self.peek().is_ascii_digit() {
            out.push(self.advance());
        }
    }

    /// Whitespace and `#` comments.
    fn skip_trivia(&mut self) {
        while !self.at_end() {
            match self.peek() {
                c if c.is_whitespace() => {
                    self.advance();
                }
                '#' => {
                    while !self.at_end() && self.peek() != '\n' {
                        self.advance();
                    }
                }
                _ => break,
            }
        }
    }

    fn error(&self, message: String) -> LexerError {
        self.error_at(self.line, self.column, message)
    }

    fn error_at(&self, line: usize, column: usize, message: String) -> LexerError {
        LexerError {
            message,
            line,
            column,
            file: self.filename.clone(),
        }
    }

    fn make_token(&self, token_type: TokenType, value: &str) -> Token {
        Token {
            token_type,
            value: value.to_string(),
            line: self.line,
            column: self.column,
            file: self.filename.clone(),
        }
    }
}
