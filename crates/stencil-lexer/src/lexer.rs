//! Expression lexer: converts expression text to a token stream.
//!
//! Features:
//! - Number, string (`'…'` / `"…"` with escapes) and keyword literals
//! - Identifiers including `$` so reserved bindings (`$index`, `$root`) lex
//! - One- to three-character operators (`!`, `!=`, `!==`, `??`, …)
//! - Fails fast on the first malformed lexeme; assignment (`=`) and
//!   bitwise operators are rejected outright

use stencil_types::{Span, SyntaxError};

use crate::token::{Token, TokenKind};

/// Result of lexing: the token stream (always ending with
/// [`TokenKind::Eof`]) or the first syntax error.
pub type LexResult = Result<Vec<Token>, SyntaxError>;

/// The expression lexer.
pub struct Lexer<'src> {
    /// The full source text as bytes.
    source: &'src [u8],
    /// Current byte offset into `source`.
    pos: usize,
    /// Current line number (1-based).
    line: u32,
    /// Current column number (1-based).
    col: u32,
}

impl<'src> Lexer<'src> {
    /// Create a new lexer for the given expression text.
    pub fn new(source: &'src str) -> Self {
        Self {
            source: source.as_bytes(),
            pos: 0,
            line: 1,
            col: 1,
        }
    }

    /// Lex the entire expression into a token stream.
    pub fn lex(mut self) -> LexResult {
        let mut tokens = Vec::new();
        loop {
            let token = self.scan_token()?;
            let is_eof = token.kind == TokenKind::Eof;
            tokens.push(token);
            if is_eof {
                return Ok(tokens);
            }
        }
    }

    // ─────────────────────────────────────────────────────────────
    // Character-level helpers
    // ─────────────────────────────────────────────────────────────

    fn peek(&self) -> Option<u8> {
        self.source.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.source.get(self.pos + offset).copied()
    }

    fn advance(&mut self) -> Option<u8> {
        let ch = self.source.get(self.pos).copied()?;
        self.pos += 1;
        if ch == b'\n' {
            self.line += 1;
            self.col = 1;
        } else if ch & 0xC0 != 0x80 {
            // Continuation bytes of a multi-byte char share its column.
            self.col += 1;
        }
        Some(ch)
    }

    fn eat(&mut self, expected: u8) -> bool {
        if self.peek() == Some(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn current_span(&self) -> Span {
        Span::point(self.line, self.col)
    }

    fn span_from(&self, start_line: u32, start_col: u32) -> Span {
        Span::new(
            start_line,
            start_col,
            self.line,
            self.col.saturating_sub(1).max(1),
        )
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.peek() {
            if ch.is_ascii_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    // ─────────────────────────────────────────────────────────────
    // Scanning
    // ─────────────────────────────────────────────────────────────

    /// Scan one token.
    fn scan_token(&mut self) -> Result<Token, SyntaxError> {
        self.skip_whitespace();

        let start_line = self.line;
        let start_col = self.col;
        let start = self.pos;
        let Some(ch) = self.advance() else {
            return Ok(Token::new(TokenKind::Eof, self.current_span()));
        };

        let kind = match ch {
            b'\'' | b'"' => return self.scan_string(ch, start_line, start_col),
            b'0'..=b'9' => return self.scan_number(start, start_line, start_col),
            b'a'..=b'z' | b'A'..=b'Z' | b'_' | b'$' => {
                return Ok(self.scan_identifier(start, start_line, start_col))
            }

            b'+' => TokenKind::Plus,
            b'-' => TokenKind::Minus,
            b'*' => TokenKind::Star,
            b'/' => TokenKind::Slash,
            b'%' => TokenKind::Percent,
            b'.' => TokenKind::Dot,
            b',' => TokenKind::Comma,
            b'(' => TokenKind::LParen,
            b')' => TokenKind::RParen,
            b'[' => TokenKind::LBracket,
            b']' => TokenKind::RBracket,
            b':' => TokenKind::Colon,

            b'=' => {
                if !self.eat(b'=') {
                    return Err(SyntaxError::new(
                        "assignment is not allowed in template expressions",
                        self.span_from(start_line, start_col),
                    ));
                }
                if self.eat(b'=') {
                    TokenKind::EqEqEq
                } else {
                    TokenKind::EqEq
                }
            }
            b'!' => {
                if self.eat(b'=') {
                    if self.eat(b'=') {
                        TokenKind::BangEqEq
                    } else {
                        TokenKind::BangEq
                    }
                } else {
                    TokenKind::Bang
                }
            }
            b'<' => {
                if self.eat(b'=') {
                    TokenKind::LessEq
                } else {
                    TokenKind::Less
                }
            }
            b'>' => {
                if self.eat(b'=') {
                    TokenKind::GreaterEq
                } else {
                    TokenKind::Greater
                }
            }
            b'&' => {
                if !self.eat(b'&') {
                    return Err(SyntaxError::new(
                        "bitwise '&' is not supported; use '&&'",
                        self.span_from(start_line, start_col),
                    ));
                }
                TokenKind::AmpAmp
            }
            b'|' => {
                if !self.eat(b'|') {
                    return Err(SyntaxError::new(
                        "bitwise '|' is not supported; use '||'",
                        self.span_from(start_line, start_col),
                    ));
                }
                TokenKind::PipePipe
            }
            b'?' => {
                if self.eat(b'?') {
                    TokenKind::QuestionQuestion
                } else {
                    TokenKind::Question
                }
            }

            _ => {
                // Report the whole (possibly multi-byte) character.
                while matches!(self.peek(), Some(b) if b & 0xC0 == 0x80) {
                    self.advance();
                }
                let text = String::from_utf8_lossy(&self.source[start..self.pos]);
                return Err(SyntaxError::new(
                    format!("unexpected character '{text}'"),
                    self.span_from(start_line, start_col),
                ));
            }
        };

        Ok(Token::new(kind, self.span_from(start_line, start_col)))
    }

    fn scan_number(
        &mut self,
        start: usize,
        start_line: u32,
        start_col: u32,
    ) -> Result<Token, SyntaxError> {
        // We already consumed the first digit
        while let Some(b'0'..=b'9') = self.peek() {
            self.advance();
        }

        // Check for decimal point
        if self.peek() == Some(b'.') && matches!(self.peek_at(1), Some(b'0'..=b'9')) {
            self.advance(); // consume '.'
            while let Some(b'0'..=b'9') = self.peek() {
                self.advance();
            }
        }

        // Exponent
        if matches!(self.peek(), Some(b'e' | b'E')) {
            let digits_at = match self.peek_at(1) {
                Some(b'+' | b'-') => 2,
                _ => 1,
            };
            if matches!(self.peek_at(digits_at), Some(b'0'..=b'9')) {
                for _ in 0..digits_at {
                    self.advance();
                }
                while let Some(b'0'..=b'9') = self.peek() {
                    self.advance();
                }
            }
        }

        let span = self.span_from(start_line, start_col);
        if matches!(self.peek(), Some(ch) if ch.is_ascii_alphabetic() || ch == b'_' || ch == b'$')
        {
            return Err(SyntaxError::new(
                "identifier cannot start immediately after a number",
                span,
            ));
        }

        let text = std::str::from_utf8(&self.source[start..self.pos]).unwrap_or("0");
        let value: f64 = text
            .parse()
            .map_err(|_| SyntaxError::new(format!("invalid number '{text}'"), span))?;
        Ok(Token::new(TokenKind::NumberLit(value), span))
    }

    fn scan_identifier(&mut self, start: usize, start_line: u32, start_col: u32) -> Token {
        // First character was already consumed
        while let Some(ch) = self.peek() {
            if ch.is_ascii_alphanumeric() || ch == b'_' || ch == b'$' {
                self.advance();
            } else {
                break;
            }
        }

        let span = self.span_from(start_line, start_col);
        let text = std::str::from_utf8(&self.source[start..self.pos]).unwrap_or("");
        let kind =
            TokenKind::from_keyword(text).unwrap_or_else(|| TokenKind::Identifier(text.to_string()));
        Token::new(kind, span)
    }

    fn scan_string(
        &mut self,
        quote: u8,
        start_line: u32,
        start_col: u32,
    ) -> Result<Token, SyntaxError> {
        let mut buf: Vec<u8> = Vec::new();

        loop {
            match self.peek() {
                None => {
                    return Err(SyntaxError::new(
                        "unterminated string literal",
                        self.span_from(start_line, start_col),
                    ));
                }
                Some(ch) if ch == quote => {
                    self.advance();
                    // Only split at ASCII bytes, so the buffer stays valid UTF-8.
                    let text = String::from_utf8_lossy(&buf).into_owned();
                    return Ok(Token::new(
                        TokenKind::StringLiteral(text),
                        self.span_from(start_line, start_col),
                    ));
                }
                Some(b'\\') => {
                    let escaped = self.scan_escape_sequence()?;
                    let mut utf8 = [0u8; 4];
                    buf.extend_from_slice(escaped.encode_utf8(&mut utf8).as_bytes());
                }
                Some(_) => {
                    if let Some(ch) = self.advance() {
                        buf.push(ch);
                    }
                }
            }
        }
    }

    /// Scan an escape sequence after `\`.
    fn scan_escape_sequence(&mut self) -> Result<char, SyntaxError> {
        let start_line = self.line;
        let start_col = self.col;
        self.advance(); // consume '\'
        let escaped = match self.advance() {
            Some(b'n') => '\n',
            Some(b't') => '\t',
            Some(b'r') => '\r',
            Some(b'0') => '\0',
            Some(b'\\') => '\\',
            Some(b'\'') => '\'',
            Some(b'"') => '"',
            Some(b'u') => return self.scan_unicode_escape(start_line, start_col),
            Some(other) => {
                return Err(SyntaxError::new(
                    format!("unknown escape sequence '\\{}'", other as char),
                    self.span_from(start_line, start_col),
                ))
            }
            None => {
                return Err(SyntaxError::new(
                    "unterminated string literal",
                    self.span_from(start_line, start_col),
                ))
            }
        };
        Ok(escaped)
    }

    /// `\u{XXXX}`: one to six hex digits.
    fn scan_unicode_escape(&mut self, start_line: u32, start_col: u32) -> Result<char, SyntaxError> {
        let invalid = |lexer: &Self| {
            SyntaxError::new(
                "invalid unicode escape; expected \\u{XXXX}",
                lexer.span_from(start_line, start_col),
            )
        };
        if !self.eat(b'{') {
            return Err(invalid(self));
        }
        let mut code: u32 = 0;
        let mut digits = 0;
        while let Some(ch) = self.peek() {
            if ch == b'}' {
                break;
            }
            let digit = (ch as char).to_digit(16).ok_or_else(|| invalid(self))?;
            code = code * 16 + digit;
            digits += 1;
            if digits > 6 {
                return Err(invalid(self));
            }
            self.advance();
        }
        if digits == 0 || !self.eat(b'}') {
            return Err(invalid(self));
        }
        char::from_u32(code).ok_or_else(|| invalid(self))
    }
}
