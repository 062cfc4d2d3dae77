//! Core parser infrastructure: token cursor, error reporting, helpers.

use stencil_lexer::token::{Token, TokenKind};
use stencil_types::ast::Expr;
use stencil_types::{Span, SyntaxError};

/// Maximum expression nesting depth (parentheses, unary chains, arguments).
pub const MAX_EXPR_DEPTH: u32 = 32;

/// Result of a parsing step.
pub type ParseResult<T> = Result<T, SyntaxError>;

/// The expression parser.
///
/// Consumes a token stream produced by the lexer and builds an [`Expr`].
/// Stops at the first error.
pub struct Parser {
    /// The token stream.
    tokens: Vec<Token>,
    /// Current index into `tokens`.
    pos: usize,
    /// Returned by the cursor once the stream is exhausted.
    eof: Token,
    /// Current expression nesting depth.
    pub(crate) expr_depth: u32,
}

impl Parser {
    /// Create a new parser from a token stream.
    pub fn new(tokens: Vec<Token>) -> Self {
        let eof_span = tokens
            .last()
            .map(|t| t.span)
            .unwrap_or_else(|| Span::point(1, 1));
        Self {
            tokens,
            pos: 0,
            eof: Token::new(TokenKind::Eof, eof_span),
            expr_depth: 0,
        }
    }

    // ── Token Cursor ──────────────────────────────────────────────────────────

    /// Returns the current token without advancing.
    pub(crate) fn peek(&self) -> &Token {
        self.tokens.get(self.pos).unwrap_or(&self.eof)
    }

    /// Returns the kind of the current token.
    pub(crate) fn peek_kind(&self) -> &TokenKind {
        &self.peek().kind
    }

    /// Advance the cursor by one and return the consumed token.
    pub(crate) fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        token
    }

    /// Returns the previously consumed token's span.
    pub(crate) fn previous_span(&self) -> Span {
        if self.pos > 0 {
            self.tokens[self.pos - 1].span
        } else {
            Span::point(1, 1)
        }
    }

    /// Returns the span of the current token.
    pub(crate) fn current_span(&self) -> Span {
        self.peek().span
    }

    /// Returns `true` if the current token is `Eof`.
    pub(crate) fn at_end(&self) -> bool {
        matches!(self.peek_kind(), TokenKind::Eof)
    }

    /// Check if the current token matches the given kind exactly.
    pub(crate) fn check_exact(&self, kind: &TokenKind) -> bool {
        self.peek_kind() == kind
    }

    /// If the current token matches, advance and return `true`.
    pub(crate) fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.check_exact(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    // ── Expect Helpers ────────────────────────────────────────────────────────

    /// Expect a specific token kind.
    pub(crate) fn expect(&mut self, expected: &TokenKind) -> ParseResult<Token> {
        if self.check_exact(expected) {
            Ok(self.advance())
        } else {
            Err(self.error_at_current(format!(
                "expected '{}', got '{}'",
                expected,
                self.peek_kind()
            )))
        }
    }

    // ── Error Reporting ───────────────────────────────────────────────────────

    /// Build an error at the current token position.
    pub(crate) fn error_at_current(&self, message: impl Into<String>) -> SyntaxError {
        SyntaxError::new(message, self.current_span())
    }

    // ── Nesting ───────────────────────────────────────────────────────────────

    /// Enter one nesting level, failing past [`MAX_EXPR_DEPTH`].
    pub(crate) fn enter(&mut self) -> ParseResult<()> {
        self.expr_depth += 1;
        if self.expr_depth > MAX_EXPR_DEPTH {
            return Err(self.error_at_current(format!(
                "maximum expression nesting depth is {MAX_EXPR_DEPTH}"
            )));
        }
        Ok(())
    }

    pub(crate) fn leave(&mut self) {
        self.expr_depth = self.expr_depth.saturating_sub(1);
    }

    // ── Public API ────────────────────────────────────────────────────────────

    /// Parse the token stream as exactly one expression.
    pub fn parse(mut self) -> ParseResult<Expr> {
        if self.at_end() {
            return Err(self.error_at_current("expected expression"));
        }
        let expr = self.parse_expression()?;
        if !self.at_end() {
            return Err(self.error_at_current(format!(
                "unexpected token '{}'",
                self.peek_kind()
            )));
        }
        Ok(expr)
    }
}
