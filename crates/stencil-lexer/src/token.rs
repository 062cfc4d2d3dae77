//! Token types for the expression lexer.
//!
//! Defines [`TokenKind`] covering every lexeme of the template expression
//! grammar and [`Token`], which pairs a kind with a source [`Span`].

use stencil_types::Span;
use std::fmt;

/// Identifiers that lex as literal tokens instead of [`TokenKind::Identifier`].
pub const ALL_KEYWORDS: &[&str] = &["true", "false", "null", "undefined"];

// ─────────────────────────────────────────────────────────────────────
// Token
// ─────────────────────────────────────────────────────────────────────

/// A single token produced by the lexer.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    /// What kind of token this is.
    pub kind: TokenKind,
    /// Source location.
    pub span: Span,
}

impl Token {
    /// Create a new token.
    pub fn new(kind: TokenKind, span: Span) -> Self {
        Self { kind, span }
    }
}

// ─────────────────────────────────────────────────────────────────────
// TokenKind
// ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // ── Literals ──
    NumberLit(f64),
    StringLiteral(String),
    True,
    False,
    Null,
    Undefined,

    // ── Identifiers ──
    /// `[A-Za-z_$][A-Za-z0-9_$]*`, e.g. `item`, `$index`, `$root`
    Identifier(String),

    // ── Operators ──
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Bang,
    EqEq,
    EqEqEq,
    BangEq,
    BangEqEq,
    Less,
    LessEq,
    Greater,
    GreaterEq,
    AmpAmp,
    PipePipe,
    QuestionQuestion,
    Question,
    Colon,

    // ── Punctuation ──
    Dot,
    Comma,
    LParen,
    RParen,
    LBracket,
    RBracket,

    // ── Special ──
    Eof,
}

impl TokenKind {
    /// Look up a literal keyword. Returns `None` for plain identifiers.
    pub fn from_keyword(s: &str) -> Option<TokenKind> {
        Some(match s {
            "true" => TokenKind::True,
            "false" => TokenKind::False,
            "null" => TokenKind::Null,
            "undefined" => TokenKind::Undefined,
            _ => return None,
        })
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::NumberLit(n) => write!(f, "{n}"),
            TokenKind::StringLiteral(s) => write!(f, "'{s}'"),
            TokenKind::True => f.write_str("true"),
            TokenKind::False => f.write_str("false"),
            TokenKind::Null => f.write_str("null"),
            TokenKind::Undefined => f.write_str("undefined"),
            TokenKind::Identifier(s) => f.write_str(s),
            TokenKind::Plus => f.write_str("+"),
            TokenKind::Minus => f.write_str("-"),
            TokenKind::Star => f.write_str("*"),
            TokenKind::Slash => f.write_str("/"),
            TokenKind::Percent => f.write_str("%"),
            TokenKind::Bang => f.write_str("!"),
            TokenKind::EqEq => f.write_str("=="),
            TokenKind::EqEqEq => f.write_str("==="),
            TokenKind::BangEq => f.write_str("!="),
            TokenKind::BangEqEq => f.write_str("!=="),
            TokenKind::Less => f.write_str("<"),
            TokenKind::LessEq => f.write_str("<="),
            TokenKind::Greater => f.write_str(">"),
            TokenKind::GreaterEq => f.write_str(">="),
            TokenKind::AmpAmp => f.write_str("&&"),
            TokenKind::PipePipe => f.write_str("||"),
            TokenKind::QuestionQuestion => f.write_str("??"),
            TokenKind::Question => f.write_str("?"),
            TokenKind::Colon => f.write_str(":"),
            TokenKind::Dot => f.write_str("."),
            TokenKind::Comma => f.write_str(","),
            TokenKind::LParen => f.write_str("("),
            TokenKind::RParen => f.write_str(")"),
            TokenKind::LBracket => f.write_str("["),
            TokenKind::RBracket => f.write_str("]"),
            TokenKind::Eof => f.write_str("end of expression"),
        }
    }
}
