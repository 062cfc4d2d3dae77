//! AST node types for expressions and parsed template markup.
//!
//! Expression nodes carry a [`Span`] relative to their expression text.
//! Markup nodes preserve source order and the exact text of every tag so
//! rendering reproduces untouched markup byte for byte.

use crate::{Span, SyntaxError};
use std::fmt;

// ══════════════════════════════════════════════════════════════════════════════
// Expressions
// ══════════════════════════════════════════════════════════════════════════════

/// A spanned identifier.
#[derive(Debug, Clone, PartialEq)]
pub struct Ident {
    pub name: String,
    pub span: Span,
}

impl Ident {
    pub fn new(name: impl Into<String>, span: Span) -> Self {
        Self {
            name: name.into(),
            span,
        }
    }
}

/// An expression node.
#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

impl Expr {
    pub fn new(kind: ExprKind, span: Span) -> Self {
        Self { kind, span }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    // ── Literals ──
    NumberLit(f64),
    StringLit(String),
    BoolLit(bool),
    NullLit,
    UndefinedLit,
    ArrayLit(Vec<Expr>),

    /// Scope lookup: `name`
    Identifier(String),

    /// `object.property`
    Member {
        object: Box<Expr>,
        property: Ident,
    },
    /// `object[index]`
    Index {
        object: Box<Expr>,
        index: Box<Expr>,
    },
    /// `callee(args)`
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
    },

    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        left: Box<Expr>,
        op: BinOp,
        right: Box<Expr>,
    },
    /// `test ? consequent : alternate`
    Conditional {
        test: Box<Expr>,
        consequent: Box<Expr>,
        alternate: Box<Expr>,
    },

    /// `(expr)`
    Paren(Box<Expr>),
}

/// Binary operators, including the short-circuiting logical ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    // Arithmetic
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    // Equality
    Eq,
    NotEq,
    StrictEq,
    StrictNotEq,
    // Relational
    Less,
    Greater,
    LessEq,
    GreaterEq,
    // Logical
    And,
    Or,
    Coalesce,
}

impl fmt::Display for BinOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Mod => "%",
            BinOp::Eq => "==",
            BinOp::NotEq => "!=",
            BinOp::StrictEq => "===",
            BinOp::StrictNotEq => "!==",
            BinOp::Less => "<",
            BinOp::Greater => ">",
            BinOp::LessEq => "<=",
            BinOp::GreaterEq => ">=",
            BinOp::And => "&&",
            BinOp::Or => "||",
            BinOp::Coalesce => "??",
        };
        f.write_str(symbol)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    /// `!`
    Not,
    /// `-`
    Neg,
    /// `+`
    Plus,
}

// ══════════════════════════════════════════════════════════════════════════════
// Markup
// ══════════════════════════════════════════════════════════════════════════════

/// An expression as written in a template, parsed once at registration.
///
/// A syntax failure is kept rather than reported eagerly: it only becomes
/// an error when rendering actually reaches the expression.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledExpr {
    /// The trimmed expression text.
    pub source: String,
    pub parsed: Result<Expr, SyntaxError>,
}

/// A piece of text with interpolation sites.
#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
    Literal(String),
    /// `{{ expr }}`: HTML-escaped on output.
    Escaped(CompiledExpr),
    /// `{{{ expr }}}`: emitted verbatim.
    Raw(CompiledExpr),
}

/// Text split into literal and interpolation segments.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Interpolated {
    pub segments: Vec<Segment>,
}

impl Interpolated {
    /// `true` when the text contains no interpolation sites.
    pub fn is_static(&self) -> bool {
        self.segments
            .iter()
            .all(|segment| matches!(segment, Segment::Literal(_)))
    }
}

/// An attribute value, classified for include binding.
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    /// Attribute written without a value: `<card compact/>`
    Flag,
    /// Plain text.
    Literal(String),
    /// Exactly one interpolation and nothing else: evaluated to its native value.
    Expression(CompiledExpr),
    /// Text mixed with interpolations: evaluated to a string.
    Interpolated(Interpolated),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    pub name: String,
    pub value: AttrValue,
}

/// `x-for="source"` with its `x-row` alias.
#[derive(Debug, Clone, PartialEq)]
pub struct LoopDirective {
    pub source: CompiledExpr,
    pub alias: String,
}

/// A matched element: open tag, children and close tag.
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    /// Tag name as written.
    pub tag: String,
    /// Attributes other than consumed directives, in source order.
    pub attributes: Vec<Attribute>,
    /// The open tag text with consumed directive attributes removed.
    pub open_tag: Interpolated,
    /// The close tag text; `None` for void and self-closing elements.
    pub close_tag: Option<String>,
    pub self_closing: bool,
    pub children: Vec<Node>,
    pub each: Option<LoopDirective>,
    pub condition: Option<CompiledExpr>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Text(Interpolated),
    Element(Element),
}

/// A parsed template.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Document {
    pub nodes: Vec<Node>,
}
