//! Expression parsing with full operator precedence.
//!
//! Precedence (lowest → highest):
//! 9. `? :` (conditional, right-associative)
//! 8. `??` (nullish coalescing)
//! 7. `||`
//! 6. `&&`
//! 5. `==`, `!=`, `===`, `!==`
//! 4. `<`, `>`, `<=`, `>=`
//! 3. `+`, `-`
//! 2. `*`, `/`, `%`
//! 1. unary `!`, `-`, `+`
//! 0. `.` (member), `[]` (index), `()` (call)

use stencil_lexer::token::TokenKind;
use stencil_types::ast::*;

use crate::parser::{ParseResult, Parser};

impl Parser {
    // ══════════════════════════════════════════════════════════════════════════
    // Entry Point
    // ══════════════════════════════════════════════════════════════════════════

    /// Parse an expression.
    pub(crate) fn parse_expression(&mut self) -> ParseResult<Expr> {
        self.enter()?;
        let result = self.parse_conditional();
        self.leave();
        result
    }

    // ══════════════════════════════════════════════════════════════════════════
    // Precedence Chain
    // ══════════════════════════════════════════════════════════════════════════

    /// `Conditional = Coalesce [ "?" Expression ":" Expression ]`
    fn parse_conditional(&mut self) -> ParseResult<Expr> {
        let test = self.parse_coalesce()?;
        if !self.eat(&TokenKind::Question) {
            return Ok(test);
        }
        let consequent = self.parse_expression()?;
        self.expect(&TokenKind::Colon)?;
        let alternate = self.parse_expression()?;
        let span = test.span.merge(alternate.span);
        Ok(Expr::new(
            ExprKind::Conditional {
                test: Box::new(test),
                consequent: Box::new(consequent),
                alternate: Box::new(alternate),
            },
            span,
        ))
    }

    /// `Coalesce = Or { "??" Or }`
    fn parse_coalesce(&mut self) -> ParseResult<Expr> {
        self.fold_binary(Self::parse_or, |kind| match kind {
            TokenKind::QuestionQuestion => Some(BinOp::Coalesce),
            _ => None,
        })
    }

    /// `Or = And { "||" And }`
    fn parse_or(&mut self) -> ParseResult<Expr> {
        self.fold_binary(Self::parse_and, |kind| match kind {
            TokenKind::PipePipe => Some(BinOp::Or),
            _ => None,
        })
    }

    /// `And = Equality { "&&" Equality }`
    fn parse_and(&mut self) -> ParseResult<Expr> {
        self.fold_binary(Self::parse_equality, |kind| match kind {
            TokenKind::AmpAmp => Some(BinOp::And),
            _ => None,
        })
    }

    /// `Equality = Relational { EqOp Relational }`
    fn parse_equality(&mut self) -> ParseResult<Expr> {
        self.fold_binary(Self::parse_relational, |kind| match kind {
            TokenKind::EqEq => Some(BinOp::Eq),
            TokenKind::BangEq => Some(BinOp::NotEq),
            TokenKind::EqEqEq => Some(BinOp::StrictEq),
            TokenKind::BangEqEq => Some(BinOp::StrictNotEq),
            _ => None,
        })
    }

    /// `Relational = Add { RelOp Add }`
    fn parse_relational(&mut self) -> ParseResult<Expr> {
        self.fold_binary(Self::parse_add, |kind| match kind {
            TokenKind::Less => Some(BinOp::Less),
            TokenKind::Greater => Some(BinOp::Greater),
            TokenKind::LessEq => Some(BinOp::LessEq),
            TokenKind::GreaterEq => Some(BinOp::GreaterEq),
            _ => None,
        })
    }

    /// `Add = Mul { ("+" | "-") Mul }`
    fn parse_add(&mut self) -> ParseResult<Expr> {
        self.fold_binary(Self::parse_mul, |kind| match kind {
            TokenKind::Plus => Some(BinOp::Add),
            TokenKind::Minus => Some(BinOp::Sub),
            _ => None,
        })
    }

    /// `Mul = Unary { ("*" | "/" | "%") Unary }`
    fn parse_mul(&mut self) -> ParseResult<Expr> {
        self.fold_binary(Self::parse_unary, |kind| match kind {
            TokenKind::Star => Some(BinOp::Mul),
            TokenKind::Slash => Some(BinOp::Div),
            TokenKind::Percent => Some(BinOp::Mod),
            _ => None,
        })
    }

    /// Left-associative `Operand { Op Operand }`.
    ///
    /// Every folded operand deepens the tree by one level and counts toward
    /// the nesting limit.
    fn fold_binary(
        &mut self,
        operand: fn(&mut Self) -> ParseResult<Expr>,
        operator: fn(&TokenKind) -> Option<BinOp>,
    ) -> ParseResult<Expr> {
        let mut left = operand(self)?;
        let mut folded = 0;
        let result = loop {
            let Some(op) = operator(self.peek_kind()) else {
                break Ok(left);
            };
            self.advance();
            if let Err(err) = self.enter() {
                break Err(err);
            }
            folded += 1;
            match operand(self) {
                Ok(right) => left = binary(left, op, right),
                Err(err) => break Err(err),
            }
        };
        for _ in 0..folded {
            self.leave();
        }
        result
    }

    /// `Unary = ( "!" | "-" | "+" ) Unary | Postfix`
    fn parse_unary(&mut self) -> ParseResult<Expr> {
        let start = self.current_span();
        let op = match self.peek_kind() {
            TokenKind::Bang => UnaryOp::Not,
            TokenKind::Minus => UnaryOp::Neg,
            TokenKind::Plus => UnaryOp::Plus,
            _ => return self.parse_postfix(),
        };
        self.advance();
        self.enter()?;
        let operand = self.parse_unary();
        self.leave();
        let operand = operand?;
        let span = start.merge(operand.span);
        Ok(Expr::new(
            ExprKind::Unary {
                op,
                operand: Box::new(operand),
            },
            span,
        ))
    }

    /// `Postfix = Primary { "." Name | "[" Expression "]" | "(" Args ")" }`
    ///
    /// Each postfix operator nests the expression one level deeper.
    fn parse_postfix(&mut self) -> ParseResult<Expr> {
        let expr = self.parse_primary()?;
        let mut folded = 0;
        let result = self.parse_postfix_chain(expr, &mut folded);
        for _ in 0..folded {
            self.leave();
        }
        result
    }

    fn parse_postfix_chain(&mut self, mut expr: Expr, folded: &mut usize) -> ParseResult<Expr> {
        loop {
            if !matches!(
                self.peek_kind(),
                TokenKind::Dot | TokenKind::LBracket | TokenKind::LParen
            ) {
                return Ok(expr);
            }
            self.enter()?;
            *folded += 1;
            match self.advance().kind {
                TokenKind::Dot => {
                    let property = self.expect_property_name()?;
                    let span = expr.span.merge(property.span);
                    expr = Expr::new(
                        ExprKind::Member {
                            object: Box::new(expr),
                            property,
                        },
                        span,
                    );
                }
                TokenKind::LBracket => {
                    let index = self.parse_expression()?;
                    self.expect(&TokenKind::RBracket)?;
                    let span = expr.span.merge(self.previous_span());
                    expr = Expr::new(
                        ExprKind::Index {
                            object: Box::new(expr),
                            index: Box::new(index),
                        },
                        span,
                    );
                }
                _ => {
                    let args = self.parse_list(&TokenKind::RParen)?;
                    let span = expr.span.merge(self.previous_span());
                    expr = Expr::new(
                        ExprKind::Call {
                            callee: Box::new(expr),
                            args,
                        },
                        span,
                    );
                }
            }
        }
    }

    /// A property name after `.`: identifiers and keyword literals alike.
    fn expect_property_name(&mut self) -> ParseResult<Ident> {
        let kind = self.peek_kind().clone();
        match kind {
            TokenKind::Identifier(name) => {
                let span = self.advance().span;
                Ok(Ident::new(name, span))
            }
            TokenKind::True | TokenKind::False | TokenKind::Null | TokenKind::Undefined => {
                let span = self.advance().span;
                Ok(Ident::new(kind.to_string(), span))
            }
            _ => Err(self.error_at_current(format!(
                "expected property name, got '{}'",
                self.peek_kind()
            ))),
        }
    }

    /// Comma-separated expressions up to and including `close`.
    /// A trailing comma is allowed.
    fn parse_list(&mut self, close: &TokenKind) -> ParseResult<Vec<Expr>> {
        let mut items = Vec::new();
        while !self.check_exact(close) {
            items.push(self.parse_expression()?);
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        self.expect(close)?;
        Ok(items)
    }

    // ══════════════════════════════════════════════════════════════════════════
    // Primary Expressions
    // ══════════════════════════════════════════════════════════════════════════

    /// Parse a primary expression.
    fn parse_primary(&mut self) -> ParseResult<Expr> {
        let start = self.current_span();
        let kind = match self.peek_kind().clone() {
            // ── Literals ────────────────────────────────────────────────
            TokenKind::NumberLit(n) => ExprKind::NumberLit(n),
            TokenKind::StringLiteral(s) => ExprKind::StringLit(s),
            TokenKind::True => ExprKind::BoolLit(true),
            TokenKind::False => ExprKind::BoolLit(false),
            TokenKind::Null => ExprKind::NullLit,
            TokenKind::Undefined => ExprKind::UndefinedLit,
            TokenKind::Identifier(name) => ExprKind::Identifier(name),

            // ── Grouping & collections ──────────────────────────────────
            TokenKind::LParen => {
                self.advance();
                let inner = self.parse_expression()?;
                self.expect(&TokenKind::RParen)?;
                let span = start.merge(self.previous_span());
                return Ok(Expr::new(ExprKind::Paren(Box::new(inner)), span));
            }
            TokenKind::LBracket => {
                self.advance();
                let items = self.parse_list(&TokenKind::RBracket)?;
                let span = start.merge(self.previous_span());
                return Ok(Expr::new(ExprKind::ArrayLit(items), span));
            }

            other => {
                return Err(self.error_at_current(format!("expected expression, got '{other}'")));
            }
        };
        self.advance();
        Ok(Expr::new(kind, start))
    }
}

fn binary(left: Expr, op: BinOp, right: Expr) -> Expr {
    let span = left.span.merge(right.span);
    Expr::new(
        ExprKind::Binary {
            left: Box::new(left),
            op,
            right: Box::new(right),
        },
        span,
    )
}
