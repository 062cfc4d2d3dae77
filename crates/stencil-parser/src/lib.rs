//! Stencil parser: expression tokens to AST, template markup to a document tree.

mod parse_expr;
mod parse_markup;
mod parser;

pub use parse_markup::{
    compile_expr, parse_interpolated, parse_template, DEFAULT_ALIAS, MAX_ELEMENT_DEPTH,
};
pub use parser::{ParseResult, Parser, MAX_EXPR_DEPTH};

use stencil_lexer::Lexer;
use stencil_types::ast::Expr;
use stencil_types::SyntaxError;

/// Lex and parse `source` as a single expression.
pub fn parse_expression(source: &str) -> Result<Expr, SyntaxError> {
    let tokens = Lexer::new(source).lex()?;
    Parser::new(tokens).parse()
}
