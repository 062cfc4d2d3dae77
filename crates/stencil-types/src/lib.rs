//! Shared types for the Stencil template engine.
//!
//! This crate defines the expression and markup AST, source spans, the
//! runtime [`Value`] model and the error types used across all stages.

mod error;
mod span;
mod value;
pub mod ast;

pub use error::{StencilError, SyntaxError};
pub use span::Span;
pub use value::{format_number, Value};

/// Result type used throughout Stencil.
pub type Result<T> = std::result::Result<T, StencilError>;
