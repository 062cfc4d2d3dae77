//! Runtime error types for the expression evaluator.

use stencil_types::SyntaxError;
use thiserror::Error;

/// Evaluation error: a malformed expression or a runtime type failure.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    /// The expression never parsed.
    #[error(transparent)]
    Syntax(#[from] SyntaxError),
    /// Arithmetic or ordering on operands that have no numeric meaning.
    #[error("type mismatch: {0}")]
    TypeMismatch(String),
    /// Call syntax applied to anything; templates have no callables.
    #[error("`{0}` is not a function")]
    NotCallable(String),
}

/// Result alias for evaluator operations.
pub type EvalResult<T> = Result<T, EvalError>;
