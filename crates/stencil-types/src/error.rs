use crate::Span;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// A malformed expression, reported by the lexer or parser.
///
/// Line/column positions are relative to the expression text, not the
/// enclosing template.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{message} at {span}")]
pub struct SyntaxError {
    /// Human-readable error message.
    pub message: String,
    /// Location inside the expression.
    pub span: Span,
}

impl SyntaxError {
    pub fn new(message: impl Into<String>, span: Span) -> Self {
        Self {
            message: message.into(),
            span,
        }
    }
}

/// Every failure surfaced by loading, configuring or rendering templates.
///
/// All kinds are fatal to the current call; the two soft-degrade policies
/// (non-array loop sources and empty interpolations) never produce one.
#[derive(Debug, Error)]
pub enum StencilError {
    /// Invalid construction-time configuration.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Render or include target absent from the registry.
    #[error("template not found: \"{name}\"")]
    TemplateNotFound {
        /// The name as the caller requested it, before normalization.
        name: String,
    },

    /// Include target already present on the active render stack.
    #[error("cyclic include: {}", chain.join(" -> "))]
    CyclicInclude {
        /// The active include chain, ending with the repeated name.
        chain: Vec<String>,
    },

    /// The recursion ceiling was reached.
    #[error("render depth exceeded: limit is {limit}")]
    RenderDepthExceeded { limit: usize },

    /// Malformed or runtime-failing expression.
    #[error("failed to evaluate expression `{expression}`: {cause}")]
    Expression {
        /// The offending expression text.
        expression: String,
        /// The underlying syntax or runtime failure.
        cause: String,
    },

    /// A template file could not be read.
    #[error("failed to read template {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Caller-supplied data could not be converted into a value.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StencilError {
    /// Build an [`StencilError::Expression`] from the expression text and any cause.
    pub fn expression(expression: impl Into<String>, cause: impl std::fmt::Display) -> Self {
        Self::Expression {
            expression: expression.into(),
            cause: cause.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_syntax_error_display() {
        let err = SyntaxError::new("unexpected token ')'", Span::point(1, 1));
        assert_eq!(err.to_string(), "unexpected token ')' at 1:1");
    }

    #[test]
    fn test_template_not_found_display() {
        let err = StencilError::TemplateNotFound {
            name: "UserCard".to_string(),
        };
        assert!(err.to_string().contains("template not found"));
        assert!(err.to_string().contains("UserCard"));
    }

    #[test]
    fn test_cyclic_include_names_chain() {
        let err = StencilError::CyclicInclude {
            chain: vec!["a".into(), "b".into(), "a".into()],
        };
        assert_eq!(err.to_string(), "cyclic include: a -> b -> a");
    }

    #[test]
    fn test_expression_error_names_expression() {
        let cause = SyntaxError::new("unexpected token ')'", Span::point(1, 1));
        let err = StencilError::expression(")(", &cause);
        assert_eq!(
            err.to_string(),
            "failed to evaluate expression `)(`: unexpected token ')' at 1:1"
        );
    }

    #[test]
    fn test_io_error_has_source() {
        use std::error::Error as _;
        let err = StencilError::Io {
            path: PathBuf::from("/tmp/missing.html"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        };
        assert!(err.source().is_some());
        assert!(err.to_string().contains("/tmp/missing.html"));
    }

    #[test]
    fn test_syntax_error_json_serialization() {
        let err = SyntaxError::new("expected expression", Span::new(1, 3, 1, 4));
        let json = serde_json::to_string(&err).unwrap();
        assert!(json.contains("\"message\""));
        let back: SyntaxError = serde_json::from_str(&json).unwrap();
        assert_eq!(back, err);
    }
}
