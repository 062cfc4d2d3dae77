//! Stencil evaluator: expression semantics and directive expansion.
//!
//! Evaluates parsed expressions against layered scopes and expands a
//! template [`Document`](stencil_types::ast::Document) into HTML: loops,
//! conditionals, includes and interpolation in a single recursive pass.

mod error;
mod escape;
mod evaluator;
mod expand;
mod scope;

pub use error::{EvalError, EvalResult};
pub use escape::escape_html;
pub use evaluator::{evaluate, evaluate_boolean, evaluate_compiled, Evaluator};
pub use expand::{Expander, TemplateLookup, INDEX_BINDING, MAX_ELEMENT_NESTING, ROOT_BINDING};
pub use scope::Scope;
