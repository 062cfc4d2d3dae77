//! Stencil: server-side HTML templates.
//!
//! Templates are HTML files with four kinds of directive:
//!
//! - `x-for="items"` (optionally `x-row="alias"`) repeats an element per item
//! - `x-if="expr"` keeps an element only when `expr` is truthy
//! - a self-closing element named after a registered template includes it,
//!   with its attributes bound as variables
//! - `{{ expr }}` inserts HTML-escaped text and `{{{ expr }}}` raw text
//!
//! ```rust,ignore
//! use stencil::{Stencil, StencilConfig};
//!
//! let stencil = Stencil::new(StencilConfig::new(["templates"]))?;
//! let html = stencil.render("home", &serde_json::json!({ "user": "Ada" }))?;
//! ```

mod config;
mod engine;
mod registry;
mod walker;

pub use config::{StencilConfig, DEFAULT_EXTENSIONS, DEFAULT_MAX_DEPTH, DEFAULT_NAME_DIRECTIVE};
pub use engine::{Stencil, DEFAULT_CONTENT_VAR};
pub use registry::{
    extract_name, fingerprint, normalize_name, ReloadReport, TemplateOrigin, TemplateRecord,
    TemplateRegistry, TemplateSet,
};
pub use walker::{base_name, matching_extension, walk_template_dir, TemplateFile};

pub use stencil_eval::{escape_html, evaluate, evaluate_boolean, Scope, TemplateLookup};
pub use stencil_types::{Result, StencilError, SyntaxError, Value};
