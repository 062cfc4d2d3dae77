//! Engine configuration.
//!
//! Fixed at construction. Every field has a default except `directories`,
//! so a JSON document only needs to name what it changes:
//!
//! ```json
//! { "directories": ["templates"], "max_depth": 20 }
//! ```

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use stencil_types::{Result, StencilError};

/// Recognized template file extensions when none are configured.
pub const DEFAULT_EXTENSIONS: &[&str] = &[".html", ".htm", ".tpl", ".tpl.html"];

/// Default recursion ceiling for a single render.
pub const DEFAULT_MAX_DEPTH: usize = 50;

/// Matches `<!-- @template name="X" -->` and `<!-- @template: X -->`.
pub const DEFAULT_NAME_DIRECTIVE: &str =
    r#"<!--\s*@template(?:\s+name\s*=\s*["'](?P<name>[^"']+)["']|\s*:\s*(?P<short>[^\s>]+?))\s*-->"#;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StencilConfig {
    /// Directories scanned recursively, in order; later registrations win.
    pub directories: Vec<PathBuf>,
    /// File name suffixes that mark a template, matched case-insensitively.
    pub extensions: Vec<String>,
    /// Replacement for [`DEFAULT_NAME_DIRECTIVE`]. The capture group `name`
    /// (or else the first group that matched) supplies the template name.
    pub name_directive_pattern: Option<String>,
    /// Lowercase names on registration and lookup.
    pub case_insensitive_names: bool,
    /// Recursion ceiling for loops, conditionals and includes.
    pub max_depth: usize,
}

impl Default for StencilConfig {
    fn default() -> Self {
        Self {
            directories: Vec::new(),
            extensions: DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
            name_directive_pattern: None,
            case_insensitive_names: true,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl StencilConfig {
    /// A default configuration scanning `directories`.
    pub fn new<I, P>(directories: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            directories: directories.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Parse a JSON configuration document.
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| StencilError::Configuration(format!("invalid configuration: {e}")))
    }

    pub fn with_directory(mut self, directory: impl Into<PathBuf>) -> Self {
        self.directories.push(directory.into());
        self
    }

    pub fn with_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extensions = extensions.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_name_directive_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.name_directive_pattern = Some(pattern.into());
        self
    }

    pub fn with_case_insensitive_names(mut self, enabled: bool) -> Self {
        self.case_insensitive_names = enabled;
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Check the configuration for a directory-backed engine.
    pub fn validate(&self) -> Result<()> {
        self.check(true)
    }

    /// Validation shared by all constructors. Embedded-only engines may
    /// have no directories.
    pub(crate) fn check(&self, require_directories: bool) -> Result<()> {
        if require_directories && self.directories.is_empty() {
            return Err(StencilError::Configuration(
                "at least one template directory is required".into(),
            ));
        }
        if self.extensions.iter().all(|e| e.is_empty()) {
            return Err(StencilError::Configuration(
                "at least one template extension is required".into(),
            ));
        }
        if self.max_depth == 0 {
            return Err(StencilError::Configuration(
                "max_depth must be greater than zero".into(),
            ));
        }
        self.name_directive()?;
        Ok(())
    }

    /// Compile the name directive pattern.
    pub(crate) fn name_directive(&self) -> Result<Regex> {
        let pattern = self
            .name_directive_pattern
            .as_deref()
            .unwrap_or(DEFAULT_NAME_DIRECTIVE);
        let regex = Regex::new(pattern).map_err(|e| {
            StencilError::Configuration(format!("invalid name directive pattern: {e}"))
        })?;
        if regex.captures_len() < 2 {
            return Err(StencilError::Configuration(
                "name directive pattern needs a capture group".into(),
            ));
        }
        Ok(regex)
    }
}
