//! Recursive template discovery.

use std::fs;
use std::path::{Path, PathBuf};
use stencil_types::{Result, StencilError};
use tracing::debug;
use walkdir::WalkDir;

/// A template file found on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateFile {
    pub path: PathBuf,
    pub file_name: String,
    /// Raw file contents; decoding happens at registration.
    pub contents: Vec<u8>,
}

/// Collect every file under `root` whose name ends with one of `extensions`.
///
/// Entries are visited in file-name order at every level so registration
/// order is stable across platforms. A missing root yields nothing.
pub fn walk_template_dir(root: &Path, extensions: &[String]) -> Result<Vec<TemplateFile>> {
    if !root.is_dir() {
        debug!(dir = %root.display(), "skipping missing template directory");
        return Ok(Vec::new());
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
    {
        if !entry.file_type().is_file() {
            continue;
        }
        let file_name = entry.file_name().to_string_lossy().into_owned();
        if matching_extension(&file_name, extensions).is_none() {
            continue;
        }
        let path = entry.into_path();
        let contents = fs::read(&path).map_err(|source| StencilError::Io {
            path: path.clone(),
            source,
        })?;
        files.push(TemplateFile {
            path,
            file_name,
            contents,
        });
    }
    Ok(files)
}

/// The longest configured extension that `file_name` ends with,
/// compared ASCII case-insensitively.
pub fn matching_extension<'e>(file_name: &str, extensions: &'e [String]) -> Option<&'e str> {
    extensions
        .iter()
        .map(String::as_str)
        .filter(|ext| !ext.is_empty() && ends_with_ignore_case(file_name, ext))
        .max_by_key(|ext| ext.len())
}

/// `file_name` without its matched extension, or unchanged when none matches.
pub fn base_name<'a>(file_name: &'a str, extensions: &[String]) -> &'a str {
    match matching_extension(file_name, extensions) {
        Some(ext) => &file_name[..file_name.len() - ext.len()],
        None => file_name,
    }
}

fn ends_with_ignore_case(text: &str, suffix: &str) -> bool {
    text.len() >= suffix.len()
        && text.is_char_boundary(text.len() - suffix.len())
        && text.as_bytes()[text.len() - suffix.len()..].eq_ignore_ascii_case(suffix.as_bytes())
}
