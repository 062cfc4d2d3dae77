//! Template registry: name resolution, storage and atomic reload.
//!
//! Templates come from two sources, registered in this order:
//!
//! 1. Files under the configured directories, directory by directory
//! 2. Embedded `(file name, source)` entries
//!
//! A later registration under an already-used name replaces the earlier one.
//!
//! # Names
//!
//! A template's name comes from a name directive comment anywhere in its
//! source (`<!-- @template name="X" -->` or `<!-- @template: X -->`),
//! falling back to the file name without its extension. Names are trimmed
//! and, unless configured otherwise, lowercased; lookups are normalized the
//! same way.
//!
//! # Concurrency
//!
//! The registered set is immutable once built. [`TemplateRegistry::reload`]
//! builds a complete replacement off to the side and swaps it in under a
//! short write lock, so a reader holding a [`TemplateRegistry::snapshot`]
//! sees either the old set or the new one, never a mix.

use crate::config::StencilConfig;
use crate::walker::{base_name, walk_template_dir};
use parking_lot::RwLock;
use regex::Regex;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use stencil_eval::TemplateLookup;
use stencil_parser::parse_template;
use stencil_types::ast::Document;
use stencil_types::Result;
use tracing::{debug, info, warn};

const BOM: char = '\u{feff}';

/// Where a template was registered from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateOrigin {
    File(PathBuf),
    Embedded(String),
}

/// A registered template.
#[derive(Debug, Clone)]
pub struct TemplateRecord {
    /// Normalized name.
    pub name: String,
    /// Source text with any byte-order mark removed.
    pub source: String,
    pub document: Document,
    pub origin: TemplateOrigin,
    /// Hex SHA-256 of `source`.
    pub fingerprint: String,
}

/// An immutable set of registered templates.
#[derive(Debug, Clone, Default)]
pub struct TemplateSet {
    records: BTreeMap<String, TemplateRecord>,
    case_insensitive: bool,
}

impl TemplateSet {
    /// Registered names in ascending order.
    pub fn names(&self) -> Vec<String> {
        self.records.keys().cloned().collect()
    }

    /// Look up a record by name; the name is normalized first.
    pub fn get(&self, name: &str) -> Option<&TemplateRecord> {
        self.records.get(&self.normalize(name))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl TemplateLookup for TemplateSet {
    fn normalize(&self, name: &str) -> String {
        normalize_name(name, self.case_insensitive)
    }

    fn document(&self, normalized: &str) -> Option<&Document> {
        self.records.get(normalized).map(|record| &record.document)
    }
}

/// What a reload changed, by normalized name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReloadReport {
    pub added: Vec<String>,
    pub removed: Vec<String>,
    /// Present before and after, with different source text.
    pub changed: Vec<String>,
    /// Templates registered after the reload.
    pub total: usize,
}

impl ReloadReport {
    /// `true` when the reload left every template as it was.
    pub fn is_unchanged(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.changed.is_empty()
    }

    fn between(old: &TemplateSet, new: &TemplateSet) -> Self {
        let mut report = ReloadReport {
            total: new.len(),
            ..Self::default()
        };
        for (name, record) in &new.records {
            match old.records.get(name) {
                None => report.added.push(name.clone()),
                Some(previous) if previous.fingerprint != record.fingerprint => {
                    report.changed.push(name.clone())
                }
                Some(_) => {}
            }
        }
        report.removed = old
            .records
            .keys()
            .filter(|name| !new.records.contains_key(*name))
            .cloned()
            .collect();
        report
    }
}

/// Canonical form of a template name: trimmed, and lowercased when
/// `case_insensitive` is set.
pub fn normalize_name(name: &str, case_insensitive: bool) -> String {
    let trimmed = name.trim();
    if case_insensitive {
        trimmed.to_lowercase()
    } else {
        trimmed.to_string()
    }
}

/// The name declared by a name directive, if the source has one.
///
/// Uses the `name` group when the pattern defines it, otherwise the first
/// group that matched.
pub fn extract_name(directive: &Regex, source: &str) -> Option<String> {
    let captures = directive.captures(source)?;
    captures
        .name("name")
        .or_else(|| captures.iter().skip(1).flatten().find(|m| !m.as_str().is_empty()))
        .map(|m| m.as_str().to_string())
}

/// Hex SHA-256 of a template source.
pub fn fingerprint(source: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(source.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Templates from the configured directories plus embedded entries.
pub struct TemplateRegistry {
    config: StencilConfig,
    directive: Regex,
    embedded: Vec<(String, String)>,
    current: RwLock<Arc<TemplateSet>>,
}

impl TemplateRegistry {
    /// Validate `config` and perform the initial load.
    pub fn new(config: StencilConfig, embedded: Vec<(String, String)>) -> Result<Self> {
        config.check(embedded.is_empty())?;
        let directive = config.name_directive()?;
        let registry = Self {
            current: RwLock::new(Arc::new(TemplateSet {
                records: BTreeMap::new(),
                case_insensitive: config.case_insensitive_names,
            })),
            config,
            directive,
            embedded,
        };
        registry.reload()?;
        Ok(registry)
    }

    pub fn config(&self) -> &StencilConfig {
        &self.config
    }

    /// Rescan every source and atomically replace the registered set.
    ///
    /// On error the previous set stays in place.
    pub fn reload(&self) -> Result<ReloadReport> {
        let next = Arc::new(self.build()?);
        let previous = {
            let mut current = self.current.write();
            std::mem::replace(&mut *current, Arc::clone(&next))
        };
        let report = ReloadReport::between(&previous, &next);
        info!(
            total = report.total,
            added = report.added.len(),
            removed = report.removed.len(),
            changed = report.changed.len(),
            "templates reloaded"
        );
        Ok(report)
    }

    /// A consistent view of the registered set, unaffected by later reloads.
    pub fn snapshot(&self) -> Arc<TemplateSet> {
        Arc::clone(&self.current.read())
    }

    pub fn normalize(&self, name: &str) -> String {
        normalize_name(name, self.config.case_insensitive_names)
    }

    /// Registered names in ascending order.
    pub fn names(&self) -> Vec<String> {
        self.snapshot().names()
    }

    fn build(&self) -> Result<TemplateSet> {
        let mut set = TemplateSet {
            records: BTreeMap::new(),
            case_insensitive: self.config.case_insensitive_names,
        };

        for dir in &self.config.directories {
            for file in walk_template_dir(dir, &self.config.extensions)? {
                let source = decode_source(file.contents, &file.path.display().to_string());
                self.register(
                    &mut set,
                    &file.file_name,
                    source,
                    TemplateOrigin::File(file.path),
                );
            }
        }
        for (file_name, source) in &self.embedded {
            let source = strip_bom(source).to_string();
            self.register(
                &mut set,
                file_name,
                source,
                TemplateOrigin::Embedded(file_name.clone()),
            );
        }
        Ok(set)
    }

    fn register(
        &self,
        set: &mut TemplateSet,
        file_name: &str,
        source: String,
        origin: TemplateOrigin,
    ) {
        let declared = extract_name(&self.directive, &source);
        let raw_name = declared
            .as_deref()
            .unwrap_or_else(|| base_name(file_name, &self.config.extensions));
        let name = self.normalize(raw_name);
        if name.is_empty() {
            debug!(file = file_name, "skipping template with an empty name");
            return;
        }

        let record = TemplateRecord {
            name: name.clone(),
            document: parse_template(&source),
            fingerprint: fingerprint(&source),
            source,
            origin,
        };
        match set.records.insert(name.clone(), record) {
            Some(replaced) => {
                debug!(template = %name, replaced = ?replaced.origin, "template overridden")
            }
            None => debug!(template = %name, file = file_name, "template registered"),
        }
    }
}

fn strip_bom(source: &str) -> &str {
    source.strip_prefix(BOM).unwrap_or(source)
}

/// Decode file bytes as UTF-8, replacing invalid sequences.
fn decode_source(bytes: Vec<u8>, origin: &str) -> String {
    let text = match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(err) => {
            warn!(file = origin, "template is not valid UTF-8; decoding lossily");
            String::from_utf8_lossy(err.as_bytes()).into_owned()
        }
    };
    match text.strip_prefix(BOM) {
        Some(stripped) => stripped.to_string(),
        None => text,
    }
}
