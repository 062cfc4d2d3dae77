//! The render facade.

use crate::config::StencilConfig;
use crate::registry::{ReloadReport, TemplateRegistry, TemplateSet};
use serde::Serialize;
use std::sync::Arc;
use stencil_eval::Expander;
use stencil_types::{Result, Value};

/// Variable that receives the inner page in [`Stencil::render_with_layout`]
/// when no other name is given.
pub const DEFAULT_CONTENT_VAR: &str = "content";

/// A configured template engine.
///
/// Cheap to share: every render works on a snapshot of the registry taken
/// at call start, so renders never block each other and a concurrent
/// [`reload`](Stencil::reload) never affects a render in progress.
pub struct Stencil {
    registry: TemplateRegistry,
}

impl Stencil {
    /// Build an engine over the configured directories and load them.
    pub fn new(config: StencilConfig) -> Result<Self> {
        Ok(Self {
            registry: TemplateRegistry::new(config, Vec::new())?,
        })
    }

    /// Build an engine from in-memory `(file name, source)` entries, in
    /// addition to any configured directories. Entries are registered
    /// after directory files and override them.
    pub fn from_templates<I, N, S>(entries: I, config: StencilConfig) -> Result<Self>
    where
        I: IntoIterator<Item = (N, S)>,
        N: Into<String>,
        S: Into<String>,
    {
        let embedded = entries
            .into_iter()
            .map(|(name, source)| (name.into(), source.into()))
            .collect();
        Ok(Self {
            registry: TemplateRegistry::new(config, embedded)?,
        })
    }

    pub fn config(&self) -> &StencilConfig {
        self.registry.config()
    }

    pub fn registry(&self) -> &TemplateRegistry {
        &self.registry
    }

    /// Rescan all template sources, replacing the registered set atomically.
    pub fn reload(&self) -> Result<ReloadReport> {
        self.registry.reload()
    }

    /// All registered names, sorted ascending.
    pub fn list_template_names(&self) -> Vec<String> {
        self.registry.names()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.registry.snapshot().get(name).is_some()
    }

    /// The registered source of a template, BOM removed.
    pub fn source(&self, name: &str) -> Option<String> {
        self.registry
            .snapshot()
            .get(name)
            .map(|record| record.source.clone())
    }

    /// Render template `name` with `data` as the root scope.
    pub fn render<T: Serialize + ?Sized>(&self, name: &str, data: &T) -> Result<String> {
        let data = to_value(data)?;
        let templates = self.registry.snapshot();
        self.render_value(&templates, name, &data)
    }

    /// Render `inner`, then render `layout` with the result bound to
    /// `content_var` (default `"content"`).
    ///
    /// Layouts should emit the content with `{{{ content }}}` to avoid
    /// escaping the already-rendered HTML. Both renders use the same
    /// registry snapshot.
    pub fn render_with_layout<T: Serialize + ?Sized>(
        &self,
        layout: &str,
        inner: &str,
        data: &T,
        content_var: Option<&str>,
    ) -> Result<String> {
        let data = to_value(data)?;
        let templates = self.registry.snapshot();
        let content = self.render_value(&templates, inner, &data)?;

        let mut fields = match data {
            Value::Object(fields) => fields,
            _ => Default::default(),
        };
        fields.insert(
            content_var.unwrap_or(DEFAULT_CONTENT_VAR).to_string(),
            Value::String(content),
        );
        self.render_value(&templates, layout, &Value::Object(fields))
    }

    fn render_value(&self, templates: &Arc<TemplateSet>, name: &str, data: &Value) -> Result<String> {
        Expander::new(templates.as_ref(), self.config().max_depth).render(name, data)
    }
}

fn to_value<T: Serialize + ?Sized>(data: &T) -> Result<Value> {
    Ok(Value::from(serde_json::to_value(data)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn engine(entries: &[(&str, &str)]) -> Stencil {
        Stencil::from_templates(entries.iter().copied(), StencilConfig::default()).unwrap()
    }

    #[test]
    fn test_engine_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Stencil>();
    }

    #[test]
    fn test_render_struct_data() {
        #[derive(Serialize)]
        struct Page<'a> {
            title: &'a str,
            count: u32,
        }
        let stencil = engine(&[("page.html", "{{ title }}: {{ count + 1 }}")]);
        let out = stencil
            .render("page", &Page { title: "Items", count: 2 })
            .unwrap();
        assert_eq!(out, "Items: 3");
    }

    #[test]
    fn test_layout_with_custom_content_var() {
        let stencil = engine(&[
            ("shell.html", "<main>{{{ body }}}</main>"),
            ("page.html", "<p>{{ msg }}</p>"),
        ]);
        let out = stencil
            .render_with_layout("shell", "page", &json!({ "msg": "hi" }), Some("body"))
            .unwrap();
        assert_eq!(out, "<main><p>hi</p></main>");
    }

    #[test]
    fn test_layout_with_non_object_data() {
        let stencil = engine(&[
            ("layout.html", "[{{{ content }}}]"),
            ("page.html", "{{ $root }}"),
        ]);
        let out = stencil
            .render_with_layout("layout", "page", &json!("plain"), None)
            .unwrap();
        assert_eq!(out, "[plain]");
    }

    #[test]
    fn test_contains_and_source_normalize() {
        let stencil = engine(&[("Nav.html", "\u{feff}<nav/>")]);
        assert!(stencil.contains(" NAV "));
        assert_eq!(stencil.source("nav").as_deref(), Some("<nav/>"));
        assert_eq!(stencil.source("missing"), None);
    }
}
