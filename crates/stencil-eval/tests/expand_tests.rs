//! Directive expansion tests.
//!
//! Covers: interpolation and escaping, loops, conditionals, includes,
//! cycle and depth detection, and untouched markup.

use serde_json::json;
use std::collections::BTreeMap;
use stencil_eval::{Expander, TemplateLookup, MAX_ELEMENT_NESTING};
use stencil_parser::parse_template;
use stencil_types::ast::Document;
use stencil_types::{StencilError, Value};

// ─────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────

/// In-memory templates keyed by lowercase name.
#[derive(Default)]
struct Templates {
    documents: BTreeMap<String, Document>,
}

impl Templates {
    fn with(mut self, name: &str, source: &str) -> Self {
        self.documents
            .insert(name.to_ascii_lowercase(), parse_template(source));
        self
    }
}

impl TemplateLookup for Templates {
    fn normalize(&self, name: &str) -> String {
        name.to_ascii_lowercase()
    }

    fn document(&self, normalized: &str) -> Option<&Document> {
        self.documents.get(normalized)
    }
}

fn render(templates: &Templates, name: &str, data: serde_json::Value) -> Result<String, StencilError> {
    Expander::new(templates, 50).render(name, &Value::from(data))
}

fn render_one(source: &str, data: serde_json::Value) -> String {
    let templates = Templates::default().with("page", source);
    render(&templates, "page", data).unwrap_or_else(|e| panic!("render failed: {e}"))
}

// ═══════════════════════════════════════════════════════════════════════
// Interpolation
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn test_escaped_and_raw_interpolation() {
    let data = json!({ "v": "<b>" });
    assert_eq!(render_one("{{ v }}", data.clone()), "&lt;b&gt;");
    assert_eq!(render_one("{{{ v }}}", data), "<b>");
}

#[test]
fn test_missing_values_render_empty() {
    assert_eq!(render_one("[{{ nope }}][{{{ nothing }}}]", json!({ "nothing": null })), "[][]");
}

#[test]
fn test_interpolation_output_is_final() {
    let out = render_one("{{{ v }}}", json!({ "v": "{{ secret }}", "secret": "x" }));
    assert_eq!(out, "{{ secret }}");
}

#[test]
fn test_root_binding() {
    assert_eq!(render_one("{{ $root.a }}", json!({ "a": 1 })), "1");
}

#[test]
fn test_markup_without_directives_is_untouched() {
    let source = "<!DOCTYPE html><html><body><p class=\"x\">Hi & bye</p><br></body></html>";
    assert_eq!(render_one(source, json!({})), source);
}

#[test]
fn test_attribute_interpolation() {
    assert_eq!(
        render_one(r#"<a href="/u/{{ id }}">x</a>"#, json!({ "id": 7 })),
        r#"<a href="/u/7">x</a>"#
    );
}

// ═══════════════════════════════════════════════════════════════════════
// Loops & conditionals
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn test_loop_preserves_order() {
    let out = render_one(
        r#"<li x-for="items">{{ item.n }}</li>"#,
        json!({ "items": [{ "n": 1 }, { "n": 2 }, { "n": 3 }] }),
    );
    assert_eq!(out, "<li>1</li><li>2</li><li>3</li>");
}

#[test]
fn test_loop_alias_and_index() {
    let out = render_one(
        r#"<i x-for="names" x-row="n" data-i="{{ $index }}">{{ n }}</i>"#,
        json!({ "names": ["a", "b"] }),
    );
    assert_eq!(out, r#"<i data-i="0">a</i><i data-i="1">b</i>"#);
}

#[test]
fn test_loop_over_non_array_removes_element() {
    let out = render_one(r#"<p>a</p><li x-for="items">x</li><p>b</p>"#, json!({ "items": "nope" }));
    assert_eq!(out, "<p>a</p><p>b</p>");
}

#[test]
fn test_conditional() {
    let source = r#"<b x-if="show">yes</b>"#;
    assert_eq!(render_one(source, json!({ "show": true })), "<b>yes</b>");
    assert_eq!(render_one(source, json!({ "show": 0 })), "");
}

#[test]
fn test_conditional_inside_loop_uses_iteration_scope() {
    let out = render_one(
        r#"<i x-for="xs" x-if="item > 1">{{ item }}</i>"#,
        json!({ "xs": [1, 2, 3] }),
    );
    assert_eq!(out, "<i>2</i><i>3</i>");
}

#[test]
fn test_nested_loops() {
    let out = render_one(
        r#"<ul x-for="rows" x-row="row"><li x-for="row" x-row="cell">{{ cell }}</li></ul>"#,
        json!({ "rows": [[1, 2], [3]] }),
    );
    assert_eq!(out, "<ul><li>1</li><li>2</li></ul><ul><li>3</li></ul>");
}

#[test]
fn test_loop_over_element_containing_same_tag() {
    let out = render_one(
        r#"<div x-for="xs"><div>{{ item }}</div></div>"#,
        json!({ "xs": [1, 2] }),
    );
    assert_eq!(out, "<div><div>1</div></div><div><div>2</div></div>");
}

#[test]
fn test_conditional_containing_same_tag_conditional() {
    let source = r#"<div x-if="a"><div x-if="b">in</div>tail</div>"#;
    assert_eq!(render_one(source, json!({ "a": true, "b": false })), "<div>tail</div>");
    assert_eq!(
        render_one(source, json!({ "a": true, "b": true })),
        "<div><div>in</div>tail</div>"
    );
    assert_eq!(render_one(source, json!({ "a": false, "b": true })), "");
}

// ═══════════════════════════════════════════════════════════════════════
// Includes
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn test_include_with_attributes() {
    let templates = Templates::default()
        .with("page", r#"<main><Card title="Hi {{ who }}" user="{{ u }}" compact/></main>"#)
        .with("card", r#"<h2>{{ title }}</h2><p>{{ user.name }}</p><i x-if="compact">c</i>"#);
    let out = render(&templates, "page", json!({ "who": "<you>", "u": { "name": "Ada" } })).unwrap();
    // Mixed attribute text is bound unescaped, then escaped on output.
    assert_eq!(out, "<main><h2>Hi &lt;you&gt;</h2><p>Ada</p><i>c</i></main>");
}

#[test]
fn test_include_inherits_scope() {
    let templates = Templates::default()
        .with("page", r#"<footer/>"#)
        .with("footer", "{{ site }}");
    assert_eq!(render(&templates, "page", json!({ "site": "S" })).unwrap(), "S");
}

#[test]
fn test_include_per_loop_iteration() {
    let templates = Templates::default()
        .with("page", r#"<row x-for="xs" v="{{ item }}"/>"#)
        .with("row", "[{{ v }}]");
    assert_eq!(render(&templates, "page", json!({ "xs": [1, 2] })).unwrap(), "[1][2]");
}

#[test]
fn test_unregistered_self_closing_element_untouched() {
    assert_eq!(render_one(r#"<widget a="1"/>"#, json!({})), r#"<widget a="1"/>"#);
}

#[test]
fn test_cyclic_include() {
    let templates = Templates::default()
        .with("a", "<b/>")
        .with("b", "<a/>");
    match render(&templates, "a", json!({})) {
        Err(StencilError::CyclicInclude { chain }) => assert_eq!(chain, ["b", "a", "b"]),
        other => panic!("expected cyclic include, got {other:?}"),
    }
}

#[test]
fn test_depth_limit() {
    let mut templates = Templates::default();
    for i in 0..60 {
        templates = templates.with(&format!("t{i}"), &format!("<t{}/>", i + 1));
    }
    templates = templates.with("t60", "end");

    let ok = Expander::new(&templates, 60).render("t0", &Value::Null).unwrap();
    assert_eq!(ok, "end");
    match Expander::new(&templates, 59).render("t0", &Value::Null) {
        Err(StencilError::RenderDepthExceeded { limit }) => assert_eq!(limit, 59),
        other => panic!("expected depth error, got {other:?}"),
    }
}

#[test]
fn test_deep_plain_markup_renders_unchanged() {
    let source = format!("{}x{}", "<b>".repeat(1000), "</b>".repeat(1000));
    assert_eq!(render_one(&source, json!({})), source);
}

#[test]
fn test_element_nesting_across_includes_is_bounded() {
    let wrapped = |next: &str| format!("{}<{next}/>{}", "<div>".repeat(60), "</div>".repeat(60));

    let two = Templates::default()
        .with("l0", &wrapped("l1"))
        .with("l1", &wrapped("l2"))
        .with("l2", "end");
    let out = render(&two, "l0", json!({})).unwrap();
    assert!(out.contains("end"));

    let three = Templates::default()
        .with("l0", &wrapped("l1"))
        .with("l1", &wrapped("l2"))
        .with("l2", &wrapped("l3"))
        .with("l3", "end");
    match render(&three, "l0", json!({})) {
        Err(StencilError::RenderDepthExceeded { limit }) => assert_eq!(limit, MAX_ELEMENT_NESTING),
        other => panic!("expected nesting error, got {other:?}"),
    }
}

#[test]
fn test_missing_template() {
    let templates = Templates::default();
    assert!(matches!(
        render(&templates, "Nope", json!({})),
        Err(StencilError::TemplateNotFound { name }) if name == "Nope"
    ));
}

#[test]
fn test_error_in_unreached_branch_is_silent() {
    assert_eq!(render_one(r#"<b x-if="false">{{ )( }}</b>"#, json!({})), "");
}
