//! End-to-end rendering tests over on-disk template directories.

use serde_json::json;
use std::fs;
use std::path::Path;
use stencil::{Stencil, StencilConfig, StencilError};
use tempfile::TempDir;

// ─────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────

fn write(dir: &Path, relative: &str, contents: &str) {
    let path = dir.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, contents).unwrap();
}

fn engine_with(files: &[(&str, &str)]) -> (TempDir, Stencil) {
    let dir = TempDir::new().unwrap();
    for (name, contents) in files {
        write(dir.path(), name, contents);
    }
    let stencil = Stencil::new(StencilConfig::new([dir.path()])).unwrap();
    (dir, stencil)
}

// ═══════════════════════════════════════════════════════════════════════
// Registration
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn test_names_sorted_and_unique() {
    let (_dir, stencil) = engine_with(&[
        ("zeta.html", "z"),
        ("Alpha.htm", "a"),
        ("nested/deep/mid.tpl", "m"),
        ("dup.html", "1"),
        ("other/dup.html", "2"),
        ("readme.md", "ignored"),
    ]);
    assert_eq!(stencil.list_template_names(), ["alpha", "dup", "mid", "zeta"]);
}

#[test]
fn test_file_without_directive_uses_lowercased_base_name() {
    let (_dir, stencil) = engine_with(&[("UserCard.html", "<b>{{ n }}</b>")]);
    assert_eq!(
        stencil.render("usercard", &json!({ "n": 1 })).unwrap(),
        "<b>1</b>"
    );
    assert_eq!(stencil.render("UserCard", &json!({ "n": 2 })).unwrap(), "<b>2</b>");
}

#[test]
fn test_name_directive_overrides_file_name() {
    let (_dir, stencil) = engine_with(&[(
        "partials/x.html",
        "<!-- @template name=\"SiteHeader\" --><header/>",
    )]);
    assert_eq!(stencil.list_template_names(), ["siteheader"]);
    // The directive comment stays in the output.
    assert_eq!(
        stencil.render("siteheader", &json!({})).unwrap(),
        "<!-- @template name=\"SiteHeader\" --><header/>"
    );
}

#[test]
fn test_case_sensitive_names() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "Card.html", "c");
    let config = StencilConfig::new([dir.path()]).with_case_insensitive_names(false);
    let stencil = Stencil::new(config).unwrap();
    assert!(stencil.contains("Card"));
    assert!(!stencil.contains("card"));
}

#[test]
fn test_later_directory_overrides_earlier() {
    let first = TempDir::new().unwrap();
    let second = TempDir::new().unwrap();
    write(first.path(), "page.html", "first");
    write(second.path(), "page.html", "second");
    let config = StencilConfig::new([first.path(), second.path()]);
    let stencil = Stencil::new(config).unwrap();
    assert_eq!(stencil.render("page", &json!({})).unwrap(), "second");
}

#[test]
fn test_missing_directory_is_skipped() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "a.html", "a");
    let config = StencilConfig::new([dir.path().join("absent"), dir.path().to_path_buf()]);
    let stencil = Stencil::new(config).unwrap();
    assert_eq!(stencil.list_template_names(), ["a"]);
}

#[test]
fn test_bom_is_stripped() {
    let (_dir, stencil) = engine_with(&[("b.html", "\u{feff}<p>x</p>")]);
    assert_eq!(stencil.render("b", &json!({})).unwrap(), "<p>x</p>");
}

#[test]
fn test_embedded_entries_override_files() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "page.html", "from disk");
    write(dir.path(), "other.html", "other");
    let stencil = Stencil::from_templates(
        [("page.html", "embedded"), ("extra.tpl.html", "x")],
        StencilConfig::new([dir.path()]),
    )
    .unwrap();
    assert_eq!(stencil.render("page", &json!({})).unwrap(), "embedded");
    assert_eq!(stencil.list_template_names(), ["extra", "other", "page"]);
}

// ═══════════════════════════════════════════════════════════════════════
// Rendering
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn test_unregistered_name() {
    let (_dir, stencil) = engine_with(&[("a.html", "a")]);
    match stencil.render("Missing", &json!({})) {
        Err(StencilError::TemplateNotFound { name }) => assert_eq!(name, "Missing"),
        other => panic!("expected not found, got {other:?}"),
    }
}

#[test]
fn test_layout() {
    let (_dir, stencil) = engine_with(&[
        ("layout.html", "<h1>{{ title }}</h1>{{{ content }}}"),
        ("page.html", "<p>Hi</p>"),
    ]);
    let out = stencil
        .render_with_layout("layout", "page", &json!({ "title": "T" }), None)
        .unwrap();
    assert_eq!(out, "<h1>T</h1><p>Hi</p>");
}

#[test]
fn test_full_page() {
    let (_dir, stencil) = engine_with(&[
        (
            "home.html",
            concat!(
                "<ul>",
                "<li x-for=\"users\" x-row=\"u\"><user-row user=\"{{ u }}\" pos=\"{{ $index }}\"/></li>",
                "</ul>",
                "<p x-if=\"users.length == 0\">none</p>",
            ),
        ),
        (
            "user-row.html",
            "{{ pos + 1 }}. {{ user.name }}<em x-if=\"user.admin\"> (admin)</em>",
        ),
    ]);
    let out = stencil
        .render(
            "home",
            &json!({ "users": [
                { "name": "Ada", "admin": true },
                { "name": "Bob & Co" }
            ]}),
        )
        .unwrap();
    assert_eq!(
        out,
        "<ul><li>1. Ada<em> (admin)</em></li><li>2. Bob &amp; Co</li></ul>"
    );
}

#[test]
fn test_self_include_is_cyclic() {
    let (_dir, stencil) = engine_with(&[("a.html", "x<a/>")]);
    match stencil.render("a", &json!({})) {
        Err(StencilError::CyclicInclude { chain }) => assert_eq!(chain, ["a", "a"]),
        other => panic!("expected cycle, got {other:?}"),
    }
}

#[test]
fn test_include_chain_depth_boundary() {
    let entries = |levels: usize| {
        (0..levels)
            .map(|i| (format!("t{i}.html"), format!("<t{}/>", i + 1)))
            .chain(std::iter::once((format!("t{levels}.html"), "leaf".to_string())))
            .collect::<Vec<_>>()
    };

    let ok = Stencil::from_templates(entries(50), StencilConfig::default()).unwrap();
    assert_eq!(ok.render("t0", &json!({})).unwrap(), "leaf");

    let deep = Stencil::from_templates(entries(51), StencilConfig::default()).unwrap();
    assert!(matches!(
        deep.render("t0", &json!({})),
        Err(StencilError::RenderDepthExceeded { limit: 50 })
    ));
}

#[test]
fn test_expression_errors_name_the_text() {
    let (_dir, stencil) = engine_with(&[("e.html", "<p>{{ nope }}</p>{{ )( }}")]);
    match stencil.render("e", &json!({})) {
        Err(StencilError::Expression { expression, .. }) => assert_eq!(expression, ")("),
        other => panic!("expected expression error, got {other:?}"),
    }
}

#[test]
fn test_long_operator_chain_is_an_expression_error() {
    let chain = vec!["1"; 1000].join("+");
    let stencil = Stencil::from_templates(
        [("p.html", format!("<p>{{{{ {chain} }}}}</p>"))],
        StencilConfig::default(),
    )
    .unwrap();
    match stencil.render("p", &json!({})) {
        Err(StencilError::Expression { expression, cause }) => {
            assert_eq!(expression, chain);
            assert!(cause.contains("nesting depth"), "cause was {cause}");
        }
        other => panic!("expected expression error, got {other:?}"),
    }
}

#[test]
fn test_invalid_utf8_is_decoded_lossily() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("bin.html"), [b'o', b'k', 0xfe]).unwrap();
    let stencil = Stencil::new(StencilConfig::new([dir.path()])).unwrap();
    assert_eq!(stencil.render("bin", &json!({})).unwrap(), "ok\u{fffd}");
}

// ═══════════════════════════════════════════════════════════════════════
// Configuration
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn test_configuration_errors() {
    let no_dirs = Stencil::new(StencilConfig::default());
    assert!(matches!(no_dirs, Err(StencilError::Configuration(_))));

    let bad_pattern = Stencil::new(StencilConfig::new(["x"]).with_name_directive_pattern("(["));
    assert!(matches!(bad_pattern, Err(StencilError::Configuration(_))));

    let zero_depth = Stencil::new(StencilConfig::new(["x"]).with_max_depth(0));
    assert!(matches!(zero_depth, Err(StencilError::Configuration(_))));
}

#[test]
fn test_custom_directive_and_extensions() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "a.view", "{# id: Main #}body");
    write(dir.path(), "b.html", "ignored");
    let config = StencilConfig::new([dir.path()])
        .with_extensions([".view"])
        .with_name_directive_pattern(r"\{#\s*id:\s*(?P<name>\w+)\s*#\}");
    let stencil = Stencil::new(config).unwrap();
    assert_eq!(stencil.list_template_names(), ["main"]);
}
