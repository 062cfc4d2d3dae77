//! Reload and concurrency tests.

use serde_json::json;
use std::fs;
use std::thread;
use stencil::{ReloadReport, Stencil, StencilConfig};
use tempfile::TempDir;

fn engine(dir: &TempDir) -> Stencil {
    Stencil::new(StencilConfig::new([dir.path()])).unwrap()
}

#[test]
fn test_reload_picks_up_changes() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("keep.html"), "same").unwrap();
    fs::write(dir.path().join("edit.html"), "v1").unwrap();
    fs::write(dir.path().join("drop.html"), "gone soon").unwrap();
    let stencil = engine(&dir);

    fs::write(dir.path().join("edit.html"), "v2").unwrap();
    fs::remove_file(dir.path().join("drop.html")).unwrap();
    fs::write(dir.path().join("new.html"), "fresh").unwrap();

    let report = stencil.reload().unwrap();
    assert_eq!(
        report,
        ReloadReport {
            added: vec!["new".into()],
            removed: vec!["drop".into()],
            changed: vec!["edit".into()],
            total: 3,
        }
    );
    assert_eq!(stencil.render("edit", &json!({})).unwrap(), "v2");
    assert!(!stencil.contains("drop"));
}

#[test]
fn test_reload_without_changes() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("a.html"), "a").unwrap();
    let stencil = engine(&dir);
    let report = stencil.reload().unwrap();
    assert!(report.is_unchanged());
    assert_eq!(report.total, 1);
}

#[test]
fn test_snapshot_is_isolated_from_reload() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("a.html"), "old").unwrap();
    let stencil = engine(&dir);

    let before = stencil.registry().snapshot();
    fs::write(dir.path().join("a.html"), "new").unwrap();
    stencil.reload().unwrap();

    assert_eq!(before.get("a").map(|r| r.source.as_str()), Some("old"));
    assert_eq!(stencil.source("a").as_deref(), Some("new"));
}

#[test]
fn test_embedded_entries_survive_reload() {
    let stencil =
        Stencil::from_templates([("inline.html", "inline")], StencilConfig::default()).unwrap();
    assert!(stencil.reload().unwrap().is_unchanged());
    assert_eq!(stencil.render("inline", &json!({})).unwrap(), "inline");
}

#[test]
fn test_concurrent_renders_during_reload() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("page.html"), "<i x-for=\"xs\">{{ item }}</i>").unwrap();
    let stencil = engine(&dir);
    let data = json!({ "xs": [1, 2, 3] });

    thread::scope(|s| {
        for _ in 0..4 {
            s.spawn(|| {
                for _ in 0..200 {
                    let out = stencil.render("page", &data).unwrap();
                    assert_eq!(out, "<i>1</i><i>2</i><i>3</i>");
                }
            });
        }
        s.spawn(|| {
            for _ in 0..50 {
                stencil.reload().unwrap();
            }
        });
    });
}

#[test]
fn test_render_determinism_100_iterations() {
    let stencil = Stencil::from_templates(
        [("p.html", "<p x-for=\"xs\" x-if=\"item % 2\">{{ item }}:{{ $index }}</p>")],
        StencilConfig::default(),
    )
    .unwrap();
    let data = json!({ "xs": [1, 2, 3, 4, 5] });
    let first = stencil.render("p", &data).unwrap();
    assert_eq!(first, "<p>1:0</p><p>3:2</p><p>5:4</p>");
    for i in 0..100 {
        assert_eq!(
            first,
            stencil.render("p", &data).unwrap(),
            "Determinism failure at iteration {i}"
        );
    }
}
