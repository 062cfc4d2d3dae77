//! HTML escaping for double-delimited interpolation.

/// Escape `&`, `"`, `'`, `<` and `>` to named entities.
///
/// A single pass; equivalent to replacing the ampersand first, so entities
/// produced here are never escaped twice.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(ch),
        }
    }
    out
}
