//! Template markup parsing.
//!
//! Builds a [`Document`] tree of text and element nodes from HTML-like
//! template source. The parser never fails: markup it cannot match (stray
//! close tags, unclosed elements, a lone `<`) is kept as text, so rendering a
//! template without directives reproduces its source.

use stencil_lexer::Lexer;
use stencil_types::ast::*;

use crate::parser::Parser;

/// Elements that never have a body or close tag.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

/// Elements whose body is opaque text.
const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style"];

const FOR_ATTR: &str = "x-for";
const ROW_ATTR: &str = "x-row";
const IF_ATTR: &str = "x-if";

/// Loop alias used when `x-row` is absent.
pub const DEFAULT_ALIAS: &str = "item";

/// Deepest element nesting built into a document. Tags opened below this
/// depth, and their close tags, are kept as text.
pub const MAX_ELEMENT_DEPTH: usize = 64;

// ══════════════════════════════════════════════════════════════════════════════
// Public API
// ══════════════════════════════════════════════════════════════════════════════

/// Parse an expression fragment, keeping a syntax failure for later.
pub fn compile_expr(source: &str) -> CompiledExpr {
    let source = source.trim();
    let parsed = Lexer::new(source)
        .lex()
        .and_then(|tokens| Parser::new(tokens).parse());
    CompiledExpr {
        source: source.to_string(),
        parsed,
    }
}

/// Split text into literal and interpolation segments.
///
/// `{{{ expr }}}` is a raw site, `{{ expr }}` an escaped one. An opening
/// delimiter without its closer stays literal text.
pub fn parse_interpolated(text: &str) -> Interpolated {
    let mut segments = Vec::new();
    let mut literal = String::new();
    let mut rest = text;

    while let Some(open) = rest.find("{{") {
        literal.push_str(&rest[..open]);
        let after = &rest[open..];

        let site = if after.starts_with("{{{") {
            after[3..]
                .find("}}}")
                .map(|close| (Segment::Raw(compile_expr(&after[3..3 + close])), 3 + close + 3))
        } else {
            None
        };
        let site = site.or_else(|| {
            after[2..]
                .find("}}")
                .map(|close| (Segment::Escaped(compile_expr(&after[2..2 + close])), 2 + close + 2))
        });

        match site {
            Some((segment, consumed)) => {
                if !literal.is_empty() {
                    segments.push(Segment::Literal(std::mem::take(&mut literal)));
                }
                segments.push(segment);
                rest = &after[consumed..];
            }
            None => {
                literal.push_str(after);
                rest = "";
            }
        }
    }
    literal.push_str(rest);
    if !literal.is_empty() {
        segments.push(Segment::Literal(literal));
    }
    Interpolated { segments }
}

/// Parse template source into a document tree.
pub fn parse_template(source: &str) -> Document {
    MarkupParser::new(source).parse()
}

// ══════════════════════════════════════════════════════════════════════════════
// Tree Builder
// ══════════════════════════════════════════════════════════════════════════════

/// An attribute as scanned from an open tag.
#[derive(Debug, Clone)]
struct RawAttr {
    name: String,
    /// Unquoted value text; `None` for a valueless attribute.
    value: Option<String>,
    /// Source text including leading whitespace.
    text: String,
}

/// A scanned open tag.
#[derive(Debug, Clone)]
struct OpenTag {
    tag: String,
    attrs: Vec<RawAttr>,
    /// Whitespace and the closing `>` or `/>`.
    tail: String,
    self_closing: bool,
}

impl OpenTag {
    fn source_text(&self) -> String {
        let mut out = format!("<{}", self.tag);
        for attr in &self.attrs {
            out.push_str(&attr.text);
        }
        out.push_str(&self.tail);
        out
    }

    fn is_void(&self) -> bool {
        VOID_ELEMENTS
            .iter()
            .any(|v| v.eq_ignore_ascii_case(&self.tag))
    }

    fn is_raw_text(&self) -> bool {
        RAW_TEXT_ELEMENTS
            .iter()
            .any(|v| v.eq_ignore_ascii_case(&self.tag))
    }
}

/// An element whose close tag has not been seen yet.
struct Frame {
    open: OpenTag,
    children: Vec<Node>,
}

struct MarkupParser<'src> {
    source: &'src str,
    pos: usize,
    /// Pending text for the innermost open element.
    text: String,
    stack: Vec<Frame>,
    /// Names of tags opened past [`MAX_ELEMENT_DEPTH`], innermost last.
    overflow: Vec<String>,
    root: Vec<Node>,
}

impl<'src> MarkupParser<'src> {
    fn new(source: &'src str) -> Self {
        Self {
            source,
            pos: 0,
            text: String::new(),
            stack: Vec::new(),
            overflow: Vec::new(),
            root: Vec::new(),
        }
    }

    fn parse(mut self) -> Document {
        let source = self.source;
        while self.pos < source.len() {
            let rest = &source[self.pos..];
            if rest.starts_with("{{") {
                self.scan_interpolation();
            } else if rest.starts_with("<!--") {
                self.scan_until("-->");
            } else if rest.starts_with("<!") || rest.starts_with("<?") {
                self.scan_until(">");
            } else if rest.starts_with("</") {
                self.scan_close_tag();
            } else if rest.starts_with('<') {
                self.scan_open_tag();
            } else {
                self.take_char();
            }
        }

        // Anything still open at EOF was never closed.
        self.flush_text();
        while let Some(frame) = self.stack.pop() {
            self.demote(frame);
        }
        Document { nodes: self.root }
    }

    // ── Output ────────────────────────────────────────────────────────────────

    fn children_mut(&mut self) -> &mut Vec<Node> {
        match self.stack.last_mut() {
            Some(frame) => &mut frame.children,
            None => &mut self.root,
        }
    }

    fn flush_text(&mut self) {
        if self.text.is_empty() {
            return;
        }
        let text = std::mem::take(&mut self.text);
        let node = Node::Text(parse_interpolated(&text));
        self.children_mut().push(node);
    }

    fn push_node(&mut self, node: Node) {
        self.flush_text();
        self.children_mut().push(node);
    }

    /// Turn an unclosed element back into text, keeping its children.
    fn demote(&mut self, frame: Frame) {
        self.flush_text();
        let open = Node::Text(parse_interpolated(&frame.open.source_text()));
        let target = self.children_mut();
        target.push(open);
        target.extend(frame.children);
    }

    // ── Scanning ──────────────────────────────────────────────────────────────

    fn take_char(&mut self) {
        if let Some(ch) = self.source[self.pos..].chars().next() {
            self.text.push(ch);
            self.pos += ch.len_utf8();
        }
    }

    /// Copy text through `terminator` (or to EOF) verbatim.
    fn scan_until(&mut self, terminator: &str) {
        let source = self.source;
        let rest = &source[self.pos..];
        let len = rest
            .find(terminator)
            .map(|i| i + terminator.len())
            .unwrap_or(rest.len());
        self.text.push_str(&rest[..len]);
        self.pos += len;
    }

    /// Copy an interpolation site as text so markup inside it is not parsed.
    fn scan_interpolation(&mut self) {
        let len = interpolation_len(&self.source[self.pos..]).unwrap_or(2);
        self.text
            .push_str(&self.source[self.pos..self.pos + len]);
        self.pos += len;
    }

    fn scan_close_tag(&mut self) {
        let source = self.source;
        let rest = &source[self.pos..];
        let Some((name, len)) = close_tag_at(rest) else {
            self.take_char();
            return;
        };
        let close_text = rest[..len].to_string();

        if let Some(index) = self
            .overflow
            .iter()
            .rposition(|tag| tag.eq_ignore_ascii_case(name))
        {
            self.overflow.truncate(index);
            self.text.push_str(&close_text);
            self.pos += len;
            return;
        }

        let Some(index) = self
            .stack
            .iter()
            .rposition(|frame| frame.open.tag.eq_ignore_ascii_case(name))
        else {
            // Stray close tag.
            self.text.push_str(&close_text);
            self.pos += len;
            return;
        };
        self.pos += len;

        self.overflow.clear();
        self.flush_text();
        while self.stack.len() > index + 1 {
            if let Some(inner) = self.stack.pop() {
                self.demote(inner);
            }
        }
        if let Some(frame) = self.stack.pop() {
            let element = build_element(frame.open, frame.children, Some(close_text));
            self.push_node(Node::Element(element));
        }
    }

    fn scan_open_tag(&mut self) {
        let source = self.source;
        let rest = &source[self.pos..];
        let Some((open, len)) = open_tag_at(rest) else {
            self.take_char();
            return;
        };
        self.pos += len;

        if open.self_closing || open.is_void() {
            let element = build_element(open, Vec::new(), None);
            self.push_node(Node::Element(element));
            return;
        }

        if open.is_raw_text() {
            let body_rest = &source[self.pos..];
            match find_close_tag(body_rest, &open.tag) {
                Some((body_len, close_len)) => {
                    let body = &body_rest[..body_len];
                    let close_text = body_rest[body_len..body_len + close_len].to_string();
                    let children = if body.is_empty() {
                        Vec::new()
                    } else {
                        vec![Node::Text(parse_interpolated(body))]
                    };
                    self.pos += body_len + close_len;
                    let element = build_element(open, children, Some(close_text));
                    self.push_node(Node::Element(element));
                }
                None => {
                    self.text.push_str(&open.source_text());
                    self.text.push_str(body_rest);
                    self.pos = source.len();
                }
            }
            return;
        }

        if self.stack.len() >= MAX_ELEMENT_DEPTH {
            self.text.push_str(&open.source_text());
            self.overflow.push(open.tag);
            return;
        }

        self.flush_text();
        self.stack.push(Frame {
            open,
            children: Vec::new(),
        });
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Tag Scanning
// ══════════════════════════════════════════════════════════════════════════════

fn is_tag_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | ':' | '.')
}

/// Length of an interpolation site at the start of `text`, delimiters included.
fn interpolation_len(text: &str) -> Option<usize> {
    if let Some(inner) = text.strip_prefix("{{{") {
        if let Some(close) = inner.find("}}}") {
            return Some(3 + close + 3);
        }
    }
    text.strip_prefix("{{")?
        .find("}}")
        .map(|close| 2 + close + 2)
}

/// Scan `<name ...>` or `<name .../>`. Returns the tag and bytes consumed.
fn open_tag_at(text: &str) -> Option<(OpenTag, usize)> {
    let bytes = text.as_bytes();
    if bytes.first() != Some(&b'<') || !bytes.get(1)?.is_ascii_alphabetic() {
        return None;
    }
    let name_len = text[1..]
        .find(|c: char| !is_tag_name_char(c))
        .unwrap_or(text.len() - 1);
    let tag = text[1..1 + name_len].to_string();
    let mut pos = 1 + name_len;
    let mut attrs = Vec::new();

    loop {
        let ws = skip_whitespace(&text[pos..]);
        let rest = &text[pos + ws..];
        if rest.is_empty() {
            return None;
        }
        if rest.starts_with("/>") {
            let tail = text[pos..pos + ws + 2].to_string();
            return Some((
                OpenTag {
                    tag,
                    attrs,
                    tail,
                    self_closing: true,
                },
                pos + ws + 2,
            ));
        }
        if rest.starts_with('>') {
            let tail = text[pos..pos + ws + 1].to_string();
            return Some((
                OpenTag {
                    tag,
                    attrs,
                    tail,
                    self_closing: false,
                },
                pos + ws + 1,
            ));
        }
        let (name, name_len) = scan_attr_name(rest)?;
        let mut consumed = ws + name_len;
        let mut value = None;

        let after_name = &text[pos + consumed..];
        let eq_ws = skip_whitespace(after_name);
        if after_name[eq_ws..].starts_with('=') {
            let value_start = pos + consumed + eq_ws + 1;
            let value_ws = skip_whitespace(&text[value_start..]);
            let (raw_value, value_len) = scan_attr_value(&text[value_start + value_ws..])?;
            value = Some(raw_value);
            consumed += eq_ws + 1 + value_ws + value_len;
        }

        attrs.push(RawAttr {
            name,
            value,
            text: text[pos..pos + consumed].to_string(),
        });
        pos += consumed;
    }
}

fn skip_whitespace(text: &str) -> usize {
    text.find(|c: char| !c.is_whitespace())
        .unwrap_or(text.len())
}

/// An attribute name runs to whitespace, `=`, `>` or `/>`.
/// Interpolation sites inside it are taken whole.
fn scan_attr_name(text: &str) -> Option<(String, usize)> {
    let mut len = 0;
    while len < text.len() {
        let rest = &text[len..];
        if let Some(site) = interpolation_len(rest) {
            len += site;
            continue;
        }
        let c = rest.chars().next()?;
        if c.is_whitespace() || c == '=' || c == '>' || rest.starts_with("/>") {
            break;
        }
        len += c.len_utf8();
    }
    if len == 0 {
        // A lone `=` or similar; consume one character so scanning progresses.
        let c = text.chars().next()?;
        len = c.len_utf8();
    }
    Some((text[..len].to_string(), len))
}

/// A quoted or unquoted attribute value. Returns the value without quotes.
fn scan_attr_value(text: &str) -> Option<(String, usize)> {
    let quote = text.chars().next()?;
    if quote == '"' || quote == '\'' {
        let close = text[1..].find(quote)?;
        return Some((text[1..1 + close].to_string(), close + 2));
    }
    let mut len = 0;
    while len < text.len() {
        let rest = &text[len..];
        if let Some(site) = interpolation_len(rest) {
            len += site;
            continue;
        }
        let c = rest.chars().next()?;
        if c.is_whitespace() || c == '>' || rest.starts_with("/>") {
            break;
        }
        len += c.len_utf8();
    }
    Some((text[..len].to_string(), len))
}

/// Scan `</name>` with optional whitespace before `>`.
fn close_tag_at(text: &str) -> Option<(&str, usize)> {
    let after = text.strip_prefix("</")?;
    if !after.starts_with(|c: char| c.is_ascii_alphabetic()) {
        return None;
    }
    let name_len = after
        .find(|c: char| !is_tag_name_char(c))
        .unwrap_or(after.len());
    let ws = skip_whitespace(&after[name_len..]);
    if !after[name_len + ws..].starts_with('>') {
        return None;
    }
    Some((&after[..name_len], 2 + name_len + ws + 1))
}

/// Find the close tag of a raw-text element. Returns body and close lengths.
fn find_close_tag(text: &str, tag: &str) -> Option<(usize, usize)> {
    let mut from = 0;
    while let Some(i) = text[from..].find("</") {
        let at = from + i;
        if let Some((name, len)) = close_tag_at(&text[at..]) {
            if name.eq_ignore_ascii_case(tag) {
                return Some((at, len));
            }
        }
        from = at + 2;
    }
    None
}

// ══════════════════════════════════════════════════════════════════════════════
// Element Construction
// ══════════════════════════════════════════════════════════════════════════════

/// Resolve directives and classify attributes for a matched element.
fn build_element(open: OpenTag, children: Vec<Node>, close_tag: Option<String>) -> Element {
    let find = |name: &str| {
        open.attrs
            .iter()
            .position(|attr| attr.name.eq_ignore_ascii_case(name))
    };
    let for_index = find(FOR_ATTR);
    let row_index = for_index.and(find(ROW_ATTR));
    let if_index = find(IF_ATTR);

    let directive_expr = |index: usize| {
        let raw = open.attrs[index].value.as_deref().unwrap_or_default();
        compile_expr(strip_delimiters(raw))
    };

    let each = for_index.map(|index| LoopDirective {
        source: directive_expr(index),
        alias: row_index
            .and_then(|i| open.attrs[i].value.as_deref())
            .map(str::trim)
            .filter(|alias| !alias.is_empty())
            .unwrap_or(DEFAULT_ALIAS)
            .to_string(),
    });
    let condition = if_index.map(directive_expr);

    let consumed = [for_index, row_index, if_index];
    let kept: Vec<&RawAttr> = open
        .attrs
        .iter()
        .enumerate()
        .filter(|(i, _)| !consumed.contains(&Some(*i)))
        .map(|(_, attr)| attr)
        .collect();

    let mut open_text = format!("<{}", open.tag);
    for attr in &kept {
        open_text.push_str(&attr.text);
    }
    open_text.push_str(&open.tail);

    let attributes = kept
        .iter()
        .map(|attr| Attribute {
            name: attr.name.clone(),
            value: classify_value(attr.value.as_deref()),
        })
        .collect();

    Element {
        tag: open.tag,
        attributes,
        open_tag: parse_interpolated(&open_text),
        close_tag,
        self_closing: open.self_closing,
        children,
        each,
        condition,
    }
}

/// Directive values are bare expressions; `{{ }}` around them is tolerated.
fn strip_delimiters(raw: &str) -> &str {
    let trimmed = raw.trim();
    trimmed
        .strip_prefix("{{{")
        .and_then(|s| s.strip_suffix("}}}"))
        .or_else(|| {
            trimmed
                .strip_prefix("{{")
                .and_then(|s| s.strip_suffix("}}"))
        })
        .unwrap_or(trimmed)
}

fn classify_value(value: Option<&str>) -> AttrValue {
    let Some(value) = value else {
        return AttrValue::Flag;
    };
    let trimmed = parse_interpolated(value.trim());
    if let [Segment::Escaped(expr) | Segment::Raw(expr)] = trimmed.segments.as_slice() {
        return AttrValue::Expression(expr.clone());
    }
    let interpolated = parse_interpolated(value);
    if interpolated.is_static() {
        AttrValue::Literal(value.to_string())
    } else {
        AttrValue::Interpolated(interpolated)
    }
}
