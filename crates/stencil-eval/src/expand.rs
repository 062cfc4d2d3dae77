//! Directive expansion: renders a template document to HTML.
//!
//! A single recursive traversal applies, per element:
//! 1. `x-for`: repeat the element per array item, in a child scope
//! 2. `x-if`: drop the element when the condition is falsy
//! 3. includes: a self-closing element naming a registered template
//! 4. interpolation: `{{{ }}}` raw, `{{ }}` HTML-escaped
//!
//! Interpolated output is final and never re-expanded.

use crate::escape::escape_html;
use crate::evaluator::evaluate_compiled;
use crate::scope::Scope;
use std::collections::BTreeMap;
use stencil_types::ast::*;
use stencil_types::{StencilError, Value};
use tracing::trace;

/// Binding holding the render data inside every template.
pub const ROOT_BINDING: &str = "$root";
/// Binding holding the zero-based loop position.
pub const INDEX_BINDING: &str = "$index";

/// Deepest element nesting a render may reach, summed across includes.
pub const MAX_ELEMENT_NESTING: usize = 128;

/// Read access to registered templates.
pub trait TemplateLookup {
    /// Canonical form of a template name.
    fn normalize(&self, name: &str) -> String;

    /// The parsed document for an already-normalized name.
    fn document(&self, normalized: &str) -> Option<&Document>;
}

/// Where the traversal stands in the render tree.
#[derive(Debug, Clone, Copy)]
struct Position<'a> {
    /// Normalized names of the active include chain.
    stack: &'a [String],
    /// Loops, true conditionals and includes entered so far.
    depth: usize,
    /// Elements entered so far, includes followed.
    nesting: usize,
}

/// Renders documents from a [`TemplateLookup`].
pub struct Expander<'t, T: TemplateLookup + ?Sized> {
    templates: &'t T,
    max_depth: usize,
}

impl<'t, T: TemplateLookup + ?Sized> Expander<'t, T> {
    pub fn new(templates: &'t T, max_depth: usize) -> Self {
        Self {
            templates,
            max_depth,
        }
    }

    /// Render a registered template with `data` as the root scope.
    ///
    /// The root scope holds `data`'s own properties, with `$root` bound to
    /// `data` itself in a layer above them.
    pub fn render(&self, name: &str, data: &Value) -> Result<String, StencilError> {
        let normalized = self.templates.normalize(name);
        let document =
            self.templates
                .document(&normalized)
                .ok_or_else(|| StencilError::TemplateNotFound {
                    name: name.to_string(),
                })?;

        let globals = Scope::root(data.as_object().cloned().unwrap_or_default());
        let scope = globals.layer(BTreeMap::from([(ROOT_BINDING.to_string(), data.clone())]));

        let start = Position {
            stack: &[],
            depth: 0,
            nesting: 0,
        };
        let mut out = String::new();
        self.render_nodes(&document.nodes, &scope, start, &mut out)?;
        Ok(out)
    }

    // ══════════════════════════════════════════════════════════════════════
    // Traversal
    // ══════════════════════════════════════════════════════════════════════

    fn render_nodes(
        &self,
        nodes: &[Node],
        scope: &Scope<'_>,
        at: Position<'_>,
        out: &mut String,
    ) -> Result<(), StencilError> {
        for node in nodes {
            match node {
                Node::Text(text) => render_interpolated(text, scope, true, out)?,
                Node::Element(element) => self.render_element(element, scope, at, out)?,
            }
        }
        Ok(())
    }

    /// Account for one more level of directive recursion.
    fn descend<'a>(&self, at: Position<'a>) -> Result<Position<'a>, StencilError> {
        let depth = at.depth + 1;
        if depth > self.max_depth {
            return Err(StencilError::RenderDepthExceeded {
                limit: self.max_depth,
            });
        }
        Ok(Position { depth, ..at })
    }

    /// Account for one more level of element nesting.
    fn nest<'a>(&self, at: Position<'a>) -> Result<Position<'a>, StencilError> {
        let nesting = at.nesting + 1;
        if nesting > MAX_ELEMENT_NESTING {
            return Err(StencilError::RenderDepthExceeded {
                limit: MAX_ELEMENT_NESTING,
            });
        }
        Ok(Position { nesting, ..at })
    }

    fn render_element(
        &self,
        element: &Element,
        scope: &Scope<'_>,
        at: Position<'_>,
        out: &mut String,
    ) -> Result<(), StencilError> {
        let Some(each) = &element.each else {
            return self.render_guarded(element, scope, at, out);
        };

        // A non-array source removes the element.
        let Value::Array(items) = evaluate_compiled(&each.source, scope)? else {
            return Ok(());
        };
        let at = self.descend(at)?;
        for (index, item) in items.into_iter().enumerate() {
            let iteration = scope.layer(BTreeMap::from([
                (each.alias.clone(), item),
                (INDEX_BINDING.to_string(), Value::from(index)),
            ]));
            self.render_guarded(element, &iteration, at, out)?;
        }
        Ok(())
    }

    /// Apply `x-if`, then render the element as an include or as markup.
    fn render_guarded(
        &self,
        element: &Element,
        scope: &Scope<'_>,
        mut at: Position<'_>,
        out: &mut String,
    ) -> Result<(), StencilError> {
        if let Some(condition) = &element.condition {
            if !evaluate_compiled(condition, scope)?.is_truthy() {
                return Ok(());
            }
            at = self.descend(at)?;
        }

        if element.self_closing {
            let name = self.templates.normalize(&element.tag);
            if let Some(document) = self.templates.document(&name) {
                return self.render_include(name, document, element, scope, at, out);
            }
        }

        render_interpolated(&element.open_tag, scope, true, out)?;
        if !element.children.is_empty() {
            self.render_nodes(&element.children, scope, self.nest(at)?, out)?;
        }
        if let Some(close) = &element.close_tag {
            out.push_str(close);
        }
        Ok(())
    }

    fn render_include(
        &self,
        name: String,
        document: &Document,
        element: &Element,
        scope: &Scope<'_>,
        at: Position<'_>,
        out: &mut String,
    ) -> Result<(), StencilError> {
        let mut chain = at.stack.to_vec();
        let cyclic = chain.contains(&name);
        chain.push(name);
        if cyclic {
            return Err(StencilError::CyclicInclude { chain });
        }

        let mut bindings = BTreeMap::new();
        for attribute in &element.attributes {
            let value = match &attribute.value {
                AttrValue::Flag => Value::Bool(true),
                AttrValue::Literal(text) => Value::String(text.clone()),
                AttrValue::Expression(expr) => evaluate_compiled(expr, scope)?,
                AttrValue::Interpolated(text) => {
                    let mut rendered = String::new();
                    render_interpolated(text, scope, false, &mut rendered)?;
                    Value::String(rendered)
                }
            };
            bindings.insert(attribute.name.clone(), value);
        }

        let at = self.descend(at)?;
        trace!(chain = %chain.join(" -> "), depth = at.depth, "expanding include");

        let child = scope.layer(bindings);
        let at = Position {
            stack: &chain,
            depth: at.depth,
            nesting: at.nesting,
        };
        self.render_nodes(&document.nodes, &child, at, out)
    }
}

/// Substitute interpolation sites. Undefined and null render as nothing.
fn render_interpolated(
    text: &Interpolated,
    scope: &Scope<'_>,
    escape: bool,
    out: &mut String,
) -> Result<(), StencilError> {
    for segment in &text.segments {
        match segment {
            Segment::Literal(literal) => out.push_str(literal),
            Segment::Escaped(expr) => {
                let value = evaluate_compiled(expr, scope)?.to_string();
                if escape {
                    out.push_str(&escape_html(&value));
                } else {
                    out.push_str(&value);
                }
            }
            Segment::Raw(expr) => {
                out.push_str(&evaluate_compiled(expr, scope)?.to_string());
            }
        }
    }
    Ok(())
}
