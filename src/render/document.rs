use kuchiki::traits::*;
use kuchiki::{parse_html, NodeRef};
use tracing::warn;

use crate::protocol::ElementPath;

/// Parsed document owned by a render.
pub struct RenderDocument {
    root: NodeRef,
}

impl RenderDocument {
    pub fn parse(html: &str) -> Self {
        Self {
            root: parse_html().one(html),
        }
    }

    /// The `html` element.
    pub fn document_element(&self) -> Option<NodeRef> {
        self.root
            .children()
            .elements()
            .next()
            .map(|element| element.as_node().clone())
    }

    pub fn body(&self) -> Option<NodeRef> {
        self.select_first("body")
    }

    pub fn select_first(&self, selector: &str) -> Option<NodeRef> {
        self.root
            .select_first(selector)
            .ok()
            .map(|element| element.as_node().clone())
    }

    /// All elements matching `selector`, in document order.
    pub fn select_all(&self, selector: &str) -> Vec<NodeRef> {
        match self.root.select(selector) {
            Ok(matches) => matches.map(|element| element.as_node().clone()).collect(),
            Err(()) => {
                warn!(target = "render", %selector, "failed to compile selector");
                Vec::new()
            }
        }
    }

    pub fn element_by_id(&self, id: &str) -> Option<NodeRef> {
        self.root
            .descendants()
            .elements()
            .find(|element| element.attributes.borrow().get("id") == Some(id))
            .map(|element| element.as_node().clone())
    }

    pub fn resolve_path(&self, path: &ElementPath) -> Option<NodeRef> {
        let mut current = self.document_element()?;
        for &index in path.indices() {
            let next = current
                .children()
                .elements()
                .nth(index)
                .map(|element| element.as_node().clone())?;
            current = next;
        }
        Some(current)
    }

    /// Outer markup of the `html` element.
    pub fn outer_html(&self) -> Option<String> {
        self.document_element().map(|element| element.to_string())
    }

    pub fn text_contents(&self) -> String {
        self.root.text_contents()
    }
}

/// Path of `node` relative to the `html` element. `None` for nodes outside
/// the element tree.
pub fn element_path(node: &NodeRef) -> Option<ElementPath> {
    let mut indices = Vec::new();
    let mut current = node.clone();
    loop {
        current.as_element()?;
        let parent = current.parent()?;
        if parent.as_document().is_some() {
            break;
        }
        let index = parent
            .children()
            .elements()
            .position(|sibling| *sibling.as_node() == current)?;
        indices.push(index);
        current = parent;
    }
    indices.reverse();
    Some(ElementPath(indices))
}

pub fn tag_name(node: &NodeRef) -> Option<String> {
    node.as_element()
        .map(|element| element.name.local.to_string().to_ascii_lowercase())
}

pub fn get_attribute(node: &NodeRef, name: &str) -> Option<String> {
    node.as_element()
        .and_then(|element| element.attributes.borrow().get(name).map(str::to_string))
}

pub fn set_attribute(node: &NodeRef, name: &str, value: &str) {
    if let Some(element) = node.as_element() {
        element
            .attributes
            .borrow_mut()
            .insert(name, value.to_string());
    }
}

pub fn remove_attribute(node: &NodeRef, name: &str) {
    if let Some(element) = node.as_element() {
        element.attributes.borrow_mut().remove(name);
    }
}

pub fn class_list(node: &NodeRef) -> Vec<String> {
    get_attribute(node, "class")
        .map(|value| value.split_whitespace().map(str::to_string).collect())
        .unwrap_or_default()
}

pub fn has_class(node: &NodeRef, class: &str) -> bool {
    class_list(node).iter().any(|existing| existing == class)
}

pub fn add_class(node: &NodeRef, class: &str) {
    let mut classes = class_list(node);
    if classes.iter().any(|existing| existing == class) {
        return;
    }
    classes.push(class.to_string());
    set_attribute(node, "class", &classes.join(" "));
}

/// Removes `class`; drops the attribute when nothing is left.
pub fn remove_class(node: &NodeRef, class: &str) {
    let classes = class_list(node);
    if !classes.iter().any(|existing| existing == class) {
        return;
    }
    let remaining: Vec<_> = classes.into_iter().filter(|c| c != class).collect();
    if remaining.is_empty() {
        remove_attribute(node, "class");
    } else {
        set_attribute(node, "class", &remaining.join(" "));
    }
}

/// One `name: value` declaration of a `style` attribute, as byte ranges
/// into the attribute text.
#[derive(Debug, Clone, Copy)]
struct StyleSpan {
    start: usize,
    /// Past the terminating `;` when there is one.
    end: usize,
    name: (usize, usize),
    value: (usize, usize),
    terminated: bool,
}

impl StyleSpan {
    fn is(&self, style: &str, property: &str) -> bool {
        style[self.name.0..self.name.1].eq_ignore_ascii_case(property)
    }
}

/// Split inline CSS into declarations. A `;` inside parentheses, quoted
/// strings or comments does not end a declaration.
fn style_spans(style: &str) -> Vec<StyleSpan> {
    let bytes = style.as_bytes();
    let mut spans = Vec::new();
    let mut segment_start = 0;
    let mut depth = 0usize;
    let mut quote: Option<u8> = None;
    let mut i = 0;
    while i < bytes.len() {
        let byte = bytes[i];
        match quote {
            Some(open) => {
                if byte == b'\\' {
                    i += 1;
                } else if byte == open {
                    quote = None;
                }
            }
            None => match byte {
                b'\\' => i += 1,
                b'"' | b'\'' => quote = Some(byte),
                b'(' => depth += 1,
                b')' => depth = depth.saturating_sub(1),
                b'/' if bytes.get(i + 1) == Some(&b'*') => {
                    i = style[i + 2..]
                        .find("*/")
                        .map(|at| i + 2 + at + 1)
                        .unwrap_or(bytes.len());
                }
                b';' if depth == 0 => {
                    push_span(style, segment_start, i, true, &mut spans);
                    segment_start = i + 1;
                }
                _ => {}
            },
        }
        i += 1;
    }
    if segment_start < bytes.len() {
        push_span(style, segment_start, bytes.len(), false, &mut spans);
    }
    spans
}

// Segments without a name or value are left in the text untouched.
fn push_span(style: &str, from: usize, to: usize, terminated: bool, spans: &mut Vec<StyleSpan>) {
    let Some(colon) = style[from..to].find(':') else {
        return;
    };
    let name = trimmed_range(style, from, from + colon);
    let value = trimmed_range(style, from + colon + 1, to);
    if name.0 == name.1 || value.0 == value.1 {
        return;
    }
    spans.push(StyleSpan {
        start: name.0,
        end: if terminated { to + 1 } else { value.1 },
        name,
        value,
        terminated,
    });
}

fn trimmed_range(text: &str, from: usize, to: usize) -> (usize, usize) {
    let slice = &text[from..to];
    let start = from + (slice.len() - slice.trim_start().len());
    let end = to - (slice.len() - slice.trim_end().len());
    (start, end.max(start))
}

/// Inline style declarations as `(property, value)` pairs, properties lowercased.
pub fn style_declarations(node: &NodeRef) -> Vec<(String, String)> {
    let Some(style) = get_attribute(node, "style") else {
        return Vec::new();
    };
    style_spans(&style)
        .into_iter()
        .map(|span| {
            (
                style[span.name.0..span.name.1].to_ascii_lowercase(),
                style[span.value.0..span.value.1].to_string(),
            )
        })
        .collect()
}

/// Last declaration of `property` wins, as in CSS.
pub fn style_property(node: &NodeRef, property: &str) -> Option<String> {
    style_declarations(node)
        .into_iter()
        .rev()
        .find(|(name, _)| name == property)
        .map(|(_, value)| value)
}

/// Replaces the value of an existing declaration in place, or appends one.
/// Every other byte of the attribute is kept.
pub fn set_style_property(node: &NodeRef, property: &str, value: &str) {
    let style = get_attribute(node, "style").unwrap_or_default();
    let spans = style_spans(&style);
    let updated = match spans.iter().rev().find(|span| span.is(&style, property)) {
        Some(span) => format!(
            "{}{value}{}",
            &style[..span.value.0],
            &style[span.value.1..]
        ),
        None => {
            let base = style.trim_end();
            if base.is_empty() {
                format!("{property}: {value};")
            } else if base.ends_with(';') {
                format!("{base} {property}: {value};")
            } else {
                format!("{base}; {property}: {value}")
            }
        }
    };
    set_attribute(node, "style", &updated);
}

/// Removes every declaration of `property`, undoing exactly what
/// [`set_style_property`] appended. Drops the attribute when nothing is left.
pub fn remove_style_property(node: &NodeRef, property: &str) {
    let Some(mut style) = get_attribute(node, "style") else {
        return;
    };
    let mut changed = false;
    loop {
        let spans = style_spans(&style);
        let Some(index) = spans.iter().position(|span| span.is(&style, property)) else {
            break;
        };
        let span = spans[index];
        let (from, to) = if index + 1 < spans.len() {
            let rest = &style[span.end..];
            (span.start, span.end + (rest.len() - rest.trim_start().len()))
        } else if span.terminated {
            (style[..span.start].trim_end().len(), span.end)
        } else if index > 0 && spans[index - 1].terminated {
            (spans[index - 1].end - 1, span.end)
        } else {
            (span.start, span.end)
        };
        style.replace_range(from..to, "");
        changed = true;
    }

    if !changed {
        return;
    }
    if style.trim().is_empty() {
        remove_attribute(node, "style");
    } else {
        set_attribute(node, "style", &style);
    }
}

/// Replace every child of `node` with a single text node.
pub fn set_text_content(node: &NodeRef, value: &str) {
    for child in node.children().collect::<Vec<_>>() {
        child.detach();
    }
    if !value.is_empty() {
        node.append(NodeRef::new_text(value));
    }
}
