//! Element tree to markup.

use crate::document::Document;
use crate::element::Element;

/// Render an element to markup.
///
/// Text and attribute values are inserted verbatim. Nothing is escaped, so
/// callers must supply markup-safe strings. A node without a tag renders as
/// the empty string.
pub fn render(element: &Element) -> String {
    let mut out = String::new();
    render_into(element, &mut out);
    out
}

/// Render an element, appending to `out`.
pub fn render_into(element: &Element, out: &mut String) {
    let node = match element {
        Element::Text(text) => {
            out.push_str(text);
            return;
        }
        Element::Node(node) => node,
    };

    let tag = match node.tag.as_deref() {
        Some(tag) if !tag.is_empty() => tag,
        _ => return,
    };

    out.push('<');
    out.push_str(tag);
    for (name, value) in &node.attrs {
        out.push(' ');
        out.push_str(name);
        out.push_str("=\"");
        out.push_str(value);
        out.push('"');
    }
    out.push('>');

    for child in &node.content {
        render_into(child, out);
    }

    out.push_str("</");
    out.push_str(tag);
    out.push('>');
}

/// Render a full page: doctype, root element, trailing newline.
pub fn render_document(doc: &Document) -> String {
    format!("<!DOCTYPE html>\n{}\n", render(&doc.html))
}
