//! Indentation for nodes added to or removed from an indented document.
//!
//! Inserted elements are given the same leading whitespace as their
//! siblings; removed elements take their leading whitespace with them.
//! Documents that carry no line-break indentation are left alone.

use crate::document::{NodeId, XmlDocument};

const INDENT_UNIT: &str = "  ";

/// Surround a freshly inserted element with indentation matching its siblings.
pub fn indent_inserted(doc: &mut XmlDocument, node: NodeId) {
    if !doc.is_element(node) {
        return;
    }
    let Some(parent) = doc.parent(node) else {
        return;
    };

    let prev = doc.previous_sibling(node);
    let next = doc.next_sibling(node);
    let prev_ws = prev.filter(|p| doc.is_whitespace(*p));
    let next_ws = next.filter(|n| doc.is_whitespace(*n));

    if let Some(indent) = sibling_indent(doc, parent, node) {
        match (prev_ws, next, next_ws) {
            // Appended after the whitespace that closes the parent.
            (Some(ws), None, _) => {
                let closing = raw_text(doc, ws);
                doc.set_raw_text(ws, indent);
                let after = doc.create_raw_text(closing);
                doc.insert_after(node, after);
            }
            // Inserted after the indentation of the following sibling.
            (Some(_), Some(_), None) => {
                let after = doc.create_raw_text(indent);
                doc.insert_after(node, after);
            }
            // First child, or inserted right after a sibling.
            (None, _, _) => {
                let before = doc.create_raw_text(indent);
                doc.insert_before(node, before);
            }
            (Some(_), Some(_), Some(_)) => {}
        }
        return;
    }

    // Only child: derive the indentation from the parent's own.
    if prev.is_none() && next.is_none() {
        if let Some(closing) = own_indent(doc, parent) {
            let before = doc.create_raw_text(format!("{}{}", closing, INDENT_UNIT));
            doc.insert_before(node, before);
            let after = doc.create_raw_text(closing);
            doc.insert_after(node, after);
        }
    }
}

/// Detach `node` along with the indentation in front of it.
pub fn remove_with_indent(doc: &mut XmlDocument, node: NodeId) {
    if let Some(prev) = doc.previous_sibling(node) {
        if doc.is_whitespace(prev) && raw_text(doc, prev).contains('\n') {
            doc.detach(prev);
        }
    }
    doc.detach(node);
}

fn raw_text(doc: &XmlDocument, id: NodeId) -> String {
    match doc.kind(id) {
        crate::document::NodeKind::Text(raw) => raw.clone(),
        _ => String::new(),
    }
}

/// The last line break of a whitespace run and everything after it.
fn last_line(ws: &str) -> Option<&str> {
    ws.rfind('\n').map(|at| {
        let start = if at > 0 && ws.as_bytes()[at - 1] == b'\r' {
            at - 1
        } else {
            at
        };
        &ws[start..]
    })
}

/// Indentation in front of the nearest element sibling of `node`.
fn sibling_indent(doc: &XmlDocument, parent: NodeId, node: NodeId) -> Option<String> {
    let children = doc.children(parent);
    let position = children.iter().position(|c| *c == node)?;

    let indent_of = |index: usize| -> Option<String> {
        let child = children[index];
        if child == node || !doc.is_element(child) || index == 0 {
            return None;
        }
        let before = children[index - 1];
        if !doc.is_whitespace(before) {
            return None;
        }
        last_line(&raw_text(doc, before)).map(str::to_string)
    };

    (0..position)
        .rev()
        .chain(position + 1..children.len())
        .find_map(indent_of)
}

/// Indentation in front of an element, counting the start of the document
/// for the root element.
fn own_indent(doc: &XmlDocument, element: NodeId) -> Option<String> {
    match doc.previous_sibling(element) {
        Some(prev) if doc.is_whitespace(prev) => last_line(&raw_text(doc, prev)).map(str::to_string),
        _ if doc.parent(element) == Some(doc.document_node()) => Some("\n".to_string()),
        _ => None,
    }
}
