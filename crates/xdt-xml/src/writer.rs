//! Format-preserving serialization.
//!
//! Nodes other than elements are written from their raw text. Element start
//! tags are rebuilt from the recorded [`AttributeLayout`] when there is one,
//! so an untouched element comes out exactly as it went in and an edited one
//! only changes around the attributes that were edited.

use crate::document::{Closing, ElementData, NodeId, NodeKind, XmlDocument};
use crate::preserve::AttributeLayout;

/// Serialize a node and its subtree.
pub fn node_to_string(doc: &XmlDocument, id: NodeId) -> String {
    let mut out = String::new();
    write_node(doc, id, &mut out);
    out
}

/// Append the serialization of a node and its subtree to `out`.
pub fn write_node(doc: &XmlDocument, id: NodeId, out: &mut String) {
    match doc.kind(id) {
        NodeKind::Document => {
            for child in doc.children(id) {
                write_node(doc, *child, out);
            }
        }
        NodeKind::Element(element) => write_element(doc, id, element, out),
        NodeKind::Text(raw)
        | NodeKind::CData(raw)
        | NodeKind::Comment(raw)
        | NodeKind::ProcessingInstruction(raw)
        | NodeKind::Declaration(raw)
        | NodeKind::DocType(raw) => out.push_str(raw),
    }
}

fn write_element(doc: &XmlDocument, id: NodeId, element: &ElementData, out: &mut String) {
    let name = element.name.to_string();
    out.push('<');
    out.push_str(&name);

    match doc.layout(id) {
        Some(layout) => write_recorded_attributes(element, layout, out),
        None => write_inferred_attributes(element, out),
    }

    let children = doc.children(id);
    match (&element.closing, children.is_empty()) {
        (Closing::SelfClosing, true) => out.push_str("/>"),
        (closing, _) => {
            out.push('>');
            for child in children {
                write_node(doc, *child, out);
            }
            match closing {
                Closing::Explicit(raw) if !raw.is_empty() => out.push_str(raw),
                _ => {
                    out.push_str("</");
                    out.push_str(&name);
                    out.push('>');
                }
            }
        }
    }
}

/// Replay a recorded layout.
///
/// Surviving attributes keep their token or, when their value changed,
/// their spelling and quote character. A removed attribute takes its gap
/// with it, except that the first surviving attribute always gets the
/// leading gap. Added attributes follow, separated by the dominant gap.
fn write_recorded_attributes(element: &ElementData, layout: &AttributeLayout, out: &mut String) {
    let mut first = true;

    for (index, token) in layout.tokens.iter().enumerate() {
        let Some(attr) = element.attribute(&token.name) else {
            continue;
        };
        let gap = if first {
            layout.leading_gap()
        } else {
            layout.gaps[index].as_str()
        };
        out.push_str(gap);
        if attr.value == token.value {
            out.push_str(&token.raw);
        } else {
            out.push_str(&token.with_value(&attr.value));
        }
        first = false;
    }

    for attr in &element.attributes {
        let qualified = attr.name.to_string();
        if layout.token(&qualified).is_some() {
            continue;
        }
        let gap = if first && !layout.tokens.is_empty() {
            layout.leading_gap()
        } else if first {
            " "
        } else {
            layout.dominant_gap()
        };
        out.push_str(gap);
        push_attribute(&qualified, &attr.value, out);
        first = false;
    }

    out.push_str(layout.trailing_gap());
}

/// Layout for elements that were never parsed: insertion order, single spaces.
fn write_inferred_attributes(element: &ElementData, out: &mut String) {
    for attr in &element.attributes {
        out.push(' ');
        push_attribute(&attr.name.to_string(), &attr.value, out);
    }
}

fn push_attribute(name: &str, value: &str, out: &mut String) {
    out.push_str(name);
    out.push_str("=\"");
    out.push_str(&quick_xml::escape::escape(value));
    out.push('"');
}

#[cfg(test)]
mod tests {
    use crate::document::XmlDocument;
    use xdt_source_map::FileId;

    fn parse(content: &str) -> XmlDocument {
        XmlDocument::parse(content, FileId(0)).unwrap()
    }

    #[test]
    fn test_round_trip_is_identity() {
        let source = "<?xml version=\"1.0\" encoding=\"utf-8\"?>\r\n\
<!DOCTYPE configuration>\r\n\
<!-- leading comment -->\r\n\
<configuration  xmlns:x = 'urn:x' >\r\n\
\t<appSettings>\r\n\
\t\t<add key=\"a\"   value='1&amp;2' />\r\n\
\t\t<add\r\n\t\t\tkey=\"b\"\r\n\t\t\tvalue=\"&#x41;\"/>\r\n\
\t\t<![CDATA[ <raw> ]]>\r\n\
\t\t<?pi data?>\r\n\
\t</appSettings   >\r\n\
\t<empty></empty>\r\n\
</configuration>\r\n";
        assert_eq!(parse(source).to_xml_string(), source);
    }

    #[test]
    fn test_changed_value_keeps_quote_and_neighbours() {
        let mut doc = parse("<a>\n  <add key='k'\n       value = \"old\"\n       extra='e'/>\n</a>");
        let add = doc.element_children(doc.root_element().unwrap())[0];
        doc.set_attribute(add, "value", "new & <improved>");

        assert_eq!(
            doc.to_xml_string(),
            "<a>\n  <add key='k'\n       value = \"new &amp; &lt;improved&gt;\"\n       extra='e'/>\n</a>"
        );
    }

    #[test]
    fn test_removed_attribute_drops_its_gap() {
        let mut doc = parse("<a  one=\"1\"\n   two=\"2\"\n   three=\"3\" />");
        let a = doc.root_element().unwrap();

        doc.remove_attribute(a, "two");
        assert_eq!(doc.to_xml_string(), "<a  one=\"1\"\n   three=\"3\" />");

        doc.remove_attribute(a, "one");
        assert_eq!(doc.to_xml_string(), "<a  three=\"3\" />");

        doc.remove_attribute(a, "three");
        assert_eq!(doc.to_xml_string(), "<a />");
    }

    #[test]
    fn test_added_attribute_uses_dominant_gap() {
        let mut doc = parse("<add\n    a=\"1\"\n    b=\"2\" c=\"3\"\n    d=\"4\"></add>");
        let add = doc.root_element().unwrap();
        doc.set_attribute(add, "e", "5");

        insta::assert_snapshot!(doc.to_xml_string(), @r#"
        <add
            a="1"
            b="2" c="3"
            d="4"
            e="5"></add>
        "#);
    }

    #[test]
    fn test_added_attribute_on_element_without_attributes() {
        let mut doc = parse("<root>\n  <item/>\n</root>");
        let item = doc.element_children(doc.root_element().unwrap())[0];
        doc.set_attribute(item, "name", "x\"y");

        assert_eq!(doc.to_xml_string(), "<root>\n  <item name=\"x&quot;y\"/>\n</root>");
    }

    #[test]
    fn test_self_closing_element_gains_end_tag() {
        let mut doc = parse("<root><p:item  a='1'/></root>");
        let item = doc.element_children(doc.root_element().unwrap())[0];
        let child = doc.create_element("child");
        doc.append_child(item, child);

        assert_eq!(doc.to_xml_string(), "<root><p:item  a='1'><child/></p:item></root>");
    }

    #[test]
    fn test_synthesized_element() {
        let mut doc = parse("<root/>");
        let root = doc.root_element().unwrap();
        let el = doc.create_element("add");
        doc.set_attribute(el, "key", "a<b");
        doc.set_attribute(el, "value", "1");
        let text = doc.create_text("x & y");
        let inner = doc.create_element("inner");
        doc.append_child(inner, text);
        doc.append_child(el, inner);
        doc.append_child(root, el);

        assert_eq!(
            doc.to_xml_string(),
            "<root><add key=\"a&lt;b\" value=\"1\"><inner>x &amp; y</inner></add></root>"
        );
    }

    #[test]
    fn test_save_keeps_writer_open() {
        use std::io::Write;

        let doc = parse("<a x='1'/>");
        let mut buffer: Vec<u8> = Vec::new();
        doc.save(&mut buffer).unwrap();
        buffer.write_all(b"\n<!-- appended -->").unwrap();

        assert_eq!(
            String::from_utf8(buffer).unwrap(),
            "<a x='1'/>\n<!-- appended -->"
        );
    }

    #[test]
    fn test_bom_is_preserved() {
        let doc = parse("\u{feff}<a/>");
        let mut buffer: Vec<u8> = Vec::new();
        doc.save(&mut buffer).unwrap();
        assert_eq!(buffer, "\u{feff}<a/>".as_bytes());
    }
}
