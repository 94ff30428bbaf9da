//! Resolving a transform element's locator against the source document.

use crate::directive::LocatorSpec;
use crate::error::TransformError;
use xdt_xml::{NamespaceContext, NodeId, XPathNode, XmlDocument};

/// Find the source nodes `element` applies to under `parent`.
///
/// Results are in document order. Attribute nodes selected by an `XPath`
/// locator are dropped.
pub fn resolve(
    source: &XmlDocument,
    parent: NodeId,
    transform: &XmlDocument,
    element: NodeId,
    spec: &LocatorSpec,
    ns: &NamespaceContext,
) -> Result<Vec<NodeId>, TransformError> {
    match spec {
        LocatorSpec::Default => Ok(same_tag_children(source, parent, transform, element)),

        LocatorSpec::Match(names) => {
            let wanted: Option<Vec<(&str, &str)>> = names
                .iter()
                .map(|name| {
                    transform
                        .attribute(element, name)
                        .map(|value| (name.as_str(), value))
                })
                .collect();
            // An attribute missing from the template matches nothing.
            let Some(wanted) = wanted else {
                return Ok(Vec::new());
            };

            Ok(same_tag_children(source, parent, transform, element)
                .into_iter()
                .filter(|child| {
                    wanted
                        .iter()
                        .all(|(name, value)| source.attribute(*child, name) == Some(*value))
                })
                .collect())
        }

        LocatorSpec::Condition(xpath) => {
            let mut found = Vec::new();
            for child in same_tag_children(source, parent, transform, element) {
                let matched = xpath
                    .evaluate_boolean(source, XPathNode::Node(child), ns)
                    .map_err(|err| TransformError::Expression {
                        expression: xpath.source().to_string(),
                        source: err,
                    })?;
                if matched {
                    found.push(child);
                }
            }
            Ok(found)
        }

        LocatorSpec::XPath(xpath) => {
            let nodes = xpath
                .select_nodes(source, XPathNode::Node(parent), ns)
                .map_err(|err| TransformError::Expression {
                    expression: xpath.source().to_string(),
                    source: err,
                })?;
            Ok(nodes.into_iter().filter_map(|n| n.as_node()).collect())
        }
    }
}

/// Element children of `parent` with the local name and namespace of `element`.
fn same_tag_children(
    source: &XmlDocument,
    parent: NodeId,
    transform: &XmlDocument,
    element: NodeId,
) -> Vec<NodeId> {
    let Some(local) = transform.local_name(element) else {
        return Vec::new();
    };
    let namespace = transform.namespace_uri(element);

    source
        .element_children(parent)
        .into_iter()
        .filter(|child| {
            source.local_name(*child) == Some(local) && source.namespace_uri(*child) == namespace
        })
        .collect()
}

/// Describe what a locator selects, for messages.
///
/// `/configuration/appSettings/add[@key='a']`
pub fn describe(transform: &XmlDocument, element: NodeId, spec: &LocatorSpec) -> String {
    let path = transform.path(element);
    match spec {
        LocatorSpec::Default => path,
        LocatorSpec::Match(names) => {
            let tests: Vec<String> = names
                .iter()
                .map(|name| match transform.attribute(element, name) {
                    Some(value) => format!("@{}={}", name, xpath_literal(value)),
                    None => format!("@{}", name),
                })
                .collect();
            format!("{}[{}]", path, tests.join(" and "))
        }
        LocatorSpec::Condition(xpath) => format!("{}[{}]", path, xpath.source()),
        LocatorSpec::XPath(xpath) => xpath.source().to_string(),
    }
}

/// An absolute expression selecting what the locator would find, usable
/// against a snapshot of the source taken before the transform ran.
///
/// Steps are written with `local-name()` and a position so that they do not
/// depend on prefixes being bound. Positions count only original elements,
/// so siblings inserted by the transform do not shift them; siblings it
/// removed still do.
pub fn original_path(
    source: &XmlDocument,
    parent: NodeId,
    transform: &XmlDocument,
    element: NodeId,
    spec: &LocatorSpec,
) -> String {
    let parent_path = element_path(source, parent);
    let local = transform.local_name(element).unwrap_or("*");
    let step = format!("{}/*[local-name()={}]", parent_path, xpath_literal(local));

    match spec {
        LocatorSpec::Default => step,
        LocatorSpec::Match(names) => {
            let tests: Option<Vec<String>> = names
                .iter()
                .map(|name| {
                    transform
                        .attribute(element, name)
                        .map(|value| format!("@{}={}", name, xpath_literal(value)))
                })
                .collect();
            match tests {
                Some(tests) => format!("{}[{}]", step, tests.join(" and ")),
                None => format!("{}[false()]", step),
            }
        }
        LocatorSpec::Condition(xpath) => format!("{}[{}]", step, xpath.source()),
        LocatorSpec::XPath(xpath) if xpath.source().starts_with('/') => {
            xpath.source().to_string()
        }
        LocatorSpec::XPath(xpath) => format!("{}/{}", parent_path, xpath.source()),
    }
}

/// `/*[local-name()='a'][1]/*[local-name()='b'][2]`; empty for the document node.
fn element_path(doc: &XmlDocument, node: NodeId) -> String {
    let mut steps = Vec::new();
    for current in std::iter::once(node).chain(doc.ancestors(node)) {
        let Some(local) = doc.local_name(current) else {
            continue;
        };
        let position = doc.parent(current).map_or(1, |parent| {
            doc.element_children(parent)
                .into_iter()
                .take_while(|sibling| *sibling != current)
                .filter(|sibling| !doc.is_new_node(*sibling))
                .filter(|sibling| doc.local_name(*sibling) == Some(local))
                .count()
                + 1
        });
        steps.push(format!("/*[local-name()={}][{}]", xpath_literal(local), position));
    }
    steps.reverse();
    steps.concat()
}

/// Quote a string as an XPath literal.
pub fn xpath_literal(value: &str) -> String {
    if !value.contains('\'') {
        format!("'{}'", value)
    } else if !value.contains('"') {
        format!("\"{}\"", value)
    } else {
        let parts: Vec<String> = value.split('\'').map(|p| format!("'{}'", p)).collect();
        format!("concat({})", parts.join(", \"'\", "))
    }
}
