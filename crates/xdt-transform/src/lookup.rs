//! Access to the source document as it was before a transform started.

use xdt_xml::xpath::{self, NamespaceContext, XPathError, XPathNode};
use xdt_xml::XmlDocument;

/// Queries against the pre-transform source document.
pub trait OriginalDocumentLookup {
    fn select_nodes(
        &self,
        path: &str,
        ns: &NamespaceContext,
    ) -> Result<Vec<XPathNode>, XPathError>;

    /// The pre-transform document, if it shares node ids with the live one.
    ///
    /// When this is `Some`, locators are resolved in it directly from the
    /// live parent's id instead of through a path.
    fn shared_snapshot(&self) -> Option<&XmlDocument> {
        None
    }
}

/// A snapshot of a source document.
///
/// Nodes are never removed from a document's arena, so a `NodeId` found in
/// the snapshot names the same node in the live document, although that
/// node may since have been detached.
#[derive(Debug, Clone)]
pub struct OriginalDocument {
    snapshot: XmlDocument,
}

impl OriginalDocument {
    pub fn snapshot(doc: &XmlDocument) -> Self {
        Self {
            snapshot: doc.clone(),
        }
    }

    pub fn document(&self) -> &XmlDocument {
        &self.snapshot
    }
}

impl OriginalDocumentLookup for OriginalDocument {
    fn select_nodes(
        &self,
        path: &str,
        ns: &NamespaceContext,
    ) -> Result<Vec<XPathNode>, XPathError> {
        xpath::select_nodes(&self.snapshot, path, self.snapshot.document_node(), ns)
    }

    fn shared_snapshot(&self) -> Option<&XmlDocument> {
        Some(&self.snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use xdt_xml::FileId;

    #[test]
    fn test_snapshot_ignores_later_edits() {
        let mut doc = XmlDocument::parse("<a><b/></a>", FileId(0)).unwrap();
        let original = OriginalDocument::snapshot(&doc);

        let root = doc.root_element().unwrap();
        let b = doc.element_children(root)[0];
        doc.detach(b);
        let c = doc.create_element("c");
        doc.append_child(root, c);

        let ns = NamespaceContext::new();
        assert_eq!(
            original.select_nodes("/a/b", &ns).unwrap(),
            vec![XPathNode::Node(b)]
        );
        assert!(original.select_nodes("/a/c", &ns).unwrap().is_empty());
        assert!(original.select_nodes("/a/[", &ns).is_err());

        let shared = original.shared_snapshot().unwrap();
        assert_eq!(shared.element_children(root), vec![b]);
        assert_eq!(doc.element_children(root), vec![c]);
    }
}
