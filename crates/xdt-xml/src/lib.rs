//! Location-tracking, format-preserving XML documents.
//!
//! This crate wraps [`quick-xml`] to build an arena-backed [`XmlDocument`]
//! in which every node remembers the raw text it was parsed from. Elements
//! and attributes carry their 1-based line and column, and a flag telling
//! whether they were part of the document as loaded ("original") or were
//! synthesized later.
//!
//! Saving a document replays the recorded text, so a document that was not
//! edited is written back byte-for-byte. Edited elements only have the bytes
//! around their attributes recomputed, using the [`AttributeLayout`] captured
//! at parse time.
//!
//! # Example
//!
//! ```rust
//! use xdt_xml::XmlDocument;
//! use xdt_source_map::FileId;
//!
//! let source = "<configuration>\n  <add key='a'   value=\"1\" />\n</configuration>";
//! let mut doc = XmlDocument::parse(source, FileId(0)).unwrap();
//!
//! let root = doc.root_element().unwrap();
//! let add = doc.element_children(root)[0];
//! assert_eq!(doc.info(add).unwrap().line, 2);
//! assert_eq!(doc.info(add).unwrap().column, 4);
//!
//! doc.set_attribute(add, "value", "2");
//! assert_eq!(
//!     doc.to_xml_string(),
//!     "<configuration>\n  <add key='a'   value=\"2\" />\n</configuration>"
//! );
//! ```
//!
//! The [`xpath`] module evaluates the XPath 1.0 subset used to locate nodes.

pub mod document;
pub mod error;
pub mod formatter;
pub mod parser;
pub mod preserve;
pub mod writer;
pub mod xpath;

// Re-export main types
pub use document::{
    Attribute, Closing, ElementData, NodeData, NodeId, NodeInfo, NodeKind, QName, XML_NAMESPACE,
    XMLNS_NAMESPACE, XmlDocument,
};
pub use error::{Error, Result};
pub use preserve::{AttributeLayout, AttributeToken, LayoutStore};
pub use xdt_source_map::FileId;
pub use xpath::{NamespaceContext, XPathError, XPathNode, XPathValue};
