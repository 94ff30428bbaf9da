//! An XPath 1.0 subset for locating nodes.
//!
//! Supported: location paths over every axis except `namespace`, the
//! abbreviations `.`, `..`, `@` and `//`, name tests (`*`, `p:*`, `p:name`),
//! node type tests, predicates, the `or`/`and`/comparison/arithmetic/union
//! operators, and the core string, number and boolean functions. Variables
//! are not supported.
//!
//! Unprefixed element name tests match the default namespace of the
//! [`NamespaceContext`], which makes paths written in a document with a
//! default namespace work against a source that uses the same one.
//!
//! # Example
//!
//! ```rust
//! use xdt_xml::{XmlDocument, FileId};
//! use xdt_xml::xpath::{NamespaceContext, XPath, XPathNode};
//!
//! let doc = XmlDocument::parse(
//!     "<configuration><add key='a'/><add key='b'/></configuration>",
//!     FileId(0),
//! ).unwrap();
//!
//! let xpath = XPath::compile("/configuration/add[@key='b']").unwrap();
//! let found = xpath
//!     .select_nodes(&doc, XPathNode::Node(doc.document_node()), &NamespaceContext::new())
//!     .unwrap();
//! assert_eq!(found.len(), 1);
//! ```

mod ast;
mod eval;
mod lexer;
mod parser;

pub use ast::{Axis, BinaryOp, Expr, NodeTest, PathExpr, PathStart, Step};
pub use eval::{XPathNode, XPathValue, string_value};

use crate::document::{NodeId, XML_NAMESPACE, XmlDocument};
use std::collections::HashMap;
use thiserror::Error;

/// Errors from compiling or evaluating an expression.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum XPathError {
    #[error("unexpected character '{ch}' at position {position}")]
    UnexpectedChar { ch: char, position: usize },

    #[error("unterminated string literal starting at position {position}")]
    UnterminatedLiteral { position: usize },

    #[error("unexpected {found} at position {position}, expected {expected}")]
    UnexpectedToken {
        found: String,
        expected: String,
        position: usize,
    },

    #[error("unexpected end of expression, expected {expected}")]
    UnexpectedEnd { expected: String },

    #[error("unknown axis '{name}' at position {position}")]
    UnknownAxis { name: String, position: usize },

    #[error("unknown function '{name}' at position {position}")]
    UnknownFunction { name: String, position: usize },

    #[error("wrong number of arguments to '{name}': {found}")]
    ArgumentCount { name: String, found: usize },

    #[error("variable references are not supported: ${0}")]
    UnsupportedVariable(String),

    #[error("namespace prefix '{0}' is not declared")]
    UndeclaredPrefix(String),

    #[error("expression does not evaluate to a node-set")]
    NotANodeSet,
}

/// Prefix bindings used to resolve names in an expression.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NamespaceContext {
    default: Option<String>,
    prefixes: HashMap<String, String>,
}

impl NamespaceContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// The bindings in scope at an element, including its default namespace.
    pub fn from_element(doc: &XmlDocument, id: NodeId) -> Self {
        let mut ctx = Self::new();
        for (prefix, uri) in doc.in_scope_namespaces(id) {
            match prefix {
                Some(prefix) => ctx.bind(prefix, uri),
                None => ctx.default = Some(uri),
            }
        }
        ctx
    }

    pub fn with_default(mut self, uri: impl Into<String>) -> Self {
        self.default = Some(uri.into());
        self
    }

    pub fn bind(&mut self, prefix: impl Into<String>, uri: impl Into<String>) {
        self.prefixes.insert(prefix.into(), uri.into());
    }

    pub fn default_namespace(&self) -> Option<&str> {
        self.default.as_deref()
    }

    pub fn resolve(&self, prefix: &str) -> Result<&str, XPathError> {
        if prefix == "xml" {
            return Ok(XML_NAMESPACE);
        }
        self.prefixes
            .get(prefix)
            .map(String::as_str)
            .ok_or_else(|| XPathError::UndeclaredPrefix(prefix.to_string()))
    }
}

/// A compiled expression.
#[derive(Debug, Clone, PartialEq)]
pub struct XPath {
    source: String,
    expr: Expr,
}

impl XPath {
    /// Parse an expression, checking function names and argument counts.
    pub fn compile(source: &str) -> Result<Self, XPathError> {
        Ok(XPath {
            source: source.to_string(),
            expr: parser::parse(source)?,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn expr(&self) -> &Expr {
        &self.expr
    }

    pub fn evaluate(
        &self,
        doc: &XmlDocument,
        context: XPathNode,
        ns: &NamespaceContext,
    ) -> Result<XPathValue, XPathError> {
        eval::Evaluator::new(doc, ns).evaluate(&self.expr, context)
    }

    /// Evaluate to a node-set in document order.
    pub fn select_nodes(
        &self,
        doc: &XmlDocument,
        context: XPathNode,
        ns: &NamespaceContext,
    ) -> Result<Vec<XPathNode>, XPathError> {
        self.evaluate(doc, context, ns)?.into_node_set()
    }

    /// Evaluate and convert the result with `boolean()`.
    pub fn evaluate_boolean(
        &self,
        doc: &XmlDocument,
        context: XPathNode,
        ns: &NamespaceContext,
    ) -> Result<bool, XPathError> {
        Ok(self.evaluate(doc, context, ns)?.to_boolean())
    }
}

/// Compile and evaluate `expression` with `context` as the context node.
pub fn select_nodes(
    doc: &XmlDocument,
    expression: &str,
    context: NodeId,
    ns: &NamespaceContext,
) -> Result<Vec<XPathNode>, XPathError> {
    XPath::compile(expression)?.select_nodes(doc, XPathNode::Node(context), ns)
}

#[cfg(test)]
mod tests {
    use super::*;
    use xdt_source_map::FileId;

    const CONFIG: &str = r#"<configuration>
  <appSettings>
    <add key="a" value="1"/>
    <add key="b" value="2"/>
    <!-- note -->
    <add key="c" value="3" enabled="false"/>
  </appSettings>
  <system.web>
    <compilation debug="true" targetFramework="4.8"/>
  </system.web>
</configuration>"#;

    fn doc() -> XmlDocument {
        XmlDocument::parse(CONFIG, FileId(0)).unwrap()
    }

    fn select(doc: &XmlDocument, expr: &str) -> Vec<XPathNode> {
        select_nodes(doc, expr, doc.document_node(), &NamespaceContext::new()).unwrap()
    }

    fn keys(doc: &XmlDocument, nodes: &[XPathNode]) -> Vec<String> {
        nodes
            .iter()
            .filter_map(|n| n.as_node())
            .filter_map(|n| doc.attribute(n, "key"))
            .map(str::to_string)
            .collect()
    }

    fn eval(doc: &XmlDocument, expr: &str) -> XPathValue {
        XPath::compile(expr)
            .unwrap()
            .evaluate(doc, XPathNode::Node(doc.document_node()), &NamespaceContext::new())
            .unwrap()
    }

    #[test]
    fn test_child_paths_and_predicates() {
        let doc = doc();
        let found = select(&doc, "/configuration/appSettings/add");
        assert_eq!(keys(&doc, &found), vec!["a", "b", "c"]);

        let found = select(&doc, "/configuration/appSettings/add[@key='b' or @value='3']");
        assert_eq!(keys(&doc, &found), vec!["b", "c"]);

        let found = select(&doc, "//add[last()]");
        assert_eq!(keys(&doc, &found), vec!["c"]);

        let found = select(&doc, "//add[position() < 3][2]");
        assert_eq!(keys(&doc, &found), vec!["b"]);
    }

    #[test]
    fn test_attribute_nodes() {
        let doc = doc();
        let found = select(&doc, "//compilation/@*");
        assert_eq!(found.len(), 2);
        assert!(found.iter().all(|n| n.as_node().is_none()));
        assert_eq!(string_value(&doc, found[1]), "4.8");
    }

    #[test]
    fn test_reverse_axes() {
        let doc = doc();
        let found = select(&doc, "//add[@key='c']/preceding-sibling::add[1]");
        assert_eq!(keys(&doc, &found), vec!["b"]);

        let found = select(&doc, "//add[@key='a']/ancestor::*");
        let names: Vec<String> = found
            .iter()
            .filter_map(|n| n.as_node())
            .filter_map(|n| doc.local_name(n).map(str::to_string))
            .collect();
        assert_eq!(names, vec!["configuration", "appSettings"]);
    }

    #[test]
    fn test_node_type_tests_and_union() {
        let doc = doc();
        assert_eq!(select(&doc, "//comment()").len(), 1);
        let found = select(&doc, "//add[@key='c'] | //add[@key='a']");
        assert_eq!(keys(&doc, &found), vec!["a", "c"]);
        assert_eq!(select(&doc, "/").len(), 1);
    }

    #[test]
    fn test_functions() {
        let doc = doc();
        assert_eq!(eval(&doc, "count(//add)"), XPathValue::Number(3.0));
        assert_eq!(eval(&doc, "sum(//add/@value)"), XPathValue::Number(6.0));
        assert_eq!(
            eval(&doc, "concat(name(/*), '-', substring('abcdef', 2, 3))"),
            XPathValue::String("configuration-bcd".to_string())
        );
        assert_eq!(
            eval(&doc, "translate(normalize-space('  a  b '), 'ab', 'AB')"),
            XPathValue::String("A B".to_string())
        );
        assert_eq!(
            eval(&doc, "substring-after(//compilation/@targetFramework, '.')"),
            XPathValue::String("8".to_string())
        );
        assert_eq!(
            eval(&doc, "starts-with(local-name(//system.web), 'system') and not(false())"),
            XPathValue::Boolean(true)
        );
        assert_eq!(eval(&doc, "7 mod 3 + 1 div 2"), XPathValue::Number(1.5));
        assert_eq!(eval(&doc, "//add/@key = 'b'"), XPathValue::Boolean(true));
        assert_eq!(eval(&doc, "//add/@value > 2"), XPathValue::Boolean(true));
        assert_eq!(eval(&doc, "//missing = ''"), XPathValue::Boolean(false));
    }

    #[test]
    fn test_default_namespace() {
        let doc = XmlDocument::parse(
            r#"<root xmlns="urn:cfg" xmlns:x="urn:x"><item/><x:item/></root>"#,
            FileId(0),
        )
        .unwrap();
        let context = XPathNode::Node(doc.document_node());

        let plain = XPath::compile("/root/item").unwrap();
        assert!(plain.select_nodes(&doc, context, &NamespaceContext::new()).unwrap().is_empty());

        let ns = NamespaceContext::new().with_default("urn:cfg");
        assert_eq!(plain.select_nodes(&doc, context, &ns).unwrap().len(), 1);

        let root = doc.root_element().unwrap();
        let scoped = NamespaceContext::from_element(&doc, root);
        let prefixed = XPath::compile("/root/x:*").unwrap();
        assert_eq!(prefixed.select_nodes(&doc, context, &scoped).unwrap().len(), 1);

        assert_eq!(
            prefixed.select_nodes(&doc, context, &ns),
            Err(XPathError::UndeclaredPrefix("x".to_string()))
        );
    }

    #[test]
    fn test_relative_to_context() {
        let doc = doc();
        let settings = doc.element_children(doc.root_element().unwrap())[0];
        let found = select_nodes(&doc, "add[@enabled]", settings, &NamespaceContext::new()).unwrap();
        assert_eq!(keys(&doc, &found), vec!["c"]);

        let found = select_nodes(&doc, "../system.web/*", settings, &NamespaceContext::new()).unwrap();
        assert_eq!(found.len(), 1);
    }

    #[test]
    fn test_not_a_node_set() {
        let doc = doc();
        assert_eq!(
            select_nodes(&doc, "1 + 1", doc.document_node(), &NamespaceContext::new()),
            Err(XPathError::NotANodeSet)
        );
    }
}
