//! The named transforms and the registry that builds them.
//!
//! A transform is created once per directive from its [`OperationSpec`],
//! which is when its arguments are checked, and then applied through an
//! [`ExecutionContext`] each time the directive runs.

mod attributes;
mod combine;
mod insert;
mod remove;
mod replace;

pub use attributes::{RemoveAttributes, SetAttributes};
pub use combine::Combine;
pub use insert::{Insert, InsertAfter, InsertBefore, InsertIfMissing, PrependChild};
pub use remove::{Remove, RemoveAll};
pub use replace::Replace;

use crate::directive::{LocatorSpec, OperationSpec, is_directive_attribute};
use crate::error::TransformError;
use crate::lookup::OriginalDocumentLookup;
use crate::options::TransformOptions;
use std::collections::HashMap;
use std::fmt;
use xdt_xml::{NamespaceContext, NodeId, XmlDocument, formatter};

/// An edit operation applied to the source document.
pub trait Transform: fmt::Debug {
    fn name(&self) -> &str;

    /// Whether the operation needs at least one target from the locator.
    fn requires_target(&self) -> bool {
        true
    }

    /// Whether the directive's child elements are left unprocessed.
    fn consumes_subtree(&self) -> bool {
        false
    }

    /// Apply the operation, returning how many nodes it touched.
    fn apply(&self, cx: &mut ExecutionContext<'_>) -> Result<usize, TransformError>;
}

/// Everything an operation can see while it runs.
pub struct ExecutionContext<'a> {
    pub source: &'a mut XmlDocument,
    pub transform: &'a XmlDocument,
    /// The transform-document element carrying the directive.
    pub template: NodeId,
    /// The source node the directive is evaluated under.
    pub parent: NodeId,
    /// Nodes resolved by the locator just before this operation ran.
    pub targets: Vec<NodeId>,
    pub locator: &'a LocatorSpec,
    /// Namespace bindings in scope at the template.
    pub namespaces: &'a NamespaceContext,
    pub options: &'a TransformOptions,
    pub lookup: Option<&'a dyn OriginalDocumentLookup>,
    /// Human-readable description of what the locator selects.
    pub target_label: &'a str,
    warnings: Vec<TransformError>,
}

impl<'a> ExecutionContext<'a> {
    pub fn new(
        source: &'a mut XmlDocument,
        transform: &'a XmlDocument,
        template: NodeId,
        parent: NodeId,
        locator: &'a LocatorSpec,
        namespaces: &'a NamespaceContext,
        options: &'a TransformOptions,
        target_label: &'a str,
    ) -> Self {
        Self {
            source,
            transform,
            template,
            parent,
            targets: Vec::new(),
            locator,
            namespaces,
            options,
            lookup: None,
            target_label,
            warnings: Vec::new(),
        }
    }

    pub fn with_targets(mut self, targets: Vec<NodeId>) -> Self {
        self.targets = targets;
        self
    }

    pub fn with_lookup(mut self, lookup: Option<&'a dyn OriginalDocumentLookup>) -> Self {
        self.lookup = lookup;
        self
    }

    /// Record a warning; the operation keeps going.
    pub fn warn(&mut self, warning: TransformError) {
        self.warnings.push(warning);
    }

    pub fn take_warnings(&mut self) -> Vec<TransformError> {
        std::mem::take(&mut self.warnings)
    }

    /// Element targets only, in locator order.
    pub fn element_targets(&self) -> Vec<NodeId> {
        self.targets
            .iter()
            .copied()
            .filter(|t| self.source.is_element(*t))
            .collect()
    }

    /// Clone the template into the source document, detached.
    ///
    /// Directive attributes are stripped from the clone unless the options
    /// say otherwise.
    pub fn clone_template(&mut self) -> Result<NodeId, TransformError> {
        let clone = self
            .source
            .clone_from_document(self.transform, self.template)
            .map_err(|err| TransformError::MalformedClone {
                message: err.to_string(),
            })?;

        if self.options.strip_directive_attributes {
            self.strip_directive_attributes(clone);
        }
        Ok(clone)
    }

    /// The clone is a re-parse of the template, so both subtrees list their
    /// elements in the same preorder.
    fn strip_directive_attributes(&mut self, clone: NodeId) {
        let transform = self.transform;
        let template_elements = std::iter::once(self.template)
            .chain(transform.descendants(self.template))
            .filter(|n| transform.is_element(*n));
        let clone_elements: Vec<NodeId> = std::iter::once(clone)
            .chain(self.source.descendants(clone))
            .filter(|n| self.source.is_element(*n))
            .collect();

        for (template, copy) in template_elements.zip(clone_elements) {
            for attr in transform.attributes(template) {
                if is_directive_attribute(transform, template, &attr.name, &attr.value) {
                    self.source.remove_attribute(copy, &attr.name.to_string());
                }
            }
        }
    }

    /// Template attributes that are neither directives nor namespace
    /// declarations, as `(qualified name, value)`.
    pub fn template_attributes(&self) -> Vec<(String, String)> {
        self.transform
            .attributes(self.template)
            .iter()
            .filter(|a| {
                !a.name.is_namespace_declaration()
                    && !is_directive_attribute(self.transform, self.template, &a.name, &a.value)
            })
            .map(|a| (a.name.to_string(), a.value.clone()))
            .collect()
    }

    /// Fix up whitespace around a node that was just attached.
    pub fn format_inserted(&mut self, node: NodeId) {
        if self.options.indent_inserted {
            formatter::indent_inserted(self.source, node);
        }
    }

    /// Detach a node, taking its indentation with it when enabled.
    pub fn remove_node(&mut self, node: NodeId) {
        if self.options.indent_inserted {
            formatter::remove_with_indent(self.source, node);
        } else {
            self.source.detach(node);
        }
    }
}

/// Builds a transform from its parsed operation entry.
pub type TransformFactory = fn(&OperationSpec) -> Result<Box<dyn Transform>, TransformError>;

/// Named transforms available to directives.
#[derive(Debug, Clone)]
pub struct TransformRegistry {
    factories: HashMap<String, TransformFactory>,
}

impl Default for TransformRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register("Insert", Insert::create);
        registry.register("InsertBefore", InsertBefore::create);
        registry.register("InsertAfter", InsertAfter::create);
        registry.register("InsertIfMissing", InsertIfMissing::create);
        registry.register("PrependChild", PrependChild::create);
        registry.register("Remove", Remove::create);
        registry.register("RemoveAll", RemoveAll::create);
        registry.register("Replace", Replace::create);
        registry.register("SetAttributes", SetAttributes::create);
        registry.register("RemoveAttributes", RemoveAttributes::create);
        registry.register("Combine", Combine::create);
        registry
    }
}

impl TransformRegistry {
    /// A registry with no transforms at all.
    pub fn empty() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    pub fn register(&mut self, name: impl Into<String>, factory: TransformFactory) {
        self.factories.insert(name.into(), factory);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn create(&self, spec: &OperationSpec) -> Result<Box<dyn Transform>, TransformError> {
        let factory = self
            .factories
            .get(&spec.name)
            .ok_or_else(|| TransformError::UnrecognizedTransform {
                name: spec.name.clone(),
            })?;
        factory(spec)
    }
}

/// Reject any argument list.
pub(crate) fn expect_no_arguments(spec: &OperationSpec) -> Result<(), TransformError> {
    if spec.has_arguments() {
        return Err(TransformError::ArgumentError {
            operation: spec.name.clone(),
            message: "takes no arguments".to_string(),
        });
    }
    Ok(())
}

/// Require the whole argument text as one non-empty argument.
pub(crate) fn expect_single_argument(spec: &OperationSpec) -> Result<String, TransformError> {
    match &spec.arguments {
        Some(argument) if !argument.trim().is_empty() => Ok(argument.trim().to_string()),
        _ => Err(TransformError::ArgumentError {
            operation: spec.name.clone(),
            message: "requires exactly one argument".to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(name: &str, arguments: Option<&str>) -> OperationSpec {
        OperationSpec {
            name: name.to_string(),
            arguments: arguments.map(str::to_string),
        }
    }

    #[test]
    fn test_registry_names() {
        let registry = TransformRegistry::default();
        assert_eq!(
            registry.names(),
            vec![
                "Combine",
                "Insert",
                "InsertAfter",
                "InsertBefore",
                "InsertIfMissing",
                "PrependChild",
                "Remove",
                "RemoveAll",
                "RemoveAttributes",
                "Replace",
                "SetAttributes",
            ]
        );
        assert!(!registry.contains("insert"));
        assert!(TransformRegistry::empty().names().is_empty());
    }

    #[test]
    fn test_argument_checks() {
        let registry = TransformRegistry::default();

        let err = registry.create(&spec("Insert", Some("x"))).unwrap_err();
        assert_eq!(err.code(), "X-2-3");
        assert!(registry.create(&spec("Insert", Some(" "))).is_ok());

        let err = registry.create(&spec("InsertBefore", None)).unwrap_err();
        assert_eq!(err.to_string(), "invalid arguments for InsertBefore: requires exactly one argument");

        let err = registry
            .create(&spec("InsertAfter", Some("/a/b[")))
            .unwrap_err();
        assert_eq!(err.code(), "X-3-2");

        let transform = registry
            .create(&spec("SetAttributes", Some("a, b")))
            .unwrap();
        assert_eq!(transform.name(), "SetAttributes");
        assert!(transform.requires_target());
        assert!(!transform.consumes_subtree());

        let err = registry.create(&spec("Nope", None)).unwrap_err();
        assert_eq!(err.code(), "X-2-1");
    }

    #[test]
    fn test_custom_registration() {
        #[derive(Debug)]
        struct Touch;
        impl Transform for Touch {
            fn name(&self) -> &str {
                "Touch"
            }
            fn apply(&self, cx: &mut ExecutionContext<'_>) -> Result<usize, TransformError> {
                Ok(cx.targets.len())
            }
        }

        let mut registry = TransformRegistry::empty();
        registry.register("Touch", |_| Ok(Box::new(Touch) as Box<dyn Transform>));
        assert!(registry.contains("Touch"));
        assert_eq!(registry.create(&spec("Touch", None)).unwrap().name(), "Touch");
    }
}
