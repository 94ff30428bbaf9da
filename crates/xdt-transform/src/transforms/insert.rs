use super::{ExecutionContext, Transform, expect_no_arguments, expect_single_argument};
use crate::directive::OperationSpec;
use crate::error::TransformError;
use crate::locator;
use xdt_xml::xpath::XPath;
use xdt_xml::{NodeId, XPathNode};

/// Appends a clone of the template as the last child of the parent.
#[derive(Debug)]
pub struct Insert;

impl Insert {
    pub fn create(spec: &OperationSpec) -> Result<Box<dyn Transform>, TransformError> {
        expect_no_arguments(spec)?;
        Ok(Box::new(Insert))
    }
}

impl Transform for Insert {
    fn name(&self) -> &str {
        "Insert"
    }

    fn requires_target(&self) -> bool {
        false
    }

    fn consumes_subtree(&self) -> bool {
        true
    }

    fn apply(&self, cx: &mut ExecutionContext<'_>) -> Result<usize, TransformError> {
        append_clone(cx)?;
        Ok(1)
    }
}

fn append_clone(cx: &mut ExecutionContext<'_>) -> Result<NodeId, TransformError> {
    let clone = cx.clone_template()?;
    cx.source.append_child(cx.parent, clone);
    cx.format_inserted(clone);
    Ok(clone)
}

/// Inserts a clone as the first child of the parent.
#[derive(Debug)]
pub struct PrependChild;

impl PrependChild {
    pub fn create(spec: &OperationSpec) -> Result<Box<dyn Transform>, TransformError> {
        expect_no_arguments(spec)?;
        Ok(Box::new(PrependChild))
    }
}

impl Transform for PrependChild {
    fn name(&self) -> &str {
        "PrependChild"
    }

    fn requires_target(&self) -> bool {
        false
    }

    fn consumes_subtree(&self) -> bool {
        true
    }

    fn apply(&self, cx: &mut ExecutionContext<'_>) -> Result<usize, TransformError> {
        let clone = cx.clone_template()?;
        cx.source.prepend_child(cx.parent, clone);
        cx.format_inserted(clone);
        Ok(1)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Before,
    After,
}

/// Shared by `InsertBefore` and `InsertAfter`: the argument is an XPath
/// selecting the siblings to insert next to.
#[derive(Debug)]
struct SiblingInsert {
    side: Side,
    xpath: XPath,
}

impl SiblingInsert {
    fn create(spec: &OperationSpec, side: Side) -> Result<Self, TransformError> {
        let expression = expect_single_argument(spec)?;
        let xpath = XPath::compile(&expression)
            .map_err(|source| TransformError::Expression { expression, source })?;
        Ok(SiblingInsert { side, xpath })
    }

    fn apply(&self, cx: &mut ExecutionContext<'_>) -> Result<usize, TransformError> {
        let siblings: Vec<NodeId> = self
            .xpath
            .select_nodes(cx.source, XPathNode::Node(cx.parent), cx.namespaces)
            .map_err(|source| TransformError::Expression {
                expression: self.xpath.source().to_string(),
                source,
            })?
            .into_iter()
            .filter_map(|n| n.as_node())
            .filter(|n| cx.source.parent(*n).is_some())
            .collect();

        if siblings.is_empty() {
            return Err(TransformError::NoMatch {
                target: self.xpath.source().to_string(),
            });
        }

        for sibling in &siblings {
            let clone = cx.clone_template()?;
            match self.side {
                Side::Before => cx.source.insert_before(*sibling, clone),
                Side::After => cx.source.insert_after(*sibling, clone),
            }
            cx.format_inserted(clone);
        }
        Ok(siblings.len())
    }
}

/// Inserts a clone before each node selected by the argument.
#[derive(Debug)]
pub struct InsertBefore(SiblingInsert);

impl InsertBefore {
    pub fn create(spec: &OperationSpec) -> Result<Box<dyn Transform>, TransformError> {
        Ok(Box::new(InsertBefore(SiblingInsert::create(spec, Side::Before)?)))
    }
}

impl Transform for InsertBefore {
    fn name(&self) -> &str {
        "InsertBefore"
    }

    fn requires_target(&self) -> bool {
        false
    }

    fn consumes_subtree(&self) -> bool {
        true
    }

    fn apply(&self, cx: &mut ExecutionContext<'_>) -> Result<usize, TransformError> {
        self.0.apply(cx)
    }
}

/// Inserts a clone after each node selected by the argument.
#[derive(Debug)]
pub struct InsertAfter(SiblingInsert);

impl InsertAfter {
    pub fn create(spec: &OperationSpec) -> Result<Box<dyn Transform>, TransformError> {
        Ok(Box::new(InsertAfter(SiblingInsert::create(spec, Side::After)?)))
    }
}

impl Transform for InsertAfter {
    fn name(&self) -> &str {
        "InsertAfter"
    }

    fn requires_target(&self) -> bool {
        false
    }

    fn consumes_subtree(&self) -> bool {
        true
    }

    fn apply(&self, cx: &mut ExecutionContext<'_>) -> Result<usize, TransformError> {
        self.0.apply(cx)
    }
}

/// Inserts like [`Insert`] unless the locator already matched something in
/// the document as it was before the transform started.
#[derive(Debug)]
pub struct InsertIfMissing;

impl InsertIfMissing {
    pub fn create(spec: &OperationSpec) -> Result<Box<dyn Transform>, TransformError> {
        expect_no_arguments(spec)?;
        Ok(Box::new(InsertIfMissing))
    }
}

impl Transform for InsertIfMissing {
    fn name(&self) -> &str {
        "InsertIfMissing"
    }

    fn requires_target(&self) -> bool {
        false
    }

    fn consumes_subtree(&self) -> bool {
        true
    }

    fn apply(&self, cx: &mut ExecutionContext<'_>) -> Result<usize, TransformError> {
        let lookup = cx.lookup.ok_or_else(|| {
            TransformError::Failed(
                "InsertIfMissing needs access to the original document".to_string(),
            )
        })?;

        // A parent created by this transform has no counterpart to look in.
        if !cx.source.is_new_node(cx.parent) {
            let present = match lookup.shared_snapshot() {
                Some(original) => !locator::resolve(
                    original,
                    cx.parent,
                    cx.transform,
                    cx.template,
                    cx.locator,
                    cx.namespaces,
                )?
                .is_empty(),
                None => {
                    let path = locator::original_path(
                        cx.source,
                        cx.parent,
                        cx.transform,
                        cx.template,
                        cx.locator,
                    );
                    !lookup
                        .select_nodes(&path, cx.namespaces)
                        .map_err(|source| TransformError::Expression {
                            expression: path.clone(),
                            source,
                        })?
                        .is_empty()
                }
            };
            if present {
                tracing::debug!(
                    locator = %cx.target_label,
                    "Element already present, not inserting"
                );
                return Ok(0);
            }
        }

        append_clone(cx)?;
        Ok(1)
    }
}
