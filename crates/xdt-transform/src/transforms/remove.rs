use super::{ExecutionContext, Transform, expect_no_arguments};
use crate::directive::OperationSpec;
use crate::error::TransformError;

/// Removes every target along with its subtree.
#[derive(Debug)]
pub struct Remove;

impl Remove {
    pub fn create(spec: &OperationSpec) -> Result<Box<dyn Transform>, TransformError> {
        expect_no_arguments(spec)?;
        Ok(Box::new(Remove))
    }
}

impl Transform for Remove {
    fn name(&self) -> &str {
        "Remove"
    }

    fn consumes_subtree(&self) -> bool {
        true
    }

    fn apply(&self, cx: &mut ExecutionContext<'_>) -> Result<usize, TransformError> {
        Ok(remove_targets(cx))
    }
}

/// Like [`Remove`], but finding nothing is only a warning.
#[derive(Debug)]
pub struct RemoveAll;

impl RemoveAll {
    pub fn create(spec: &OperationSpec) -> Result<Box<dyn Transform>, TransformError> {
        expect_no_arguments(spec)?;
        Ok(Box::new(RemoveAll))
    }
}

impl Transform for RemoveAll {
    fn name(&self) -> &str {
        "RemoveAll"
    }

    fn requires_target(&self) -> bool {
        false
    }

    fn consumes_subtree(&self) -> bool {
        true
    }

    fn apply(&self, cx: &mut ExecutionContext<'_>) -> Result<usize, TransformError> {
        if cx.targets.is_empty() {
            let target = cx.target_label.to_string();
            cx.warn(TransformError::NothingToRemove { target });
            return Ok(0);
        }
        Ok(remove_targets(cx))
    }
}

fn remove_targets(cx: &mut ExecutionContext<'_>) -> usize {
    let targets = cx.targets.clone();
    let mut removed = 0;
    for target in targets {
        if cx.source.parent(target).is_some() {
            cx.remove_node(target);
            removed += 1;
        }
    }
    removed
}
