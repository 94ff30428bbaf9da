use super::{ExecutionContext, Transform, expect_no_arguments};
use crate::directive::OperationSpec;
use crate::error::TransformError;

/// Replaces each target with a clone of the template.
#[derive(Debug)]
pub struct Replace;

impl Replace {
    pub fn create(spec: &OperationSpec) -> Result<Box<dyn Transform>, TransformError> {
        expect_no_arguments(spec)?;
        Ok(Box::new(Replace))
    }
}

impl Transform for Replace {
    fn name(&self) -> &str {
        "Replace"
    }

    fn consumes_subtree(&self) -> bool {
        true
    }

    fn apply(&self, cx: &mut ExecutionContext<'_>) -> Result<usize, TransformError> {
        let targets = cx.targets.clone();
        let mut replaced = 0;
        for target in targets {
            if cx.source.parent(target).is_none() {
                continue;
            }
            let clone = cx.clone_template()?;
            cx.source.replace(target, clone);
            replaced += 1;
        }
        Ok(replaced)
    }
}
