use super::{ExecutionContext, Transform, expect_no_arguments};
use crate::directive::OperationSpec;
use crate::error::TransformError;

/// Does nothing itself; the directive's children are applied to each target.
#[derive(Debug)]
pub struct Combine;

impl Combine {
    pub fn create(spec: &OperationSpec) -> Result<Box<dyn Transform>, TransformError> {
        expect_no_arguments(spec)?;
        Ok(Box::new(Combine))
    }
}

impl Transform for Combine {
    fn name(&self) -> &str {
        "Combine"
    }

    fn apply(&self, cx: &mut ExecutionContext<'_>) -> Result<usize, TransformError> {
        Ok(cx.targets.len())
    }
}
