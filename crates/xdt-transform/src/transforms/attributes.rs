use super::{ExecutionContext, Transform};
use crate::directive::OperationSpec;
use crate::error::TransformError;

/// Resolve the attributes an attribute transform works with: the named
/// ones, or every ordinary attribute of the template.
fn selected_attributes(
    cx: &mut ExecutionContext<'_>,
    operation: &str,
    names: &[String],
) -> Vec<(String, String)> {
    let available = cx.template_attributes();
    if names.is_empty() {
        return available;
    }

    let mut selected = Vec::new();
    for name in names {
        match available.iter().find(|(n, _)| n == name) {
            Some(found) => selected.push(found.clone()),
            None => cx.warn(TransformError::UnmatchedArgument {
                operation: operation.to_string(),
                argument: name.clone(),
            }),
        }
    }
    selected
}

/// Copies attribute values from the template onto each target.
#[derive(Debug)]
pub struct SetAttributes {
    names: Vec<String>,
}

impl SetAttributes {
    pub fn create(spec: &OperationSpec) -> Result<Box<dyn Transform>, TransformError> {
        Ok(Box::new(SetAttributes {
            names: spec.argument_list(),
        }))
    }
}

impl Transform for SetAttributes {
    fn name(&self) -> &str {
        "SetAttributes"
    }

    fn apply(&self, cx: &mut ExecutionContext<'_>) -> Result<usize, TransformError> {
        let attributes = selected_attributes(cx, self.name(), &self.names);
        let targets = cx.element_targets();
        for target in &targets {
            for (name, value) in &attributes {
                cx.source.set_attribute(*target, name, value);
            }
        }
        Ok(targets.len())
    }
}

/// Removes attributes from each target: the named ones, or every ordinary
/// attribute the template carries.
#[derive(Debug)]
pub struct RemoveAttributes {
    names: Vec<String>,
}

impl RemoveAttributes {
    pub fn create(spec: &OperationSpec) -> Result<Box<dyn Transform>, TransformError> {
        Ok(Box::new(RemoveAttributes {
            names: spec.argument_list(),
        }))
    }
}

impl Transform for RemoveAttributes {
    fn name(&self) -> &str {
        "RemoveAttributes"
    }

    fn apply(&self, cx: &mut ExecutionContext<'_>) -> Result<usize, TransformError> {
        let names: Vec<String> = if self.names.is_empty() {
            cx.template_attributes().into_iter().map(|(n, _)| n).collect()
        } else {
            self.names.clone()
        };

        let targets = cx.element_targets();
        for target in &targets {
            for name in &names {
                cx.source.remove_attribute(*target, name);
            }
        }
        Ok(targets.len())
    }
}
