//! Required and range checks on coerced values.

use crate::coerce::Strategy;
use crate::error::BindError;
use crate::tree::FieldNode;

/// Checks a leaf's final value, after defaults were applied.
///
/// `value` is `None` when no source and no default produced one.
pub(crate) fn validate<S: Strategy>(
    node: &FieldNode,
    value: Option<&S::Target>,
) -> Result<(), BindError> {
    let descriptor = node.descriptor();

    let present = value.filter(|v| !S::is_empty(v));
    if descriptor.required && present.is_none() {
        return Err(missing(node));
    }

    if let (Some(value), Some(range)) = (value, &descriptor.range) {
        if !S::within(value, range) {
            return Err(BindError::OutOfRange {
                field: node.reported_name().to_string(),
                allowed: range.as_str().to_string(),
            });
        }
    }

    Ok(())
}

/// The error for a required value that is absent.
pub(crate) fn missing(node: &FieldNode) -> BindError {
    BindError::MissingParameter {
        place: node.descriptor().source,
        field: node.reported_name().to_string(),
    }
}
