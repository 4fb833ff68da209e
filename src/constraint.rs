//! Constraint tags: extraction from declarations and checks against values.
//!
//! A tag is a constraint when its kind is marked as one in the capability
//! model. Extraction keeps the declaration's tag order and any duplicates.
//! The value checks cover the well-known kinds (`Range`, `NotBlank`, `OneOf`);
//! other constraint kinds are carried through untouched for handlers to
//! interpret.

use crate::descriptor::AttributeDescriptor;
use crate::model::{AttributeDeclaration, AttributeKey, CapabilityModel, Tag, TagName, ValueSnapshot};
use serde_json::Value;

/// Constraint tags of `declaration`, in declaration order.
pub fn constraints_of<M: CapabilityModel + ?Sized>(
    model: &M,
    declaration: &AttributeDeclaration,
) -> Vec<Tag> {
    declaration
        .tags
        .iter()
        .filter(|tag| model.is_constraint_tag(&tag.name))
        .cloned()
        .collect()
}

/// One constraint an attribute's current value does not satisfy.
#[derive(Clone, Debug, PartialEq)]
pub struct ConstraintViolation {
    pub key: AttributeKey,
    pub constraint: TagName,
    pub message: String,
}

/// Check the attribute's current value against its well-known constraints.
///
/// Null values are never checked; whether a value is required is a separate
/// concern from whether a present value is valid.
pub fn check_constraints(attribute: &AttributeDescriptor) -> Vec<ConstraintViolation> {
    if attribute.value == ValueSnapshot::Null {
        return Vec::new();
    }
    attribute
        .constraints
        .iter()
        .filter_map(|tag| {
            check_one(tag, &attribute.value).map(|message| ConstraintViolation {
                key: attribute.key.clone(),
                constraint: tag.name.clone(),
                message,
            })
        })
        .collect()
}

fn check_one(tag: &Tag, value: &ValueSnapshot) -> Option<String> {
    match tag.name.as_str() {
        "Range" => check_range(tag, value),
        "NotBlank" => match value.as_str() {
            Some(text) if text.trim().is_empty() => Some("value must not be blank".to_string()),
            _ => None,
        },
        "OneOf" => {
            let allowed = tag.params.get("values").and_then(Value::as_array)?;
            let current = value.to_json();
            if allowed.contains(&current) {
                None
            } else {
                Some(format!("value {value} is not one of {}", Value::Array(allowed.clone())))
            }
        }
        _ => None,
    }
}

fn check_range(tag: &Tag, value: &ValueSnapshot) -> Option<String> {
    let Some(number) = value.as_f64() else {
        return Some(format!("value {value} is not numeric"));
    };
    let min = tag.params.get("min").and_then(Value::as_f64);
    let max = tag.params.get("max").and_then(Value::as_f64);
    if let Some(min) = min {
        if number < min {
            return Some(format!("value {number} is below minimum {min}"));
        }
    }
    if let Some(max) = max {
        if number > max {
            return Some(format!("value {number} is above maximum {max}"));
        }
    }
    None
}
