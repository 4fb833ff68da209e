use crate::model::{AttributeKey, TypeName};
use thiserror::Error;

/// Failures of descriptor building and handler resolution.
///
/// Every variant aborts the whole call; no partial descriptor or fallback
/// handler is ever produced.
#[derive(Error, Debug)]
pub enum BindError {
    #[error("instance of type {type_name} is not configurable")]
    NotConfigurable { type_name: TypeName },

    #[error("circular reference: instance of type {type_name} is already being described")]
    CircularReference { type_name: TypeName },

    #[error("could not load attribute metadata for {type_name}: {reason}")]
    MetadataLoad { type_name: TypeName, reason: String },

    #[error("could not read the current value of attribute {key}: {reason}")]
    Access { key: AttributeKey, reason: String },

    #[error("no suitable handler found for attribute {key}")]
    HandlerNotFound { key: AttributeKey },
}

impl BindError {
    /// Stable short name of the failure kind, for reports and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            BindError::NotConfigurable { .. } => "type",
            BindError::CircularReference { .. } => "circular_reference",
            BindError::MetadataLoad { .. } => "metadata_load",
            BindError::Access { .. } => "access",
            BindError::HandlerNotFound { .. } => "handler_not_found",
        }
    }
}

pub type BindResult<T> = std::result::Result<T, BindError>;
