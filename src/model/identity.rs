use serde::{Deserialize, Serialize};
use std::fmt;

/// Name of the universal base type every type is compatible with.
pub const UNIVERSAL_TYPE: &str = "object";

/// Fully-qualified name of a type known to the capability model.
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TypeName(pub String);

/// Qualified attribute key: the declaring type plus the field name.
///
/// Keys are stable across descendants because they always name the type that
/// declares the field, not the type the field is observed on.
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttributeKey(pub String);

/// Name of a tag kind attached to a declaration (e.g. `Range`, `Required`).
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TagName(pub String);

/// Identifier of a handler registered in a catalog.
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HandlerId(pub String);

impl TypeName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn universal() -> Self {
        Self(UNIVERSAL_TYPE.to_string())
    }

    pub fn is_universal(&self) -> bool {
        self.0 == UNIVERSAL_TYPE
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AttributeKey {
    pub fn qualified(declaring_type: &TypeName, field: &str) -> Self {
        Self(format!("{}.{}", declaring_type.0, field))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TagName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl HandlerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl fmt::Display for TypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for AttributeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for TagName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for HandlerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
