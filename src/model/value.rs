//! Runtime side of the capability model: instances and the values they hold.

use crate::model::identity::{AttributeKey, TypeName};
use crate::model::table::AttributeDeclaration;
use anyhow::{Context, Result, anyhow, bail};
use serde_json::Value as Json;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, RwLock};

/// An instance of some type in the capability model.
///
/// `read` returns the current value held in one declared slot. A type that
/// redeclares an inherited field name owns two slots, and implementors must
/// keep them apart. Instance identity is the address of the implementing
/// value, so two distinct instances must not share one (zero-sized
/// implementors are not supported).
pub trait Component: Send + Sync + fmt::Debug {
    fn type_name(&self) -> &TypeName;

    fn read(&self, slot: FieldSlot<'_>) -> Result<Value>;
}

/// One declared slot of an instance, as seen from the instance's own type.
#[derive(Clone, Copy, Debug)]
pub struct FieldSlot<'a> {
    pub declaration: &'a AttributeDeclaration,
    /// A more-derived type of the instance declares the same field name.
    pub shadowed: bool,
}

impl<'a> FieldSlot<'a> {
    pub fn new(declaration: &'a AttributeDeclaration, shadowed: bool) -> Self {
        Self {
            declaration,
            shadowed,
        }
    }

    pub fn key(&self) -> &'a AttributeKey {
        &self.declaration.key
    }

    pub fn name(&self) -> &'a str {
        &self.declaration.name
    }
}

pub type ComponentRef = Arc<dyn Component>;

/// Identity of a component instance, independent of its value.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct InstanceId(usize);

impl InstanceId {
    pub fn of(component: &dyn Component) -> Self {
        Self(component as *const dyn Component as *const () as usize)
    }
}

/// Current value of a field.
#[derive(Clone, Debug)]
pub enum Value {
    Null,
    Bool(bool),
    Integer(i64),
    Number(f64),
    Text(String),
    List(Vec<Value>),
    Component(ComponentRef),
}

impl Value {
    pub fn component(component: impl Component + 'static) -> Self {
        Value::Component(Arc::new(component))
    }

    pub fn text(value: &str) -> Self {
        Value::Text(value.to_string())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_component(&self) -> Option<&ComponentRef> {
        match self {
            Value::Component(component) => Some(component),
            _ => None,
        }
    }

    /// Detached copy of the value; components collapse to their type name.
    pub fn snapshot(&self) -> ValueSnapshot {
        match self {
            Value::Null => ValueSnapshot::Null,
            Value::Bool(value) => ValueSnapshot::Bool(*value),
            Value::Integer(value) => ValueSnapshot::Integer(*value),
            Value::Number(value) => ValueSnapshot::Number(*value),
            Value::Text(value) => ValueSnapshot::Text(value.clone()),
            Value::List(items) => ValueSnapshot::List(items.iter().map(Value::snapshot).collect()),
            Value::Component(component) => {
                ValueSnapshot::Component(component.type_name().clone())
            }
        }
    }
}

/// Value captured into a descriptor. Holds no reference to any instance.
#[derive(Clone, Debug, PartialEq)]
pub enum ValueSnapshot {
    Null,
    Bool(bool),
    Integer(i64),
    Number(f64),
    Text(String),
    List(Vec<ValueSnapshot>),
    Component(TypeName),
}

impl ValueSnapshot {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ValueSnapshot::Integer(value) => Some(*value as f64),
            ValueSnapshot::Number(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ValueSnapshot::Text(value) => Some(value),
            _ => None,
        }
    }

    /// Comparable JSON form, used when matching against tag parameters.
    pub fn to_json(&self) -> Json {
        match self {
            ValueSnapshot::Null => Json::Null,
            ValueSnapshot::Bool(value) => Json::Bool(*value),
            ValueSnapshot::Integer(value) => Json::from(*value),
            ValueSnapshot::Number(value) => Json::from(*value),
            ValueSnapshot::Text(value) => Json::String(value.clone()),
            ValueSnapshot::List(items) => Json::Array(items.iter().map(Self::to_json).collect()),
            ValueSnapshot::Component(name) => Json::String(name.0.clone()),
        }
    }
}

impl fmt::Display for ValueSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueSnapshot::Null => f.write_str("null"),
            ValueSnapshot::Bool(value) => write!(f, "{value}"),
            ValueSnapshot::Integer(value) => write!(f, "{value}"),
            ValueSnapshot::Number(value) => write!(f, "{value}"),
            ValueSnapshot::Text(value) => write!(f, "{value:?}"),
            ValueSnapshot::List(items) => {
                f.write_str("[")?;
                for (idx, item) in items.iter().enumerate() {
                    if idx > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            ValueSnapshot::Component(name) => write!(f, "<{name}>"),
        }
    }
}

/// Host-neutral component: a type name plus a mutable field map.
///
/// Entries are keyed either by qualified key (`Algorithm.threshold`) or by
/// bare field name (`threshold`). A qualified entry always wins; a bare entry
/// only fills the slot that is not shadowed, which is the most-derived
/// declaration of that name. Unset slots read as [`Value::Null`]. Fields can
/// be replaced after construction, which is how shared-reference graphs
/// (including cycles) are assembled.
pub struct DynamicComponent {
    type_name: TypeName,
    fields: RwLock<BTreeMap<String, Value>>,
}

impl DynamicComponent {
    pub fn new(type_name: &str) -> Self {
        Self {
            type_name: TypeName::new(type_name),
            fields: RwLock::new(BTreeMap::new()),
        }
    }

    pub fn with(mut self, field: &str, value: Value) -> Self {
        self.fields
            .get_mut()
            .unwrap_or_else(|err| err.into_inner())
            .insert(field.to_string(), value);
        self
    }

    pub fn set(&self, field: &str, value: Value) {
        self.fields
            .write()
            .unwrap_or_else(|err| err.into_inner())
            .insert(field.to_string(), value);
    }

    /// Build a component graph from a JSON instance document.
    ///
    /// The document is `{"type": NAME, "fields": {...}}`. Field names may be
    /// bare or qualified, as for [`DynamicComponent::set`]. Nested objects of
    /// the same shape become nested components, integers stay integers, and
    /// every other number becomes a float.
    pub fn from_json(document: &Json) -> Result<ComponentRef> {
        let object = document
            .as_object()
            .ok_or_else(|| anyhow!("instance must be a JSON object"))?;
        if let Some(unknown) = object.keys().find(|key| !matches!(key.as_str(), "type" | "fields")) {
            bail!("unexpected instance key '{unknown}'");
        }
        let type_name = object
            .get("type")
            .and_then(Json::as_str)
            .ok_or_else(|| anyhow!("instance is missing a string 'type'"))?;
        let component = DynamicComponent::new(type_name);
        if let Some(fields) = object.get("fields") {
            let fields = fields
                .as_object()
                .ok_or_else(|| anyhow!("fields of {type_name} must be an object"))?;
            for (name, raw) in fields {
                let value =
                    value_from_json(raw).with_context(|| format!("field {type_name}.{name}"))?;
                component.set(name, value);
            }
        }
        Ok(Arc::new(component))
    }
}

fn value_from_json(raw: &Json) -> Result<Value> {
    Ok(match raw {
        Json::Null => Value::Null,
        Json::Bool(value) => Value::Bool(*value),
        Json::Number(number) => match number.as_i64() {
            Some(value) => Value::Integer(value),
            None => Value::Number(
                number
                    .as_f64()
                    .ok_or_else(|| anyhow!("number {number} is out of range"))?,
            ),
        },
        Json::String(value) => Value::Text(value.clone()),
        Json::Array(items) => Value::List(
            items
                .iter()
                .map(value_from_json)
                .collect::<Result<Vec<_>>>()?,
        ),
        Json::Object(_) => Value::Component(DynamicComponent::from_json(raw)?),
    })
}

impl Component for DynamicComponent {
    fn type_name(&self) -> &TypeName {
        &self.type_name
    }

    fn read(&self, slot: FieldSlot<'_>) -> Result<Value> {
        let fields = self
            .fields
            .read()
            .map_err(|_| anyhow!("field storage of {} is poisoned", self.type_name))?;
        let value = fields
            .get(slot.key().as_str())
            .or_else(|| match slot.shadowed {
                true => None,
                false => fields.get(slot.name()),
            });
        Ok(value.cloned().unwrap_or(Value::Null))
    }
}

// Field values are summarized by name only; shared-reference graphs may be
// cyclic.
impl fmt::Debug for DynamicComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<String> = match self.fields.read() {
            Ok(fields) => fields.keys().cloned().collect(),
            Err(_) => Vec::new(),
        };
        f.debug_struct("DynamicComponent")
            .field("type_name", &self.type_name)
            .field("fields", &names)
            .finish()
    }
}
