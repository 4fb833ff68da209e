//! Explicit capability table for configurable types.
//!
//! Hosts describe every type once: its kind, hierarchy, whether it is
//! configurable, and the fields it declares (with their tags). The table is
//! validated on construction so hierarchy walks are plain data traversals that
//! cannot loop or dangle. Tables are either authored in code through
//! [`TypeTable::from_defs`] or read from `schema/type_table.schema.json`
//! documents through [`TypeTable::load`].

use crate::model::CapabilityModel;
use crate::model::identity::{AttributeKey, TagName, TypeName};
use crate::schema_loader::{
    DocumentKind, TYPE_TABLE_SCHEMA_VERSION, expect_schema_version, validate_document,
};
use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;
use tracing::debug;

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeKind {
    #[default]
    Class,
    Interface,
}

/// Properties of a tag kind; declared once per table.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct TagKind {
    #[serde(default)]
    pub constraint: bool,
}

impl TagKind {
    pub fn constraint() -> Self {
        Self { constraint: true }
    }

    pub fn marker() -> Self {
        Self { constraint: false }
    }
}

/// A tag attached to a declaration, with optional free-form parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Tag {
    pub name: TagName,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub params: Map<String, Value>,
}

impl Tag {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: TagName::new(name),
            params: Map::new(),
        }
    }

    pub fn param(mut self, key: &str, value: Value) -> Self {
        self.params.insert(key.to_string(), value);
        self
    }
}

/// Field as authored in a [`TypeDef`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FieldDef {
    pub name: String,
    #[serde(rename = "type")]
    pub value_type: TypeName,
    #[serde(default)]
    pub attribute: bool,
    #[serde(default)]
    pub tags: Vec<Tag>,
}

impl FieldDef {
    /// A field exposed as an attribute.
    pub fn attribute(name: &str, value_type: &str) -> Self {
        Self {
            name: name.to_string(),
            value_type: TypeName::new(value_type),
            attribute: true,
            tags: Vec::new(),
        }
    }

    /// A plain field: never described itself, but still descended into when it
    /// holds a configurable instance.
    pub fn plain(name: &str, value_type: &str) -> Self {
        Self {
            attribute: false,
            ..Self::attribute(name, value_type)
        }
    }

    pub fn tag(mut self, tag: Tag) -> Self {
        self.tags.push(tag);
        self
    }
}

/// One entry of the type table.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TypeDef {
    pub name: TypeName,
    #[serde(default)]
    pub kind: TypeKind,
    #[serde(default)]
    pub configurable: bool,
    #[serde(default)]
    pub extends: Option<TypeName>,
    #[serde(default)]
    pub implements: Vec<TypeName>,
    #[serde(default)]
    pub fields: Vec<FieldDef>,
}

impl TypeDef {
    pub fn class(name: &str) -> Self {
        Self {
            name: TypeName::new(name),
            kind: TypeKind::Class,
            configurable: false,
            extends: None,
            implements: Vec::new(),
            fields: Vec::new(),
        }
    }

    pub fn interface(name: &str) -> Self {
        Self {
            kind: TypeKind::Interface,
            ..Self::class(name)
        }
    }

    pub fn configurable(mut self) -> Self {
        self.configurable = true;
        self
    }

    pub fn extends(mut self, parent: &str) -> Self {
        self.extends = Some(TypeName::new(parent));
        self
    }

    pub fn implements(mut self, interface: &str) -> Self {
        self.implements.push(TypeName::new(interface));
        self
    }

    pub fn field(mut self, field: FieldDef) -> Self {
        self.fields.push(field);
        self
    }
}

/// A named, typed slot on a configurable type.
#[derive(Clone, Debug, PartialEq)]
pub struct AttributeDeclaration {
    pub name: String,
    pub key: AttributeKey,
    pub declaring_type: TypeName,
    pub value_type: TypeName,
    pub attribute: bool,
    pub tags: Vec<Tag>,
}

impl AttributeDeclaration {
    fn from_field(declaring_type: &TypeName, field: &FieldDef) -> Self {
        Self {
            name: field.name.clone(),
            key: AttributeKey::qualified(declaring_type, &field.name),
            declaring_type: declaring_type.clone(),
            value_type: field.value_type.clone(),
            attribute: field.attribute,
            tags: field.tags.clone(),
        }
    }

    pub fn has_tag(&self, tag: &TagName) -> bool {
        self.tags.iter().any(|t| &t.name == tag)
    }
}

#[derive(Deserialize)]
struct TypeTableDocument {
    #[serde(default)]
    tags: BTreeMap<TagName, TagKind>,
    #[serde(default)]
    types: Vec<TypeDef>,
}

/// Validated type table keyed by type name.
#[derive(Debug, Default)]
pub struct TypeTable {
    tags: BTreeMap<TagName, TagKind>,
    types: BTreeMap<TypeName, TypeDef>,
    declarations: BTreeMap<TypeName, Vec<AttributeDeclaration>>,
}

impl TypeTable {
    /// Load and validate a type table document from disk.
    pub fn load(path: &Path) -> Result<Self> {
        let data =
            fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        let value: Value =
            serde_json::from_str(&data).with_context(|| format!("parsing {}", path.display()))?;
        validate_document(DocumentKind::TypeTable, &value, path)?;
        expect_schema_version(&value, TYPE_TABLE_SCHEMA_VERSION, path)?;
        let document: TypeTableDocument = serde_json::from_value(value)
            .with_context(|| format!("decoding type table {}", path.display()))?;
        let table = Self::from_defs(document.tags, document.types)
            .with_context(|| format!("validating type table {}", path.display()))?;
        debug!(path = %path.display(), types = table.types.len(), "loaded type table");
        Ok(table)
    }

    /// Build a table from definitions authored in code.
    ///
    /// Applies the same checks as [`TypeTable::load`]: unique names, known tag
    /// kinds, well-formed and acyclic hierarchies.
    pub fn from_defs(
        tags: BTreeMap<TagName, TagKind>,
        defs: impl IntoIterator<Item = TypeDef>,
    ) -> Result<Self> {
        let mut types = BTreeMap::new();
        for mut def in defs {
            if def.name.0.trim().is_empty() {
                bail!("encountered type with no name");
            }
            if def.name.is_universal() {
                bail!("type '{}' is implicit and must not be declared", def.name);
            }
            if def.extends.as_ref().is_some_and(TypeName::is_universal) {
                def.extends = None;
            }
            if types.contains_key(&def.name) {
                bail!("duplicate type name {}", def.name);
            }
            types.insert(def.name.clone(), def);
        }

        for def in types.values() {
            validate_fields(def, &tags)?;
            validate_parents(def, &types)?;
        }
        reject_cycles(&types)?;

        let declarations = types
            .values()
            .map(|def| {
                let decls = def
                    .fields
                    .iter()
                    .map(|field| AttributeDeclaration::from_field(&def.name, field))
                    .collect();
                (def.name.clone(), decls)
            })
            .collect();

        Ok(Self {
            tags,
            types,
            declarations,
        })
    }

    /// Declarations made directly on `name`, in authored order.
    pub fn own_declarations(&self, name: &TypeName) -> &[AttributeDeclaration] {
        self.declarations
            .get(name)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    fn parent(&self, name: &TypeName) -> Option<&TypeName> {
        self.types.get(name).and_then(|def| def.extends.as_ref())
    }

    fn direct_interfaces(&self, name: &TypeName) -> &[TypeName] {
        self.types
            .get(name)
            .map(|def| def.implements.as_slice())
            .unwrap_or_default()
    }

    fn is_interface(&self, name: &TypeName) -> bool {
        self.types
            .get(name)
            .is_some_and(|def| def.kind == TypeKind::Interface)
    }

    /// Depth-first, pre-order walk over the interfaces reachable from `name`.
    fn walk_interfaces(
        &self,
        name: &TypeName,
        visited: &mut BTreeSet<TypeName>,
        visit: &mut impl FnMut(&TypeName),
    ) {
        for interface in self.direct_interfaces(name) {
            if visited.insert(interface.clone()) {
                visit(interface);
                self.walk_interfaces(interface, visited, visit);
            }
        }
    }

    /// `name` followed by its ancestor classes, nearest first.
    fn class_chain(&self, name: &TypeName) -> Vec<TypeName> {
        let mut chain = vec![name.clone()];
        chain.extend(self.superclasses_of(name));
        chain
    }
}

impl CapabilityModel for TypeTable {
    fn is_configurable(&self, name: &TypeName) -> bool {
        self.types.get(name).is_some_and(|def| def.configurable)
    }

    fn declarations_of(&self, name: &TypeName) -> Vec<&AttributeDeclaration> {
        self.configurable_hierarchy_of(name)
            .iter()
            .flat_map(|ty| self.own_declarations(ty))
            .collect()
    }

    fn configurable_hierarchy_of(&self, name: &TypeName) -> Vec<TypeName> {
        let mut hierarchy = Vec::new();
        let mut listed = BTreeSet::new();
        let mut visited_interfaces = BTreeSet::new();
        for class in self.class_chain(name) {
            if self.is_configurable(&class) && listed.insert(class.clone()) {
                hierarchy.push(class.clone());
            }
            self.walk_interfaces(&class, &mut visited_interfaces, &mut |interface| {
                if self.is_configurable(interface) && listed.insert(interface.clone()) {
                    hierarchy.push(interface.clone());
                }
            });
        }
        hierarchy
    }

    fn superclasses_of(&self, name: &TypeName) -> Vec<TypeName> {
        if name.is_universal() || self.is_interface(name) {
            return Vec::new();
        }
        let mut chain = Vec::new();
        let mut current = self.parent(name);
        while let Some(parent) = current {
            chain.push(parent.clone());
            current = self.parent(parent);
        }
        chain.push(TypeName::universal());
        chain
    }

    fn interfaces_of(&self, name: &TypeName) -> Vec<TypeName> {
        let mut interfaces = Vec::new();
        let mut visited = BTreeSet::new();
        for class in self.class_chain(name) {
            self.walk_interfaces(&class, &mut visited, &mut |interface| {
                interfaces.push(interface.clone());
            });
        }
        interfaces
    }

    fn is_constraint_tag(&self, tag: &TagName) -> bool {
        self.tags.get(tag).is_some_and(|kind| kind.constraint)
    }
}

fn validate_fields(def: &TypeDef, tags: &BTreeMap<TagName, TagKind>) -> Result<()> {
    let mut names = BTreeSet::new();
    for field in &def.fields {
        if field.name.trim().is_empty() {
            bail!("type {} declares a field with no name", def.name);
        }
        if !names.insert(field.name.as_str()) {
            bail!("type {} declares field '{}' twice", def.name, field.name);
        }
        for tag in &field.tags {
            if !tags.contains_key(&tag.name) {
                bail!(
                    "field {}.{} references unknown tag '{}'",
                    def.name,
                    field.name,
                    tag.name
                );
            }
        }
    }
    Ok(())
}

fn validate_parents(def: &TypeDef, types: &BTreeMap<TypeName, TypeDef>) -> Result<()> {
    if let Some(parent) = &def.extends {
        if def.kind == TypeKind::Interface {
            bail!(
                "interface {} must list super-interfaces under implements",
                def.name
            );
        }
        match types.get(parent) {
            Some(parent_def) if parent_def.kind == TypeKind::Class => {}
            Some(_) => bail!("type {} extends interface {}", def.name, parent),
            None => bail!("type {} extends unknown type {}", def.name, parent),
        }
    }
    for interface in &def.implements {
        match types.get(interface) {
            Some(target) if target.kind == TypeKind::Interface => {}
            Some(_) => bail!("type {} implements class {}", def.name, interface),
            None => bail!("type {} implements unknown type {}", def.name, interface),
        }
    }
    Ok(())
}

fn reject_cycles(types: &BTreeMap<TypeName, TypeDef>) -> Result<()> {
    // Class chains: follow `extends` and stop once a name repeats.
    for def in types.values() {
        let mut seen = BTreeSet::from([&def.name]);
        let mut current = def.extends.as_ref();
        while let Some(parent) = current {
            if !seen.insert(parent) {
                bail!("inheritance cycle through {}", def.name);
            }
            current = types.get(parent).and_then(|d| d.extends.as_ref());
        }
    }

    // Interface graphs: depth-first search with an explicit path set.
    fn visit<'a>(
        name: &'a TypeName,
        types: &'a BTreeMap<TypeName, TypeDef>,
        path: &mut Vec<&'a TypeName>,
        done: &mut BTreeSet<&'a TypeName>,
    ) -> Result<()> {
        if done.contains(name) {
            return Ok(());
        }
        if path.contains(&name) {
            bail!("interface cycle through {}", name);
        }
        path.push(name);
        if let Some(def) = types.get(name) {
            for interface in &def.implements {
                visit(interface, types, path, done)?;
            }
        }
        path.pop();
        done.insert(name);
        Ok(())
    }

    let mut done = BTreeSet::new();
    for name in types.keys() {
        visit(name, types, &mut Vec::new(), &mut done)?;
    }
    Ok(())
}
