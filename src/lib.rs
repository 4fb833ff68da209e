//! Descriptor building and handler resolution for configurable components.
//!
//! A host describes its types once in a [`TypeTable`] (or any other
//! [`CapabilityModel`]): which types are configurable, which fields are
//! attributes, and which tags are constraints. From that the crate builds a
//! read-only [`Descriptor`] tree for any configurable instance and picks the
//! best [`HandlerCatalog`] entry for each of its attributes.
//!
//! On-disk documents (type tables, handler catalogs, per-type metadata) are
//! validated against the JSON Schemas under `schema/` before use. The
//! `bindable` helper binary wires everything together for a workspace
//! described by a `bindable.json` manifest.

pub mod config;
pub mod constraint;
pub mod descriptor;
pub mod error;
pub mod handler;
pub mod metadata;
pub mod model;
mod schema_loader;
pub mod workspace;

pub use config::{PathOverrides, WorkspacePaths, find_workspace_root};
pub use constraint::{ConstraintViolation, check_constraints, constraints_of};
pub use descriptor::{AttributeDescriptor, AttributeGroups, Descriptor, DescriptorBuilder, Grouping};
pub use error::{BindError, BindResult};
pub use handler::{
    DedicatedHandler, HandlerCatalog, HandlerResolver, MatchPolicy, TypeHandler, distance,
};
pub use metadata::{
    AttributeLevel, AttributeMetadata, CachedMetadata, DirectoryMetadata, MetadataProvider,
    StaticMetadata, TypeMetadata,
};
pub use model::{
    AttributeDeclaration, AttributeKey, CapabilityModel, Component, ComponentRef,
    DynamicComponent, FieldDef, FieldSlot, HandlerId, Tag, TagKind, TagName, TypeDef, TypeKind, TypeName,
    TypeTable, Value, ValueSnapshot, is_compatible,
};
pub use workspace::{Workspace, load_instance};
