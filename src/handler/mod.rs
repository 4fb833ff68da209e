//! Handler catalog and resolution.

pub mod catalog;
pub mod resolver;

pub use catalog::{DedicatedHandler, HandlerCatalog, MatchPolicy, TypeHandler};
pub use resolver::{HandlerResolver, attribute_key_for, distance};
