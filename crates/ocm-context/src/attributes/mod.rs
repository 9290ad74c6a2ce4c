//! Typed, hierarchical attribute storage
//!
//! - [`AttributeScheme`]: the global registry of attribute types
//! - [`Attributes`]: the per-context store, optionally delegating reads to a
//!   parent store

mod scheme;
mod store;

pub use scheme::{
    default_scheme, register_attribute_type, AttributeScheme, AttributeType,
    AttributeTypeRegistration, AttributeValue, OpaqueAttribute, TypedAttribute,
};
pub use store::{Attributes, UpdateHook};
