//! Core data object model.
//!
//! Defines the loosely-typed but introspectable document tree that the rest of
//! the data object stack operates on:
//! - [`Entity`]: a named, ordered container of attribute nodes plus contributions
//! - [`AttributeNode`]: a value, list, set or collection node with lazy presence
//! - [`Value`]: the dynamic values stored in nodes (scalars, arrays, maps,
//!   nested entities and opaque user values)
//! - [`TypeInfo`]: the static descriptor of a data object type: type name,
//!   type version, contribution edges and declared attributes
//!
//! Nothing in this crate knows about serialization formats or the schema
//! registry; those live in the `dataobject` crate.

mod entity;
mod extract;
mod namespace;
mod node;
mod opaque;
mod types;
mod value;

pub use entity::Entity;
pub use extract::Extract;
pub use namespace::NamespaceVersion;
pub use node::{AttributeNode, CollectionNode, ItemsMut, NodeKind, ValueNode};
pub use opaque::{Opaque, OpaqueValue};
pub use types::{
    AttributeDecl, DO_ENTITY, OpaqueDecoder, TypeInfo, TypeKind, TypeVersion, ValueType,
};
pub use value::Value;

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by the data object model.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    #[error("attribute '{attribute}': expected {expected}, found {actual}")]
    TypeMismatch {
        attribute: String,
        expected: String,
        actual: String,
    },

    #[error("node for attribute '{attribute}' is already attached to an entity")]
    Ownership { attribute: String },

    #[error("assertion failed for attribute '{attribute}': {reason}")]
    Assertion { attribute: String, reason: String },

    #[error("'{0}' is not a contribution type")]
    InvalidContribution(String),

    #[error("invalid namespace version: {0}")]
    InvalidNamespaceVersion(String),

    #[error("invalid value for {type_id}: {reason}")]
    InvalidValue { type_id: String, reason: String },
}

impl Error {
    pub(crate) fn mismatch(
        attribute: &str,
        expected: impl std::fmt::Display,
        actual: impl std::fmt::Display,
    ) -> Self {
        Self::TypeMismatch {
            attribute: attribute.to_string(),
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }
}
