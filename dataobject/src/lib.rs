//! Data object runtime.
//!
//! Builds on [`dataobject_model`] with:
//! - [`registry`]: the schema registry (type names, type versions,
//!   contributions, visitor extensions, attribute descriptors)
//! - [`visitor`]: read-only and replacing traversal, plus typed entry points
//! - [`codec`]: the JSON codec
//! - [`helper`]: clone, normalize, clean, ensure and extend
//! - [`migration`]: structure migration handlers per type version
//! - [`config`]: TOML configuration for all of the above

pub mod codec;
pub mod config;
mod error;
pub mod helper;
pub mod inventory;
pub mod migration;
pub mod namespace;
pub mod registry;
pub mod visitor;

pub use dataobject_model as model;
pub use dataobject_model::{
    AttributeDecl, AttributeNode, CollectionNode, DO_ENTITY, Entity, Extract, NamespaceVersion,
    NodeKind, Opaque, OpaqueValue, TypeInfo, TypeKind, TypeVersion, Value, ValueNode, ValueType,
};

pub use codec::{Codec, JsonCodec};
pub use config::Config;
pub use error::{Error, Result};
pub use helper::DataObjectHelper;
pub use inventory::TypeInventory;
pub use migration::{MigrationInventory, NextMigration, StructureMigrationHandler};
pub use registry::{AttributeDescriptor, DataObjectRegistry};
pub use visitor::{DataObjectVisitor, DataObjectVisitors, ReplacingVisitor, VisitorExtension};
