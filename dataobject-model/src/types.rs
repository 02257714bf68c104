//! Static type descriptors.
//!
//! A data object type is declared once as a `static` [`TypeInfo`] and
//! referenced everywhere as `&'static TypeInfo`. The descriptor carries what a
//! reflective runtime would discover at start-up: the superclass and
//! implemented interfaces, the serialization type name, the type version
//! provider, the containers a contribution attaches to, and the declared
//! attribute accessors.
//!
//! ```
//! use dataobject_model::{AttributeDecl, TypeInfo, ValueType, DO_ENTITY};
//!
//! static LABEL: TypeInfo = TypeInfo::entity("example.Label")
//!     .extends(&DO_ENTITY)
//!     .type_name("example.Label")
//!     .attributes(&[AttributeDecl::value("text", ValueType::String)]);
//!
//! assert_eq!(LABEL.declared_type_name(), Some("example.Label"));
//! assert!(LABEL.is_assignable_to(&DO_ENTITY));
//! ```

use crate::namespace::NamespaceVersion;
use crate::node::NodeKind;
use crate::opaque::OpaqueValue;
use std::collections::HashSet;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Decodes the JSON form of an opaque value back into the value.
pub type OpaqueDecoder = fn(&serde_json::Value) -> crate::Result<OpaqueValue>;

/// The role a type plays in the data object hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeKind {
    /// A concrete entity type.
    Entity,
    /// A concrete entity type that is mixed into container entities.
    Contribution,
    /// An abstract entity base type.
    Abstract,
    /// An interface implemented by entity types.
    Interface,
    /// A non-entity value type (typed ids, composites) carried by `Value::Opaque`.
    Value,
}

impl TypeKind {
    /// Returns true for every kind that describes an entity shape.
    #[must_use]
    pub const fn is_data_object(self) -> bool {
        !matches!(self, TypeKind::Value)
    }

    /// Returns true if instances of this kind can exist.
    #[must_use]
    pub const fn is_instantiable(self) -> bool {
        matches!(
            self,
            TypeKind::Entity | TypeKind::Contribution | TypeKind::Value
        )
    }
}

/// A type version provider.
///
/// Providers are declared separately from the entities that reference them,
/// so several entity types of one release can share a provider.
pub struct TypeVersion {
    id: &'static str,
    version: Option<NamespaceVersion>,
}

impl TypeVersion {
    #[must_use]
    pub const fn new(id: &'static str, version: NamespaceVersion) -> Self {
        Self {
            id,
            version: Some(version),
        }
    }

    /// A provider that does not declare a version. Registering one is a
    /// configuration error; it exists so such inventories can be expressed.
    #[must_use]
    pub const fn unversioned(id: &'static str) -> Self {
        Self { id, version: None }
    }

    pub const fn id(&self) -> &'static str {
        self.id
    }

    pub const fn version(&self) -> Option<&NamespaceVersion> {
        self.version.as_ref()
    }
}

impl PartialEq for TypeVersion {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeVersion {}

impl Hash for TypeVersion {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for TypeVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeVersion")
            .field("id", &self.id)
            .field("version", &self.version)
            .finish()
    }
}

/// The declared value type of an attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    Any,
    Bool,
    Int,
    Float,
    String,
    /// A generic string-keyed map.
    Map,
    /// A nested entity of (at least) the given type.
    Entity(&'static TypeInfo),
    /// An opaque value of the given value type.
    Opaque(&'static TypeInfo),
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueType::Any => f.write_str("any"),
            ValueType::Bool => f.write_str("bool"),
            ValueType::Int => f.write_str("int"),
            ValueType::Float => f.write_str("float"),
            ValueType::String => f.write_str("string"),
            ValueType::Map => f.write_str("map"),
            ValueType::Entity(t) => write!(f, "entity<{}>", t.id()),
            ValueType::Opaque(t) => write!(f, "opaque<{}>", t.id()),
        }
    }
}

/// A declared attribute accessor of an entity type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttributeDecl {
    accessor: &'static str,
    name: Option<&'static str>,
    kind: NodeKind,
    value_type: ValueType,
    format: Option<&'static str>,
}

impl AttributeDecl {
    const fn new(accessor: &'static str, kind: NodeKind, value_type: ValueType) -> Self {
        Self {
            accessor,
            name: None,
            kind,
            value_type,
            format: None,
        }
    }

    pub const fn value(accessor: &'static str, value_type: ValueType) -> Self {
        Self::new(accessor, NodeKind::Value, value_type)
    }

    pub const fn list(accessor: &'static str, value_type: ValueType) -> Self {
        Self::new(accessor, NodeKind::List, value_type)
    }

    pub const fn set(accessor: &'static str, value_type: ValueType) -> Self {
        Self::new(accessor, NodeKind::Set, value_type)
    }

    pub const fn collection(accessor: &'static str, value_type: ValueType) -> Self {
        Self::new(accessor, NodeKind::Collection, value_type)
    }

    /// Overrides the serialized attribute name (defaults to the accessor name).
    pub const fn named(self, name: &'static str) -> Self {
        Self {
            name: Some(name),
            ..self
        }
    }

    /// Attaches a serialization format pattern (e.g. a date pattern).
    pub const fn format(self, pattern: &'static str) -> Self {
        Self {
            format: Some(pattern),
            ..self
        }
    }

    pub const fn accessor(&self) -> &'static str {
        self.accessor
    }

    /// The resolved attribute name: the override if present, else the accessor.
    pub const fn attribute_name(&self) -> &'static str {
        match self.name {
            Some(name) => name,
            None => self.accessor,
        }
    }

    pub const fn kind(&self) -> NodeKind {
        self.kind
    }

    pub const fn value_type(&self) -> ValueType {
        self.value_type
    }

    pub const fn format_pattern(&self) -> Option<&'static str> {
        self.format
    }
}

/// Static descriptor of a data object (or opaque value) type.
///
/// Identity, equality and hashing use the qualified [`id`](Self::id) only.
pub struct TypeInfo {
    id: &'static str,
    kind: TypeKind,
    parent: Option<&'static TypeInfo>,
    interfaces: &'static [&'static TypeInfo],
    type_name: Option<&'static str>,
    type_version: Option<&'static TypeVersion>,
    requires_type_version: bool,
    contributes_to: Option<&'static [&'static TypeInfo]>,
    attributes: &'static [AttributeDecl],
    decoder: Option<OpaqueDecoder>,
}

/// The generic, untyped entity type.
pub static DO_ENTITY: TypeInfo = TypeInfo::entity("dataobject.DoEntity");

impl TypeInfo {
    const fn new(id: &'static str, kind: TypeKind) -> Self {
        Self {
            id,
            kind,
            parent: None,
            interfaces: &[],
            type_name: None,
            type_version: None,
            requires_type_version: false,
            contributes_to: None,
            attributes: &[],
            decoder: None,
        }
    }

    pub const fn entity(id: &'static str) -> Self {
        Self::new(id, TypeKind::Entity)
    }

    pub const fn contribution(id: &'static str) -> Self {
        Self::new(id, TypeKind::Contribution)
    }

    pub const fn abstract_entity(id: &'static str) -> Self {
        Self::new(id, TypeKind::Abstract)
    }

    pub const fn interface(id: &'static str) -> Self {
        Self::new(id, TypeKind::Interface)
    }

    pub const fn value(id: &'static str) -> Self {
        Self::new(id, TypeKind::Value)
    }

    pub const fn extends(self, parent: &'static TypeInfo) -> Self {
        Self {
            parent: Some(parent),
            ..self
        }
    }

    pub const fn implements(self, interfaces: &'static [&'static TypeInfo]) -> Self {
        Self { interfaces, ..self }
    }

    pub const fn type_name(self, name: &'static str) -> Self {
        Self {
            type_name: Some(name),
            ..self
        }
    }

    pub const fn type_version(self, version: &'static TypeVersion) -> Self {
        Self {
            type_version: Some(version),
            ..self
        }
    }

    /// Every instantiable subtype of this type must declare a type version.
    pub const fn requires_type_version(self) -> Self {
        Self {
            requires_type_version: true,
            ..self
        }
    }

    pub const fn contributes_to(self, containers: &'static [&'static TypeInfo]) -> Self {
        Self {
            contributes_to: Some(containers),
            ..self
        }
    }

    pub const fn attributes(self, attributes: &'static [AttributeDecl]) -> Self {
        Self { attributes, ..self }
    }

    pub const fn decoder(self, decoder: OpaqueDecoder) -> Self {
        Self {
            decoder: Some(decoder),
            ..self
        }
    }

    pub const fn id(&self) -> &'static str {
        self.id
    }

    pub const fn kind(&self) -> TypeKind {
        self.kind
    }

    pub const fn parent(&self) -> Option<&'static TypeInfo> {
        self.parent
    }

    pub const fn interfaces(&self) -> &'static [&'static TypeInfo] {
        self.interfaces
    }

    pub const fn declared_type_name(&self) -> Option<&'static str> {
        self.type_name
    }

    pub const fn declared_type_version(&self) -> Option<&'static TypeVersion> {
        self.type_version
    }

    pub const fn is_type_version_required(&self) -> bool {
        self.requires_type_version
    }

    pub const fn declared_contributes_to(&self) -> Option<&'static [&'static TypeInfo]> {
        self.contributes_to
    }

    pub const fn declared_attributes(&self) -> &'static [AttributeDecl] {
        self.attributes
    }

    pub const fn opaque_decoder(&self) -> Option<OpaqueDecoder> {
        self.decoder
    }

    /// Iterates the superclass chain, starting with `self`.
    pub fn ancestors(&'static self) -> impl Iterator<Item = &'static TypeInfo> {
        std::iter::successors(Some(self), |t| t.parent)
    }

    /// Returns true if `self` is `other`, or extends or implements it
    /// (transitively).
    pub fn is_assignable_to(&self, other: &TypeInfo) -> bool {
        if self == other {
            return true;
        }
        self.parent.is_some_and(|p| p.is_assignable_to(other))
            || self.interfaces.iter().any(|i| i.is_assignable_to(other))
    }

    /// Collects `self` and all data object superclasses and interfaces.
    pub fn hierarchy(&'static self) -> Vec<&'static TypeInfo> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        collect_hierarchy(self, &mut seen, &mut out);
        out
    }
}

fn collect_hierarchy(
    t: &'static TypeInfo,
    seen: &mut HashSet<&'static str>,
    out: &mut Vec<&'static TypeInfo>,
) {
    if !seen.insert(t.id) {
        return;
    }
    out.push(t);
    if let Some(parent) = t.parent.filter(|p| p.kind.is_data_object()) {
        collect_hierarchy(parent, seen, out);
    }
    for iface in t.interfaces.iter().filter(|i| i.kind.is_data_object()) {
        collect_hierarchy(iface, seen, out);
    }
}

impl PartialEq for TypeInfo {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeInfo {}

impl Hash for TypeInfo {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for TypeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeInfo")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("parent", &self.parent.map(|p| p.id))
            .field("type_name", &self.type_name)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for TypeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id)
    }
}
