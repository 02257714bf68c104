//! Opaque values: user types that are not entities but live inside the tree.
//!
//! Typed identifiers and composite identifiers are the usual examples. The
//! tree treats them as leaves unless a visitor extension is registered for
//! their type, in which case visitors can descend into (and rebuild) them.

use crate::types::TypeInfo;
use std::any::Any;
use std::fmt;

/// A user value type that can be stored as [`Value::Opaque`](crate::Value::Opaque).
pub trait Opaque: Any + Clone + PartialEq + fmt::Debug + Send + Sync {
    /// The static descriptor of this value type. Must have kind
    /// [`TypeKind::Value`](crate::TypeKind::Value).
    fn type_info(&self) -> &'static TypeInfo;

    /// The JSON form written by codecs.
    fn to_json(&self) -> serde_json::Value;
}

trait DynOpaque: Any + fmt::Debug + Send + Sync {
    fn type_info(&self) -> &'static TypeInfo;
    fn to_json(&self) -> serde_json::Value;
    fn clone_box(&self) -> Box<dyn DynOpaque>;
    fn dyn_eq(&self, other: &dyn DynOpaque) -> bool;
    fn as_any(&self) -> &dyn Any;
}

impl<T: Opaque> DynOpaque for T {
    fn type_info(&self) -> &'static TypeInfo {
        Opaque::type_info(self)
    }

    fn to_json(&self) -> serde_json::Value {
        Opaque::to_json(self)
    }

    fn clone_box(&self) -> Box<dyn DynOpaque> {
        Box::new(self.clone())
    }

    fn dyn_eq(&self, other: &dyn DynOpaque) -> bool {
        other
            .as_any()
            .downcast_ref::<T>()
            .is_some_and(|other| self == other)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// A type-erased [`Opaque`] value.
pub struct OpaqueValue(Box<dyn DynOpaque>);

impl OpaqueValue {
    pub fn new<T: Opaque>(value: T) -> Self {
        Self(Box::new(value))
    }

    pub fn type_info(&self) -> &'static TypeInfo {
        self.0.type_info()
    }

    pub fn to_json(&self) -> serde_json::Value {
        self.0.to_json()
    }

    pub fn downcast_ref<T: Opaque>(&self) -> Option<&T> {
        self.0.as_any().downcast_ref::<T>()
    }

    pub fn is<T: Opaque>(&self) -> bool {
        self.downcast_ref::<T>().is_some()
    }
}

impl Clone for OpaqueValue {
    fn clone(&self) -> Self {
        Self(self.0.clone_box())
    }
}

impl PartialEq for OpaqueValue {
    fn eq(&self, other: &Self) -> bool {
        self.0.dyn_eq(other.0.as_ref())
    }
}

impl fmt::Debug for OpaqueValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.0, f)
    }
}
