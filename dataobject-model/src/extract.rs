//! Typed extraction of values from the tree.

use crate::entity::Entity;
use crate::opaque::Opaque;
use crate::value::Value;

/// A Rust type that can be found inside a [`Value`] tree.
///
/// Used by the visitor helpers to select nodes by type, e.g. every `String`
/// or every entity.
pub trait Extract: Sized + 'static {
    /// Borrows `Self` out of a value, if the value holds one.
    fn extract(value: &Value) -> Option<&Self>;

    /// Borrows `Self` out of an entity reached directly (not through a
    /// `Value`), such as a contribution.
    fn extract_entity(_entity: &Entity) -> Option<&Self> {
        None
    }

    fn into_value(self) -> Value;
}

impl Extract for String {
    fn extract(value: &Value) -> Option<&Self> {
        match value {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    fn into_value(self) -> Value {
        Value::String(self)
    }
}

impl Extract for bool {
    fn extract(value: &Value) -> Option<&Self> {
        match value {
            Value::Bool(b) => Some(b),
            _ => None,
        }
    }

    fn into_value(self) -> Value {
        Value::Bool(self)
    }
}

impl Extract for i64 {
    fn extract(value: &Value) -> Option<&Self> {
        match value {
            Value::Int(i) => Some(i),
            _ => None,
        }
    }

    fn into_value(self) -> Value {
        Value::Int(self)
    }
}

impl Extract for f64 {
    fn extract(value: &Value) -> Option<&Self> {
        match value {
            Value::Float(f) => Some(f),
            _ => None,
        }
    }

    fn into_value(self) -> Value {
        Value::Float(self)
    }
}

impl Extract for Entity {
    fn extract(value: &Value) -> Option<&Self> {
        value.as_entity()
    }

    fn extract_entity(entity: &Entity) -> Option<&Self> {
        Some(entity)
    }

    fn into_value(self) -> Value {
        Value::Entity(self)
    }
}

impl<T: Opaque> Extract for T {
    fn extract(value: &Value) -> Option<&Self> {
        value.as_opaque()?.downcast_ref::<T>()
    }

    fn into_value(self) -> Value {
        Value::opaque(self)
    }
}
