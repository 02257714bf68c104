//! Visitor extensions: descending into opaque values.

use crate::error::Result;
use dataobject_model::{Opaque, OpaqueValue, TypeInfo, Value};
use std::marker::PhantomData;

/// Describes how visitors reach the children of an opaque value type and how
/// a replacing visitor rebuilds the value from replaced children.
///
/// Registered through [`TypeInventory::with_extension`](crate::inventory::TypeInventory::with_extension);
/// the extension also applies to registered subtypes of its value type.
pub trait VisitorExtension: Send + Sync {
    /// The value type handled by this extension.
    fn value_type(&self) -> &'static TypeInfo;

    /// Calls `visit_child` for each child of `value`.
    fn visit(
        &self,
        value: &OpaqueValue,
        visit_child: &mut dyn FnMut(&Value) -> Result<()>,
    ) -> Result<()>;

    /// Lets `replace_child` rewrite each child of `value`, then rebuilds the
    /// value. Returns `None` if no child changed and `value` stays as it is.
    fn replace(
        &self,
        value: &OpaqueValue,
        replace_child: &mut dyn FnMut(&mut Value) -> Result<()>,
    ) -> Result<Option<OpaqueValue>>;
}

/// A [`VisitorExtension`] for an opaque type `T` described by two functions:
/// one listing the children, one rebuilding `T` from (replaced) children.
pub struct CompositeExtension<T> {
    value_type: &'static TypeInfo,
    children: fn(&T) -> Vec<Value>,
    rebuild: fn(&T, Vec<Value>) -> Result<T>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Opaque> CompositeExtension<T> {
    pub fn new(
        value_type: &'static TypeInfo,
        children: fn(&T) -> Vec<Value>,
        rebuild: fn(&T, Vec<Value>) -> Result<T>,
    ) -> Self {
        Self {
            value_type,
            children,
            rebuild,
            _marker: PhantomData,
        }
    }
}

impl<T: Opaque> VisitorExtension for CompositeExtension<T> {
    fn value_type(&self) -> &'static TypeInfo {
        self.value_type
    }

    fn visit(
        &self,
        value: &OpaqueValue,
        visit_child: &mut dyn FnMut(&Value) -> Result<()>,
    ) -> Result<()> {
        let Some(composite) = value.downcast_ref::<T>() else {
            return Ok(());
        };
        for child in (self.children)(composite) {
            visit_child(&child)?;
        }
        Ok(())
    }

    fn replace(
        &self,
        value: &OpaqueValue,
        replace_child: &mut dyn FnMut(&mut Value) -> Result<()>,
    ) -> Result<Option<OpaqueValue>> {
        let Some(composite) = value.downcast_ref::<T>() else {
            return Ok(None);
        };
        let original = (self.children)(composite);
        let mut replaced = original.clone();
        for child in &mut replaced {
            replace_child(child)?;
        }
        if replaced == original {
            return Ok(None);
        }
        let rebuilt = (self.rebuild)(composite, replaced)?;
        Ok(Some(OpaqueValue::new(rebuilt)))
    }
}
