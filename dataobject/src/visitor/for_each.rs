//! Visitor entry points that select values by Rust type.

use super::{
    DataObjectVisitor, Replaceable, ReplacingVisitor, Visitable, walk_entity, walk_entity_mut,
    walk_value, walk_value_mut,
};
use crate::error::Result;
use crate::registry::{self, DataObjectRegistry};
use dataobject_model::{Entity, Extract, TypeInfo, Value};
use std::marker::PhantomData;

/// Visitor entry points bound to a registry.
///
/// `T` selects the values of interest through [`Extract`]: `String`, `bool`,
/// `i64`, `f64`, [`Entity`] or any opaque type.
#[derive(Debug, Clone, Copy)]
pub struct DataObjectVisitors<'r> {
    registry: Option<&'r DataObjectRegistry>,
}

impl DataObjectVisitors<'static> {
    /// Entry points using the process-wide registry.
    pub fn global() -> Self {
        Self {
            registry: registry::global(),
        }
    }
}

impl<'r> DataObjectVisitors<'r> {
    pub fn with_registry(registry: &'r DataObjectRegistry) -> Self {
        Self {
            registry: Some(registry),
        }
    }

    /// Calls `f` for each `T` in the tree. Matches are not searched for
    /// nested matches.
    pub fn for_each<T: Extract>(
        &self,
        root: &(impl Visitable + ?Sized),
        mut f: impl FnMut(&T),
    ) -> Result<()> {
        self.for_each_conditionally_rec(root, |found: &T| {
            f(found);
            false
        })
    }

    /// Calls `f` for each `T` in the tree, including `T`s nested in matches.
    pub fn for_each_rec<T: Extract>(
        &self,
        root: &(impl Visitable + ?Sized),
        mut f: impl FnMut(&T),
    ) -> Result<()> {
        self.for_each_conditionally_rec(root, |found: &T| {
            f(found);
            true
        })
    }

    /// Calls `f` for each `T` in the tree; a match is searched for nested
    /// matches only if `f` returns true.
    pub fn for_each_conditionally_rec<T: Extract>(
        &self,
        root: &(impl Visitable + ?Sized),
        f: impl FnMut(&T) -> bool,
    ) -> Result<()> {
        let mut visitor = ForEach {
            registry: self.registry,
            f,
            _marker: PhantomData,
        };
        root.accept(&mut visitor)
    }

    /// Calls `f` for each entity whose type is assignable to `type_info`.
    /// Matching entities are not searched for nested matches.
    pub fn for_each_entity_of(
        &self,
        root: &(impl Visitable + ?Sized),
        type_info: &TypeInfo,
        mut f: impl FnMut(&Entity),
    ) -> Result<()> {
        self.for_each_conditionally_rec(root, |entity: &Entity| {
            if entity.type_info().is_assignable_to(type_info) {
                f(entity);
                false
            } else {
                true
            }
        })
    }

    /// Replaces each `T` in the tree with the result of `f`. Replacements are
    /// not searched for further matches.
    pub fn replace_each<T: Extract>(
        &self,
        root: &mut (impl Replaceable + ?Sized),
        f: impl FnMut(&T) -> T,
    ) -> Result<()> {
        let mut visitor = ReplaceEach {
            registry: self.registry,
            f,
            _marker: PhantomData,
        };
        root.accept_replacing(&mut visitor)
    }
}

/// [`DataObjectVisitors::for_each`] using the process-wide registry.
pub fn for_each<T: Extract>(root: &(impl Visitable + ?Sized), f: impl FnMut(&T)) -> Result<()> {
    DataObjectVisitors::global().for_each(root, f)
}

pub fn for_each_rec<T: Extract>(
    root: &(impl Visitable + ?Sized),
    f: impl FnMut(&T),
) -> Result<()> {
    DataObjectVisitors::global().for_each_rec(root, f)
}

pub fn for_each_conditionally_rec<T: Extract>(
    root: &(impl Visitable + ?Sized),
    f: impl FnMut(&T) -> bool,
) -> Result<()> {
    DataObjectVisitors::global().for_each_conditionally_rec(root, f)
}

pub fn for_each_entity_of(
    root: &(impl Visitable + ?Sized),
    type_info: &TypeInfo,
    f: impl FnMut(&Entity),
) -> Result<()> {
    DataObjectVisitors::global().for_each_entity_of(root, type_info, f)
}

pub fn replace_each<T: Extract>(
    root: &mut (impl Replaceable + ?Sized),
    f: impl FnMut(&T) -> T,
) -> Result<()> {
    DataObjectVisitors::global().replace_each(root, f)
}

// Entities are matched in the entity hooks only, so one reached through a
// `Value` is not tested twice.
struct ForEach<'r, T, F> {
    registry: Option<&'r DataObjectRegistry>,
    f: F,
    _marker: PhantomData<fn(&T)>,
}

impl<T, F> DataObjectVisitor for ForEach<'_, T, F>
where
    T: Extract,
    F: FnMut(&T) -> bool,
{
    fn registry(&self) -> Option<&DataObjectRegistry> {
        self.registry
    }

    fn visit(&mut self, value: &Value) -> Result<()> {
        if !matches!(value, Value::Entity(_)) {
            if let Some(found) = T::extract(value) {
                if (self.f)(found) {
                    walk_value(self, value)?;
                }
                return Ok(());
            }
        }
        walk_value(self, value)
    }

    fn visit_entity(&mut self, entity: &Entity) -> Result<()> {
        if let Some(found) = T::extract_entity(entity) {
            if !(self.f)(found) {
                return Ok(());
            }
        }
        walk_entity(self, entity)
    }
}

struct ReplaceEach<'r, T, F> {
    registry: Option<&'r DataObjectRegistry>,
    f: F,
    _marker: PhantomData<fn(&T)>,
}

impl<T, F> ReplacingVisitor for ReplaceEach<'_, T, F>
where
    T: Extract,
    F: FnMut(&T) -> T,
{
    fn registry(&self) -> Option<&DataObjectRegistry> {
        self.registry
    }

    fn replace(&mut self, value: &mut Value) -> Result<()> {
        if !matches!(value, Value::Entity(_)) {
            if let Some(found) = T::extract(value) {
                let replacement = (self.f)(found).into_value();
                *value = replacement;
                return Ok(());
            }
        }
        walk_value_mut(self, value)
    }

    fn replace_entity(&mut self, entity: &mut Entity) -> Result<()> {
        if let Some(found) = T::extract_entity(entity) {
            // Only entities can take an entity's place.
            if let Value::Entity(replacement) = (self.f)(found).into_value() {
                *entity = replacement;
            }
            return Ok(());
        }
        walk_entity_mut(self, entity)
    }
}
