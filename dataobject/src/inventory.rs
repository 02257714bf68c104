//! The type inventory the registry is built from.
//!
//! Everything the registry knows comes from here: the data object types, the
//! type version providers, the visitor extensions (in priority order) and the
//! replacement edges between types.

use crate::visitor::VisitorExtension;
use dataobject_model::{TypeInfo, TypeVersion};
use std::sync::Arc;

#[derive(Clone, Default)]
pub struct TypeInventory {
    types: Vec<&'static TypeInfo>,
    type_versions: Vec<&'static TypeVersion>,
    extensions: Vec<Arc<dyn VisitorExtension>>,
    replacements: Vec<(&'static TypeInfo, &'static TypeInfo)>,
}

impl TypeInventory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a type.
    #[must_use]
    pub fn with_type(mut self, type_info: &'static TypeInfo) -> Self {
        self.types.push(type_info);
        self
    }

    #[must_use]
    pub fn with_types(mut self, types: impl IntoIterator<Item = &'static TypeInfo>) -> Self {
        self.types.extend(types);
        self
    }

    /// Registers a type version provider that no registered type references.
    ///
    /// Providers referenced through [`TypeInfo::type_version`] are picked up
    /// automatically.
    #[must_use]
    pub fn with_type_version(mut self, version: &'static TypeVersion) -> Self {
        self.type_versions.push(version);
        self
    }

    /// Registers a visitor extension. Earlier registrations take precedence.
    #[must_use]
    pub fn with_extension(mut self, extension: impl VisitorExtension + 'static) -> Self {
        self.extensions.push(Arc::new(extension));
        self
    }

    /// Declares that `replacement` replaces `base` when resolving type names.
    #[must_use]
    pub fn with_replacement(
        mut self,
        base: &'static TypeInfo,
        replacement: &'static TypeInfo,
    ) -> Self {
        self.replacements.push((base, replacement));
        self
    }

    pub fn types(&self) -> &[&'static TypeInfo] {
        &self.types
    }

    /// All type version providers: the explicit ones, then those referenced by
    /// registered types, without duplicates.
    pub fn type_versions(&self) -> Vec<&'static TypeVersion> {
        let referenced = self
            .types
            .iter()
            .filter_map(|t| t.declared_type_version());
        let mut out: Vec<&'static TypeVersion> = Vec::new();
        for version in self.type_versions.iter().copied().chain(referenced) {
            if !out.contains(&version) {
                out.push(version);
            }
        }
        out
    }

    pub fn extensions(&self) -> &[Arc<dyn VisitorExtension>] {
        &self.extensions
    }

    pub fn replacements(&self) -> &[(&'static TypeInfo, &'static TypeInfo)] {
        &self.replacements
    }

    /// Registered types that extend or implement `type_info`, excluding itself.
    pub fn known_subtypes(&self, type_info: &TypeInfo) -> Vec<&'static TypeInfo> {
        self.types
            .iter()
            .copied()
            .filter(|t| *t != type_info && t.is_assignable_to(type_info))
            .collect()
    }
}

impl std::fmt::Debug for TypeInventory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypeInventory")
            .field("types", &self.types.len())
            .field("type_versions", &self.type_versions.len())
            .field("extensions", &self.extensions.len())
            .field("replacements", &self.replacements.len())
            .finish()
    }
}
