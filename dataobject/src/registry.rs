//! The data object registry.
//!
//! Built once from a [`TypeInventory`] and immutable afterwards, except for
//! the attribute descriptor cache, which is filled lazily per type. Build
//! order and validation:
//!
//! 1. type names (unique per type, unique per name)
//! 2. type versions (a type is versioned at most once)
//! 3. contribution edges
//! 4. type version providers: every provider has a well-formed version, its namespace is
//!    registered, and no two providers share a version
//! 5. types below a `requires_type_version` ancestor declare a version
//! 6. visitor extensions (first registration per type wins)
//! 7. replacement edges
//!
//! Any violation is an [`Error::Configuration`].

use crate::config::{AmbiguityPolicy, Config};
use crate::error::{Error, Result};
use crate::inventory::TypeInventory;
use crate::namespace::Namespaces;
use crate::visitor::VisitorExtension;
use dataobject_model::{NamespaceVersion, NodeKind, TypeInfo, TypeKind, ValueType};
use indexmap::IndexMap;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};
use tracing::{debug, info, warn};

/// Attribute descriptors of one type, keyed by attribute name.
pub type AttributeDescriptors = IndexMap<String, AttributeDescriptor>;

/// Describes one declared attribute of an entity type.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeDescriptor {
    name: &'static str,
    accessor: &'static str,
    kind: NodeKind,
    value_type: ValueType,
    format_pattern: Option<&'static str>,
    declared_by: &'static TypeInfo,
}

impl AttributeDescriptor {
    /// The serialized attribute name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn accessor(&self) -> &'static str {
        self.accessor
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    pub fn value_type(&self) -> ValueType {
        self.value_type
    }

    pub fn format_pattern(&self) -> Option<&'static str> {
        self.format_pattern
    }

    /// The type whose declaration won for this accessor.
    pub fn declared_by(&self) -> &'static TypeInfo {
        self.declared_by
    }
}

pub struct DataObjectRegistry {
    type_name_to_type: HashMap<&'static str, &'static TypeInfo>,
    type_to_type_name: HashMap<&'static TypeInfo, &'static str>,
    type_versions: HashMap<&'static TypeInfo, NamespaceVersion>,
    ordered_versions: Vec<NamespaceVersion>,
    contribution_to_containers: HashMap<&'static TypeInfo, Vec<&'static TypeInfo>>,
    container_to_contributions: HashMap<&'static TypeInfo, Vec<&'static TypeInfo>>,
    visitor_extensions: HashMap<&'static TypeInfo, Arc<dyn VisitorExtension>>,
    extension_order: Vec<Arc<dyn VisitorExtension>>,
    replacements: HashMap<&'static TypeInfo, Vec<&'static TypeInfo>>,
    namespaces: Namespaces,
    attributes: RwLock<HashMap<&'static TypeInfo, Arc<AttributeDescriptors>>>,
}

impl DataObjectRegistry {
    /// A registry without any registrations.
    pub fn empty() -> Self {
        Self {
            type_name_to_type: HashMap::new(),
            type_to_type_name: HashMap::new(),
            type_versions: HashMap::new(),
            ordered_versions: Vec::new(),
            contribution_to_containers: HashMap::new(),
            container_to_contributions: HashMap::new(),
            visitor_extensions: HashMap::new(),
            extension_order: Vec::new(),
            replacements: HashMap::new(),
            namespaces: Namespaces::default(),
            attributes: RwLock::new(HashMap::new()),
        }
    }

    /// Builds and validates a registry.
    pub fn build(inventory: &TypeInventory, config: &Config) -> Result<Self> {
        let mut registry = Self::empty();
        registry.namespaces = config.namespaces()?;

        for &t in inventory.types() {
            if t.declared_type_name().is_some() {
                registry.register_type_name(t)?;
            }
        }
        for &t in inventory.types() {
            if t.declared_type_version().is_some() {
                registry.register_type_version(t)?;
            }
        }
        for &t in inventory.types() {
            if t.declared_contributes_to().is_some() {
                registry.register_contribution(t);
            }
        }
        registry.validate_type_version_providers(inventory)?;
        registry.order_type_versions(inventory);
        registry.validate_type_version_required(inventory)?;
        for extension in inventory.extensions() {
            registry.register_visitor_extension(inventory, extension);
        }
        registry.register_replacements(inventory, config.registry.ambiguous_replacements)?;

        info!(
            type_names = registry.type_name_to_type.len(),
            type_versions = registry.type_versions.len(),
            contributions = registry.contribution_to_containers.len(),
            visitor_extensions = registry.extension_order.len(),
            "data object registry initialized"
        );
        Ok(registry)
    }

    // ── registration ────────────────────────────────────────────────────

    fn register_type_name(&mut self, t: &'static TypeInfo) -> Result<()> {
        let name = t.declared_type_name().unwrap_or_default();
        if !t.kind().is_data_object() {
            warn!(
                type_id = t.id(),
                "type name declared on a non data object type, skip registration"
            );
            return Ok(());
        }
        if name.trim().is_empty() {
            warn!(type_id = t.id(), "empty type name, skip registration");
            return Ok(());
        }
        if let Some(existing) = self.type_name_to_type.get(name) {
            return Err(Error::configuration(format!(
                "{} and {} have the same type name '{name}'",
                t.id(),
                existing.id()
            )));
        }
        if let Some(existing) = self.type_to_type_name.get(t) {
            return Err(Error::configuration(format!(
                "{} was already registered with type name '{existing}'",
                t.id()
            )));
        }
        self.type_name_to_type.insert(name, t);
        self.type_to_type_name.insert(t, name);
        debug!(type_id = t.id(), type_name = name, "registered type name");
        Ok(())
    }

    fn register_type_version(&mut self, t: &'static TypeInfo) -> Result<()> {
        if !t.kind().is_data_object() {
            warn!(
                type_id = t.id(),
                "type version declared on a non data object type, skip registration"
            );
            return Ok(());
        }
        let Some(provider) = t.declared_type_version() else {
            return Ok(());
        };
        // Providers without a version are reported by the provider validation.
        let Some(version) = provider.version() else {
            return Ok(());
        };
        if let Some(existing) = self.type_versions.get(t) {
            return Err(Error::configuration(format!(
                "{} was already registered with type version {existing}",
                t.id()
            )));
        }
        self.type_versions.insert(t, version.clone());
        debug!(type_id = t.id(), %version, "registered type version");
        Ok(())
    }

    fn register_contribution(&mut self, t: &'static TypeInfo) {
        if t.kind() != TypeKind::Contribution {
            warn!(
                type_id = t.id(),
                "containers declared on a non contribution type, skip registration"
            );
            return;
        }
        let containers = t.declared_contributes_to().unwrap_or_default();
        if containers.is_empty() {
            warn!(type_id = t.id(), "contribution declares no containers, skip registration");
            return;
        }
        let mut unique: Vec<&'static TypeInfo> = Vec::with_capacity(containers.len());
        for &container in containers {
            if !unique.contains(&container) {
                unique.push(container);
            }
            let contributions = self.container_to_contributions.entry(container).or_default();
            if !contributions.contains(&t) {
                contributions.push(t);
            }
        }
        debug!(
            type_id = t.id(),
            containers = ?unique.iter().map(|c| c.id()).collect::<Vec<_>>(),
            "registered contribution"
        );
        self.contribution_to_containers.insert(t, unique);
    }

    fn validate_type_version_providers(&self, inventory: &TypeInventory) -> Result<()> {
        let providers = inventory.type_versions();

        let unversioned: Vec<&str> = providers
            .iter()
            .filter(|p| p.version().is_none())
            .map(|p| p.id())
            .collect();
        if !unversioned.is_empty() {
            return Err(Error::configuration(format!(
                "missing namespace version for type version providers: {}",
                unversioned.join(", ")
            )));
        }

        let malformed: Vec<String> = providers
            .iter()
            .filter_map(|p| {
                p.version()
                    .filter(|v| !v.is_valid())
                    .map(|v| format!("{} ({v})", p.id()))
            })
            .collect();
        if !malformed.is_empty() {
            return Err(Error::configuration(format!(
                "invalid namespace version for type version providers: {}",
                malformed.join(", ")
            )));
        }

        let unknown_namespace: Vec<&str> = providers
            .iter()
            .filter(|p| {
                p.version()
                    .is_some_and(|v| !self.namespaces.contains(v.namespace()))
            })
            .map(|p| p.id())
            .collect();
        if !unknown_namespace.is_empty() {
            return Err(Error::configuration(format!(
                "no registered namespace for type versions: {}",
                unknown_namespace.join(", ")
            )));
        }

        let mut by_version: IndexMap<&NamespaceVersion, Vec<&str>> = IndexMap::new();
        for provider in &providers {
            if let Some(version) = provider.version() {
                by_version.entry(version).or_default().push(provider.id());
            }
        }
        let duplicates: Vec<String> = by_version
            .iter()
            .filter(|(_, ids)| ids.len() > 1)
            .map(|(version, ids)| format!("{version}: {}", ids.join(", ")))
            .collect();
        if !duplicates.is_empty() {
            return Err(Error::configuration(format!(
                "multiple type version providers for the same namespace version: {}",
                duplicates.join("; ")
            )));
        }
        Ok(())
    }

    /// Orders all provider versions by namespace order, then by version.
    fn order_type_versions(&mut self, inventory: &TypeInventory) {
        let namespaces = self.namespaces.all();
        let mut versions: Vec<NamespaceVersion> = inventory
            .type_versions()
            .iter()
            .filter_map(|p| p.version().cloned())
            .collect();
        versions.sort_by(|a, b| {
            let rank = |v: &NamespaceVersion| {
                namespaces
                    .iter()
                    .position(|ns| ns.id == v.namespace())
                    .unwrap_or(usize::MAX)
            };
            rank(a).cmp(&rank(b)).then_with(|| a.cmp(b))
        });
        self.ordered_versions = versions;
    }

    fn validate_type_version_required(&self, inventory: &TypeInventory) -> Result<()> {
        let mut missing: Vec<&str> = Vec::new();
        for &required in inventory
            .types()
            .iter()
            .filter(|t| t.is_type_version_required())
        {
            for subtype in inventory.known_subtypes(required) {
                if subtype.kind().is_instantiable()
                    && subtype.declared_type_version().is_none()
                    && !missing.contains(&subtype.id())
                {
                    missing.push(subtype.id());
                }
            }
        }
        if missing.is_empty() {
            Ok(())
        } else {
            Err(Error::configuration(format!(
                "missing type version for data objects that require one: {}",
                missing.join(", ")
            )))
        }
    }

    fn register_visitor_extension(
        &mut self,
        inventory: &TypeInventory,
        extension: &Arc<dyn VisitorExtension>,
    ) {
        let value_type = extension.value_type();
        self.extension_order.push(Arc::clone(extension));
        self.visitor_extensions
            .entry(value_type)
            .or_insert_with(|| Arc::clone(extension));
        for subtype in inventory.known_subtypes(value_type) {
            self.visitor_extensions
                .entry(subtype)
                .or_insert_with(|| Arc::clone(extension));
        }
        debug!(value_type = value_type.id(), "registered visitor extension");
    }

    fn register_replacements(
        &mut self,
        inventory: &TypeInventory,
        policy: AmbiguityPolicy,
    ) -> Result<()> {
        for &(base, replacement) in inventory.replacements() {
            if !replacement.is_assignable_to(base) {
                return Err(Error::configuration(format!(
                    "{} cannot replace {}: not a subtype",
                    replacement.id(),
                    base.id()
                )));
            }
            let candidates = self.replacements.entry(base).or_default();
            if !candidates.contains(&replacement) {
                candidates.push(replacement);
            }
        }
        if policy == AmbiguityPolicy::Fail {
            if let Some((base, candidates)) = self.replacements.iter().find(|(_, c)| c.len() > 1) {
                return Err(Error::configuration(format!(
                    "{} has multiple replacements: {}",
                    base.id(),
                    candidates.iter().map(|c| c.id()).collect::<Vec<_>>().join(", ")
                )));
            }
        }
        Ok(())
    }

    // ── lookups ─────────────────────────────────────────────────────────

    /// The type name of `t`, or of its nearest ancestor that has one.
    pub fn to_type_name(&self, t: &'static TypeInfo) -> Option<&'static str> {
        t.ancestors()
            .find_map(|ancestor| self.type_to_type_name.get(ancestor).copied())
    }

    /// Resolves a type name to its type, following replacements.
    ///
    /// Returns `None` for unknown names and, with a warning, when a
    /// replaced type has more than one replacement.
    pub fn from_type_name(&self, type_name: &str) -> Option<&'static TypeInfo> {
        let raw = self.type_name_to_type.get(type_name).copied()?;
        let mut leaves = Vec::new();
        self.collect_replacement_leaves(raw, &mut leaves);
        match leaves.as_slice() {
            [] => Some(raw),
            [unique] => Some(*unique),
            _ => {
                warn!(
                    type_id = raw.id(),
                    type_name,
                    candidates = ?leaves.iter().map(|c| c.id()).collect::<Vec<_>>(),
                    "type lookup is not unique, cannot resolve replacement"
                );
                None
            }
        }
    }

    fn collect_replacement_leaves(&self, t: &'static TypeInfo, out: &mut Vec<&'static TypeInfo>) {
        for &replacement in self.replacements.get(t).map(Vec::as_slice).unwrap_or_default() {
            if self.replacements.contains_key(replacement) {
                self.collect_replacement_leaves(replacement, out);
            } else if !out.contains(&replacement) {
                out.push(replacement);
            }
        }
    }

    pub fn type_version(&self, t: &TypeInfo) -> Option<&NamespaceVersion> {
        self.type_versions.get(t)
    }

    /// Every known type version, ordered by namespace order, then by version.
    pub fn ordered_type_versions(&self) -> &[NamespaceVersion] {
        &self.ordered_versions
    }

    /// The containers `contribution` declares. A container may be an
    /// abstract type or interface; test with [`TypeInfo::is_assignable_to`].
    pub fn contribution_containers(&self, contribution: &TypeInfo) -> &[&'static TypeInfo] {
        self.contribution_to_containers
            .get(contribution)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Contribution types declared for exactly `container`.
    pub fn contribution_types(&self, container: &TypeInfo) -> Vec<&'static TypeInfo> {
        let mut out = self
            .container_to_contributions
            .get(container)
            .cloned()
            .unwrap_or_default();
        out.sort_by_key(|t| t.id());
        out
    }

    /// Contribution types declared for `container` or any of its data object
    /// superclasses and interfaces.
    pub fn all_contribution_types(&self, container: &'static TypeInfo) -> Vec<&'static TypeInfo> {
        let mut out: Vec<&'static TypeInfo> = Vec::new();
        for t in container.hierarchy() {
            for &contribution in self
                .container_to_contributions
                .get(t)
                .map(Vec::as_slice)
                .unwrap_or_default()
            {
                if !out.contains(&contribution) {
                    out.push(contribution);
                }
            }
        }
        out.sort_by_key(|t| t.id());
        out
    }

    /// Returns true if `contribution` may be attached to an entity of type
    /// `container`.
    pub fn accepts_contribution(&self, container: &TypeInfo, contribution: &TypeInfo) -> bool {
        self.contribution_containers(contribution)
            .iter()
            .any(|c| container.is_assignable_to(c))
    }

    /// The visitor extension for `t`: registered for `t` itself, one of its
    /// ancestors, or (in registration order) a type `t` is assignable to.
    pub fn visitor_extension(&self, t: &'static TypeInfo) -> Option<&Arc<dyn VisitorExtension>> {
        t.ancestors()
            .find_map(|ancestor| self.visitor_extensions.get(ancestor))
            .or_else(|| {
                self.extension_order
                    .iter()
                    .find(|e| t.is_assignable_to(e.value_type()))
            })
    }

    pub fn type_name_to_type_map(&self) -> &HashMap<&'static str, &'static TypeInfo> {
        &self.type_name_to_type
    }

    pub fn namespaces(&self) -> &Namespaces {
        &self.namespaces
    }

    // ── attribute descriptors ───────────────────────────────────────────

    /// All attribute descriptors of `t`, computed on first use.
    ///
    /// Declarations are collected from the root of the hierarchy down, so a
    /// subtype's declaration of an accessor replaces its ancestor's.
    pub fn attribute_descriptors(&self, t: &'static TypeInfo) -> Arc<AttributeDescriptors> {
        if let Some(cached) = self
            .attributes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(t)
        {
            return Arc::clone(cached);
        }
        let computed = Arc::new(compute_attribute_descriptors(t));
        let mut cache = self
            .attributes
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        Arc::clone(cache.entry(t).or_insert(computed))
    }

    pub fn attribute_descriptor(
        &self,
        t: &'static TypeInfo,
        name: &str,
    ) -> Option<AttributeDescriptor> {
        self.attribute_descriptors(t).get(name).cloned()
    }
}

fn compute_attribute_descriptors(t: &'static TypeInfo) -> AttributeDescriptors {
    debug!(type_id = t.id(), "computing attribute descriptors");
    let mut by_accessor: IndexMap<&'static str, AttributeDescriptor> = IndexMap::new();
    for declaring in t.hierarchy().into_iter().rev() {
        for decl in declaring.declared_attributes() {
            by_accessor.insert(
                decl.accessor(),
                AttributeDescriptor {
                    name: decl.attribute_name(),
                    accessor: decl.accessor(),
                    kind: decl.kind(),
                    value_type: decl.value_type(),
                    format_pattern: decl.format_pattern(),
                    declared_by: declaring,
                },
            );
        }
    }
    by_accessor
        .into_values()
        .map(|d| (d.name.to_string(), d))
        .collect()
}

impl fmt::Debug for DataObjectRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataObjectRegistry")
            .field("type_names", &self.type_name_to_type.len())
            .field("type_versions", &self.type_versions.len())
            .field("contributions", &self.contribution_to_containers.len())
            .field("visitor_extensions", &self.extension_order.len())
            .finish_non_exhaustive()
    }
}

// ── process-wide registry ───────────────────────────────────────────────

static GLOBAL: OnceLock<DataObjectRegistry> = OnceLock::new();

/// Builds the process-wide registry. Fails if it was already initialized.
pub fn init(inventory: &TypeInventory, config: &Config) -> Result<&'static DataObjectRegistry> {
    if GLOBAL.get().is_some() {
        return Err(Error::configuration("data object registry is already initialized"));
    }
    let registry = DataObjectRegistry::build(inventory, config)?;
    let mut fresh = false;
    let stored = GLOBAL.get_or_init(|| {
        fresh = true;
        registry
    });
    if fresh {
        Ok(stored)
    } else {
        Err(Error::configuration("data object registry is already initialized"))
    }
}

/// The process-wide registry, once [`init`] has run.
pub fn global() -> Option<&'static DataObjectRegistry> {
    GLOBAL.get()
}
