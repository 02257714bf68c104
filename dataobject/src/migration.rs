//! Structure migration inventory.
//!
//! Collects [`StructureMigrationHandler`]s per target type version and type
//! name, and answers which versions a persisted data object still has to
//! pass through. All versions come from the registry's type version table and
//! share its total order: namespace order first, then version.

use crate::error::{Error, Result};
use crate::registry::DataObjectRegistry;
use dataobject_model::{Entity, NamespaceVersion};
use indexmap::IndexMap;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

/// Handlers of one type version, keyed by type name.
pub type HandlersByTypeName = IndexMap<String, Arc<dyn StructureMigrationHandler>>;

/// Migrates the raw structure of data objects to one type version.
pub trait StructureMigrationHandler: Send + Sync {
    /// Identifies the handler in error messages and logs.
    fn id(&self) -> &str;

    /// The type version a migrated data object has afterwards.
    fn to_type_version(&self) -> &NamespaceVersion;

    /// The type names this handler migrates, as persisted before migration.
    fn type_names(&self) -> &[&str];

    /// Migrates `entity` in place. Returns true if anything changed.
    fn apply(&self, entity: &mut Entity) -> Result<bool>;
}

impl fmt::Debug for dyn StructureMigrationHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StructureMigrationHandler")
            .field("id", &self.id())
            .field("to_type_version", &self.to_type_version())
            .finish()
    }
}

/// Where migration of one persisted type name and version continues.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NextMigration {
    /// Already at the type version the registry declares for the type name.
    UpToDate,
    /// No handler migrates this type name, e.g. a foreign type name.
    NoMigrationHandlers,
    /// Persisted without a type version; starts at the first handler for it.
    NoTypeVersionYet(NamespaceVersion),
    /// The persisted version is not known here, e.g. written by a newer system.
    UnknownTypeVersion,
    /// The type name and version do not fit together, e.g. a rename or a
    /// handler is missing.
    InvalidTypeNameVersionPair,
    /// The next version with a handler for this type name.
    Found(NamespaceVersion),
}

impl NextMigration {
    /// The version migration continues at, if any.
    pub fn version(&self) -> Option<&NamespaceVersion> {
        match self {
            NextMigration::NoTypeVersionYet(version) | NextMigration::Found(version) => {
                Some(version)
            }
            _ => None,
        }
    }
}

pub struct MigrationInventory {
    ordered_versions: Vec<NamespaceVersion>,
    positions: HashMap<NamespaceVersion, usize>,
    /// One entry per known version, possibly empty.
    handlers: HashMap<NamespaceVersion, HandlersByTypeName>,
    /// Per type name, the positions of versions with a handler, ascending.
    type_name_versions: HashMap<String, Vec<usize>>,
    current_versions: HashMap<&'static str, NamespaceVersion>,
}

impl MigrationInventory {
    /// Builds and validates the inventory.
    ///
    /// Every handler needs at least one non-blank type name and a target
    /// version the registry knows. A registered type name must carry a type
    /// version, and within the handler's namespace it must not be lower than
    /// the handler's target. At most one handler may exist per type version
    /// and type name. Any violation is an [`Error::Configuration`].
    pub fn build(
        registry: &DataObjectRegistry,
        handlers: impl IntoIterator<Item = Arc<dyn StructureMigrationHandler>>,
    ) -> Result<Self> {
        let ordered_versions = registry.ordered_type_versions().to_vec();
        let positions: HashMap<NamespaceVersion, usize> = ordered_versions
            .iter()
            .enumerate()
            .map(|(position, version)| (version.clone(), position))
            .collect();

        let current_versions: HashMap<&'static str, NamespaceVersion> = registry
            .type_name_to_type_map()
            .iter()
            .filter_map(|(&name, &t)| registry.type_version(t).map(|v| (name, v.clone())))
            .collect();

        let mut collected: BTreeMap<(usize, String), Vec<Arc<dyn StructureMigrationHandler>>> =
            BTreeMap::new();
        for handler in handlers {
            let position = validate_handler(registry, &positions, handler.as_ref())?;
            for &type_name in handler.type_names() {
                collected
                    .entry((position, type_name.to_string()))
                    .or_default()
                    .push(Arc::clone(&handler));
            }
            debug!(
                handler = handler.id(),
                to_type_version = %handler.to_type_version(),
                "collected structure migration handler"
            );
        }

        let duplicates: Vec<String> = collected
            .iter()
            .filter(|(_, handlers)| handlers.len() > 1)
            .map(|((position, type_name), handlers)| {
                format!(
                    "{type_name}@{}: {}",
                    ordered_versions[*position],
                    handlers.iter().map(|h| h.id()).collect::<Vec<_>>().join(", ")
                )
            })
            .collect();
        if !duplicates.is_empty() {
            return Err(Error::configuration(format!(
                "multiple migration handlers for the same type version and type name: {}",
                duplicates.join("; ")
            )));
        }

        let mut by_version: HashMap<NamespaceVersion, HandlersByTypeName> = ordered_versions
            .iter()
            .map(|version| (version.clone(), IndexMap::new()))
            .collect();
        let mut type_name_versions: HashMap<String, Vec<usize>> = HashMap::new();
        let entries = collected.len();
        // Keys are visited by ascending position, so each list ends up sorted.
        for ((position, type_name), mut handlers) in collected {
            if let Some(handler) = handlers.pop() {
                type_name_versions
                    .entry(type_name.clone())
                    .or_default()
                    .push(position);
                by_version
                    .entry(ordered_versions[position].clone())
                    .or_default()
                    .insert(type_name, handler);
            }
        }
        for handlers in by_version.values_mut() {
            handlers.sort_keys();
        }

        info!(
            versions = ordered_versions.len(),
            entries,
            type_names = type_name_versions.len(),
            "migration inventory initialized"
        );
        Ok(Self {
            ordered_versions,
            positions,
            handlers: by_version,
            type_name_versions,
            current_versions,
        })
    }

    /// All known type versions in migration order.
    pub fn all_versions_ordered(&self) -> &[NamespaceVersion] {
        &self.ordered_versions
    }

    /// The versions whose handlers have to run to migrate data objects with
    /// the given persisted type names and versions.
    ///
    /// Starts at the lowest next version over all type names and ends at
    /// `to_version` (inclusive) or at the newest version. Versions without any
    /// handler are left out. Fails if `to_version` is unknown.
    pub fn versions<'a>(
        &self,
        type_names: impl IntoIterator<Item = (&'a str, Option<&'a NamespaceVersion>)>,
        to_version: Option<&NamespaceVersion>,
    ) -> Result<Vec<NamespaceVersion>> {
        let upper = match to_version {
            Some(version) => self.position(version)?,
            None => self.ordered_versions.len().saturating_sub(1),
        };
        let lower = type_names
            .into_iter()
            .filter_map(|(type_name, version)| {
                self.next_version(type_name, version)
                    .version()
                    .and_then(|next| self.positions.get(next).copied())
            })
            .min();
        let Some(lower) = lower else {
            return Ok(Vec::new());
        };
        if lower > upper {
            return Ok(Vec::new());
        }
        Ok(self.ordered_versions[lower..=upper]
            .iter()
            .filter(|version| self.handlers.get(*version).is_some_and(|h| !h.is_empty()))
            .cloned()
            .collect())
    }

    /// Where migration continues for one persisted type name and version
    /// (`None` if it was persisted without a version).
    pub fn next_version(
        &self,
        type_name: &str,
        version: Option<&NamespaceVersion>,
    ) -> NextMigration {
        if version.is_some() && self.current_versions.get(type_name) == version {
            return NextMigration::UpToDate;
        }
        // Renamed type names have no current version but may still have handlers.
        let Some(versions) = self.type_name_versions.get(type_name) else {
            return NextMigration::NoMigrationHandlers;
        };
        let Some(version) = version else {
            return match versions.first() {
                Some(&first) => {
                    NextMigration::NoTypeVersionYet(self.ordered_versions[first].clone())
                }
                None => NextMigration::NoMigrationHandlers,
            };
        };
        let Some(&position) = self.positions.get(version) else {
            return NextMigration::UnknownTypeVersion;
        };
        match versions.binary_search(&position) {
            Ok(index) => match versions.get(index + 1) {
                Some(&next) => NextMigration::Found(self.ordered_versions[next].clone()),
                None => NextMigration::InvalidTypeNameVersionPair,
            },
            // Past the last handler for this name: either renamed since, so the
            // handlers of the new name pick it up, or a handler is missing.
            Err(index) if index == versions.len() => match self.ordered_versions.get(position + 1) {
                Some(next) => NextMigration::Found(next.clone()),
                None => NextMigration::InvalidTypeNameVersionPair,
            },
            Err(index) => NextMigration::Found(self.ordered_versions[versions[index]].clone()),
        }
    }

    /// Returns true if the data object is current or a handler will migrate it.
    pub fn is_up_to_date_or_migration_available(
        &self,
        type_name: &str,
        version: Option<&NamespaceVersion>,
    ) -> bool {
        matches!(
            self.next_version(type_name, version),
            NextMigration::UpToDate | NextMigration::NoTypeVersionYet(_) | NextMigration::Found(_)
        )
    }

    /// The handlers migrating to `version`, keyed by type name. Empty for a
    /// known version without handlers; fails for an unknown one.
    pub fn handlers(&self, version: &NamespaceVersion) -> Result<&HandlersByTypeName> {
        self.handlers
            .get(version)
            .ok_or_else(|| Error::migration(format!("type version {version} is unknown")))
    }

    fn position(&self, version: &NamespaceVersion) -> Result<usize> {
        self.positions
            .get(version)
            .copied()
            .ok_or_else(|| Error::migration(format!("type version {version} is unknown")))
    }
}

/// Checks one handler on its own and returns the position of its target.
fn validate_handler(
    registry: &DataObjectRegistry,
    positions: &HashMap<NamespaceVersion, usize>,
    handler: &dyn StructureMigrationHandler,
) -> Result<usize> {
    let id = handler.id();
    if handler.type_names().is_empty() {
        return Err(Error::configuration(format!(
            "migration handler {id} has no type names"
        )));
    }
    if handler.type_names().iter().any(|name| name.trim().is_empty()) {
        return Err(Error::configuration(format!(
            "migration handler {id} has an empty type name"
        )));
    }
    let to_version = handler.to_type_version();
    let Some(&position) = positions.get(to_version) else {
        return Err(Error::configuration(format!(
            "unknown target type version {to_version} of migration handler {id}, \
             register a type version provider for it"
        )));
    };

    for &type_name in handler.type_names() {
        // Old handlers may name types that were renamed since.
        let Some(t) = registry.from_type_name(type_name) else {
            continue;
        };
        let Some(current) = registry.type_version(t) else {
            return Err(Error::configuration(format!(
                "missing type version (at least {to_version}) for {type_name} \
                 migrated by {id}"
            )));
        };
        // Replaced types may live in another namespace; only compare within one.
        if current.namespace() == to_version.namespace() && current < to_version {
            return Err(Error::configuration(format!(
                "{type_name} declares type version {current}, lower than {to_version} \
                 of migration handler {id}"
            )));
        }
    }
    Ok(position)
}

impl fmt::Debug for MigrationInventory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MigrationInventory")
            .field("versions", &self.ordered_versions)
            .field("type_names", &self.type_name_versions.len())
            .finish_non_exhaustive()
    }
}
