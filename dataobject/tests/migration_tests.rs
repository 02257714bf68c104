mod fixtures;

use dataobject::namespace::Namespace;
use dataobject::{
    Config, DO_ENTITY, DataObjectRegistry, Entity, Error, MigrationInventory, NamespaceVersion,
    NextMigration, StructureMigrationHandler, TypeInfo, TypeInventory, TypeVersion,
};
use fixtures::init_tracing;
use pretty_assertions::assert_eq;
use std::sync::Arc;

// ── type versions ────────────────────────────────────────────────

static CRM_1: TypeVersion =
    TypeVersion::new("fixture.Crm_1", NamespaceVersion::of_static("crm", "1"));
static CRM_2: TypeVersion =
    TypeVersion::new("fixture.Crm_2", NamespaceVersion::of_static("crm", "2"));
static CRM_3: TypeVersion =
    TypeVersion::new("fixture.Crm_3", NamespaceVersion::of_static("crm", "3"));
static CRM_4: TypeVersion =
    TypeVersion::new("fixture.Crm_4", NamespaceVersion::of_static("crm", "4"));
static IPSUM_1: TypeVersion =
    TypeVersion::new("fixture.Ipsum_1", NamespaceVersion::of_static("ipsum", "1"));

fn v(s: &str) -> NamespaceVersion {
    NamespaceVersion::parse(s).unwrap()
}

// ── types ────────────────────────────────────────────────────────

/// Migrated to crm-2, then crm-3.
static EXAMPLE: TypeInfo = TypeInfo::entity("fixture.Example")
    .extends(&DO_ENTITY)
    .type_name("crm.Example")
    .type_version(&CRM_3);

/// Versioned, but never migrated.
static MIGRATIONLESS: TypeInfo = TypeInfo::entity("fixture.Migrationless")
    .extends(&DO_ENTITY)
    .type_name("crm.Migrationless")
    .type_version(&CRM_2);

/// Called crm.Alpha until crm-2 renamed it.
static BETA: TypeInfo = TypeInfo::entity("fixture.Beta")
    .extends(&DO_ENTITY)
    .type_name("crm.Beta")
    .type_version(&CRM_4);

static PLAIN: TypeInfo = TypeInfo::entity("fixture.Plain")
    .extends(&DO_ENTITY)
    .type_name("crm.Plain");

fn make_migration_registry(ipsum_order: f64) -> DataObjectRegistry {
    init_tracing();
    let inventory = TypeInventory::new()
        .with_types([&EXAMPLE, &MIGRATIONLESS, &BETA, &PLAIN])
        .with_type_version(&CRM_1)
        .with_type_version(&IPSUM_1);
    let config = Config {
        namespaces: vec![Namespace::new("crm", 10.0), Namespace::new("ipsum", ipsum_order)],
        ..Config::default()
    };
    DataObjectRegistry::build(&inventory, &config).unwrap()
}

// ── handlers ─────────────────────────────────────────────────────

/// Stamps the target version and optionally renames the type.
struct Stamp {
    id: &'static str,
    to: NamespaceVersion,
    type_names: &'static [&'static str],
    rename_to: Option<&'static str>,
}

impl StructureMigrationHandler for Stamp {
    fn id(&self) -> &str {
        self.id
    }

    fn to_type_version(&self) -> &NamespaceVersion {
        &self.to
    }

    fn type_names(&self) -> &[&str] {
        self.type_names
    }

    fn apply(&self, entity: &mut Entity) -> dataobject::Result<bool> {
        if let Some(name) = self.rename_to {
            entity.put("_type", name)?;
        }
        entity.put("_typeVersion", self.to.to_string())?;
        Ok(true)
    }
}

fn stamp(
    id: &'static str,
    to: &str,
    type_names: &'static [&'static str],
) -> Arc<dyn StructureMigrationHandler> {
    Arc::new(Stamp {
        id,
        to: v(to),
        type_names,
        rename_to: None,
    })
}

fn make_handlers() -> Vec<Arc<dyn StructureMigrationHandler>> {
    vec![
        stamp("ExampleToCrm2", "crm-2", &["crm.Example"]),
        stamp("ExampleToCrm3", "crm-3", &["crm.Example"]),
        Arc::new(Stamp {
            id: "AlphaToBeta",
            to: v("crm-2"),
            type_names: &["crm.Alpha"],
            rename_to: Some("crm.Beta"),
        }),
        stamp("BetaToCrm4", "crm-4", &["crm.Beta"]),
    ]
}

fn make_migrations() -> MigrationInventory {
    MigrationInventory::build(&make_migration_registry(20.0), make_handlers()).unwrap()
}

fn assert_build_error(handlers: Vec<Arc<dyn StructureMigrationHandler>>, needle: &str) {
    let registry = make_migration_registry(20.0);
    match MigrationInventory::build(&registry, handlers) {
        Err(Error::Configuration(message)) => assert!(
            message.contains(needle),
            "expected '{needle}' in '{message}'"
        ),
        other => panic!("expected a configuration error, got {other:?}"),
    }
}

// ── version order ────────────────────────────────────────────────

#[test]
fn versions_follow_namespace_order_then_version() {
    let migrations = make_migrations();
    assert_eq!(
        migrations.all_versions_ordered(),
        &[v("crm-1"), v("crm-2"), v("crm-3"), v("crm-4"), v("ipsum-1")]
    );

    let ipsum_first =
        MigrationInventory::build(&make_migration_registry(5.0), make_handlers()).unwrap();
    assert_eq!(
        ipsum_first.all_versions_ordered(),
        &[v("ipsum-1"), v("crm-1"), v("crm-2"), v("crm-3"), v("crm-4")]
    );
}

#[test]
fn registry_orders_versions_numerically() {
    static CRM_10: TypeVersion =
        TypeVersion::new("fixture.Crm_10", NamespaceVersion::of_static("crm", "10"));
    let inventory = TypeInventory::new()
        .with_type_version(&CRM_10)
        .with_type_version(&CRM_2);
    let config = Config {
        namespaces: vec![Namespace::new("crm", 1.0)],
        ..Config::default()
    };
    let registry = DataObjectRegistry::build(&inventory, &config).unwrap();
    assert_eq!(registry.ordered_type_versions(), &[v("crm-2"), v("crm-10")]);
}

// ── next version ─────────────────────────────────────────────────

#[test]
fn next_version_per_type_name() {
    let migrations = make_migrations();
    let cases = [
        ("crm.Example", Some("crm-3"), NextMigration::UpToDate),
        ("crm.Example", None, NextMigration::NoTypeVersionYet(v("crm-2"))),
        ("crm.Example", Some("crm-1"), NextMigration::Found(v("crm-2"))),
        ("crm.Example", Some("crm-2"), NextMigration::Found(v("crm-3"))),
        ("crm.Example", Some("crm-9"), NextMigration::UnknownTypeVersion),
        ("crm.Example", Some("ipsum-1"), NextMigration::InvalidTypeNameVersionPair),
        ("crm.Migrationless", Some("crm-1"), NextMigration::NoMigrationHandlers),
        ("other.Thing", Some("crm-1"), NextMigration::NoMigrationHandlers),
        ("crm.Alpha", Some("crm-1"), NextMigration::Found(v("crm-2"))),
        ("crm.Alpha", Some("crm-2"), NextMigration::InvalidTypeNameVersionPair),
        ("crm.Beta", Some("crm-2"), NextMigration::Found(v("crm-4"))),
    ];
    for (type_name, version, expected) in cases {
        let version = version.map(v);
        assert_eq!(
            migrations.next_version(type_name, version.as_ref()),
            expected,
            "{type_name} at {version:?}"
        );
    }
}

#[test]
fn renamed_type_name_continues_after_its_last_handler() {
    let migrations = make_migrations();
    // crm.Alpha has no handler past crm-2; crm.Beta's handlers take over.
    assert_eq!(
        migrations.next_version("crm.Alpha", Some(&v("crm-3"))),
        NextMigration::Found(v("crm-4"))
    );
}

#[test]
fn up_to_date_or_migration_available() {
    let migrations = make_migrations();
    assert!(migrations.is_up_to_date_or_migration_available("crm.Example", Some(&v("crm-3"))));
    assert!(migrations.is_up_to_date_or_migration_available("crm.Example", None));
    assert!(migrations.is_up_to_date_or_migration_available("crm.Alpha", Some(&v("crm-1"))));
    assert!(!migrations.is_up_to_date_or_migration_available("crm.Alpha", Some(&v("crm-2"))));
    assert!(!migrations.is_up_to_date_or_migration_available("crm.Example", Some(&v("crm-9"))));
    assert!(!migrations.is_up_to_date_or_migration_available("other.Thing", None));
}

// ── versions to run ──────────────────────────────────────────────

#[test]
fn versions_start_at_the_lowest_next_version() {
    let migrations = make_migrations();
    let crm_1 = v("crm-1");
    let crm_2 = v("crm-2");

    assert_eq!(
        migrations.versions([("crm.Example", Some(&crm_1))], None).unwrap(),
        vec![v("crm-2"), v("crm-3"), v("crm-4")]
    );
    assert_eq!(
        migrations
            .versions([("crm.Beta", Some(&crm_2)), ("crm.Example", Some(&crm_2))], None)
            .unwrap(),
        vec![v("crm-3"), v("crm-4")]
    );
}

#[test]
fn versions_stop_at_the_target_version() {
    let migrations = make_migrations();
    let crm_1 = v("crm-1");
    let crm_2 = v("crm-2");

    assert_eq!(
        migrations
            .versions([("crm.Example", Some(&crm_1))], Some(&v("crm-3")))
            .unwrap(),
        vec![v("crm-2"), v("crm-3")]
    );
    // The next version lies past the target.
    assert!(migrations
        .versions([("crm.Example", Some(&crm_2))], Some(&crm_2))
        .unwrap()
        .is_empty());
}

#[test]
fn versions_are_empty_when_nothing_migrates() {
    let migrations = make_migrations();
    let crm_3 = v("crm-3");
    assert!(migrations
        .versions([("crm.Example", Some(&crm_3)), ("other.Thing", None)], None)
        .unwrap()
        .is_empty());
    let none: Vec<(&str, Option<&NamespaceVersion>)> = Vec::new();
    assert!(migrations.versions(none, None).unwrap().is_empty());
}

#[test]
fn unknown_target_version_is_rejected() {
    let migrations = make_migrations();
    let result = migrations.versions([("crm.Example", None)], Some(&v("crm-9")));
    assert!(matches!(result, Err(Error::Migration(message)) if message.contains("crm-9")));
}

// ── handlers ─────────────────────────────────────────────────────

#[test]
fn handlers_are_keyed_by_type_name() {
    let migrations = make_migrations();
    let crm_2 = migrations.handlers(&v("crm-2")).unwrap();
    let names: Vec<&str> = crm_2.keys().map(String::as_str).collect();
    assert_eq!(names, vec!["crm.Alpha", "crm.Example"]);
    assert_eq!(crm_2["crm.Alpha"].id(), "AlphaToBeta");

    assert!(migrations.handlers(&v("crm-1")).unwrap().is_empty());
    assert!(matches!(migrations.handlers(&v("crm-9")), Err(Error::Migration(_))));
}

#[test]
fn handlers_migrate_a_raw_object_step_by_step() {
    let migrations = make_migrations();
    let mut raw = Entity::new();
    raw.put("_type", "crm.Alpha").unwrap();
    raw.put("_typeVersion", "crm-1").unwrap();

    let crm_1 = v("crm-1");
    let versions = migrations.versions([("crm.Alpha", Some(&crm_1))], None).unwrap();
    assert_eq!(versions, vec![v("crm-2"), v("crm-3"), v("crm-4")]);

    for version in &versions {
        let type_name = raw.get_string("_type").unwrap().unwrap_or_default().to_string();
        if let Some(handler) = migrations.handlers(version).unwrap().get(&type_name) {
            assert!(handler.apply(&mut raw).unwrap());
        }
    }
    assert_eq!(raw.get_string("_type").unwrap(), Some("crm.Beta"));
    assert_eq!(raw.get_string("_typeVersion").unwrap(), Some("crm-4"));
}

// ── validation ───────────────────────────────────────────────────

#[test]
fn duplicate_handlers_are_rejected() {
    let mut handlers = make_handlers();
    handlers.push(stamp("AnotherExampleToCrm2", "crm-2", &["crm.Example"]));
    assert_build_error(handlers, "crm.Example@crm-2: ExampleToCrm2, AnotherExampleToCrm2");
}

#[test]
fn handler_without_type_names_is_rejected() {
    assert_build_error(vec![stamp("Nameless", "crm-2", &[])], "Nameless has no type names");
}

#[test]
fn handler_with_blank_type_name_is_rejected() {
    assert_build_error(
        vec![stamp("Blank", "crm-2", &["crm.Example", " "])],
        "Blank has an empty type name",
    );
}

#[test]
fn unknown_target_type_version_is_rejected() {
    assert_build_error(vec![stamp("Future", "crm-7", &["crm.Example"])], "crm-7");
}

#[test]
fn registered_type_without_type_version_is_rejected() {
    assert_build_error(vec![stamp("PlainToCrm2", "crm-2", &["crm.Plain"])], "crm.Plain");
}

#[test]
fn type_version_below_handler_target_is_rejected() {
    assert_build_error(
        vec![stamp("ExampleToCrm4", "crm-4", &["crm.Example"])],
        "crm.Example declares type version crm-3, lower than crm-4",
    );
}

#[test]
fn type_version_in_another_namespace_is_not_compared() {
    let registry = make_migration_registry(20.0);
    let handlers = vec![stamp("ExampleToIpsum1", "ipsum-1", &["crm.Example"])];
    assert!(MigrationInventory::build(&registry, handlers).is_ok());
}
