//! Shared fixture types for the data object tests.

#![allow(dead_code)]

use dataobject::model;
use dataobject::namespace::Namespace;
use dataobject::visitor::CompositeExtension;
use dataobject::{
    AttributeDecl, Config, DO_ENTITY, DataObjectRegistry, Entity, Error, NamespaceVersion, Opaque,
    OpaqueValue, TypeInfo, TypeInventory, TypeVersion, Value, ValueType,
};

// ── type versions ────────────────────────────────────────────────

pub static CRM_1_0_0: TypeVersion =
    TypeVersion::new("fixture.Crm_1_0_0", NamespaceVersion::of_static("crm", "1.0.0"));

// ── opaque value types ───────────────────────────────────────────

pub static PERSON_ID: TypeInfo = TypeInfo::value("fixture.PersonId").decoder(decode_person_id);
pub static PAIR_ID: TypeInfo = TypeInfo::value("fixture.PairId");

#[derive(Debug, Clone, PartialEq)]
pub struct PersonId(pub String);

impl Opaque for PersonId {
    fn type_info(&self) -> &'static TypeInfo {
        &PERSON_ID
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::Value::String(self.0.clone())
    }
}

fn decode_person_id(json: &serde_json::Value) -> model::Result<OpaqueValue> {
    json.as_str()
        .map(|s| OpaqueValue::new(PersonId(s.to_string())))
        .ok_or_else(|| model::Error::InvalidValue {
            type_id: PERSON_ID.id().to_string(),
            reason: "expected a string".to_string(),
        })
}

/// A composite id whose parts are visited through an extension.
#[derive(Debug, Clone, PartialEq)]
pub struct PairId {
    pub left: String,
    pub right: String,
}

impl PairId {
    pub fn new(left: &str, right: &str) -> Self {
        Self {
            left: left.to_string(),
            right: right.to_string(),
        }
    }
}

impl Opaque for PairId {
    fn type_info(&self) -> &'static TypeInfo {
        &PAIR_ID
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::json!([self.left, self.right])
    }
}

pub fn pair_extension() -> CompositeExtension<PairId> {
    CompositeExtension::new(
        &PAIR_ID,
        |pair| vec![Value::from(pair.left.as_str()), Value::from(pair.right.as_str())],
        |_, children| match children.as_slice() {
            [Value::String(left), Value::String(right)] => Ok(PairId::new(left, right)),
            _ => Err(Error::Codec("pair id needs two string parts".to_string())),
        },
    )
}

// ── entity types ─────────────────────────────────────────────────

pub static I_CONTACT: TypeInfo = TypeInfo::interface("fixture.IContact");

pub static ADDRESS: TypeInfo = TypeInfo::entity("fixture.Address")
    .extends(&DO_ENTITY)
    .type_name("crm.Address")
    .type_version(&CRM_1_0_0)
    .attributes(&[
        AttributeDecl::value("street", ValueType::String),
        AttributeDecl::value("city", ValueType::String),
    ]);

pub static PERSON: TypeInfo = TypeInfo::entity("fixture.Person")
    .extends(&DO_ENTITY)
    .implements(&[&I_CONTACT])
    .type_name("crm.Person")
    .type_version(&CRM_1_0_0)
    .attributes(&[
        AttributeDecl::value("id", ValueType::Opaque(&PERSON_ID)),
        AttributeDecl::value("name", ValueType::String),
        AttributeDecl::value("age", ValueType::Int),
        AttributeDecl::value("weight", ValueType::Float),
        AttributeDecl::value("address", ValueType::Entity(&ADDRESS)),
        AttributeDecl::list("nicknames", ValueType::String),
        AttributeDecl::set("tags", ValueType::String),
        AttributeDecl::collection("scores", ValueType::Int),
    ]);

/// A subtype without its own type name.
pub static CUSTOMER: TypeInfo = TypeInfo::entity("fixture.Customer")
    .extends(&PERSON)
    .type_version(&CRM_1_0_0)
    .attributes(&[AttributeDecl::value("customer_no", ValueType::String)]);

pub static AUDIT: TypeInfo = TypeInfo::contribution("fixture.AuditContribution")
    .extends(&DO_ENTITY)
    .type_name("crm.AuditContribution")
    .type_version(&CRM_1_0_0)
    .contributes_to(&[&PERSON])
    .attributes(&[AttributeDecl::value("user", ValueType::String)]);

pub static NOTE: TypeInfo = TypeInfo::contribution("fixture.NoteContribution")
    .extends(&DO_ENTITY)
    .type_name("crm.NoteContribution")
    .type_version(&CRM_1_0_0)
    .contributes_to(&[&I_CONTACT])
    .attributes(&[AttributeDecl::value("text", ValueType::String)]);

// ── builders ─────────────────────────────────────────────────────

pub fn make_config() -> Config {
    Config {
        namespaces: vec![Namespace::new("crm", 10.0)],
        ..Config::default()
    }
}

pub fn make_inventory() -> TypeInventory {
    TypeInventory::new()
        .with_types([
            &I_CONTACT, &ADDRESS, &PERSON, &CUSTOMER, &AUDIT, &NOTE, &PERSON_ID, &PAIR_ID,
        ])
        .with_extension(pair_extension())
}

pub fn make_registry() -> DataObjectRegistry {
    DataObjectRegistry::build(&make_inventory(), &make_config()).unwrap()
}

pub fn make_address(street: &str, city: &str) -> Entity {
    let mut address = Entity::of_type(&ADDRESS);
    address.put("street", street).unwrap();
    address.put("city", city).unwrap();
    address
}

pub fn make_person(name: &str) -> Entity {
    let mut person = Entity::of_type(&PERSON);
    person.put("id", Value::opaque(PersonId(format!("p-{name}")))).unwrap();
    person.put("name", name).unwrap();
    person.put("age", 42).unwrap();
    person.put("address", make_address("Main St", "Springfield")).unwrap();
    person.put_list("nicknames", ["Bud", "Al"]).unwrap();
    person.put_set("tags", ["vip", "early"]).unwrap();
    person.put_collection("scores", [3, 1, 3]).unwrap();
    person
}

pub fn make_audit(user: &str) -> Entity {
    let mut audit = Entity::of_type(&AUDIT);
    audit.put("user", user).unwrap();
    audit
}

pub fn make_note(text: &str) -> Entity {
    let mut note = Entity::of_type(&NOTE);
    note.put("text", text).unwrap();
    note
}

/// Routes `tracing` output to the test harness.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
