use dataobject_model::{AttributeNode, Entity, Error, NodeKind, TypeInfo, Value, DO_ENTITY};
use pretty_assertions::assert_eq;

static NOTE: TypeInfo = TypeInfo::entity("test.Note").extends(&DO_ENTITY);
static AUDIT: TypeInfo = TypeInfo::contribution("test.AuditContribution").contributes_to(&[&NOTE]);
static TAGS: TypeInfo = TypeInfo::contribution("test.TagsContribution").contributes_to(&[&NOTE]);

fn make_entity() -> Entity {
    let mut e = Entity::of_type(&NOTE);
    e.put("title", "Hello").unwrap();
    e.put("count", 3).unwrap();
    e.put_list("tags", ["a", "b"]).unwrap();
    e
}

fn make_contribution(t: &'static TypeInfo, user: &str) -> Entity {
    let mut c = Entity::of_type(t);
    c.put("user", user).unwrap();
    c
}

// ── presence ─────────────────────────────────────────────────────

#[test]
fn new_entity_is_empty_and_untyped() {
    let e = Entity::new();
    assert!(e.is_empty());
    assert_eq!(e.type_info(), &DO_ENTITY);
}

#[test]
fn put_attaches_value_node() {
    let mut e = Entity::new();
    e.put("name", "x").unwrap();
    assert!(e.has("name"));
    assert_eq!(e.get("name"), Some(&Value::from("x")));
    assert!(e.get_node("name").unwrap().exists());
}

#[test]
fn null_value_is_present() {
    let mut e = Entity::new();
    e.put("name", Value::Null).unwrap();
    assert!(e.has("name"));
    assert_eq!(e.get("name"), Some(&Value::Null));
}

#[test]
fn value_node_accessor_does_not_attach() {
    let mut e = Entity::new();
    {
        let node = e.value_node("name").unwrap();
        assert!(!node.exists());
        assert_eq!(node.get(), None);
    }
    assert!(!e.has("name"));
}

#[test]
fn value_node_set_attaches() {
    let mut e = Entity::new();
    e.value_node("name").unwrap().set("bob");
    assert_eq!(e.get_string("name").unwrap(), Some("bob"));
}

#[test]
fn list_accessor_attaches_empty_list() {
    let mut e = Entity::new();
    assert!(e.list_node("items").unwrap().is_empty());
    assert!(e.has("items"));
    assert_eq!(e.get("items"), Some(&Value::Array(vec![])));
}

#[test]
fn get_list_materializes_node() {
    let mut e = Entity::new();
    assert!(e.get_list("items").unwrap().is_empty());
    assert!(e.has("items"));
}

#[test]
fn opt_list_does_not_materialize() {
    let e = Entity::new();
    assert_eq!(e.opt_list("items").unwrap(), None);
    assert!(!e.has("items"));
}

#[test]
fn remove_detaches_node() {
    let mut e = make_entity();
    let node = e.remove_node("title").unwrap();
    assert!(!node.exists());
    assert!(node.name().is_none());
    assert!(!e.has("title"));
    assert!(!e.remove("title"));
}

#[test]
fn remove_if_removes_matching_nodes() {
    let mut e = make_entity();
    assert!(e.remove_if(|n| n.kind() == NodeKind::List));
    assert!(!e.has("tags"));
    assert!(e.has("title"));
    assert!(!e.remove_if(|n| n.kind() == NodeKind::Set));
}

// ── kind changes ─────────────────────────────────────────────────

#[test]
fn changing_node_kind_fails() {
    let mut e = make_entity();
    let err = e.put("tags", "x").unwrap_err();
    assert!(matches!(err, Error::TypeMismatch { ref attribute, .. } if attribute == "tags"));
    assert!(e.set_node("title").is_err());
    assert!(e.put_collection("tags", [1]).is_err());
}

#[test]
fn put_keeps_node_identity_and_order() {
    let mut e = make_entity();
    e.put("title", "Updated").unwrap();
    let names: Vec<&str> = e.all_nodes().keys().map(String::as_str).collect();
    assert_eq!(names, vec!["title", "count", "tags"]);
}

#[test]
fn put_node_rejects_attached_node() {
    let a = make_entity();
    let node = a.get_node("title").unwrap().clone();
    let err = Entity::new().put_node("title", node).unwrap_err();
    assert!(matches!(err, Error::Ownership { .. }));
}

#[test]
fn detached_node_can_be_moved() {
    let mut a = make_entity();
    let node = a.remove_node("tags").unwrap();
    let mut b = Entity::new();
    b.put_node("labels", node).unwrap();
    assert_eq!(b.get_node("labels").unwrap().name(), Some("labels"));
    assert_eq!(b.get("labels").unwrap().as_array().unwrap().len(), 2);
}

#[test]
fn put_node_accepts_fresh_node() {
    let mut e = Entity::new();
    e.put_node("ids", AttributeNode::of_set([1, 1, 2])).unwrap();
    assert_eq!(e.get_node("ids").unwrap().items().len(), 2);
}

// ── typed getters ────────────────────────────────────────────────

#[test]
fn typed_getters_read_values() {
    let e = make_entity();
    assert_eq!(e.get_string("title").unwrap(), Some("Hello"));
    assert_eq!(e.get_int("count").unwrap(), Some(3));
    assert_eq!(e.get_decimal("count").unwrap(), Some(3.0));
    assert_eq!(e.get_bool("missing").unwrap(), None);
}

#[test]
fn typed_getter_fails_on_mismatch() {
    let e = make_entity();
    assert!(e.get_string("count").is_err());
    assert!(e.get_bool("title").is_err());
    assert!(e.get_int("tags").is_err());
}

#[test]
fn typed_list_getters() {
    let mut e = Entity::new();
    e.put_list("names", [Value::from("a"), Value::Null]).unwrap();
    e.put_list("flags", [true, false]).unwrap();
    assert_eq!(e.get_string_list("names").unwrap(), vec![Some("a"), None]);
    assert_eq!(e.get_bool_list("flags").unwrap(), vec![Some(true), Some(false)]);
    assert!(e.get_decimal_list("names").is_err());
}

#[test]
fn put_list_with_no_items_gives_empty_list() {
    let mut e = Entity::new();
    e.put_list("items", Vec::<Value>::new()).unwrap();
    assert_eq!(e.get_list("items").unwrap(), &[] as &[Value]);
}

#[test]
fn get_as_maps_present_value() {
    let e = make_entity();
    assert_eq!(e.get_as("title", |v| v.as_str().map(str::len)), Some(Some(5)));
    assert_eq!(e.get_as("missing", |v| v.is_null()), None);
}

#[test]
fn all_returns_values_in_insertion_order() {
    let e = make_entity();
    let all = e.all();
    let names: Vec<&str> = all.keys().copied().collect();
    assert_eq!(names, vec!["title", "count", "tags"]);
    let lens = e.all_mapped(|v| v.as_array().map(<[Value]>::len));
    assert_eq!(lens["tags"], Some(2));
}

// ── conditional puts ─────────────────────────────────────────────

#[test]
fn put_if_only_puts_when_predicate_holds() {
    let mut e = Entity::new();
    e.put_if("a", "x", |v| v.is_null()).unwrap();
    e.put_if("b", "y", |v| !v.is_null()).unwrap();
    assert!(!e.has("a"));
    assert!(e.has("b"));
}

#[test]
fn put_list_if_checks_items() {
    let mut e = Entity::new();
    e.put_list_if("a", Vec::<Value>::new(), |items| !items.is_empty())
        .unwrap();
    e.put_set_if("b", [1, 2], |items| !items.is_empty()).unwrap();
    e.put_collection_if("c", [1], |items| items.len() > 1).unwrap();
    assert!(!e.has("a"));
    assert!(e.has("b"));
    assert!(!e.has("c"));
}

// ── equality ─────────────────────────────────────────────────────

#[test]
fn equality_ignores_attribute_order() {
    let mut a = Entity::new();
    a.put("x", 1).unwrap();
    a.put("y", 2).unwrap();
    let mut b = Entity::new();
    b.put("y", 2).unwrap();
    b.put("x", 1).unwrap();
    assert_eq!(a, b);
}

#[test]
fn equality_distinguishes_absent_from_null() {
    let a = Entity::new();
    let mut b = Entity::new();
    b.put("x", Value::Null).unwrap();
    assert_ne!(a, b);
}

#[test]
fn equality_requires_same_type() {
    assert_ne!(Entity::new(), Entity::of_type(&NOTE));
}

#[test]
fn list_order_matters_but_set_order_does_not() {
    let mut a = Entity::new();
    a.put_list("l", [1, 2]).unwrap();
    a.put_set("s", [1, 2]).unwrap();
    let mut b = Entity::new();
    b.put_list("l", [2, 1]).unwrap();
    b.put_set("s", [2, 1]).unwrap();
    assert_ne!(a, b);
    b.put_list("l", [1, 2]).unwrap();
    assert_eq!(a, b);
}

// ── contributions ────────────────────────────────────────────────

#[test]
fn put_contribution_replaces_same_type() {
    let mut e = make_entity();
    e.put_contribution(make_contribution(&AUDIT, "a")).unwrap();
    e.put_contribution(make_contribution(&AUDIT, "b")).unwrap();
    assert_eq!(e.contributions().len(), 1);
    assert_eq!(
        e.contribution(&AUDIT).unwrap().get_string("user").unwrap(),
        Some("b")
    );
}

#[test]
fn put_contribution_rejects_non_contribution() {
    let mut e = make_entity();
    let err = e.put_contribution(Entity::of_type(&NOTE)).unwrap_err();
    assert_eq!(err, Error::InvalidContribution("test.Note".to_string()));
}

#[test]
fn contribution_order_is_ignored_by_equality() {
    let mut a = make_entity();
    a.put_contribution(make_contribution(&AUDIT, "a")).unwrap();
    a.put_contribution(make_contribution(&TAGS, "t")).unwrap();
    let mut b = make_entity();
    b.put_contribution(make_contribution(&TAGS, "t")).unwrap();
    b.put_contribution(make_contribution(&AUDIT, "a")).unwrap();
    assert_eq!(a, b);
}

#[test]
fn remove_and_take_contributions() {
    let mut e = make_entity();
    e.put_contribution(make_contribution(&AUDIT, "a")).unwrap();
    e.put_contribution(make_contribution(&TAGS, "t")).unwrap();
    assert!(e.remove_contribution(&AUDIT).is_some());
    assert!(e.remove_contribution(&AUDIT).is_none());
    assert_eq!(e.take_contributions().len(), 1);
    assert!(!e.has_contributions());
}

#[test]
fn entity_with_only_contributions_is_not_empty() {
    let mut e = Entity::of_type(&NOTE);
    e.put_contribution(make_contribution(&AUDIT, "a")).unwrap();
    assert!(!e.is_empty());
}
