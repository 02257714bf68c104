//! Attribute nodes and the handles used to access them.
//!
//! A node is *attached* once it is part of an entity's attribute map, even if
//! it holds `Null` or an empty collection. Value nodes are attached when they
//! are written, collection nodes as soon as they are accessed, because the
//! returned handle is the way callers mutate them.

use crate::entity::Entity;
use crate::value::Value;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Deref, DerefMut};

/// The four node kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    /// A single value of any type.
    Value,
    /// Ordered, duplicates allowed.
    List,
    /// Unordered, deduplicated.
    Set,
    /// Unordered, duplicates allowed.
    Collection,
}

impl NodeKind {
    #[must_use]
    pub const fn is_collection(self) -> bool {
        !matches!(self, NodeKind::Value)
    }

    /// Returns true for the kinds whose element order carries no meaning.
    #[must_use]
    pub const fn is_unordered(self) -> bool {
        matches!(self, NodeKind::Set | NodeKind::Collection)
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            NodeKind::Value => "value node",
            NodeKind::List => "list node",
            NodeKind::Set => "set node",
            NodeKind::Collection => "collection node",
        };
        f.write_str(s)
    }
}

/// A named attribute of an entity.
///
/// Collection nodes always hold a `Value::Array` of their items.
#[derive(Debug, Clone)]
pub struct AttributeNode {
    name: Option<String>,
    attached: bool,
    kind: NodeKind,
    value: Value,
}

impl AttributeNode {
    fn with_items(kind: NodeKind, mut items: Vec<Value>) -> Self {
        if kind == NodeKind::Set {
            dedup_values(&mut items);
        }
        Self {
            name: None,
            attached: false,
            kind,
            value: Value::Array(items),
        }
    }

    /// A detached value node.
    pub fn of_value(value: impl Into<Value>) -> Self {
        Self {
            name: None,
            attached: false,
            kind: NodeKind::Value,
            value: value.into(),
        }
    }

    pub fn of_list<T: Into<Value>>(items: impl IntoIterator<Item = T>) -> Self {
        Self::with_items(NodeKind::List, items.into_iter().map(Into::into).collect())
    }

    pub fn of_set<T: Into<Value>>(items: impl IntoIterator<Item = T>) -> Self {
        Self::with_items(NodeKind::Set, items.into_iter().map(Into::into).collect())
    }

    pub fn of_collection<T: Into<Value>>(items: impl IntoIterator<Item = T>) -> Self {
        Self::with_items(
            NodeKind::Collection,
            items.into_iter().map(Into::into).collect(),
        )
    }

    /// A detached node holding the default of its kind: `Null` or no items.
    pub fn empty(kind: NodeKind) -> Self {
        match kind {
            NodeKind::Value => Self::of_value(Value::Null),
            kind => Self::with_items(kind, Vec::new()),
        }
    }

    /// The attribute name, set when the node is attached.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    /// Returns true while the node is part of an entity.
    pub fn exists(&self) -> bool {
        self.attached
    }

    /// The unwrapped value; collection nodes return their items as an array.
    pub fn get(&self) -> &Value {
        &self.value
    }

    /// The items of a collection node; empty for value nodes.
    pub fn items(&self) -> &[Value] {
        match &self.value {
            Value::Array(items) if self.kind.is_collection() => items,
            _ => &[],
        }
    }

    pub fn into_value(self) -> Value {
        self.value
    }

    /// Returns true for a value node holding `Null`.
    pub fn is_null_value(&self) -> bool {
        self.kind == NodeKind::Value && self.value.is_null()
    }

    /// Returns true for a collection node without items.
    pub fn is_empty_collection(&self) -> bool {
        self.kind.is_collection() && self.items().is_empty()
    }

    /// Returns this node in the detached state, ready to be attached elsewhere.
    /// The name is cleared; it is set again on attachment.
    #[must_use]
    pub fn detach(mut self) -> Self {
        self.attached = false;
        self.name = None;
        self
    }

    /// Mutable access to the value of a value node.
    pub fn value_mut(&mut self) -> Option<&mut Value> {
        match self.kind {
            NodeKind::Value => Some(&mut self.value),
            _ => None,
        }
    }

    /// Mutable access to the items of a collection node.
    ///
    /// Set nodes are deduplicated again when the guard is dropped.
    pub fn items_mut(&mut self) -> Option<ItemsMut<'_>> {
        let kind = self.kind;
        self.items_vec_mut().map(|items| ItemsMut { kind, items })
    }

    /// Replaces the node's value. Collection nodes accept an array (or
    /// `Null`, meaning no items).
    pub fn set(&mut self, value: impl Into<Value>) -> Result<()> {
        let value = value.into();
        match (self.kind, value) {
            (NodeKind::Value, value) => self.value = value,
            (kind, Value::Null) => *self = self.rebuilt(kind, Vec::new()),
            (kind, Value::Array(items)) => *self = self.rebuilt(kind, items),
            (kind, other) => {
                return Err(Error::mismatch(
                    self.name().unwrap_or_default(),
                    kind,
                    other.kind_name(),
                ));
            }
        }
        Ok(())
    }

    fn rebuilt(&self, kind: NodeKind, items: Vec<Value>) -> Self {
        let mut node = Self::with_items(kind, items);
        node.name = self.name.clone();
        node.attached = self.attached;
        node
    }

    pub(crate) fn attach(&mut self, name: &str) {
        self.name = Some(name.to_string());
        self.attached = true;
    }

    pub(crate) fn items_vec_mut(&mut self) -> Option<&mut Vec<Value>> {
        match &mut self.value {
            Value::Array(items) if self.kind.is_collection() => Some(items),
            _ => None,
        }
    }

    pub(crate) fn insert_item(&mut self, item: Value) {
        let dedup = self.kind == NodeKind::Set;
        if let Some(items) = self.items_vec_mut() {
            if !(dedup && items.contains(&item)) {
                items.push(item);
            }
        }
    }
}

impl PartialEq for AttributeNode {
    fn eq(&self, other: &Self) -> bool {
        if self.kind != other.kind {
            return false;
        }
        if self.kind.is_unordered() {
            multiset_eq(self.items(), other.items())
        } else {
            self.value == other.value
        }
    }
}

/// Compares two slices as multisets.
pub(crate) fn multiset_eq<T: PartialEq>(a: &[T], b: &[T]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut used = vec![false; b.len()];
    a.iter().all(|x| {
        let found = b
            .iter()
            .enumerate()
            .position(|(i, y)| !used[i] && x == y);
        match found {
            Some(i) => {
                used[i] = true;
                true
            }
            None => false,
        }
    })
}

fn dedup_values(items: &mut Vec<Value>) {
    let mut unique: Vec<Value> = Vec::with_capacity(items.len());
    for item in items.drain(..) {
        if !unique.contains(&item) {
            unique.push(item);
        }
    }
    *items = unique;
}

/// Mutable view of a collection node's items.
pub struct ItemsMut<'a> {
    kind: NodeKind,
    items: &'a mut Vec<Value>,
}

impl Deref for ItemsMut<'_> {
    type Target = Vec<Value>;

    fn deref(&self) -> &Self::Target {
        self.items
    }
}

impl DerefMut for ItemsMut<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.items
    }
}

impl Drop for ItemsMut<'_> {
    fn drop(&mut self) {
        if self.kind == NodeKind::Set {
            dedup_values(self.items);
        }
    }
}

/// Accessor for a value attribute of an entity.
///
/// Obtaining the accessor does not attach the attribute; [`set`](Self::set) does.
pub struct ValueNode<'a> {
    entity: &'a mut Entity,
    name: String,
}

impl<'a> ValueNode<'a> {
    pub(crate) fn new(entity: &'a mut Entity, name: &str) -> Self {
        Self {
            entity,
            name: name.to_string(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn exists(&self) -> bool {
        self.entity.has(&self.name)
    }

    /// `None` while the attribute is absent, `Some(&Value::Null)` when it is
    /// present without a value.
    pub fn get(&self) -> Option<&Value> {
        self.entity.get(&self.name)
    }

    /// Writes the value, attaching the attribute if necessary.
    pub fn set(&mut self, value: impl Into<Value>) -> &mut Self {
        self.entity.write_value_node(&self.name, value.into());
        self
    }
}

/// Accessor for a list, set or collection attribute of an entity.
///
/// The attribute is attached by the time the accessor exists.
pub struct CollectionNode<'a> {
    node: &'a mut AttributeNode,
}

impl<'a> CollectionNode<'a> {
    pub(crate) fn new(node: &'a mut AttributeNode) -> Self {
        Self { node }
    }

    pub fn name(&self) -> &str {
        self.node.name().unwrap_or_default()
    }

    pub fn kind(&self) -> NodeKind {
        self.node.kind()
    }

    pub fn exists(&self) -> bool {
        self.node.exists()
    }

    pub fn node(&self) -> &AttributeNode {
        self.node
    }

    /// The items as an array value.
    pub fn get(&self) -> &Value {
        self.node.get()
    }

    pub fn items(&self) -> &[Value] {
        self.node.items()
    }

    pub fn items_mut(&mut self) -> Option<ItemsMut<'_>> {
        self.node.items_mut()
    }

    pub fn add(&mut self, item: impl Into<Value>) -> &mut Self {
        self.node.insert_item(item.into());
        self
    }

    pub fn add_all<T: Into<Value>>(&mut self, items: impl IntoIterator<Item = T>) -> &mut Self {
        for item in items {
            self.node.insert_item(item.into());
        }
        self
    }

    /// Removes the first occurrence of `item`.
    pub fn remove(&mut self, item: &Value) -> bool {
        let Some(items) = self.node.items_vec_mut() else {
            return false;
        };
        match items.iter().position(|i| i == item) {
            Some(index) => {
                items.remove(index);
                true
            }
            None => false,
        }
    }

    /// Removes every occurrence of every value in `remove`.
    pub fn remove_all(&mut self, remove: &[Value]) -> bool {
        let Some(items) = self.node.items_vec_mut() else {
            return false;
        };
        let before = items.len();
        items.retain(|i| !remove.contains(i));
        items.len() != before
    }

    /// Replaces all items.
    pub fn update_all<T: Into<Value>>(&mut self, items: impl IntoIterator<Item = T>) -> &mut Self {
        self.clear();
        self.add_all(items)
    }

    pub fn clear(&mut self) {
        if let Some(items) = self.node.items_vec_mut() {
            items.clear();
        }
    }

    pub fn len(&self) -> usize {
        self.items().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items().is_empty()
    }

    pub fn contains(&self, item: &Value) -> bool {
        self.items().contains(item)
    }

    pub fn get_at(&self, index: usize) -> Option<&Value> {
        self.items().get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Value> {
        self.items().iter()
    }

    pub fn find<P>(&self, predicate: P) -> Vec<&Value>
    where
        P: Fn(&Value) -> bool,
    {
        self.iter().filter(|v| predicate(v)).collect()
    }

    pub fn find_first<P>(&self, predicate: P) -> Option<&Value>
    where
        P: Fn(&Value) -> bool,
    {
        self.iter().find(|v| predicate(v))
    }

    /// Items for which `accessor` yields a value equal to `expected`.
    pub fn find_by<F>(&self, accessor: F, expected: &Value) -> Vec<&Value>
    where
        F: Fn(&Value) -> Option<&Value>,
    {
        self.iter()
            .filter(|v| accessor(v).is_some_and(|actual| actual == expected))
            .collect()
    }

    pub fn find_first_by<F>(&self, accessor: F, expected: &Value) -> Option<&Value>
    where
        F: Fn(&Value) -> Option<&Value>,
    {
        self.iter()
            .find(|v| accessor(v).is_some_and(|actual| actual == expected))
    }

    /// Entity items whose attribute `name` equals `expected`.
    pub fn find_by_attribute(&self, name: &str, expected: &Value) -> Vec<&Value> {
        self.find_by(|v| v.as_entity().and_then(|e| e.get(name)), expected)
    }
}
