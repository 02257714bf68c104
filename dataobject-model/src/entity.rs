//! The entity: an ordered map of attribute nodes plus contributions.

use crate::node::{AttributeNode, CollectionNode, NodeKind, ValueNode, multiset_eq};
use crate::types::{DO_ENTITY, TypeInfo, TypeKind};
use crate::value::Value;
use crate::{Error, Result};
use indexmap::IndexMap;
use indexmap::map::Entry;
use std::cmp::Ordering;

/// A data object instance.
///
/// Attribute insertion order is preserved for iteration and serialization but
/// ignored by equality, as is contribution order.
#[derive(Debug, Clone)]
pub struct Entity {
    type_info: &'static TypeInfo,
    nodes: IndexMap<String, AttributeNode>,
    contributions: Vec<Entity>,
}

impl Default for Entity {
    fn default() -> Self {
        Self::new()
    }
}

impl Entity {
    /// Creates an empty, untyped entity.
    #[must_use]
    pub fn new() -> Self {
        Self::of_type(&DO_ENTITY)
    }

    /// Creates an empty entity of the given type.
    #[must_use]
    pub fn of_type(type_info: &'static TypeInfo) -> Self {
        Self {
            type_info,
            nodes: IndexMap::new(),
            contributions: Vec::new(),
        }
    }

    pub fn type_info(&self) -> &'static TypeInfo {
        self.type_info
    }

    /// Returns true if the entity has neither attributes nor contributions.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.contributions.is_empty()
    }

    // ── attributes ──────────────────────────────────────────────────────

    /// The value of an attached attribute. Collection nodes yield their items
    /// as an array.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.nodes.get(name).map(AttributeNode::get)
    }

    pub fn get_node(&self, name: &str) -> Option<&AttributeNode> {
        self.nodes.get(name)
    }

    pub fn get_node_mut(&mut self, name: &str) -> Option<&mut AttributeNode> {
        self.nodes.get_mut(name)
    }

    /// Returns true if the attribute is attached, whatever its value.
    pub fn has(&self, name: &str) -> bool {
        self.nodes.contains_key(name)
    }

    pub fn all_nodes(&self) -> &IndexMap<String, AttributeNode> {
        &self.nodes
    }

    pub fn nodes_mut(&mut self) -> impl Iterator<Item = &mut AttributeNode> {
        self.nodes.values_mut()
    }

    /// All attribute values, unwrapped, in insertion order.
    pub fn all(&self) -> IndexMap<&str, &Value> {
        self.nodes
            .iter()
            .map(|(name, node)| (name.as_str(), node.get()))
            .collect()
    }

    /// All attribute values mapped through `f`, in insertion order.
    pub fn all_mapped<T>(&self, mut f: impl FnMut(&Value) -> T) -> IndexMap<&str, T> {
        self.nodes
            .iter()
            .map(|(name, node)| (name.as_str(), f(node.get())))
            .collect()
    }

    /// Writes a value attribute, keeping the existing node if there is one.
    pub fn put(&mut self, name: &str, value: impl Into<Value>) -> Result<()> {
        self.check_kind(name, NodeKind::Value)?;
        self.write_value_node(name, value.into());
        Ok(())
    }

    pub fn put_list<T: Into<Value>>(
        &mut self,
        name: &str,
        items: impl IntoIterator<Item = T>,
    ) -> Result<()> {
        self.put_items(name, NodeKind::List, collect_values(items))
    }

    pub fn put_set<T: Into<Value>>(
        &mut self,
        name: &str,
        items: impl IntoIterator<Item = T>,
    ) -> Result<()> {
        self.put_items(name, NodeKind::Set, collect_values(items))
    }

    pub fn put_collection<T: Into<Value>>(
        &mut self,
        name: &str,
        items: impl IntoIterator<Item = T>,
    ) -> Result<()> {
        self.put_items(name, NodeKind::Collection, collect_values(items))
    }

    /// Attaches a detached node under `name`.
    pub fn put_node(&mut self, name: &str, mut node: AttributeNode) -> Result<()> {
        if node.exists() {
            return Err(Error::Ownership {
                attribute: node.name().unwrap_or(name).to_string(),
            });
        }
        self.check_kind(name, node.kind())?;
        node.attach(name);
        self.nodes.insert(name.to_string(), node);
        Ok(())
    }

    /// Writes the value if `predicate` accepts it.
    pub fn put_if(
        &mut self,
        name: &str,
        value: impl Into<Value>,
        predicate: impl FnOnce(&Value) -> bool,
    ) -> Result<()> {
        let value = value.into();
        if predicate(&value) {
            self.put(name, value)?;
        }
        Ok(())
    }

    pub fn put_list_if<T: Into<Value>>(
        &mut self,
        name: &str,
        items: impl IntoIterator<Item = T>,
        predicate: impl FnOnce(&[Value]) -> bool,
    ) -> Result<()> {
        self.put_items_if(name, NodeKind::List, collect_values(items), predicate)
    }

    pub fn put_set_if<T: Into<Value>>(
        &mut self,
        name: &str,
        items: impl IntoIterator<Item = T>,
        predicate: impl FnOnce(&[Value]) -> bool,
    ) -> Result<()> {
        self.put_items_if(name, NodeKind::Set, collect_values(items), predicate)
    }

    pub fn put_collection_if<T: Into<Value>>(
        &mut self,
        name: &str,
        items: impl IntoIterator<Item = T>,
        predicate: impl FnOnce(&[Value]) -> bool,
    ) -> Result<()> {
        self.put_items_if(name, NodeKind::Collection, collect_values(items), predicate)
    }

    fn put_items_if(
        &mut self,
        name: &str,
        kind: NodeKind,
        items: Vec<Value>,
        predicate: impl FnOnce(&[Value]) -> bool,
    ) -> Result<()> {
        if predicate(&items) {
            self.put_items(name, kind, items)?;
        }
        Ok(())
    }

    fn put_items(&mut self, name: &str, kind: NodeKind, items: Vec<Value>) -> Result<()> {
        self.check_kind(name, kind)?;
        match self.nodes.get_mut(name) {
            Some(node) => node.set(Value::Array(items))?,
            None => {
                let mut node = AttributeNode::empty(kind);
                node.set(Value::Array(items))?;
                node.attach(name);
                self.nodes.insert(name.to_string(), node);
            }
        }
        Ok(())
    }

    fn check_kind(&self, name: &str, requested: NodeKind) -> Result<()> {
        match self.nodes.get(name) {
            Some(node) if node.kind() != requested => {
                Err(Error::mismatch(name, requested, node.kind()))
            }
            _ => Ok(()),
        }
    }

    pub(crate) fn write_value_node(&mut self, name: &str, value: Value) {
        match self.nodes.get_mut(name).and_then(AttributeNode::value_mut) {
            Some(slot) => *slot = value,
            None => {
                let mut node = AttributeNode::of_value(value);
                node.attach(name);
                self.nodes.insert(name.to_string(), node);
            }
        }
    }

    // ── node accessors ──────────────────────────────────────────────────

    /// Accessor for a value attribute. Does not attach the attribute.
    pub fn value_node(&mut self, name: &str) -> Result<ValueNode<'_>> {
        self.check_kind(name, NodeKind::Value)?;
        Ok(ValueNode::new(self, name))
    }

    /// Accessor for a list attribute, attaching an empty list if absent.
    pub fn list_node(&mut self, name: &str) -> Result<CollectionNode<'_>> {
        self.collection_node_of(name, NodeKind::List)
    }

    pub fn set_node(&mut self, name: &str) -> Result<CollectionNode<'_>> {
        self.collection_node_of(name, NodeKind::Set)
    }

    pub fn collection_node(&mut self, name: &str) -> Result<CollectionNode<'_>> {
        self.collection_node_of(name, NodeKind::Collection)
    }

    fn collection_node_of(&mut self, name: &str, kind: NodeKind) -> Result<CollectionNode<'_>> {
        Ok(CollectionNode::new(self.materialize(name, kind)?))
    }

    fn materialize(&mut self, name: &str, kind: NodeKind) -> Result<&mut AttributeNode> {
        let node = match self.nodes.entry(name.to_string()) {
            Entry::Occupied(entry) => {
                let node = entry.into_mut();
                if node.kind() != kind {
                    return Err(Error::mismatch(name, kind, node.kind()));
                }
                node
            }
            Entry::Vacant(entry) => {
                let mut node = AttributeNode::empty(kind);
                node.attach(name);
                entry.insert(node)
            }
        };
        Ok(node)
    }

    // ── removal ─────────────────────────────────────────────────────────

    /// Detaches the attribute. Returns true if it was present.
    pub fn remove(&mut self, name: &str) -> bool {
        self.remove_node(name).is_some()
    }

    /// Detaches the attribute and hands the node back, detached.
    pub fn remove_node(&mut self, name: &str) -> Option<AttributeNode> {
        self.nodes.shift_remove(name).map(AttributeNode::detach)
    }

    /// Removes every node matching `predicate`. Returns true if any was removed.
    pub fn remove_if(&mut self, mut predicate: impl FnMut(&AttributeNode) -> bool) -> bool {
        let before = self.nodes.len();
        self.nodes.retain(|_, node| !predicate(node));
        self.nodes.len() != before
    }

    // ── typed getters ───────────────────────────────────────────────────

    /// Reads a string attribute. Absent and `Null` both yield `None`.
    pub fn get_string(&self, name: &str) -> Result<Option<&str>> {
        match self.get(name) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) => Ok(Some(s)),
            Some(other) => Err(Error::mismatch(name, "string", other.kind_name())),
        }
    }

    pub fn get_bool(&self, name: &str) -> Result<Option<bool>> {
        match self.get(name) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Bool(b)) => Ok(Some(*b)),
            Some(other) => Err(Error::mismatch(name, "bool", other.kind_name())),
        }
    }

    pub fn get_int(&self, name: &str) -> Result<Option<i64>> {
        match self.get(name) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Int(i)) => Ok(Some(*i)),
            Some(other) => Err(Error::mismatch(name, "int", other.kind_name())),
        }
    }

    /// Reads a numeric attribute; integers are widened.
    pub fn get_decimal(&self, name: &str) -> Result<Option<f64>> {
        match self.get(name) {
            None | Some(Value::Null) => Ok(None),
            Some(v) => v
                .as_f64()
                .map(Some)
                .ok_or_else(|| Error::mismatch(name, "number", v.kind_name())),
        }
    }

    /// Maps the attribute value through `mapper`, if attached.
    pub fn get_as<T>(&self, name: &str, mapper: impl FnOnce(&Value) -> T) -> Option<T> {
        self.get(name).map(mapper)
    }

    /// Items of a list attribute, attaching an empty list if absent.
    pub fn get_list(&mut self, name: &str) -> Result<&[Value]> {
        Ok(self.materialize(name, NodeKind::List)?.items())
    }

    /// Items of a list attribute without attaching it.
    pub fn opt_list(&self, name: &str) -> Result<Option<&[Value]>> {
        match self.nodes.get(name) {
            None => Ok(None),
            Some(node) if node.kind() == NodeKind::List => Ok(Some(node.items())),
            Some(node) => Err(Error::mismatch(name, NodeKind::List, node.kind())),
        }
    }

    /// Items of a list attribute mapped through `mapper`, attaching the list
    /// if absent.
    pub fn get_list_as<T>(
        &mut self,
        name: &str,
        mapper: impl FnMut(&Value) -> T,
    ) -> Result<Vec<T>> {
        Ok(self.get_list(name)?.iter().map(mapper).collect())
    }

    pub fn get_string_list(&mut self, name: &str) -> Result<Vec<Option<&str>>> {
        typed_items(name, self.get_list(name)?, "string", |v| match v {
            Value::String(s) => Some(s.as_str()),
            _ => None,
        })
    }

    pub fn get_bool_list(&mut self, name: &str) -> Result<Vec<Option<bool>>> {
        typed_items(name, self.get_list(name)?, "bool", Value::as_bool)
    }

    pub fn get_decimal_list(&mut self, name: &str) -> Result<Vec<Option<f64>>> {
        typed_items(name, self.get_list(name)?, "number", Value::as_f64)
    }

    // ── contributions ───────────────────────────────────────────────────

    pub fn contributions(&self) -> &[Entity] {
        &self.contributions
    }

    pub fn has_contributions(&self) -> bool {
        !self.contributions.is_empty()
    }

    /// Adds a contribution, replacing one of the same type.
    ///
    /// Whether the contribution may attach to this entity's type is checked
    /// by the registry-aware layers, not here.
    pub fn put_contribution(&mut self, contribution: Entity) -> Result<()> {
        if contribution.type_info.kind() != TypeKind::Contribution {
            return Err(Error::InvalidContribution(
                contribution.type_info.id().to_string(),
            ));
        }
        match self
            .contributions
            .iter_mut()
            .find(|c| c.type_info == contribution.type_info)
        {
            Some(existing) => *existing = contribution,
            None => self.contributions.push(contribution),
        }
        Ok(())
    }

    pub fn contribution(&self, type_info: &TypeInfo) -> Option<&Entity> {
        self.contributions.iter().find(|c| c.type_info == type_info)
    }

    pub fn contribution_mut(&mut self, type_info: &TypeInfo) -> Option<&mut Entity> {
        self.contributions
            .iter_mut()
            .find(|c| c.type_info == type_info)
    }

    pub fn remove_contribution(&mut self, type_info: &TypeInfo) -> Option<Entity> {
        let index = self
            .contributions
            .iter()
            .position(|c| c.type_info == type_info)?;
        Some(self.contributions.remove(index))
    }

    /// Removes and returns all contributions.
    pub fn take_contributions(&mut self) -> Vec<Entity> {
        std::mem::take(&mut self.contributions)
    }

    pub fn contributions_mut(&mut self) -> impl Iterator<Item = &mut Entity> {
        self.contributions.iter_mut()
    }

    pub fn sort_contributions_by(&mut self, compare: impl FnMut(&Entity, &Entity) -> Ordering) {
        self.contributions.sort_by(compare);
    }
}

impl PartialEq for Entity {
    fn eq(&self, other: &Self) -> bool {
        self.type_info == other.type_info
            && self.nodes.len() == other.nodes.len()
            && self
                .nodes
                .iter()
                .all(|(name, node)| other.nodes.get(name).is_some_and(|o| node == o))
            && multiset_eq(&self.contributions, &other.contributions)
    }
}

fn collect_values<T: Into<Value>>(items: impl IntoIterator<Item = T>) -> Vec<Value> {
    items.into_iter().map(Into::into).collect()
}

fn typed_items<'a, T>(
    name: &str,
    items: &'a [Value],
    expected: &str,
    read: impl Fn(&'a Value) -> Option<T>,
) -> Result<Vec<Option<T>>> {
    items
        .iter()
        .enumerate()
        .map(|(index, item)| match item {
            Value::Null => Ok(None),
            item => read(item).map(Some).ok_or_else(|| {
                Error::mismatch(&format!("{name}[{index}]"), expected, item.kind_name())
            }),
        })
        .collect()
}
