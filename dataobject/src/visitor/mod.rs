//! Recursive traversal of data object trees.
//!
//! [`DataObjectVisitor`] walks a tree read-only, [`ReplacingVisitor`] walks it
//! mutably and may replace any value on the way. Both dispatch on the
//! structural kind of a value:
//!
//! - `Null` ends the branch
//! - arrays recurse into their elements, maps into keys and values
//! - entities recurse into every attached node, then every contribution
//! - list, set and collection nodes recurse into their items
//! - opaque values with a registered [`VisitorExtension`] recurse into the
//!   children the extension reports; everything else is a leaf
//!
//! Each kind has its own hook with a default that does the recursion through
//! the matching `walk_*` function, so a visitor can act before or after a
//! single kind without re-implementing dispatch. Errors returned by any hook
//! abort the traversal and reach the caller unchanged. Trees are assumed to
//! be acyclic.

mod extension;
mod for_each;

pub use extension::{CompositeExtension, VisitorExtension};
pub use for_each::{
    DataObjectVisitors, for_each, for_each_conditionally_rec, for_each_entity_of, for_each_rec,
    replace_each,
};

use crate::error::Result;
use crate::registry::{self, DataObjectRegistry};
use dataobject_model::{AttributeNode, Entity, NodeKind, OpaqueValue, Value};
use std::sync::Arc;

/// A read-only visitor.
pub trait DataObjectVisitor {
    /// The registry used to look up visitor extensions.
    fn registry(&self) -> Option<&DataObjectRegistry> {
        registry::global()
    }

    fn visit(&mut self, value: &Value) -> Result<()> {
        walk_value(self, value)
    }

    fn visit_array(&mut self, items: &[Value]) -> Result<()> {
        walk_array(self, items)
    }

    fn visit_map(&mut self, entries: &[(Value, Value)]) -> Result<()> {
        walk_map(self, entries)
    }

    fn visit_entity(&mut self, entity: &Entity) -> Result<()> {
        walk_entity(self, entity)
    }

    fn visit_node(&mut self, node: &AttributeNode) -> Result<()> {
        walk_node(self, node)
    }

    fn visit_list(&mut self, node: &AttributeNode) -> Result<()> {
        walk_items(self, node)
    }

    fn visit_set(&mut self, node: &AttributeNode) -> Result<()> {
        walk_items(self, node)
    }

    fn visit_collection(&mut self, node: &AttributeNode) -> Result<()> {
        walk_items(self, node)
    }

    fn visit_contributions(&mut self, contributions: &[Entity]) -> Result<()> {
        walk_contributions(self, contributions)
    }

    /// Called for values without substructure.
    fn visit_leaf(&mut self, _value: &Value) -> Result<()> {
        Ok(())
    }
}

pub fn walk_value<V: DataObjectVisitor + ?Sized>(visitor: &mut V, value: &Value) -> Result<()> {
    match value {
        Value::Null => Ok(()),
        Value::Array(items) => visitor.visit_array(items),
        Value::Map(entries) => visitor.visit_map(entries),
        Value::Entity(entity) => visitor.visit_entity(entity),
        Value::Opaque(opaque) => match extension_for(visitor.registry(), opaque) {
            Some(extension) => extension.visit(opaque, &mut |child| visitor.visit(child)),
            None => visitor.visit_leaf(value),
        },
        leaf => visitor.visit_leaf(leaf),
    }
}

pub fn walk_array<V: DataObjectVisitor + ?Sized>(visitor: &mut V, items: &[Value]) -> Result<()> {
    items.iter().try_for_each(|item| visitor.visit(item))
}

pub fn walk_map<V: DataObjectVisitor + ?Sized>(
    visitor: &mut V,
    entries: &[(Value, Value)],
) -> Result<()> {
    for (key, value) in entries {
        visitor.visit(key)?;
        visitor.visit(value)?;
    }
    Ok(())
}

pub fn walk_entity<V: DataObjectVisitor + ?Sized>(visitor: &mut V, entity: &Entity) -> Result<()> {
    for node in entity.all_nodes().values() {
        visitor.visit_node(node)?;
    }
    if entity.has_contributions() {
        visitor.visit_contributions(entity.contributions())?;
    }
    Ok(())
}

pub fn walk_node<V: DataObjectVisitor + ?Sized>(
    visitor: &mut V,
    node: &AttributeNode,
) -> Result<()> {
    match node.kind() {
        NodeKind::Value => visitor.visit(node.get()),
        NodeKind::List => visitor.visit_list(node),
        NodeKind::Set => visitor.visit_set(node),
        NodeKind::Collection => visitor.visit_collection(node),
    }
}

pub fn walk_items<V: DataObjectVisitor + ?Sized>(
    visitor: &mut V,
    node: &AttributeNode,
) -> Result<()> {
    node.items().iter().try_for_each(|item| visitor.visit(item))
}

pub fn walk_contributions<V: DataObjectVisitor + ?Sized>(
    visitor: &mut V,
    contributions: &[Entity],
) -> Result<()> {
    contributions
        .iter()
        .try_for_each(|contribution| visitor.visit_entity(contribution))
}

/// A visitor that may replace values while walking.
///
/// Ordered containers are rewritten position by position. For sets,
/// collections and maps each element is replaced on a copy; elements whose
/// replacement differs are removed and the replacements appended, so
/// unchanged elements keep their place.
pub trait ReplacingVisitor {
    fn registry(&self) -> Option<&DataObjectRegistry> {
        registry::global()
    }

    fn replace(&mut self, value: &mut Value) -> Result<()> {
        walk_value_mut(self, value)
    }

    fn replace_array(&mut self, items: &mut Vec<Value>) -> Result<()> {
        walk_array_mut(self, items)
    }

    fn replace_map(&mut self, entries: &mut Vec<(Value, Value)>) -> Result<()> {
        walk_map_mut(self, entries)
    }

    fn replace_entity(&mut self, entity: &mut Entity) -> Result<()> {
        walk_entity_mut(self, entity)
    }

    fn replace_node(&mut self, node: &mut AttributeNode) -> Result<()> {
        walk_node_mut(self, node)
    }

    fn replace_list(&mut self, node: &mut AttributeNode) -> Result<()> {
        walk_list_mut(self, node)
    }

    fn replace_set(&mut self, node: &mut AttributeNode) -> Result<()> {
        walk_unordered_mut(self, node)
    }

    fn replace_collection(&mut self, node: &mut AttributeNode) -> Result<()> {
        walk_unordered_mut(self, node)
    }

    fn replace_contributions(&mut self, entity: &mut Entity) -> Result<()> {
        walk_contributions_mut(self, entity)
    }

    fn replace_leaf(&mut self, _value: &mut Value) -> Result<()> {
        Ok(())
    }
}

pub fn walk_value_mut<V: ReplacingVisitor + ?Sized>(
    visitor: &mut V,
    value: &mut Value,
) -> Result<()> {
    match value {
        Value::Null => Ok(()),
        Value::Array(items) => visitor.replace_array(items),
        Value::Map(entries) => visitor.replace_map(entries),
        Value::Entity(entity) => visitor.replace_entity(entity),
        Value::Opaque(opaque) => match extension_for(visitor.registry(), opaque) {
            Some(extension) => {
                let rebuilt = extension.replace(opaque, &mut |child| visitor.replace(child))?;
                if let Some(rebuilt) = rebuilt {
                    *value = Value::Opaque(rebuilt);
                }
                Ok(())
            }
            None => visitor.replace_leaf(value),
        },
        _ => visitor.replace_leaf(value),
    }
}

pub fn walk_array_mut<V: ReplacingVisitor + ?Sized>(
    visitor: &mut V,
    items: &mut [Value],
) -> Result<()> {
    items.iter_mut().try_for_each(|item| visitor.replace(item))
}

pub fn walk_map_mut<V: ReplacingVisitor + ?Sized>(
    visitor: &mut V,
    entries: &mut Vec<(Value, Value)>,
) -> Result<()> {
    let mut rekeyed = Vec::new();
    let mut index = 0;
    while index < entries.len() {
        let mut key = entries[index].0.clone();
        visitor.replace(&mut key)?;
        visitor.replace(&mut entries[index].1)?;
        if key == entries[index].0 {
            index += 1;
        } else {
            let (_, value) = entries.remove(index);
            rekeyed.push((key, value));
        }
    }
    for (key, value) in rekeyed {
        match entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => entries.push((key, value)),
        }
    }
    Ok(())
}

pub fn walk_entity_mut<V: ReplacingVisitor + ?Sized>(
    visitor: &mut V,
    entity: &mut Entity,
) -> Result<()> {
    for node in entity.nodes_mut() {
        visitor.replace_node(node)?;
    }
    if entity.has_contributions() {
        visitor.replace_contributions(entity)?;
    }
    Ok(())
}

pub fn walk_node_mut<V: ReplacingVisitor + ?Sized>(
    visitor: &mut V,
    node: &mut AttributeNode,
) -> Result<()> {
    match node.kind() {
        NodeKind::Value => match node.value_mut() {
            Some(value) => visitor.replace(value),
            None => Ok(()),
        },
        NodeKind::List => visitor.replace_list(node),
        NodeKind::Set => visitor.replace_set(node),
        NodeKind::Collection => visitor.replace_collection(node),
    }
}

pub fn walk_list_mut<V: ReplacingVisitor + ?Sized>(
    visitor: &mut V,
    node: &mut AttributeNode,
) -> Result<()> {
    match node.items_mut() {
        Some(mut items) => walk_array_mut(visitor, &mut items),
        None => Ok(()),
    }
}

/// Replaces the items of a set or collection node by diffing.
pub fn walk_unordered_mut<V: ReplacingVisitor + ?Sized>(
    visitor: &mut V,
    node: &mut AttributeNode,
) -> Result<()> {
    let Some(mut items) = node.items_mut() else {
        return Ok(());
    };
    let mut changed: Vec<(usize, Value)> = Vec::new();
    for (index, item) in items.iter().enumerate() {
        let mut replacement = item.clone();
        visitor.replace(&mut replacement)?;
        if replacement != *item {
            changed.push((index, replacement));
        }
    }
    for &(index, _) in changed.iter().rev() {
        items.remove(index);
    }
    items.extend(changed.into_iter().map(|(_, replacement)| replacement));
    Ok(())
}

pub fn walk_contributions_mut<V: ReplacingVisitor + ?Sized>(
    visitor: &mut V,
    entity: &mut Entity,
) -> Result<()> {
    entity
        .contributions_mut()
        .try_for_each(|contribution| visitor.replace_entity(contribution))
}

fn extension_for(
    registry: Option<&DataObjectRegistry>,
    opaque: &OpaqueValue,
) -> Option<Arc<dyn VisitorExtension>> {
    registry?.visitor_extension(opaque.type_info()).cloned()
}

/// A tree root that read-only visitors can start from.
pub trait Visitable {
    fn accept<V: DataObjectVisitor + ?Sized>(&self, visitor: &mut V) -> Result<()>;
}

impl Visitable for Value {
    fn accept<V: DataObjectVisitor + ?Sized>(&self, visitor: &mut V) -> Result<()> {
        visitor.visit(self)
    }
}

impl Visitable for Entity {
    fn accept<V: DataObjectVisitor + ?Sized>(&self, visitor: &mut V) -> Result<()> {
        visitor.visit_entity(self)
    }
}

/// A tree root that replacing visitors can start from.
pub trait Replaceable {
    fn accept_replacing<V: ReplacingVisitor + ?Sized>(&mut self, visitor: &mut V) -> Result<()>;
}

impl Replaceable for Value {
    fn accept_replacing<V: ReplacingVisitor + ?Sized>(&mut self, visitor: &mut V) -> Result<()> {
        visitor.replace(self)
    }
}

impl Replaceable for Entity {
    fn accept_replacing<V: ReplacingVisitor + ?Sized>(&mut self, visitor: &mut V) -> Result<()> {
        visitor.replace_entity(self)
    }
}
