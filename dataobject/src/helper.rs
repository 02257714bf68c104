//! Whole-tree operations built on the codec, the registry and the visitors.

use crate::codec::{Codec, JsonCodec};
use crate::error::Result;
use crate::registry::DataObjectRegistry;
use crate::visitor::{Replaceable, ReplacingVisitor, walk_entity_mut, walk_value_mut};
use dataobject_model::{AttributeNode, Entity, Value};
use std::cmp::Ordering;

pub struct DataObjectHelper<'r> {
    codec: JsonCodec<'r>,
}

impl<'r> DataObjectHelper<'r> {
    pub fn new(registry: &'r DataObjectRegistry) -> Self {
        Self::with_codec(JsonCodec::new(registry))
    }

    pub fn with_codec(codec: JsonCodec<'r>) -> Self {
        Self { codec }
    }

    pub fn codec(&self) -> &JsonCodec<'r> {
        &self.codec
    }

    fn registry(&self) -> &'r DataObjectRegistry {
        self.codec.registry()
    }

    /// Deep copy through a write/read round trip.
    pub fn clone(&self, entity: &Entity) -> Result<Entity> {
        let text = self.codec.write_entity(entity)?;
        self.codec.read(&text, entity.type_info())
    }

    /// Deep copy into a generic entity tree; type tags become attributes.
    pub fn clone_raw(&self, entity: &Entity) -> Result<Entity> {
        let text = self.codec.write_entity(entity)?;
        self.codec.read_raw(&text)
    }

    /// Sorts the items of every set and collection node, and the
    /// contributions of every entity, so that equal trees serialize to the
    /// same text. List nodes and arrays keep their order.
    pub fn normalize(&self, root: &mut (impl Replaceable + ?Sized)) -> Result<()> {
        root.accept_replacing(&mut Normalizer { codec: &self.codec })
    }

    /// Removes value nodes holding `Null` and empty collection nodes, at
    /// every depth. Entities themselves are kept, even when left empty.
    pub fn clean(&self, root: &mut (impl Replaceable + ?Sized)) -> Result<()> {
        root.accept_replacing(&mut Cleaner {
            registry: self.registry(),
        })
    }

    /// Attaches every declared but absent attribute of `entity` and its
    /// contributions with the default of its kind.
    pub fn ensure_declared_nodes(&self, entity: &mut Entity) -> Result<()> {
        let descriptors = self.registry().attribute_descriptors(entity.type_info());
        for (name, descriptor) in descriptors.iter() {
            if !entity.has(name) {
                entity.put_node(name, AttributeNode::empty(descriptor.kind()))?;
            }
        }
        for contribution in entity.contributions_mut() {
            self.ensure_declared_nodes(contribution)?;
        }
        Ok(())
    }

    /// Copies the attributes of `template` that `target` lacks. Not recursive.
    pub fn extend(&self, target: &mut Entity, template: &Entity) -> Result<()> {
        for (name, node) in template.all_nodes() {
            if !target.has(name) {
                target.put_node(name, node.clone().detach())?;
            }
        }
        Ok(())
    }

    pub fn to_string(&self, entity: &Entity) -> Result<String> {
        self.codec.write_entity(entity)
    }

    pub fn to_bytes(&self, entity: &Entity) -> Result<Vec<u8>> {
        Ok(self.to_string(entity)?.into_bytes())
    }
}

/// Returns the value of `name`, failing if it is absent or `Null`.
pub fn assert_value<'e>(entity: &'e Entity, name: &str) -> Result<&'e Value> {
    match entity.get(name) {
        Some(value) if !value.is_null() => Ok(value),
        _ => Err(assertion(name, "value is missing")),
    }
}

/// Returns the string value of `name`, failing unless it has visible text.
pub fn assert_has_text<'e>(entity: &'e Entity, name: &str) -> Result<&'e str> {
    match entity.get(name) {
        Some(Value::String(s)) if !s.trim().is_empty() => Ok(s),
        _ => Err(assertion(name, "text is missing")),
    }
}

fn assertion(name: &str, reason: &str) -> crate::Error {
    dataobject_model::Error::Assertion {
        attribute: name.to_string(),
        reason: reason.to_string(),
    }
    .into()
}

struct Normalizer<'a, 'r> {
    codec: &'a JsonCodec<'r>,
}

impl Normalizer<'_, '_> {
    fn sort(&self, items: &mut Vec<Value>) -> Result<()> {
        if items.len() < 2 {
            return Ok(());
        }
        let natural = items[0].is_self_ordering()
            && items.iter().all(|item| items[0].natural_cmp(item).is_some());
        if natural {
            items.sort_by(|a, b| a.natural_cmp(b).unwrap_or(Ordering::Equal));
            return Ok(());
        }
        let keys = items
            .iter()
            .map(|item| self.codec.write(item))
            .collect::<Result<Vec<_>>>()?;
        sort_by_keys(items, keys);
        Ok(())
    }
}

fn sort_by_keys<T>(items: &mut Vec<T>, keys: Vec<String>) {
    let mut keyed: Vec<(String, T)> = keys.into_iter().zip(items.drain(..)).collect();
    keyed.sort_by(|a, b| a.0.cmp(&b.0));
    items.extend(keyed.into_iter().map(|(_, item)| item));
}

impl ReplacingVisitor for Normalizer<'_, '_> {
    fn registry(&self) -> Option<&DataObjectRegistry> {
        Some(self.codec.registry())
    }

    fn replace_set(&mut self, node: &mut AttributeNode) -> Result<()> {
        self.normalize_unordered(node)
    }

    fn replace_collection(&mut self, node: &mut AttributeNode) -> Result<()> {
        self.normalize_unordered(node)
    }

    fn replace_entity(&mut self, entity: &mut Entity) -> Result<()> {
        walk_entity_mut(self, entity)?;
        if entity.contributions().len() > 1 {
            let keys = entity
                .contributions()
                .iter()
                .map(|c| self.codec.write_entity(c))
                .collect::<Result<Vec<_>>>()?;
            let mut contributions = entity.take_contributions();
            sort_by_keys(&mut contributions, keys);
            for contribution in contributions {
                entity.put_contribution(contribution)?;
            }
        }
        Ok(())
    }
}

impl Normalizer<'_, '_> {
    fn normalize_unordered(&mut self, node: &mut AttributeNode) -> Result<()> {
        let Some(mut items) = node.items_mut() else {
            return Ok(());
        };
        for item in items.iter_mut() {
            walk_value_mut(self, item)?;
        }
        self.sort(&mut items)
    }
}

struct Cleaner<'r> {
    registry: &'r DataObjectRegistry,
}

impl ReplacingVisitor for Cleaner<'_> {
    fn registry(&self) -> Option<&DataObjectRegistry> {
        Some(self.registry)
    }

    fn replace_entity(&mut self, entity: &mut Entity) -> Result<()> {
        entity.remove_if(|node| node.is_null_value() || node.is_empty_collection());
        walk_entity_mut(self, entity)
    }
}
