//! Text encoding of data objects.
//!
//! [`JsonCodec`] writes an entity as a JSON object: the registered type name
//! under `_type`, the type version under `_typeVersion`, every attached node
//! under its attribute name, and contributions as an array under
//! `_contributions`. Object keys are written in sorted order, so equal trees
//! with equally ordered collections produce identical text.

use crate::config::CodecConfig;
use crate::error::{Error, Result};
use crate::registry::DataObjectRegistry;
use dataobject_model::{AttributeNode, DO_ENTITY, Entity, NodeKind, TypeInfo, Value, ValueType};
use serde_json::{Map, Number};

/// Reads and writes data object trees as text.
pub trait Codec {
    fn write(&self, value: &Value) -> Result<String>;

    fn write_entity(&self, entity: &Entity) -> Result<String>;

    /// Reads an entity of (at least) type `target`, resolving the type name
    /// written in the text.
    fn read(&self, text: &str, target: &'static TypeInfo) -> Result<Entity>;

    /// Reads a generic entity tree, keeping type tags as plain attributes.
    fn read_raw(&self, text: &str) -> Result<Entity>;
}

/// JSON codec backed by `serde_json`.
#[derive(Debug, Clone)]
pub struct JsonCodec<'r> {
    registry: &'r DataObjectRegistry,
    config: CodecConfig,
}

impl<'r> JsonCodec<'r> {
    pub fn new(registry: &'r DataObjectRegistry) -> Self {
        Self::with_config(registry, CodecConfig::default())
    }

    pub fn with_config(registry: &'r DataObjectRegistry, config: CodecConfig) -> Self {
        Self { registry, config }
    }

    pub fn registry(&self) -> &'r DataObjectRegistry {
        self.registry
    }

    pub fn config(&self) -> &CodecConfig {
        &self.config
    }

    // ── writing ─────────────────────────────────────────────────────────

    pub fn to_json(&self, value: &Value) -> Result<serde_json::Value> {
        Ok(match value {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Int(i) => serde_json::Value::Number(Number::from(*i)),
            Value::Float(f) => Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .ok_or_else(|| Error::codec(format!("cannot encode non-finite number {f}")))?,
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::Array(items) => serde_json::Value::Array(
                items
                    .iter()
                    .map(|item| self.to_json(item))
                    .collect::<Result<_>>()?,
            ),
            Value::Map(entries) => {
                let mut map = Map::new();
                for (key, value) in entries {
                    let key = key.as_str().ok_or_else(|| {
                        Error::codec(format!(
                            "map key must be a string, found {}",
                            key.kind_name()
                        ))
                    })?;
                    map.insert(key.to_string(), self.to_json(value)?);
                }
                serde_json::Value::Object(map)
            }
            Value::Entity(entity) => self.entity_to_json(entity)?,
            Value::Opaque(opaque) => opaque.to_json(),
        })
    }

    pub fn entity_to_json(&self, entity: &Entity) -> Result<serde_json::Value> {
        let mut map = Map::new();
        let t = entity.type_info();
        if let Some(name) = self.registry.to_type_name(t) {
            map.insert(self.config.type_name_key.clone(), name.into());
        }
        if let Some(version) = self.registry.type_version(t) {
            map.insert(self.config.type_version_key.clone(), version.to_string().into());
        }
        for (name, node) in entity.all_nodes() {
            map.insert(name.clone(), self.to_json(node.get())?);
        }
        if entity.has_contributions() {
            let contributions = entity
                .contributions()
                .iter()
                .map(|c| self.entity_to_json(c))
                .collect::<Result<Vec<_>>>()?;
            map.insert(
                self.config.contributions_key.clone(),
                serde_json::Value::Array(contributions),
            );
        }
        Ok(serde_json::Value::Object(map))
    }

    fn render(&self, json: &serde_json::Value) -> Result<String> {
        let text = if self.config.pretty {
            serde_json::to_string_pretty(json)?
        } else {
            serde_json::to_string(json)?
        };
        Ok(text)
    }

    // ── typed reading ───────────────────────────────────────────────────

    fn parse_object(text: &str) -> Result<Map<String, serde_json::Value>> {
        match serde_json::from_str(text)? {
            serde_json::Value::Object(map) => Ok(map),
            other => Err(Error::codec(format!(
                "expected a JSON object, found {}",
                json_kind(&other)
            ))),
        }
    }

    fn entity_from_json(
        &self,
        mut map: Map<String, serde_json::Value>,
        expected: &'static TypeInfo,
    ) -> Result<Entity> {
        let t = match map.remove(&self.config.type_name_key) {
            Some(serde_json::Value::String(name)) => match self.registry.from_type_name(&name) {
                Some(resolved) if *expected == DO_ENTITY || resolved.is_assignable_to(expected) => {
                    resolved
                }
                Some(resolved) => {
                    return Err(Error::codec(format!(
                        "type '{name}' resolves to {}, which is not a {}",
                        resolved.id(),
                        expected.id()
                    )));
                }
                None => expected,
            },
            Some(other) => {
                return Err(Error::codec(format!(
                    "type name must be a string, found {}",
                    json_kind(&other)
                )));
            }
            None => expected,
        };
        map.remove(&self.config.type_version_key);
        let contributions = map.remove(&self.config.contributions_key);

        let mut entity = Entity::of_type(t);
        for (name, json) in map {
            let node = match self.registry.attribute_descriptor(t, &name) {
                Some(descriptor) => {
                    self.node_from_json(&name, json, descriptor.kind(), descriptor.value_type())?
                }
                None => self.untyped_node(json)?,
            };
            entity.put_node(&name, node)?;
        }

        if let Some(contributions) = contributions {
            let serde_json::Value::Array(items) = contributions else {
                return Err(Error::codec("contributions must be an array"));
            };
            for item in items {
                let serde_json::Value::Object(map) = item else {
                    return Err(Error::codec("contribution must be an object"));
                };
                entity.put_contribution(self.entity_from_json(map, &DO_ENTITY)?)?;
            }
        }
        Ok(entity)
    }

    fn node_from_json(
        &self,
        name: &str,
        json: serde_json::Value,
        kind: NodeKind,
        value_type: ValueType,
    ) -> Result<AttributeNode> {
        if kind == NodeKind::Value {
            return Ok(AttributeNode::of_value(self.typed_value(json, value_type)?));
        }
        let items = match json {
            serde_json::Value::Null => Vec::new(),
            serde_json::Value::Array(items) => items,
            other => {
                return Err(Error::codec(format!(
                    "attribute '{name}' expects an array, found {}",
                    json_kind(&other)
                )));
            }
        };
        let items = items
            .into_iter()
            .map(|item| self.typed_value(item, value_type))
            .collect::<Result<Vec<_>>>()?;
        Ok(match kind {
            NodeKind::Set => AttributeNode::of_set(items),
            NodeKind::Collection => AttributeNode::of_collection(items),
            _ => AttributeNode::of_list(items),
        })
    }

    fn untyped_node(&self, json: serde_json::Value) -> Result<AttributeNode> {
        Ok(match json {
            serde_json::Value::Array(items) => AttributeNode::of_list(
                items
                    .into_iter()
                    .map(|item| self.untyped_value(item))
                    .collect::<Result<Vec<_>>>()?,
            ),
            other => AttributeNode::of_value(self.untyped_value(other)?),
        })
    }

    fn typed_value(&self, json: serde_json::Value, value_type: ValueType) -> Result<Value> {
        match (value_type, json) {
            (_, serde_json::Value::Null) => Ok(Value::Null),
            (ValueType::Entity(t), serde_json::Value::Object(map)) => {
                Ok(Value::Entity(self.entity_from_json(map, t)?))
            }
            (ValueType::Opaque(t), json) => {
                let decoder = t.opaque_decoder().ok_or_else(|| {
                    Error::codec(format!("no decoder registered for value type {}", t.id()))
                })?;
                Ok(Value::Opaque(decoder(&json)?))
            }
            (ValueType::Float, serde_json::Value::Number(n)) => n
                .as_f64()
                .map(Value::Float)
                .ok_or_else(|| Error::codec(format!("cannot decode {n} as float"))),
            (ValueType::Map, serde_json::Value::Object(map)) => {
                let entries = map
                    .into_iter()
                    .map(|(key, value)| Ok((Value::String(key), self.untyped_value(value)?)))
                    .collect::<Result<Vec<_>>>()?;
                Ok(Value::Map(entries))
            }
            (_, json) => self.untyped_value(json),
        }
    }

    fn untyped_value(&self, json: serde_json::Value) -> Result<Value> {
        Ok(match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => number_value(&n)?,
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => Value::Array(
                items
                    .into_iter()
                    .map(|item| self.untyped_value(item))
                    .collect::<Result<_>>()?,
            ),
            serde_json::Value::Object(map) => {
                Value::Entity(self.entity_from_json(map, &DO_ENTITY)?)
            }
        })
    }
}

// ── raw reading ─────────────────────────────────────────────────────────

fn raw_entity(map: Map<String, serde_json::Value>) -> Result<Entity> {
    let mut entity = Entity::new();
    for (name, json) in map {
        let node = match json {
            serde_json::Value::Array(items) => AttributeNode::of_list(
                items
                    .into_iter()
                    .map(raw_value)
                    .collect::<Result<Vec<_>>>()?,
            ),
            other => AttributeNode::of_value(raw_value(other)?),
        };
        entity.put_node(&name, node)?;
    }
    Ok(entity)
}

fn raw_value(json: serde_json::Value) -> Result<Value> {
    Ok(match json {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Bool(b),
        serde_json::Value::Number(n) => number_value(&n)?,
        serde_json::Value::String(s) => Value::String(s),
        serde_json::Value::Array(items) => Value::Array(
            items
                .into_iter()
                .map(raw_value)
                .collect::<Result<_>>()?,
        ),
        serde_json::Value::Object(map) => Value::Entity(raw_entity(map)?),
    })
}

fn number_value(n: &Number) -> Result<Value> {
    if let Some(i) = n.as_i64() {
        return Ok(Value::Int(i));
    }
    n.as_f64()
        .map(Value::Float)
        .ok_or_else(|| Error::codec(format!("cannot decode number {n}")))
}

fn json_kind(json: &serde_json::Value) -> &'static str {
    match json {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "bool",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

impl Codec for JsonCodec<'_> {
    fn write(&self, value: &Value) -> Result<String> {
        self.render(&self.to_json(value)?)
    }

    fn write_entity(&self, entity: &Entity) -> Result<String> {
        self.render(&self.entity_to_json(entity)?)
    }

    fn read(&self, text: &str, target: &'static TypeInfo) -> Result<Entity> {
        self.entity_from_json(Self::parse_object(text)?, target)
    }

    fn read_raw(&self, text: &str) -> Result<Entity> {
        raw_entity(Self::parse_object(text)?)
    }
}
