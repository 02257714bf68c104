//! The namespace directory.
//!
//! Every type version names a namespace; the registry refuses versions whose
//! namespace is not listed here.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// A registered namespace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Namespace {
    pub id: String,
    /// Sort order, used when namespaces are listed.
    #[serde(default)]
    pub order: f64,
}

impl Namespace {
    pub fn new(id: impl Into<String>, order: f64) -> Self {
        Self {
            id: id.into(),
            order,
        }
    }
}

/// All registered namespaces, sorted by order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Namespaces {
    entries: Vec<Namespace>,
}

impl Namespaces {
    /// Builds the directory, rejecting duplicate ids.
    pub fn new(namespaces: impl IntoIterator<Item = Namespace>) -> Result<Self> {
        let mut entries: Vec<Namespace> = Vec::new();
        for ns in namespaces {
            if entries.iter().any(|e| e.id == ns.id) {
                return Err(Error::configuration(format!(
                    "namespace '{}' is registered twice",
                    ns.id
                )));
            }
            entries.push(ns);
        }
        entries.sort_by(|a, b| a.order.total_cmp(&b.order));
        Ok(Self { entries })
    }

    pub fn by_id(&self, id: &str) -> Option<&Namespace> {
        self.entries.iter().find(|ns| ns.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.by_id(id).is_some()
    }

    pub fn all(&self) -> &[Namespace] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
