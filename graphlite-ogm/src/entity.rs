// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Raw entities as delivered by the store
//!
//! A raw entity is the property bag plus store metadata, prior to any
//! typed wrapping. Raw entities are treated as immutable once received;
//! a mutation in the store shows up as a new raw entity on the next fetch.

use crate::value::{PropertyMap, Value};
use serde::{Deserialize, Serialize};

/// Store-assigned integer handle of a node or relationship
///
/// Opaque and possibly reused by the store over time, never a business key.
pub type StoreId = i64;

/// Node as returned by the store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawNode {
    pub identity: StoreId,
    pub labels: Vec<String>,
    pub properties: PropertyMap,
}

impl RawNode {
    /// Create a node with no labels or properties
    pub fn new(identity: StoreId) -> Self {
        Self {
            identity,
            labels: Vec::new(),
            properties: PropertyMap::new(),
        }
    }

    /// Add a label
    pub fn with_label<T: Into<String>>(mut self, label: T) -> Self {
        let label = label.into();
        if !self.labels.contains(&label) {
            self.labels.push(label);
        }
        self
    }

    /// Set a property value
    pub fn with_property<K: Into<String>, V: Into<Value>>(mut self, key: K, value: V) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// Check if node has a specific label
    pub fn has_label(&self, label: &str) -> bool {
        self.labels.iter().any(|l| l == label)
    }

    /// Get a property value
    pub fn get_property(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }
}

/// Relationship as returned by the store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRelationship {
    pub identity: StoreId,
    #[serde(rename = "type")]
    pub rel_type: String,
    pub start: StoreId,
    pub end: StoreId,
    pub properties: PropertyMap,
}

impl RawRelationship {
    /// Create a relationship of `rel_type` from `start` to `end`
    pub fn new<T: Into<String>>(identity: StoreId, rel_type: T, start: StoreId, end: StoreId) -> Self {
        Self {
            identity,
            rel_type: rel_type.into(),
            start,
            end,
            properties: PropertyMap::new(),
        }
    }

    /// Set a property value
    pub fn with_property<K: Into<String>, V: Into<Value>>(mut self, key: K, value: V) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// Get a property value
    pub fn get_property(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }

    /// Check if this relationship goes from `start` to `end`
    pub fn goes_from_to(&self, start: StoreId, end: StoreId) -> bool {
        self.start == start && self.end == end
    }
}

/// Either kind of raw entity
#[derive(Debug, Clone, PartialEq)]
pub enum RawEntity {
    Node(RawNode),
    Relationship(RawRelationship),
}

impl RawEntity {
    pub fn identity(&self) -> StoreId {
        match self {
            RawEntity::Node(n) => n.identity,
            RawEntity::Relationship(r) => r.identity,
        }
    }

    pub fn properties(&self) -> &PropertyMap {
        match self {
            RawEntity::Node(n) => &n.properties,
            RawEntity::Relationship(r) => &r.properties,
        }
    }

    pub fn as_node(&self) -> Option<&RawNode> {
        match self {
            RawEntity::Node(n) => Some(n),
            RawEntity::Relationship(_) => None,
        }
    }

    pub fn as_relationship(&self) -> Option<&RawRelationship> {
        match self {
            RawEntity::Relationship(r) => Some(r),
            RawEntity::Node(_) => None,
        }
    }
}

impl From<RawNode> for RawEntity {
    fn from(node: RawNode) -> Self {
        RawEntity::Node(node)
    }
}

impl From<RawRelationship> for RawEntity {
    fn from(rel: RawRelationship) -> Self {
        RawEntity::Relationship(rel)
    }
}
