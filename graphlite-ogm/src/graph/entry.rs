// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Cache entries

use crate::entity::{RawNode, RawRelationship};
use crate::node::Node;
use crate::relationship::Relationship;
use std::collections::HashMap;

/// One cached entity with the wrappers materialized over it
///
/// Wrappers are keyed by class name for nodes and by relationship type for
/// relationships, so each lens over the same raw entity is materialized
/// once per graph.
#[derive(Debug)]
pub struct CacheEntry<E, W> {
    entity: E,
    column: Option<String>,
    wrappers: HashMap<String, W>,
}

pub type NodeEntry = CacheEntry<RawNode, Node>;
pub type RelationshipEntry = CacheEntry<RawRelationship, Relationship>;

impl<E, W: Clone> CacheEntry<E, W> {
    pub(crate) fn new(entity: E, column: Option<String>) -> Self {
        Self {
            entity,
            column,
            wrappers: HashMap::new(),
        }
    }

    /// Raw entity as last ingested
    pub fn entity(&self) -> &E {
        &self.entity
    }

    /// Column the entity was last ingested from
    pub fn column(&self) -> Option<&str> {
        self.column.as_deref()
    }

    pub fn wrapper(&self, key: &str) -> Option<&W> {
        self.wrappers.get(key)
    }

    pub fn wrapper_count(&self) -> usize {
        self.wrappers.len()
    }

    pub(crate) fn wrappers(&self) -> impl Iterator<Item = &W> {
        self.wrappers.values()
    }

    pub(crate) fn update(&mut self, entity: E, column: Option<String>) {
        self.entity = entity;
        if column.is_some() {
            self.column = column;
        }
    }

    pub(crate) fn insert_wrapper(&mut self, key: String, wrapper: W) {
        self.wrappers.insert(key, wrapper);
    }

    /// Existing wrapper under `key`, or a new one built from the entity
    pub(crate) fn materialize<F>(&mut self, key: &str, build: F) -> W
    where
        F: FnOnce(&E) -> W,
    {
        if let Some(wrapper) = self.wrappers.get(key) {
            return wrapper.clone();
        }
        let wrapper = build(&self.entity);
        self.wrappers.insert(key.to_string(), wrapper.clone());
        wrapper
    }
}
