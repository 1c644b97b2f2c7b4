// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Collections of nodes of one class

use crate::db::Db;
use crate::error::Result;
use crate::lifecycle::Cascade;
use crate::model::ModelClass;
use crate::node::Node;
use crate::value::Value;
use std::sync::Arc;

/// Nodes returned by a query, in result order
#[derive(Debug, Clone)]
pub struct NodeCollection {
    class: Arc<ModelClass>,
    items: Vec<Node>,
}

impl NodeCollection {
    pub fn new(class: &Arc<ModelClass>, items: Vec<Node>) -> Self {
        Self {
            class: class.clone(),
            items,
        }
    }

    pub fn class(&self) -> &Arc<ModelClass> {
        &self.class
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Node> {
        self.items.iter()
    }

    pub fn get(&self, index: usize) -> Option<&Node> {
        self.items.get(index)
    }

    pub fn first(&self) -> Option<&Node> {
        self.items.first()
    }

    pub fn push(&mut self, node: Node) {
        self.items.push(node);
    }

    pub fn into_vec(self) -> Vec<Node> {
        self.items
    }

    /// Stable ids of the members that have one
    pub fn ids(&self) -> Vec<String> {
        self.items.iter().filter_map(Node::id).collect()
    }

    /// Set a property on every member
    pub fn set_property<K: Into<String>, V: Into<Value>>(&self, key: K, value: V) {
        let key = key.into();
        let value = value.into();
        for node in &self.items {
            node.set(key.clone(), value.clone());
        }
    }

    /// Save every member in one transaction
    pub async fn save<C: Into<Cascade>>(&self, db: &Db, cascade: C) -> Result<()> {
        let cascade = cascade.into();
        let mut tx = db.begin_transaction().await?;
        let mut result = Ok(());
        for node in &self.items {
            result = node.save_in(&mut tx, cascade.clone()).await;
            if result.is_err() {
                break;
            }
        }
        tx.finish(result).await
    }

    /// Delete every member in one transaction
    pub async fn delete<C: Into<Cascade>>(&self, db: &Db, cascade: C) -> Result<()> {
        let cascade = cascade.into();
        let mut tx = db.begin_transaction().await?;
        let mut result = Ok(());
        for node in &self.items {
            result = node.delete_in(&mut tx, cascade.clone()).await;
            if result.is_err() {
                break;
            }
        }
        tx.finish(result).await
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Array(self.items.iter().map(Node::to_json).collect())
    }
}

impl IntoIterator for NodeCollection {
    type Item = Node;
    type IntoIter = std::vec::IntoIter<Node>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<'a> IntoIterator for &'a NodeCollection {
    type Item = &'a Node;
    type IntoIter = std::slice::Iter<'a, Node>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
