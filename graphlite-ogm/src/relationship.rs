// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Relationship wrapper
//!
//! A [`Relationship`] is a typed view over one edge. Its endpoints are weak
//! node references, so an edge never keeps the nodes it connects alive.
//!
//! A graph materializes one wrapper per stored edge. Endpoints of a stored
//! edge follow its stored start and end whichever side it was resolved
//! from; endpoints of a new edge follow the declaring node.

use crate::db::{Db, Transaction};
use crate::entity::{RawRelationship, StoreId};
use crate::error::{Error, Result};
use crate::graph::Graph;
use crate::model::{Direction, PropertyBag, RelationshipDef};
use crate::node::{Node, WeakNode};
use crate::value::{map_to_json, Params, PropertyMap, Value};
use parking_lot::RwLock;
use std::fmt;
use std::sync::{Arc, Weak};

struct RelState {
    entity: Option<RawRelationship>,
    bag: PropertyBag,
    start: Option<WeakNode>,
    end: Option<WeakNode>,
    // endpoints match the stored edge's start and end
    stored_order: bool,
}

struct RelInner {
    def: RelationshipDef,
    state: RwLock<RelState>,
    graph: RwLock<Weak<Graph>>,
}

/// Handle to an edge wrapper
///
/// Clones share state; use [`Relationship::ptr_eq`] to compare identity.
#[derive(Clone)]
pub struct Relationship {
    inner: Arc<RelInner>,
    pin: Option<Arc<Graph>>,
}

impl Relationship {
    /// New, unsaved relationship for a definition
    pub fn new(def: &RelationshipDef) -> Self {
        Self::build(def, None, PropertyBag::new(), Weak::new())
    }

    pub fn with_properties(def: &RelationshipDef, properties: PropertyMap) -> Self {
        let rel = Self::new(def);
        rel.set_properties(properties);
        rel
    }

    pub(crate) fn from_entity(def: &RelationshipDef, entity: RawRelationship, graph: Weak<Graph>) -> Self {
        let bag = PropertyBag::from_map(entity.properties.clone());
        Self::build(def, Some(entity), bag, graph)
    }

    fn build(def: &RelationshipDef, entity: Option<RawRelationship>, bag: PropertyBag, graph: Weak<Graph>) -> Self {
        Self {
            inner: Arc::new(RelInner {
                def: def.clone(),
                state: RwLock::new(RelState {
                    entity,
                    bag,
                    start: None,
                    end: None,
                    stored_order: false,
                }),
                graph: RwLock::new(graph),
            }),
            pin: None,
        }
    }

    pub(crate) fn pinned(&self, graph: Option<Arc<Graph>>) -> Self {
        Self {
            inner: self.inner.clone(),
            pin: graph,
        }
    }

    pub(crate) fn unpinned(&self) -> Self {
        self.pinned(None)
    }

    /// Take over a freshly ingested entity, keeping local edits
    pub(crate) fn refresh(&self, entity: &RawRelationship) {
        let mut state = self.inner.state.write();
        if !state.bag.is_dirty() {
            state.bag.replace(entity.properties.clone());
        }
        state.entity = Some(entity.clone());
    }

    pub fn definition(&self) -> &RelationshipDef {
        &self.inner.def
    }

    pub fn rel_type(&self) -> &str {
        self.inner.def.type_name()
    }

    pub fn direction(&self) -> Direction {
        self.inner.def.get_direction()
    }

    pub fn store_id(&self) -> Option<StoreId> {
        self.inner.state.read().entity.as_ref().map(|e| e.identity)
    }

    pub fn entity(&self) -> Option<RawRelationship> {
        self.inner.state.read().entity.clone()
    }

    /// True until the edge has been saved or fetched
    pub fn is_new(&self) -> bool {
        self.inner.state.read().entity.is_none()
    }

    pub fn is_dirty(&self) -> bool {
        let state = self.inner.state.read();
        state.entity.is_none() || state.bag.is_dirty()
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.inner.state.read().bag.get(key).cloned()
    }

    pub fn set<K: Into<String>, V: Into<Value>>(&self, key: K, value: V) {
        self.inner.state.write().bag.set(key, value);
    }

    pub fn remove(&self, key: &str) -> Option<Value> {
        self.inner.state.write().bag.remove(key)
    }

    pub fn set_properties(&self, properties: PropertyMap) {
        let mut state = self.inner.state.write();
        for (key, value) in properties {
            state.bag.set(key, value);
        }
    }

    pub fn properties(&self) -> PropertyMap {
        self.inner.state.read().bag.data().clone()
    }

    /// Start node: the stored start once the edge is known to the store
    /// through a graph, else the declaring node
    pub fn start(&self) -> Option<Node> {
        let weak = self.inner.state.read().start.clone();
        weak.and_then(|w| Node::from_weak(&w, self.graph()))
    }

    /// End node, opposite [`start`](Relationship::start)
    pub fn end(&self) -> Option<Node> {
        let weak = self.inner.state.read().end.clone();
        weak.and_then(|w| Node::from_weak(&w, self.graph()))
    }

    /// Set the declaring node and the related node
    ///
    /// The definition's direction decides the arrow on save.
    pub fn set_endpoints(&self, start: &Node, end: &Node) {
        let mut state = self.inner.state.write();
        state.start = Some(start.downgrade());
        state.end = Some(end.downgrade());
        state.stored_order = false;
    }

    /// Connect the declaring node and a related node
    ///
    /// When the edge is stored between the two, endpoints take the stored
    /// order so resolving from either side never flips them.
    pub(crate) fn attach_endpoints(&self, declaring: &Node, related: &Node) {
        let ids = (declaring.store_id(), related.store_id());
        let mut state = self.inner.state.write();
        let stored = state.entity.as_ref().map(|e| (e.start, e.end));

        let (start, end, stored_order) = match (stored, ids) {
            (Some((s, e)), (Some(d), Some(r))) if s == d && e == r => (declaring, related, true),
            (Some((s, e)), (Some(d), Some(r))) if s == r && e == d => (related, declaring, true),
            _ => (declaring, related, false),
        };
        state.start = Some(start.downgrade());
        state.end = Some(end.downgrade());
        state.stored_order = stored_order;
    }

    /// Graph this edge was materialized in, if it is still alive
    pub fn graph(&self) -> Option<Arc<Graph>> {
        self.inner.graph.read().upgrade()
    }

    pub fn ptr_eq(&self, other: &Relationship) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub fn to_json(&self) -> serde_json::Value {
        map_to_json(self.inner.state.read().bag.data())
    }

    /// Save the edge in its own transaction
    pub async fn save(&self, db: &Db) -> Result<()> {
        let mut tx = db.begin_transaction().await?;
        let result = self.save_in(&mut tx).await;
        tx.finish(result).await
    }

    /// Merge the edge between its endpoints
    ///
    /// A stored edge is merged in its stored direction. Otherwise IN
    /// reverses the arrow. BOTH also merges the reverse edge with the same
    /// properties.
    pub async fn save_in(&self, tx: &mut Transaction) -> Result<()> {
        let (start, end) = match (self.start(), self.end()) {
            (Some(start), Some(end)) => (start, end),
            _ => return Err(Error::invalid_state("relationship endpoints are not set")),
        };
        let start_id = start.id().ok_or_else(Error::missing_identity)?;
        let end_id = end.id().ok_or_else(Error::missing_identity)?;

        let rel_type = self.rel_type();
        let direction = self.direction();
        let stored_order = self.inner.state.read().stored_order;
        let (left, right) = match direction {
            Direction::In if !stored_order => ("<", ""),
            _ => ("", ">"),
        };

        let mut query = format!(
            "MATCH (start:{} {{id: $start}}), (end:{} {{id: $end}})\nMERGE (start){}-[r:{}]-{}(end)\n",
            start.base_label(),
            end.base_label(),
            left,
            rel_type,
            right
        );
        if direction == Direction::Both {
            query.push_str(&format!("MERGE (end)-[r_2:{}]->(start)\n", rel_type));
        }
        query.push_str("SET r += $properties\n");
        if direction == Direction::Both {
            query.push_str("SET r_2 += $properties\n");
        }
        query.push_str("RETURN r");

        let mut params = Params::new();
        params.insert("start".to_string(), Value::from(start_id));
        params.insert("end".to_string(), Value::from(end_id));
        params.insert("properties".to_string(), Value::Map(self.properties()));

        let records = tx.run(&query, params).await?;
        let entity = records
            .first()
            .and_then(|r| r.get("r"))
            .and_then(Value::as_relationship)
            .cloned()
            .ok_or_else(|| Error::not_found("Relationship endpoints not found"))?;

        let mut state = self.inner.state.write();
        state.entity = Some(entity);
        state.bag.reset();
        Ok(())
    }
}

impl fmt::Debug for Relationship {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Relationship")
            .field("type", &self.rel_type())
            .field("direction", &self.direction())
            .field("store_id", &self.store_id())
            .finish()
    }
}
