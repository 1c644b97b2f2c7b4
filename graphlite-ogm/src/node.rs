// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Node wrapper
//!
//! A [`Node`] is a typed view over one node: its properties, its labels and
//! the relationships declared by its [`ModelClass`]. Clones share state.
//!
//! # Examples
//!
//! ```no_run
//! # use graphlite_ogm::{ModelClass, Node, RelationshipDef};
//! let person = ModelClass::builder("Person")
//!     .relationship("friends", RelationshipDef::of_type("knows"))
//!     .build();
//!
//! let alice = Node::new(&person);
//! alice.set("name", "Alice");
//! assert!(alice.is_new());
//! assert!(alice.is_dirty());
//! ```

use crate::db::Db;
use crate::entity::{RawNode, StoreId};
use crate::error::{Error, Result};
use crate::graph::{Graph, LinkedValue};
use crate::model::{ModelClass, PropertyBag, RelationshipDef};
use crate::planner::WithSpec;
use crate::query::{self, Criteria, QueryOptions};
use crate::related::{RelatedNode, Resolved};
use crate::relationship::Relationship;
use crate::value::{map_to_json, PropertyMap, Value};
use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Weak};

pub(crate) type WeakNode = Weak<NodeInner>;

// Graph a handle keeps alive; shared by clones of the handle
type Pin = Arc<RwLock<Option<Arc<Graph>>>>;

fn pin_slot(graph: Option<Arc<Graph>>) -> Pin {
    Arc::new(RwLock::new(graph))
}

/// Related node assigned by the caller, owned by the node's graph
#[derive(Clone)]
struct Assigned {
    node: WeakNode,
    rel: Relationship,
}

struct NodeState {
    entity: Option<RawNode>,
    bag: PropertyBag,
    labels: Vec<String>,
    related: HashMap<String, Vec<Assigned>>,
    deleted: bool,
}

pub(crate) struct NodeInner {
    class: Arc<ModelClass>,
    state: RwLock<NodeState>,
    graph: RwLock<Weak<Graph>>,
}

/// Handle to a node wrapper
///
/// Use [`Node::ptr_eq`] to test whether two handles are the same wrapper.
#[derive(Clone)]
pub struct Node {
    inner: Arc<NodeInner>,
    pin: Pin,
}

impl Node {
    /// New, unsaved node of a class
    pub fn new(class: &Arc<ModelClass>) -> Self {
        Self::build(class, None, PropertyBag::new(), class.labels().to_vec(), Weak::new())
    }

    pub fn with_properties(class: &Arc<ModelClass>, properties: PropertyMap) -> Self {
        let node = Self::new(class);
        node.set_properties(properties);
        node
    }

    pub(crate) fn from_entity(class: &Arc<ModelClass>, entity: RawNode, graph: Weak<Graph>) -> Self {
        let bag = PropertyBag::from_map(entity.properties.clone());
        let labels = entity.labels.clone();
        Self::build(class, Some(entity), bag, labels, graph)
    }

    fn build(
        class: &Arc<ModelClass>,
        entity: Option<RawNode>,
        bag: PropertyBag,
        labels: Vec<String>,
        graph: Weak<Graph>,
    ) -> Self {
        Self {
            inner: Arc::new(NodeInner {
                class: class.clone(),
                state: RwLock::new(NodeState {
                    entity,
                    bag,
                    labels,
                    related: HashMap::new(),
                    deleted: false,
                }),
                graph: RwLock::new(graph),
            }),
            pin: pin_slot(None),
        }
    }

    pub(crate) fn from_weak(weak: &WeakNode, pin: Option<Arc<Graph>>) -> Option<Self> {
        weak.upgrade().map(|inner| Self {
            inner,
            pin: pin_slot(pin),
        })
    }

    pub(crate) fn downgrade(&self) -> WeakNode {
        Arc::downgrade(&self.inner)
    }

    /// Identity of the wrapper, stable while it is alive
    pub(crate) fn key(&self) -> usize {
        Arc::as_ptr(&self.inner) as usize
    }

    pub(crate) fn pinned(&self, graph: Option<Arc<Graph>>) -> Self {
        Self {
            inner: self.inner.clone(),
            pin: pin_slot(graph),
        }
    }

    pub(crate) fn unpinned(&self) -> Self {
        self.pinned(None)
    }

    pub(crate) fn attach_to(&self, graph: Weak<Graph>) {
        *self.inner.graph.write() = graph;
    }

    /// Take over a freshly ingested entity
    ///
    /// Property data is only replaced while the wrapper has no local edits.
    pub(crate) fn refresh(&self, entity: &RawNode) {
        let mut state = self.inner.state.write();
        if !state.bag.is_dirty() {
            state.bag.replace(entity.properties.clone());
        }
        state.labels = entity.labels.clone();
        state.entity = Some(entity.clone());
    }

    pub(crate) fn mark_saved(&self, entity: RawNode) {
        let mut state = self.inner.state.write();
        state.entity = Some(entity);
        state.bag.reset();
    }

    pub(crate) fn mark_deleted(&self) {
        let mut state = self.inner.state.write();
        state.entity = None;
        state.bag.remove("id");
        state.deleted = true;
    }

    pub(crate) fn add_local_labels(&self, labels: &[String]) {
        let mut state = self.inner.state.write();
        for label in labels {
            if !state.labels.contains(label) {
                state.labels.push(label.clone());
            }
        }
    }

    pub(crate) fn remove_local_labels(&self, labels: &[String]) {
        self.inner
            .state
            .write()
            .labels
            .retain(|label| !labels.contains(label));
    }

    pub fn class(&self) -> &Arc<ModelClass> {
        &self.inner.class
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

    /// Snapshot of the current properties
    pub fn properties(&self) -> PropertyMap {
        self.inner.state.read().bag.data().clone()
    }

    /// Stable id, assigned on first save
    pub fn id(&self) -> Option<String> {
        self.inner
            .state
            .read()
            .bag
            .get("id")
            .and_then(Value::as_str)
            .map(str::to_string)
    }

    pub fn set_id<T: Into<String>>(&self, id: T) {
        self.set("id", id.into());
    }

    /// Store identity; `None` while new
    pub fn store_id(&self) -> Option<StoreId> {
        self.inner.state.read().entity.as_ref().map(|e| e.identity)
    }

    pub fn entity(&self) -> Option<RawNode> {
        self.inner.state.read().entity.clone()
    }

    pub fn is_new(&self) -> bool {
        self.inner.state.read().entity.is_none()
    }

    /// New, or changed since the last save
    pub fn is_dirty(&self) -> bool {
        let state = self.inner.state.read();
        state.entity.is_none() || state.bag.is_dirty()
    }

    pub fn is_deleted(&self) -> bool {
        self.inner.state.read().deleted
    }

    pub fn labels(&self) -> Vec<String> {
        self.inner.state.read().labels.clone()
    }

    pub fn base_label(&self) -> &str {
        self.inner.class.base_label()
    }

    /// Graph this node resolves relationships through, if still alive
    pub fn graph(&self) -> Option<Arc<Graph>> {
        self.inner.graph.read().upgrade()
    }

    pub fn ptr_eq(&self, other: &Node) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Graph owning this node's assigned related nodes
    ///
    /// A node outside any graph gets a fresh one, pinned by this handle and
    /// its clones.
    fn owning_graph(&self) -> Arc<Graph> {
        if let Some(graph) = self.graph() {
            return graph;
        }
        let graph = Graph::new();
        graph.attach(self);
        *self.pin.write() = Some(graph.clone());
        graph
    }

    /// Related nodes for a declared relationship
    ///
    /// Nodes assigned with [`set_related`](Node::set_related) take
    /// precedence; otherwise they are resolved through the node's graph.
    /// Assigned nodes that no longer exist are skipped.
    pub fn related(&self, name: &str) -> Result<Resolved<RelatedNode>> {
        let def = self.inner.class.get_relationship(name)?.clone();
        let assigned = self.inner.state.read().related.get(name).cloned();

        let items = match assigned {
            Some(items) => {
                let pin = self.graph();
                items
                    .into_iter()
                    .filter_map(|item| {
                        let node = Node::from_weak(&item.node, pin.clone())?;
                        Some(RelatedNode::new(node, item.rel.pinned(pin.clone())))
                    })
                    .collect()
            }
            None => self.resolve_related(&def),
        };
        Ok(Resolved::from_vec(items, def.is_singular()))
    }

    fn resolve_related(&self, def: &RelationshipDef) -> Vec<RelatedNode> {
        let Some(graph) = self.graph() else {
            return Vec::new();
        };

        graph
            .get_related(self, def)
            .into_vec()
            .into_iter()
            .map(|other| {
                let rel = graph
                    .get_relationship(self, &other, def)
                    .unwrap_or_else(|| Relationship::new(def));
                rel.attach_endpoints(self, &other);
                RelatedNode::new(other, rel)
            })
            .collect()
    }

    /// Replace the related nodes of a relationship
    ///
    /// Existing edges found in the graph are reused; `properties` are set
    /// on every edge. A singular relationship keeps the first node only.
    /// The assigned nodes are owned by this node's graph.
    pub fn set_related<I>(&self, name: &str, nodes: I, properties: PropertyMap) -> Result<()>
    where
        I: IntoIterator<Item = Node>,
    {
        let def = self.inner.class.get_relationship(name)?.clone();
        let graph = self.owning_graph();
        let mut items: Vec<RelatedNode> = nodes
            .into_iter()
            .map(|node| self.connect(&graph, &def, node, &properties))
            .collect();
        if def.is_singular() {
            items.truncate(1);
        }
        self.assign_related(&graph, name, items);
        Ok(())
    }

    /// Add a related node, keeping existing ones unless singular
    pub fn add_related(&self, name: &str, node: &Node, properties: PropertyMap) -> Result<()> {
        let def = self.inner.class.get_relationship(name)?.clone();
        let graph = self.owning_graph();
        let item = self.connect(&graph, &def, node.clone(), &properties);

        let items = if def.is_singular() {
            vec![item]
        } else {
            let mut items = self.related(name)?.into_vec();
            items.push(item);
            items
        };
        self.assign_related(&graph, name, items);
        Ok(())
    }

    fn connect(&self, graph: &Graph, def: &RelationshipDef, node: Node, properties: &PropertyMap) -> RelatedNode {
        let rel = graph
            .get_relationship(self, &node, def)
            .unwrap_or_else(|| Relationship::new(def));
        rel.set_properties(properties.clone());
        rel.attach_endpoints(self, &node);
        RelatedNode::new(node, rel)
    }

    fn assign_related(&self, graph: &Graph, name: &str, items: Vec<RelatedNode>) {
        let assigned: Vec<Assigned> = items
            .into_iter()
            .map(|item| {
                let (node, rel) = item.into_parts();
                graph.hold(&node);
                Assigned {
                    node: node.downgrade(),
                    rel: rel.unpinned(),
                }
            })
            .collect();

        let mut state = self.inner.state.write();
        state.related.insert(name.to_string(), assigned);
        state.bag.set_changed(name);
    }

    /// Values linked to this node in its graph
    pub fn linked(&self, name: &str) -> Option<Resolved<LinkedValue>> {
        self.graph()?.get_linked(self, name)
    }

    /// Forget assigned related nodes
    ///
    /// With a spec, only the named relationships are cleared, recursing
    /// into nested levels; without one, all of them are.
    pub fn clear_cached_relationships(&self, spec: Option<&WithSpec>) {
        let targets: Vec<(String, Option<WithSpec>)> = match spec {
            Some(spec) => spec
                .iter()
                .map(|(name, level)| (name.to_string(), level.nested().cloned()))
                .collect(),
            None => self
                .inner
                .class
                .relationship_names()
                .into_iter()
                .map(|name| (name, None))
                .collect(),
        };

        for (name, nested) in targets {
            let removed = self.inner.state.write().related.remove(&name);
            if let (Some(items), Some(nested)) = (removed, nested) {
                for node in items.iter().filter_map(|item| Node::from_weak(&item.node, None)) {
                    node.clear_cached_relationships(Some(&nested));
                }
            }
        }
    }

    /// Fetch related nodes from the store into this node's graph
    ///
    /// Runs the expansion for this node alone, attaching it to a fresh graph
    /// if it has none, and returns the resolved relationships by name.
    pub async fn fetch_related<W: Into<WithSpec>>(
        &mut self,
        db: &Db,
        with: W,
    ) -> Result<HashMap<String, Resolved<RelatedNode>>> {
        let spec: WithSpec = with.into();
        let id = self.id().ok_or_else(Error::missing_identity)?;

        let variable = db.config().default_variable.clone();
        let options = QueryOptions::new()
            .variable(&variable)
            .with(spec.clone());
        let prepared = query::prepare(&self.inner.class, Criteria::Id(id), options)?;

        let graph = self.graph().unwrap_or_else(|| Graph::with_db(db));
        if graph.db().is_none() {
            graph.set_db(db);
        }
        graph.add_model(&prepared.variable, &self.inner.class);
        graph.attach(self);
        graph.run(&prepared.query, prepared.parameters).await?;
        *self.pin.write() = Some(graph);

        self.clear_cached_relationships(Some(&spec));

        let mut results = HashMap::new();
        for name in spec.names() {
            results.insert(name.to_string(), self.related(name)?);
        }
        Ok(results)
    }

    /// Deserialize the properties into a user type
    pub fn deserialize<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_value(self.to_json())?)
    }

    pub fn to_json(&self) -> serde_json::Value {
        map_to_json(self.inner.state.read().bag.data())
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("class", &self.inner.class.name())
            .field("store_id", &self.store_id())
            .field("id", &self.id())
            .finish()
    }
}
