// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! In-memory graph of query results
//!
//! A [`Graph`] ingests result records into one identity space per query
//! session: every store identity maps to a single cache entry, relationships
//! are indexed in both directions, and typed wrappers are materialized once
//! per entry and class.
//!
//! Later queries can be run into the same graph. Entities seen again are
//! recognized instead of duplicated, and relationships found later become
//! visible to wrappers materialized earlier.
//!
//! The graph holds its wrappers strongly; wrappers point back at the graph
//! weakly. Wrappers handed out to callers additionally pin the graph so it
//! lives as long as anything obtained from it.
//!
//! Nodes assigned as related nodes of a node in this graph are held here as
//! well, never by the node they were assigned to. Assignments that form a
//! cycle are released together with the graph.

pub mod entry;
pub mod index;
pub mod links;

pub use entry::{CacheEntry, NodeEntry, RelationshipEntry};
pub use index::RelationshipIndex;
pub use links::{LinkSpec, LinkedValue};

use crate::db::Db;
use crate::entity::{RawNode, RawRelationship, StoreId};
use crate::error::{Error, Result};
use crate::model::{Direction, ModelClass, RelationshipDef};
use crate::node::Node;
use crate::related::Resolved;
use crate::relationship::Relationship;
use crate::resolver::{entity_kind, identity_of, EntityKind, EntityRef};
use crate::value::{Params, Record, Value};
use links::{LinkTarget, Links};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Weak};

/// Entry of a column's reference list
#[derive(Debug, Clone, PartialEq)]
pub enum Reference {
    Node(StoreId),
    Relationship(StoreId),
    Value(Value),
}

struct GraphState {
    nodes: HashMap<StoreId, NodeEntry>,
    relationships: HashMap<StoreId, RelationshipEntry>,
    index: RelationshipIndex,
    references: HashMap<String, Vec<Reference>>,
    models: HashMap<String, Arc<ModelClass>>,
    links: Option<Links>,
    variable: String,
    db: Option<Db>,
    held: HashMap<usize, Node>,
}

impl GraphState {
    fn new(db: Option<Db>) -> Self {
        let variable = db
            .as_ref()
            .map(|db| db.config().default_variable.clone())
            .unwrap_or_else(|| "n".to_string());
        Self {
            nodes: HashMap::new(),
            relationships: HashMap::new(),
            index: RelationshipIndex::new(),
            references: HashMap::new(),
            models: HashMap::new(),
            links: None,
            variable,
            db,
            held: HashMap::new(),
        }
    }

    fn ingest_value(&mut self, me: &Weak<Graph>, column: &str, value: &Value) {
        match value {
            Value::List(items) => {
                for item in items {
                    self.ingest_value(me, column, item);
                }
            }
            Value::Node(raw) => {
                self.push_reference(column, Reference::Node(raw.identity));
                self.ingest_node(me, column, raw);
            }
            Value::Relationship(raw) => {
                self.push_reference(column, Reference::Relationship(raw.identity));
                self.ingest_relationship(column, raw);
            }
            other => self.push_reference(column, Reference::Value(other.clone())),
        }
    }

    fn push_reference(&mut self, column: &str, reference: Reference) {
        self.references
            .entry(column.to_string())
            .or_default()
            .push(reference);
    }

    fn ingest_node(&mut self, me: &Weak<Graph>, column: &str, raw: &RawNode) {
        let class = self.models.get(column).cloned();
        let entry = self
            .nodes
            .entry(raw.identity)
            .or_insert_with(|| CacheEntry::new(raw.clone(), None));
        entry.update(raw.clone(), Some(column.to_string()));

        if let Some(class) = class {
            // refresh in place so earlier handles stay valid
            let existing = entry.wrapper(class.name()).cloned();
            match existing {
                Some(node) => node.refresh(raw),
                None => entry.insert_wrapper(
                    class.name().to_string(),
                    Node::from_entity(&class, raw.clone(), me.clone()),
                ),
            }
        }
    }

    fn ingest_relationship(&mut self, column: &str, raw: &RawRelationship) {
        let entry = self
            .relationships
            .entry(raw.identity)
            .or_insert_with(|| CacheEntry::new(raw.clone(), None));
        entry.update(raw.clone(), Some(column.to_string()));
        for wrapper in entry.wrappers() {
            wrapper.refresh(raw);
        }
        self.index.insert(raw);
    }

    fn materialize_node(&mut self, me: &Weak<Graph>, id: StoreId, class: &Arc<ModelClass>) -> Option<Node> {
        let entry = self.nodes.get_mut(&id)?;
        Some(entry.materialize(class.name(), |raw| {
            Node::from_entity(class, raw.clone(), me.clone())
        }))
    }

    fn materialize_relationship(
        &mut self,
        me: &Weak<Graph>,
        id: StoreId,
        def: &RelationshipDef,
    ) -> Option<Relationship> {
        let entry = self.relationships.get_mut(&id)?;
        Some(entry.materialize(&def.wrapper_key(), |raw| {
            Relationship::from_entity(def, raw.clone(), me.clone())
        }))
    }

    fn strip_references(&mut self, reference: &Reference) {
        for refs in self.references.values_mut() {
            refs.retain(|r| r != reference);
        }
    }
}

/// Deduplicated entity graph for one query session
pub struct Graph {
    me: Weak<Graph>,
    state: RwLock<GraphState>,
}

impl Graph {
    /// Empty graph without a database handle
    pub fn new() -> Arc<Graph> {
        Self::create(GraphState::new(None))
    }

    /// Empty graph that can [`run`](Graph::run) queries against `db`
    pub fn with_db(db: &Db) -> Arc<Graph> {
        Self::create(GraphState::new(Some(db.clone())))
    }

    /// Graph over an existing result set
    ///
    /// `models` maps result columns to the class their nodes are wrapped
    /// in; `links` configures virtual links between columns.
    pub fn from_records(
        records: &[Record],
        models: HashMap<String, Arc<ModelClass>>,
        links: Option<HashMap<String, LinkSpec>>,
    ) -> Arc<Graph> {
        let mut state = GraphState::new(None);
        state.models = models;
        state.links = links.map(Links::new);
        let graph = Self::create(state);
        graph.ingest(records);
        graph
    }

    /// Run a query and build a graph from its records
    pub async fn build(
        db: &Db,
        query: &str,
        params: Params,
        models: HashMap<String, Arc<ModelClass>>,
        links: Option<HashMap<String, LinkSpec>>,
    ) -> Result<Arc<Graph>> {
        let graph = Self::with_db(db);
        {
            let mut state = graph.state.write();
            state.models = models;
            state.links = links.map(Links::new);
        }
        graph.run(query, params).await?;
        Ok(graph)
    }

    fn create(state: GraphState) -> Arc<Graph> {
        Arc::new_cyclic(|me| Graph {
            me: me.clone(),
            state: RwLock::new(state),
        })
    }

    fn pin(&self) -> Option<Arc<Graph>> {
        self.me.upgrade()
    }

    pub fn db(&self) -> Option<Db> {
        self.state.read().db.clone()
    }

    pub fn set_db(&self, db: &Db) {
        self.state.write().db = Some(db.clone());
    }

    /// Wrap nodes of `column` in `class` from now on
    pub fn add_model(&self, column: &str, class: &Arc<ModelClass>) {
        self.state
            .write()
            .models
            .insert(column.to_string(), class.clone());
    }

    /// Configure links; items are collected from records ingested afterwards
    pub fn set_links(&self, specs: HashMap<String, LinkSpec>) {
        self.state.write().links = Some(Links::new(specs));
    }

    /// Variable holding the primary node (default start column of links)
    pub fn variable(&self) -> String {
        self.state.read().variable.clone()
    }

    pub fn set_variable(&self, variable: &str) {
        self.state.write().variable = variable.to_string();
    }

    /// Ingest result records
    ///
    /// List values are flattened into the same column. Every value is
    /// appended to its column's reference list, duplicates included.
    pub fn ingest(&self, records: &[Record]) {
        let mut state = self.state.write();
        for record in records {
            for (column, value) in record.iter() {
                state.ingest_value(&self.me, column, value);
            }

            let variable = state.variable.clone();
            if let Some(links) = state.links.as_mut() {
                links.collect(record, &variable);
            }
        }
        log::debug!(
            "Ingested {} records ({} nodes, {} relationships cached)",
            records.len(),
            state.nodes.len(),
            state.relationships.len()
        );
    }

    /// Run a query and ingest its records into this graph
    ///
    /// Returns the number of records ingested.
    pub async fn run(&self, query: &str, params: Params) -> Result<usize> {
        let db = self
            .db()
            .ok_or_else(|| Error::invalid_state("graph has no database handle"))?;
        let records = db.query(query, params).await?;
        self.ingest(&records);
        Ok(records.len())
    }

    /// Drop entities from the graph
    ///
    /// Lists are removed element by element. Wrappers that were never saved
    /// carry no identity and are ignored.
    pub fn remove<'a, T: Into<EntityRef<'a>>>(&self, target: T) -> Result<()> {
        let target = target.into();
        if let EntityRef::Value(Value::List(items)) = target {
            for item in items {
                self.remove(item)?;
            }
            return Ok(());
        }

        let kind = entity_kind(target)?;
        let Some(id) = identity_of(target) else {
            return Ok(());
        };

        let mut state = self.state.write();
        if kind == EntityKind::Relationship {
            if let Some(entry) = state.relationships.remove(&id) {
                state.index.remove(entry.entity());
            }
            state.strip_references(&Reference::Relationship(id));
        } else {
            state.nodes.remove(&id);
            state.strip_references(&Reference::Node(id));
        }
        Ok(())
    }

    /// Relationship between two nodes per a definition
    ///
    /// `start` is the node declaring the relationship. OUT looks at edges
    /// leaving `start`, IN at edges entering it, ANY and BOTH try outgoing
    /// first and then incoming.
    pub fn get_relationship<'a, 'b, S, E>(&self, start: S, end: E, def: &RelationshipDef) -> Option<Relationship>
    where
        S: Into<EntityRef<'a>>,
        E: Into<EntityRef<'b>>,
    {
        let start = identity_of(start.into())?;
        let end = identity_of(end.into())?;

        let mut state = self.state.write();
        let id = state
            .index
            .find(def.type_name(), start, end, def.get_direction())?;
        state
            .materialize_relationship(&self.me, id, def)
            .map(|rel| rel.pinned(self.pin()))
    }

    /// Nodes related to `node` per a definition
    ///
    /// Nodes reachable through both index sides are returned once.
    pub fn get_related<'a, T: Into<EntityRef<'a>>>(&self, node: T, def: &RelationshipDef) -> Resolved<Node> {
        let Some(id) = identity_of(node.into()) else {
            return Resolved::from_vec(Vec::new(), def.is_singular());
        };
        let class = def.related_class();
        let pin = self.pin();

        let mut state = self.state.write();
        let related = state.index.related(def.type_name(), id, def.get_direction());
        let nodes = related
            .into_iter()
            .filter_map(|other| {
                let node = state.materialize_node(&self.me, other, &class);
                if node.is_none() {
                    log::debug!("Skipping related node {}: not in graph", other);
                }
                node
            })
            .map(|node| node.pinned(pin.clone()))
            .collect();

        Resolved::from_vec(nodes, def.is_singular())
    }

    /// Wrapper of class `class` for a cached node
    pub fn node_model(&self, id: StoreId, class: &Arc<ModelClass>) -> Result<Node> {
        let mut state = self.state.write();
        state
            .materialize_node(&self.me, id, class)
            .map(|node| node.pinned(self.pin()))
            .ok_or_else(|| Error::not_found("Node not found"))
    }

    /// Generic wrapper for a cached node
    pub fn node(&self, id: StoreId) -> Result<Node> {
        self.node_model(id, &ModelClass::generic())
    }

    /// Nodes ingested from a column, in order and with duplicates
    pub fn nodes(&self, column: &str) -> Vec<Node> {
        let pin = self.pin();
        let mut state = self.state.write();
        let class = state
            .models
            .get(column)
            .cloned()
            .unwrap_or_else(ModelClass::generic);
        let ids: Vec<StoreId> = state
            .references
            .get(column)
            .map(|refs| {
                refs.iter()
                    .filter_map(|r| match r {
                        Reference::Node(id) => Some(*id),
                        _ => None,
                    })
                    .collect()
            })
            .unwrap_or_default();

        ids.into_iter()
            .filter_map(|id| state.materialize_node(&self.me, id, &class))
            .map(|node| node.pinned(pin.clone()))
            .collect()
    }

    /// Values linked to `node` under a link name
    ///
    /// `None` when no link of that name is configured or nothing was
    /// collected for it.
    pub fn get_linked<'a, T: Into<EntityRef<'a>>>(&self, node: T, name: &str) -> Option<Resolved<LinkedValue>> {
        let id = identity_of(node.into())?;
        let pin = self.pin();
        let mut state = self.state.write();

        let (spec, items) = {
            let links = state.links.as_ref()?;
            let spec = links.spec(name)?.clone();
            let items: Vec<LinkTarget> = links
                .items(name)?
                .iter()
                .filter(|item| item.start == id)
                .map(|item| item.target.clone())
                .collect();
            (spec, items)
        };

        let class = spec
            .model_class()
            .cloned()
            .unwrap_or_else(ModelClass::generic);
        let mut values = Vec::with_capacity(items.len());
        for target in items {
            match target {
                LinkTarget::Node(nid) => {
                    if let Some(node) = state.materialize_node(&self.me, nid, &class) {
                        values.push(LinkedValue::Node(node.pinned(pin.clone())));
                    }
                }
                LinkTarget::Relationship(rid) => {
                    let rel_type = state
                        .relationships
                        .get(&rid)
                        .map(|e| e.entity().rel_type.clone());
                    if let Some(rel_type) = rel_type {
                        let def = RelationshipDef::of_type(rel_type).direction(Direction::Any);
                        if let Some(rel) = state.materialize_relationship(&self.me, rid, &def) {
                            values.push(LinkedValue::Relationship(rel.pinned(pin.clone())));
                        }
                    }
                }
                LinkTarget::Value(value) => values.push(LinkedValue::Value(value)),
            }
        }

        Some(Resolved::from_vec(values, spec.is_singular()))
    }

    /// Make `node` resolve through this graph
    ///
    /// A saved node also becomes the cached wrapper of its class for its
    /// store identity, so later ingestion refreshes it in place.
    pub fn attach(&self, node: &Node) {
        node.attach_to(self.me.clone());
        let Some(entity) = node.entity() else {
            return;
        };

        let mut state = self.state.write();
        let entry = state
            .nodes
            .entry(entity.identity)
            .or_insert_with(|| CacheEntry::new(entity.clone(), None));
        entry.insert_wrapper(node.class().name().to_string(), node.unpinned());
    }

    /// Keep an assigned related node alive as long as this graph
    pub(crate) fn hold(&self, node: &Node) {
        self.state
            .write()
            .held
            .entry(node.key())
            .or_insert_with(|| node.unpinned());
    }

    pub fn node_count(&self) -> usize {
        self.state.read().nodes.len()
    }

    pub fn relationship_count(&self) -> usize {
        self.state.read().relationships.len()
    }

    pub fn contains_node(&self, id: StoreId) -> bool {
        self.state.read().nodes.contains_key(&id)
    }

    pub fn contains_relationship(&self, id: StoreId) -> bool {
        self.state.read().relationships.contains_key(&id)
    }

    /// Whether both index sides hold the (start, end) pair for a type
    pub fn is_indexed(&self, rel_type: &str, start: StoreId, end: StoreId) -> bool {
        self.state.read().index.contains(rel_type, start, end)
    }

    pub fn raw_node(&self, id: StoreId) -> Option<RawNode> {
        self.state.read().nodes.get(&id).map(|e| e.entity().clone())
    }

    pub fn raw_relationship(&self, id: StoreId) -> Option<RawRelationship> {
        self.state
            .read()
            .relationships
            .get(&id)
            .map(|e| e.entity().clone())
    }

    /// Reference list of a column (empty if never ingested)
    pub fn references(&self, column: &str) -> Vec<Reference> {
        self.state
            .read()
            .references
            .get(column)
            .cloned()
            .unwrap_or_default()
    }

    pub fn columns(&self) -> Vec<String> {
        let mut columns: Vec<String> = self.state.read().references.keys().cloned().collect();
        columns.sort();
        columns
    }
}

impl fmt::Debug for Graph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.read();
        f.debug_struct("Graph")
            .field("nodes", &state.nodes.len())
            .field("relationships", &state.relationships.len())
            .field("columns", &state.references.len())
            .field("held", &state.held.len())
            .finish()
    }
}
