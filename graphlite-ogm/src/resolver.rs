// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Entity reference resolution
//!
//! Pure helpers that classify whatever a caller or a result column hands
//! over and derive the store identity behind it.

use crate::entity::{RawEntity, RawNode, RawRelationship, StoreId};
use crate::error::{Error, Result};
use crate::graph::{NodeEntry, RelationshipEntry};
use crate::node::Node;
use crate::related::RelatedNode;
use crate::relationship::Relationship;
use crate::value::Value;

/// Anything that may stand for an entity
#[derive(Debug, Clone, Copy)]
pub enum EntityRef<'a> {
    Id(StoreId),
    Value(&'a Value),
    RawNode(&'a RawNode),
    RawRelationship(&'a RawRelationship),
    Node(&'a Node),
    Relationship(&'a Relationship),
    NodeEntry(&'a NodeEntry),
    RelationshipEntry(&'a RelationshipEntry),
}

/// Semantic type of a value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Node,
    Relationship,
    Integer,
    Sequence,
    Primitive(&'static str),
}

impl EntityKind {
    pub fn is_entity(&self) -> bool {
        matches!(self, EntityKind::Node | EntityKind::Relationship)
    }
}

/// Classify a raw value
pub fn classify(value: &Value) -> EntityKind {
    match value {
        Value::Node(_) => EntityKind::Node,
        Value::Relationship(_) => EntityKind::Relationship,
        Value::Integer(_) => EntityKind::Integer,
        Value::List(_) => EntityKind::Sequence,
        other => EntityKind::Primitive(other.type_name()),
    }
}

/// Classify any entity reference
pub fn kind_of(target: EntityRef<'_>) -> EntityKind {
    match target {
        EntityRef::Id(_) => EntityKind::Integer,
        EntityRef::Value(v) => classify(v),
        EntityRef::RawNode(_) | EntityRef::Node(_) | EntityRef::NodeEntry(_) => EntityKind::Node,
        EntityRef::RawRelationship(_)
        | EntityRef::Relationship(_)
        | EntityRef::RelationshipEntry(_) => EntityKind::Relationship,
    }
}

/// Node or relationship kind, failing for anything else
pub fn entity_kind(target: EntityRef<'_>) -> Result<EntityKind> {
    let kind = kind_of(target);
    if kind.is_entity() {
        return Ok(kind);
    }

    let description = match target {
        EntityRef::Value(v) => v.to_string(),
        EntityRef::Id(id) => id.to_string(),
        _ => format!("{:?}", kind),
    };
    Err(Error::invalid_argument(format!(
        "No map defined for this entity: {}",
        description
    )))
}

/// Store identity behind a reference, if it carries one
///
/// Integers pass through unchanged; wrappers report their entity's
/// identity, which is `None` while they are new.
pub fn identity_of(target: EntityRef<'_>) -> Option<StoreId> {
    match target {
        EntityRef::Id(id) => Some(id),
        EntityRef::Value(Value::Integer(id)) => Some(*id),
        EntityRef::Value(Value::Node(n)) => Some(n.identity),
        EntityRef::Value(Value::Relationship(r)) => Some(r.identity),
        EntityRef::Value(_) => None,
        EntityRef::RawNode(n) => Some(n.identity),
        EntityRef::RawRelationship(r) => Some(r.identity),
        EntityRef::Node(n) => n.store_id(),
        EntityRef::Relationship(r) => r.store_id(),
        EntityRef::NodeEntry(e) => Some(e.entity().identity),
        EntityRef::RelationshipEntry(e) => Some(e.entity().identity),
    }
}

/// Raw entity behind a reference
pub fn entity_of(target: EntityRef<'_>) -> Option<RawEntity> {
    match target {
        EntityRef::Id(_) => None,
        EntityRef::Value(Value::Node(n)) => Some(RawEntity::Node(n.clone())),
        EntityRef::Value(Value::Relationship(r)) => Some(RawEntity::Relationship(r.clone())),
        EntityRef::Value(_) => None,
        EntityRef::RawNode(n) => Some(RawEntity::Node(n.clone())),
        EntityRef::RawRelationship(r) => Some(RawEntity::Relationship(r.clone())),
        EntityRef::Node(n) => n.entity().map(RawEntity::Node),
        EntityRef::Relationship(r) => r.entity().map(RawEntity::Relationship),
        EntityRef::NodeEntry(e) => Some(RawEntity::Node(e.entity().clone())),
        EntityRef::RelationshipEntry(e) => Some(RawEntity::Relationship(e.entity().clone())),
    }
}

impl From<StoreId> for EntityRef<'_> {
    fn from(id: StoreId) -> Self {
        EntityRef::Id(id)
    }
}

impl<'a> From<&'a Value> for EntityRef<'a> {
    fn from(value: &'a Value) -> Self {
        EntityRef::Value(value)
    }
}

impl<'a> From<&'a RawNode> for EntityRef<'a> {
    fn from(node: &'a RawNode) -> Self {
        EntityRef::RawNode(node)
    }
}

impl<'a> From<&'a RawRelationship> for EntityRef<'a> {
    fn from(rel: &'a RawRelationship) -> Self {
        EntityRef::RawRelationship(rel)
    }
}

impl<'a> From<&'a Node> for EntityRef<'a> {
    fn from(node: &'a Node) -> Self {
        EntityRef::Node(node)
    }
}

impl<'a> From<&'a Relationship> for EntityRef<'a> {
    fn from(rel: &'a Relationship) -> Self {
        EntityRef::Relationship(rel)
    }
}

impl<'a> From<&'a RelatedNode> for EntityRef<'a> {
    fn from(related: &'a RelatedNode) -> Self {
        EntityRef::Node(related.node())
    }
}

impl<'a> From<&'a NodeEntry> for EntityRef<'a> {
    fn from(entry: &'a NodeEntry) -> Self {
        EntityRef::NodeEntry(entry)
    }
}

impl<'a> From<&'a RelationshipEntry> for EntityRef<'a> {
    fn from(entry: &'a RelationshipEntry) -> Self {
        EntityRef::RelationshipEntry(entry)
    }
}
