// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Bidirectional relationship index
//!
//! Per relationship type, `outgoing[start][end]` and `incoming[end][start]`
//! both point at the relationship's store id. Ordered maps keep traversal
//! deterministic (ascending store id).

use crate::entity::{RawRelationship, StoreId};
use crate::model::Direction;
use std::collections::{BTreeMap, HashMap};

type Adjacency = BTreeMap<StoreId, BTreeMap<StoreId, StoreId>>;

#[derive(Debug, Default)]
struct TypeIndex {
    outgoing: Adjacency,
    incoming: Adjacency,
}

#[derive(Debug, Default)]
pub struct RelationshipIndex {
    types: HashMap<String, TypeIndex>,
}

impl RelationshipIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, rel: &RawRelationship) {
        let bucket = self.types.entry(rel.rel_type.clone()).or_default();
        bucket
            .outgoing
            .entry(rel.start)
            .or_default()
            .insert(rel.end, rel.identity);
        bucket
            .incoming
            .entry(rel.end)
            .or_default()
            .insert(rel.start, rel.identity);
    }

    /// Drop the pair entries pointing at this relationship
    ///
    /// Empty type buckets are kept.
    pub fn remove(&mut self, rel: &RawRelationship) {
        let Some(bucket) = self.types.get_mut(&rel.rel_type) else {
            return;
        };
        remove_pair(&mut bucket.outgoing, rel.start, rel.end, rel.identity);
        remove_pair(&mut bucket.incoming, rel.end, rel.start, rel.identity);
    }

    /// Relationship between `start` and `end` in the given direction
    ///
    /// `start` is the side the definition is declared on. ANY and BOTH try
    /// the outgoing side first, then the incoming side.
    pub fn find(&self, rel_type: &str, start: StoreId, end: StoreId, direction: Direction) -> Option<StoreId> {
        let bucket = self.types.get(rel_type)?;
        let lookup = |side: &Adjacency| side.get(&start).and_then(|m| m.get(&end)).copied();

        match direction {
            Direction::Out => lookup(&bucket.outgoing),
            Direction::In => lookup(&bucket.incoming),
            Direction::Both | Direction::Any => {
                lookup(&bucket.outgoing).or_else(|| lookup(&bucket.incoming))
            }
        }
    }

    /// Store ids of nodes related to `id`, without duplicates
    pub fn related(&self, rel_type: &str, id: StoreId, direction: Direction) -> Vec<StoreId> {
        let Some(bucket) = self.types.get(rel_type) else {
            return Vec::new();
        };

        let mut result: Vec<StoreId> = Vec::new();
        let mut collect = |side: &Adjacency| {
            if let Some(others) = side.get(&id) {
                for other in others.keys() {
                    if !result.contains(other) {
                        result.push(*other);
                    }
                }
            }
        };

        if matches!(direction, Direction::Out | Direction::Both | Direction::Any) {
            collect(&bucket.outgoing);
        }
        if matches!(direction, Direction::In | Direction::Both | Direction::Any) {
            collect(&bucket.incoming);
        }
        result
    }

    /// Whether both sides of the index know the pair
    pub fn contains(&self, rel_type: &str, start: StoreId, end: StoreId) -> bool {
        self.types.get(rel_type).map_or(false, |bucket| {
            bucket.outgoing.get(&start).map_or(false, |m| m.contains_key(&end))
                && bucket.incoming.get(&end).map_or(false, |m| m.contains_key(&start))
        })
    }

    pub fn has_type(&self, rel_type: &str) -> bool {
        self.types.contains_key(rel_type)
    }

    /// Number of indexed (start, end) pairs across all types
    pub fn len(&self) -> usize {
        self.types
            .values()
            .map(|bucket| bucket.outgoing.values().map(BTreeMap::len).sum::<usize>())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn remove_pair(side: &mut Adjacency, first: StoreId, second: StoreId, identity: StoreId) {
    if let Some(others) = side.get_mut(&first) {
        if others.get(&second) == Some(&identity) {
            others.remove(&second);
        }
        if others.is_empty() {
            side.remove(&first);
        }
    }
}
