// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Related nodes and singular/plural results

use crate::node::Node;
use crate::relationship::Relationship;

/// A related node paired with the edge that connects it
#[derive(Debug, Clone)]
pub struct RelatedNode {
    node: Node,
    rel: Relationship,
}

impl RelatedNode {
    pub fn new(node: Node, rel: Relationship) -> Self {
        Self { node, rel }
    }

    /// The node on the other end
    pub fn node(&self) -> &Node {
        &self.node
    }

    /// The connecting edge
    pub fn rel(&self) -> &Relationship {
        &self.rel
    }

    pub fn into_node(self) -> Node {
        self.node
    }

    pub fn into_parts(self) -> (Node, Relationship) {
        (self.node, self.rel)
    }
}

/// Result of a lookup that is singular or plural by definition
///
/// Singular lookups yield `One(None)` when nothing matched; plural lookups
/// yield an empty `Many`, never `None`.
#[derive(Debug, Clone)]
pub enum Resolved<T> {
    One(Option<T>),
    Many(Vec<T>),
}

impl<T> Resolved<T> {
    pub(crate) fn from_vec(items: Vec<T>, singular: bool) -> Self {
        if singular {
            Resolved::One(items.into_iter().next())
        } else {
            Resolved::Many(items)
        }
    }

    pub fn is_singular(&self) -> bool {
        matches!(self, Resolved::One(_))
    }

    /// The single result of a singular lookup
    pub fn one(&self) -> Option<&T> {
        match self {
            Resolved::One(item) => item.as_ref(),
            Resolved::Many(_) => None,
        }
    }

    /// All results of a plural lookup
    pub fn many(&self) -> Option<&[T]> {
        match self {
            Resolved::One(_) => None,
            Resolved::Many(items) => Some(items),
        }
    }

    pub fn first(&self) -> Option<&T> {
        match self {
            Resolved::One(item) => item.as_ref(),
            Resolved::Many(items) => items.first(),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Resolved::One(item) => usize::from(item.is_some()),
            Resolved::Many(items) => items.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn into_vec(self) -> Vec<T> {
        match self {
            Resolved::One(item) => item.into_iter().collect(),
            Resolved::Many(items) => items,
        }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        match self {
            Resolved::One(Some(item)) => std::slice::from_ref(item).iter(),
            Resolved::One(None) => [].iter(),
            Resolved::Many(items) => items.iter(),
        }
    }
}
