// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Registry of index and uniqueness constraints owned by a database handle

use crate::error::{Error, Result};
use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConstraintKind {
    Index,
    Unique,
}

/// One registered constraint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Constraint {
    pub kind: ConstraintKind,
    pub label: String,
    pub property: String,
    pub added: bool,
}

impl Constraint {
    pub fn create_statement(&self) -> String {
        match self.kind {
            ConstraintKind::Index => {
                format!("CREATE INDEX ON :`{}`(`{}`)", self.label, self.property)
            }
            ConstraintKind::Unique => format!(
                "CREATE CONSTRAINT ON (n:`{}`) ASSERT n.`{}` IS UNIQUE",
                self.label, self.property
            ),
        }
    }

    pub fn drop_statement(&self) -> String {
        match self.kind {
            ConstraintKind::Index => {
                format!("DROP INDEX ON :`{}`(`{}`)", self.label, self.property)
            }
            ConstraintKind::Unique => format!(
                "DROP CONSTRAINT ON (n:`{}`) ASSERT n.`{}` IS UNIQUE",
                self.label, self.property
            ),
        }
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.kind {
            ConstraintKind::Index => "index",
            ConstraintKind::Unique => "unique",
        };
        write!(f, "{} {}:{}", kind, self.label, self.property)
    }
}

/// Pending and created constraints, in registration order
#[derive(Debug, Default)]
pub struct ConstraintRegistry {
    entries: Vec<Constraint>,
}

impl ConstraintRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a constraint; returns false if it was already known
    pub fn add(&mut self, kind: ConstraintKind, label: &str, property: &str) -> bool {
        if self.find(kind, label, property).is_some() {
            return false;
        }
        self.entries.push(Constraint {
            kind,
            label: label.to_string(),
            property: property.to_string(),
            added: false,
        });
        true
    }

    pub fn remove(&mut self, kind: ConstraintKind, label: &str, property: &str) -> bool {
        let before = self.entries.len();
        self.entries
            .retain(|c| !(c.kind == kind && c.label == label && c.property == property));
        before != self.entries.len()
    }

    /// Constraints not yet created in the store
    pub fn pending(&self) -> Vec<Constraint> {
        self.entries.iter().filter(|c| !c.added).cloned().collect()
    }

    pub fn has_pending(&self) -> bool {
        self.entries.iter().any(|c| !c.added)
    }

    pub fn mark_added(&mut self, kind: ConstraintKind, label: &str, property: &str) {
        if let Some(entry) = self
            .entries
            .iter_mut()
            .find(|c| c.kind == kind && c.label == label && c.property == property)
        {
            entry.added = true;
        }
    }

    pub fn find(&self, kind: ConstraintKind, label: &str, property: &str) -> Option<&Constraint> {
        self.entries
            .iter()
            .find(|c| c.kind == kind && c.label == label && c.property == property)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Constraint> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Parse an index description such as `INDEX ON :Person(name)`
///
/// Returns the label and property, or `None` when the text does not
/// describe a single-property index.
pub fn parse_index_description(description: &str) -> Result<Option<(String, String)>> {
    let pattern = Regex::new(r":`?([^`(]+)`?\(`?([^`)]+)`?\)")
        .map_err(|e| Error::invalid_argument(e.to_string()))?;

    Ok(pattern
        .captures(description)
        .map(|caps| (caps[1].to_string(), caps[2].to_string())))
}

/// Group index descriptions by label
pub fn index_map<'a, I>(descriptions: I) -> Result<HashMap<String, HashSet<String>>>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut indexes: HashMap<String, HashSet<String>> = HashMap::new();
    for description in descriptions {
        if let Some((label, property)) = parse_index_description(description)? {
            indexes.entry(label).or_default().insert(property);
        }
    }
    Ok(indexes)
}
