// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Virtual links between result columns
//!
//! A link associates values of one column with the entity in another column
//! of the same row, without a graph edge between them. Aggregates and
//! parallel entity columns are typical link targets.

use crate::entity::StoreId;
use crate::model::ModelClass;
use crate::node::Node;
use crate::relationship::Relationship;
use crate::value::{Record, Value};
use std::collections::HashMap;
use std::sync::Arc;

/// Configuration of one link
#[derive(Debug, Clone, Default)]
pub struct LinkSpec {
    start: Option<String>,
    end: Option<String>,
    singular: bool,
    model: Option<Arc<ModelClass>>,
}

impl LinkSpec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Column holding the start entity (defaults to the graph variable)
    pub fn start<T: Into<String>>(mut self, column: T) -> Self {
        self.start = Some(column.into());
        self
    }

    /// Column holding the linked values (defaults to the link name)
    pub fn end<T: Into<String>>(mut self, column: T) -> Self {
        self.end = Some(column.into());
        self
    }

    pub fn singular(mut self, singular: bool) -> Self {
        self.singular = singular;
        self
    }

    /// Class used to materialize linked nodes
    pub fn model(mut self, class: &Arc<ModelClass>) -> Self {
        self.model = Some(class.clone());
        self
    }

    pub fn is_singular(&self) -> bool {
        self.singular
    }

    pub(crate) fn model_class(&self) -> Option<&Arc<ModelClass>> {
        self.model.as_ref()
    }
}

/// Linked value as recorded during ingestion
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum LinkTarget {
    Node(StoreId),
    Relationship(StoreId),
    Value(Value),
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct LinkItem {
    pub(crate) start: StoreId,
    pub(crate) target: LinkTarget,
}

/// Resolved linked value
#[derive(Debug, Clone)]
pub enum LinkedValue {
    Node(Node),
    Relationship(Relationship),
    Value(Value),
}

impl LinkedValue {
    pub fn as_node(&self) -> Option<&Node> {
        match self {
            LinkedValue::Node(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_relationship(&self) -> Option<&Relationship> {
        match self {
            LinkedValue::Relationship(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_value(&self) -> Option<&Value> {
        match self {
            LinkedValue::Value(v) => Some(v),
            _ => None,
        }
    }
}

/// Link specs plus the items collected for them
#[derive(Debug, Default)]
pub(crate) struct Links {
    specs: HashMap<String, LinkSpec>,
    items: HashMap<String, Vec<LinkItem>>,
}

impl Links {
    pub(crate) fn new(specs: HashMap<String, LinkSpec>) -> Self {
        Self {
            specs,
            items: HashMap::new(),
        }
    }

    pub(crate) fn spec(&self, name: &str) -> Option<&LinkSpec> {
        self.specs.get(name)
    }

    pub(crate) fn items(&self, name: &str) -> Option<&[LinkItem]> {
        self.items.get(name).map(Vec::as_slice)
    }

    /// Collect link items from one ingested record
    pub(crate) fn collect(&mut self, record: &Record, variable: &str) {
        for (name, spec) in &self.specs {
            let start_column = spec.start.as_deref().unwrap_or(variable);
            let end_column = spec.end.as_deref().unwrap_or(name);

            let Some(start) = record.get(start_column).and_then(start_identity) else {
                continue;
            };
            let Some(end) = record.get(end_column) else {
                log::debug!("Link '{}' skipped: no column '{}'", name, end_column);
                continue;
            };

            let items = self.items.entry(name.clone()).or_default();
            match end {
                Value::List(values) => {
                    for value in values {
                        push_item(items, start, value);
                    }
                }
                value => push_item(items, start, value),
            }
        }
    }
}

fn start_identity(value: &Value) -> Option<StoreId> {
    match value {
        Value::Node(n) => Some(n.identity),
        Value::Relationship(r) => Some(r.identity),
        _ => None,
    }
}

fn push_item(items: &mut Vec<LinkItem>, start: StoreId, value: &Value) {
    let target = match value {
        Value::Null => return,
        Value::Node(n) => LinkTarget::Node(n.identity),
        Value::Relationship(r) => LinkTarget::Relationship(r.identity),
        other => LinkTarget::Value(other.clone()),
    };

    let is_entity = !matches!(target, LinkTarget::Value(_));
    let item = LinkItem { start, target };
    if is_entity && items.contains(&item) {
        return;
    }
    items.push(item);
}
