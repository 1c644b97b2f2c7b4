// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Query options builder

use crate::graph::LinkSpec;
use crate::model::ModelClass;
use crate::planner::WithSpec;
use crate::value::{Params, Value};
use std::collections::HashMap;
use std::sync::Arc;

/// Options shared by the query-building operations
///
/// # Examples
///
/// ```no_run
/// # use graphlite_ogm::QueryOptions;
/// let options = QueryOptions::new()
///     .where_clause("n.age > $min")
///     .parameter("min", 18)
///     .order_by("n.name")
///     .limit(10)
///     .with("friends.pets");
/// ```
#[derive(Debug, Clone)]
pub struct QueryOptions {
    pub(crate) variable: String,
    pub(crate) variables: Vec<String>,
    pub(crate) parameters: Params,
    pub(crate) where_clauses: Vec<String>,
    pub(crate) query: Option<String>,
    pub(crate) matches: Vec<String>,
    pub(crate) set: Vec<String>,
    pub(crate) return_clause: Option<String>,
    pub(crate) order_by: Option<String>,
    pub(crate) skip: Option<u64>,
    pub(crate) limit: Option<u64>,
    pub(crate) singular: bool,
    pub(crate) index: Option<String>,
    pub(crate) with: Option<WithSpec>,
    pub(crate) models: Vec<(String, Arc<ModelClass>)>,
    pub(crate) links: HashMap<String, LinkSpec>,
    pub(crate) on_create: Option<String>,
    pub(crate) on_match: Option<String>,
    variable_set: bool,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            variable: "n".to_string(),
            variables: Vec::new(),
            parameters: Params::new(),
            where_clauses: Vec::new(),
            query: None,
            matches: Vec::new(),
            set: Vec::new(),
            return_clause: None,
            order_by: None,
            skip: None,
            limit: None,
            singular: false,
            index: None,
            with: None,
            models: Vec::new(),
            links: HashMap::new(),
            on_create: None,
            on_match: None,
            variable_set: false,
        }
    }
}

impl QueryOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Variable bound to the queried node
    pub fn variable<T: Into<String>>(mut self, variable: T) -> Self {
        self.variable = variable.into();
        self.variable_set = true;
        self
    }

    /// Extra variables to return
    pub fn variables<I, T>(mut self, variables: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.variables.extend(variables.into_iter().map(Into::into));
        self
    }

    pub fn parameter<K: Into<String>, V: Into<Value>>(mut self, key: K, value: V) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }

    pub fn parameters(mut self, parameters: Params) -> Self {
        self.parameters.extend(parameters);
        self
    }

    /// Additional WHERE condition, joined with AND
    pub fn where_clause<T: Into<String>>(mut self, condition: T) -> Self {
        self.where_clauses.push(condition.into());
        self
    }

    /// Replace the generated MATCH line
    pub fn query<T: Into<String>>(mut self, query: T) -> Self {
        self.query = Some(query.into());
        self
    }

    /// Append a clause after the WHERE conditions
    pub fn matches<T: Into<String>>(mut self, clause: T) -> Self {
        self.matches.push(clause.into());
        self
    }

    /// Append a `SET` line
    pub fn set<T: Into<String>>(mut self, line: T) -> Self {
        self.set.push(line.into());
        self
    }

    /// Replace the RETURN expression
    pub fn returning<T: Into<String>>(mut self, expression: T) -> Self {
        self.return_clause = Some(expression.into());
        self
    }

    pub fn order_by<T: Into<String>>(mut self, order: T) -> Self {
        self.order_by = Some(order.into());
        self
    }

    pub fn skip(mut self, skip: u64) -> Self {
        self.skip = Some(skip);
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Return at most one node
    pub fn singular(mut self, singular: bool) -> Self {
        self.singular = singular;
        self
    }

    /// Index hint, `Label(property)` or a property of the base label
    pub fn index<T: Into<String>>(mut self, index: T) -> Self {
        self.index = Some(index.into());
        self
    }

    /// Expand related nodes; repeated calls are merged
    pub fn with<W: Into<WithSpec>>(mut self, spec: W) -> Self {
        let spec = spec.into();
        match self.with.as_mut() {
            Some(existing) => existing.merge(spec),
            None => self.with = Some(spec),
        }
        self
    }

    /// Wrap nodes of another returned column in `class`
    pub fn model<T: Into<String>>(mut self, column: T, class: &Arc<ModelClass>) -> Self {
        let column = column.into();
        self.models.retain(|(c, _)| *c != column);
        self.models.push((column, class.clone()));
        self
    }

    pub fn link<T: Into<String>>(mut self, name: T, spec: LinkSpec) -> Self {
        self.links.insert(name.into(), spec);
        self
    }

    /// `ON CREATE` clause of a merge
    pub fn on_create<T: Into<String>>(mut self, clause: T) -> Self {
        self.on_create = Some(clause.into());
        self
    }

    /// `ON MATCH` clause of a merge
    pub fn on_match<T: Into<String>>(mut self, clause: T) -> Self {
        self.on_match = Some(clause.into());
        self
    }

    /// Fall back to the configured default variable unless one was chosen
    pub(crate) fn default_variable(mut self, variable: &str) -> Self {
        if !self.variable_set {
            self.variable = variable.to_string();
        }
        self
    }
}
