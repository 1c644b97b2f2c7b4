// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Relationship query planner
//!
//! Expands a [`WithSpec`] into `OPTIONAL MATCH` clauses so related nodes come
//! back in the same query as the nodes they belong to. Each expansion is
//! aggregated right away with `WITH …, COLLECT(…)`, which keeps one row per
//! primary node; the graph cache flattens the collected lists on ingestion.
//!
//! Variables are derived from the enclosing variable and the relationship
//! name (`n_friends`, `n_r_friends`). Names already taken in the plan get a
//! numeric suffix (`n_r_x_2`), so sibling and nested expansions never
//! collide.

use crate::error::{Error, Result};
use crate::model::{Direction, ModelClass};
use crate::query::Filter;
use crate::value::Params;
use std::collections::HashSet;
use std::sync::Arc;

const COLLECTION_SUFFIX: &str = "_col";

/// One expanded relationship
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Level {
    filter: Option<Filter>,
    with: Option<WithSpec>,
}

impl Level {
    /// Condition on the related nodes
    pub fn filter(&self) -> Option<&Filter> {
        self.filter.as_ref()
    }

    /// Expansions below this one
    pub fn nested(&self) -> Option<&WithSpec> {
        self.with.as_ref()
    }

    fn merge(&mut self, other: Level) {
        if let Some(filter) = other.filter {
            match self.filter.as_mut() {
                Some(existing) => existing.extend(filter),
                None => self.filter = Some(filter),
            }
        }
        if let Some(with) = other.with {
            match self.with.as_mut() {
                Some(existing) => existing.merge(with),
                None => self.with = Some(with),
            }
        }
    }
}

/// Which relationships to expand, in order
///
/// # Examples
///
/// ```no_run
/// # use graphlite_ogm::WithSpec;
/// // same expansion three ways
/// let a = WithSpec::path("friends.pets");
/// let b = WithSpec::from(vec!["friends.pets"]);
/// let c = WithSpec::new().nested("friends", WithSpec::new().include("pets"));
/// assert_eq!(a, b);
/// assert_eq!(b, c);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WithSpec {
    levels: Vec<(String, Level)>,
}

impl WithSpec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Dot path, `"a.b"` expands `a` and then `b` within each `a`
    pub fn path(path: &str) -> Self {
        path.split('.')
            .map(str::trim)
            .filter(|segment| !segment.is_empty())
            .rev()
            .fold(None, |inner: Option<WithSpec>, segment| {
                let mut spec = WithSpec::new();
                spec.insert(
                    segment.to_string(),
                    Level {
                        filter: None,
                        with: inner,
                    },
                );
                Some(spec)
            })
            .unwrap_or_default()
    }

    /// Several dot paths, deep-merged
    pub fn paths<I, T>(paths: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        let mut spec = WithSpec::new();
        for path in paths {
            spec.merge(WithSpec::path(path.as_ref()));
        }
        spec
    }

    /// Spec from JSON
    ///
    /// Accepts a dot path, an array of specs, or an object mapping names to
    /// `true`, `false`/`null` (skipped), or an object holding an optional
    /// `with` spec next to filter keys.
    pub fn from_json(json: &serde_json::Value) -> Result<Self> {
        match json {
            serde_json::Value::String(path) => Ok(WithSpec::path(path)),
            serde_json::Value::Array(items) => {
                let mut spec = WithSpec::new();
                for item in items {
                    spec.merge(WithSpec::from_json(item)?);
                }
                Ok(spec)
            }
            serde_json::Value::Object(object) => {
                let mut spec = WithSpec::new();
                for (name, value) in object {
                    let level = match value {
                        serde_json::Value::Bool(false) | serde_json::Value::Null => continue,
                        serde_json::Value::Bool(true) => Level::default(),
                        serde_json::Value::Object(inner) => {
                            let mut filters = inner.clone();
                            let with = filters
                                .remove("with")
                                .map(|w| WithSpec::from_json(&w))
                                .transpose()?;
                            let filter = if filters.is_empty() {
                                None
                            } else {
                                Some(Filter::from_json(&serde_json::Value::Object(filters))?)
                            };
                            Level { filter, with }
                        }
                        other => {
                            return Err(Error::invalid_argument(format!(
                                "Invalid relationship spec for '{}': {}",
                                name, other
                            )))
                        }
                    };
                    spec.insert(name.clone(), level);
                }
                Ok(spec)
            }
            other => Err(Error::invalid_argument(format!("Invalid relationship spec: {}", other))),
        }
    }

    /// Expand a relationship
    pub fn include<T: Into<String>>(mut self, name: T) -> Self {
        self.insert(name.into(), Level::default());
        self
    }

    /// Expand a relationship, keeping only related nodes matching `filter`
    pub fn filter<T: Into<String>>(mut self, name: T, filter: Filter) -> Self {
        self.insert(
            name.into(),
            Level {
                filter: Some(filter),
                with: None,
            },
        );
        self
    }

    /// Expand a relationship and further relationships of its nodes
    pub fn nested<T: Into<String>>(mut self, name: T, with: WithSpec) -> Self {
        self.insert(
            name.into(),
            Level {
                filter: None,
                with: Some(with),
            },
        );
        self
    }

    fn insert(&mut self, name: String, level: Level) {
        match self.levels.iter_mut().find(|(n, _)| *n == name) {
            Some((_, existing)) => existing.merge(level),
            None => self.levels.push((name, level)),
        }
    }

    /// Deep-merge another spec into this one
    pub fn merge(&mut self, other: WithSpec) {
        for (name, level) in other.levels {
            self.insert(name, level);
        }
    }

    pub fn names(&self) -> Vec<&str> {
        self.levels.iter().map(|(n, _)| n.as_str()).collect()
    }

    pub fn get(&self, name: &str) -> Option<&Level> {
        self.levels.iter().find(|(n, _)| n == name).map(|(_, l)| l)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Level)> {
        self.levels.iter().map(|(n, l)| (n.as_str(), l))
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }
}

impl From<&str> for WithSpec {
    fn from(path: &str) -> Self {
        WithSpec::path(path)
    }
}

impl From<String> for WithSpec {
    fn from(path: String) -> Self {
        WithSpec::path(&path)
    }
}

impl From<Vec<&str>> for WithSpec {
    fn from(paths: Vec<&str>) -> Self {
        WithSpec::paths(paths)
    }
}

impl From<Vec<String>> for WithSpec {
    fn from(paths: Vec<String>) -> Self {
        WithSpec::paths(paths)
    }
}

/// Clauses and variables produced by [`plan`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Plan {
    /// Clauses in execution order
    pub matches: Vec<String>,
    /// Variables in scope after the last clause
    pub variables: Vec<String>,
    pub parameters: Params,
}

/// Plan the expansion of `spec` from `reference`, a node of `class`
///
/// `scope` lists the variables that must survive every aggregation.
pub fn plan(class: &Arc<ModelClass>, spec: &WithSpec, scope: &[String], reference: &str) -> Result<Plan> {
    let mut taken: HashSet<String> = scope.iter().cloned().collect();
    taken.insert(reference.to_string());
    plan_level(class, spec, scope, reference, &mut taken)
}

fn collection(variable: &str) -> String {
    format!("{}{}", variable, COLLECTION_SUFFIX)
}

/// Node and edge variables for an expansion, unused anywhere in the plan
fn allocate(taken: &mut HashSet<String>, reference: &str, name: &str) -> (String, String) {
    let mut attempt = 1;
    loop {
        let suffix = if attempt == 1 {
            String::new()
        } else {
            format!("_{}", attempt)
        };
        let node_var = format!("{}_{}{}", reference, name, suffix);
        let rel_var = format!("{}_r_{}{}", reference, name, suffix);
        let names = [
            collection(&node_var),
            collection(&rel_var),
            node_var.clone(),
            rel_var.clone(),
        ];
        if names.iter().all(|n| !taken.contains(n)) {
            taken.extend(names);
            return (node_var, rel_var);
        }
        attempt += 1;
    }
}

fn plan_level(
    class: &Arc<ModelClass>,
    spec: &WithSpec,
    scope: &[String],
    reference: &str,
    taken: &mut HashSet<String>,
) -> Result<Plan> {
    let mut plan = Plan {
        variables: scope.to_vec(),
        ..Plan::default()
    };

    for (name, level) in spec.iter() {
        let def = class.get_relationship(name)?;
        let related = def.related_class();
        let (node_var, rel_var) = allocate(taken, reference, name);

        let (left, right) = match def.get_direction() {
            Direction::Out => ("", ">"),
            Direction::In => ("<", ""),
            Direction::Both | Direction::Any => ("", ""),
        };
        let mut clause = format!(
            "OPTIONAL MATCH ({}){}-[{}:{}]-{}({}:{})",
            reference,
            left,
            rel_var,
            def.type_name(),
            right,
            node_var,
            related.base_label()
        );

        if let Some(filter) = level.filter().filter(|f| !f.is_empty()) {
            let (conditions, parameters) = filter.to_conditions(&node_var);
            clause.push_str("\nWHERE ");
            clause.push_str(&conditions.join("\nAND "));
            plan.parameters.extend(parameters);
        }
        plan.matches.push(clause);

        let mut nested_collections = Vec::new();
        if let Some(nested) = level.nested() {
            let mut inner_scope = plan.variables.clone();
            inner_scope.push(node_var.clone());
            inner_scope.push(rel_var.clone());

            let inner = plan_level(&related, nested, &inner_scope, &node_var, taken)?;
            plan.matches.extend(inner.matches);
            plan.parameters.extend(inner.parameters);
            nested_collections = inner.variables[inner_scope.len()..].to_vec();
        }

        let node_col = collection(&node_var);
        let rel_col = collection(&rel_var);
        let mut projections = plan.variables.clone();
        projections.push(format!("COLLECT({}) AS {}", node_var, node_col));
        projections.push(format!("COLLECT({}) AS {}", rel_var, rel_col));
        for collection in &nested_collections {
            projections.push(format!("COLLECT({}) AS {}", collection, collection));
        }
        plan.matches.push(format!("WITH {}", projections.join(", ")));

        plan.variables.push(node_col);
        plan.variables.push(rel_col);
        plan.variables.extend(nested_collections);
    }

    log::trace!("Planned {} clauses from {}", plan.matches.len(), reference);
    Ok(plan)
}
