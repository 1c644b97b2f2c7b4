// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Query building and model queries
//!
//! [`build_query`] and [`parse_query_filters`] are pure string builders.
//! The `Db` methods in this module run the built queries through a fresh
//! [`Graph`] and return the wrapped nodes of the queried variable.

pub mod filter;
pub mod options;

pub use filter::{Condition, Filter, STORE_ID_KEY};
pub use options::QueryOptions;

use crate::collection::NodeCollection;
use crate::db::Db;
use crate::entity::StoreId;
use crate::error::{Error, Result};
use crate::graph::{Graph, LinkSpec};
use crate::model::ModelClass;
use crate::node::Node;
use crate::planner;
use crate::value::{Params, PropertyMap, Value};
use regex::Regex;
use std::collections::HashMap;
use std::sync::Arc;

/// Which nodes a query selects
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Criteria {
    #[default]
    All,
    /// Stable id
    Id(String),
    /// Store identity
    StoreId(StoreId),
    Filter(Filter),
}

impl Criteria {
    /// Criteria from JSON: a number is a store identity, a string a stable
    /// id, an object a filter and `null` selects everything
    pub fn from_json(json: &serde_json::Value) -> Result<Self> {
        match json {
            serde_json::Value::Null => Ok(Criteria::All),
            serde_json::Value::String(id) => Ok(Criteria::Id(id.clone())),
            serde_json::Value::Number(n) => n
                .as_i64()
                .map(Criteria::StoreId)
                .ok_or_else(|| Error::invalid_argument(format!("Invalid filter object: {}", json))),
            serde_json::Value::Object(_) => Ok(Criteria::Filter(Filter::from_json(json)?)),
            other => Err(Error::invalid_argument(format!("Invalid filter object: {}", other))),
        }
    }
}

impl From<&str> for Criteria {
    fn from(id: &str) -> Self {
        Criteria::Id(id.to_string())
    }
}

impl From<String> for Criteria {
    fn from(id: String) -> Self {
        Criteria::Id(id)
    }
}

impl From<StoreId> for Criteria {
    fn from(id: StoreId) -> Self {
        Criteria::StoreId(id)
    }
}

impl From<Filter> for Criteria {
    fn from(filter: Filter) -> Self {
        Criteria::Filter(filter)
    }
}

/// WHERE conditions and parameters for criteria on `variable`
pub fn parse_query_filters(criteria: &Criteria, variable: &str) -> (Vec<String>, Params) {
    match criteria {
        Criteria::All => (Vec::new(), Params::new()),
        Criteria::Id(id) => Filter::new().eq("id", id.as_str()).to_conditions(variable),
        Criteria::StoreId(id) => Filter::new().store_id(*id).to_conditions(variable),
        Criteria::Filter(filter) => filter.to_conditions(variable),
    }
}

fn parse_index(class: &ModelClass, index: &str) -> Result<(String, String)> {
    let re = Regex::new(r"([^(]*)\(?([^)]*)\)?")
        .map_err(|e| Error::invalid_argument(format!("Invalid index pattern: {}", e)))?;
    let caps = re
        .captures(index)
        .ok_or_else(|| Error::invalid_argument(format!("Invalid index hint: {}", index)))?;

    let label = caps.get(1).map_or("", |m| m.as_str()).trim();
    let property = caps.get(2).map_or("", |m| m.as_str()).trim();
    if label.is_empty() {
        return Err(Error::invalid_argument(format!("Invalid index hint: {}", index)));
    }

    if property.is_empty() {
        Ok((class.base_label().to_string(), label.to_string()))
    } else {
        Ok((label.to_string(), property.to_string()))
    }
}

/// Render a query for nodes of `class`
pub fn build_query(class: &ModelClass, options: &QueryOptions) -> Result<String> {
    let variable = &options.variable;
    let index = options
        .index
        .as_deref()
        .map(|hint| parse_index(class, hint))
        .transpose()?;

    let mut query = match (&options.query, &index) {
        (Some(custom), _) => {
            let mut custom = custom.clone();
            if !custom.ends_with('\n') {
                custom.push('\n');
            }
            custom
        }
        (None, Some((label, _))) => format!("MATCH ({}:{})\n", variable, label),
        (None, None) => format!("MATCH ({}:{})\n", variable, class.labels().join(":")),
    };

    if let Some((label, property)) = &index {
        query.push_str(&format!("USING INDEX {}:{}({})\n", variable, label, property));
    }

    if !options.where_clauses.is_empty() {
        query.push_str("WHERE ");
        query.push_str(&options.where_clauses.join("\nAND "));
        query.push('\n');
    }

    if !options.matches.is_empty() {
        query.push_str(&options.matches.join("\n"));
        query.push('\n');
    }

    for line in &options.set {
        query.push_str(&format!("SET {}\n", line));
    }

    query.push_str("RETURN ");
    match &options.return_clause {
        Some(expression) => query.push_str(expression),
        None if options.variables.is_empty() => query.push_str(variable),
        None => query.push_str(&options.variables.join(", ")),
    }
    query.push('\n');

    if let Some(order) = &options.order_by {
        query.push_str(&format!("ORDER BY {}\n", order));
    }
    if let Some(skip) = options.skip.filter(|s| *s > 0) {
        query.push_str(&format!("SKIP {}\n", skip));
    }
    match options.limit.filter(|l| *l > 0) {
        Some(limit) => query.push_str(&format!("LIMIT {}\n", limit)),
        None if options.singular => query.push_str("LIMIT 1\n"),
        None => {}
    }

    Ok(query)
}

/// A query ready to run through a graph
#[derive(Debug)]
pub(crate) struct Prepared {
    pub(crate) query: String,
    pub(crate) parameters: Params,
    pub(crate) models: HashMap<String, Arc<ModelClass>>,
    pub(crate) links: Option<HashMap<String, LinkSpec>>,
    pub(crate) variable: String,
    pub(crate) singular: bool,
}

pub(crate) fn prepare(class: &Arc<ModelClass>, criteria: Criteria, options: QueryOptions) -> Result<Prepared> {
    let mut options = options;
    let variable = options.variable.clone();

    let mut link_names: Vec<String> = options.links.keys().cloned().collect();
    link_names.sort();

    let mut variables = vec![variable.clone()];
    let extra = options
        .variables
        .iter()
        .cloned()
        .chain(options.models.iter().map(|(column, _)| column.clone()))
        .chain(link_names);
    for name in extra {
        if !variables.contains(&name) {
            variables.push(name);
        }
    }

    let (conditions, parameters) = parse_query_filters(&criteria, &variable);
    options.where_clauses.extend(conditions);
    options.parameters.extend(parameters);

    if let Some(with) = options.with.take() {
        let plan = planner::plan(class, &with, &variables, &variable)?;
        options.matches.extend(plan.matches);
        options.parameters.extend(plan.parameters);
        variables = plan.variables;
    }
    options.variables = variables;

    let query = build_query(class, &options)?;

    let mut models: HashMap<String, Arc<ModelClass>> = options.models.iter().cloned().collect();
    models.entry(variable.clone()).or_insert_with(|| class.clone());
    let links = if options.links.is_empty() {
        None
    } else {
        Some(options.links)
    };

    Ok(Prepared {
        query,
        parameters: options.parameters,
        models,
        links,
        variable,
        singular: options.singular,
    })
}

impl Db {
    /// Find nodes of `class`
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # use graphlite_ogm::{Db, Filter, ModelClass, QueryOptions, Result};
    /// # async fn demo(db: Db) -> Result<()> {
    /// let person = ModelClass::builder("Person").build();
    /// let adults = db
    ///     .find(&person, Filter::new().eq("adult", true), QueryOptions::new().with("friends"))
    ///     .await?;
    /// for node in adults.iter() {
    ///     println!("{:?}", node.get("name"));
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub async fn find<C: Into<Criteria>>(
        &self,
        class: &Arc<ModelClass>,
        criteria: C,
        options: QueryOptions,
    ) -> Result<NodeCollection> {
        let options = options.default_variable(&self.config().default_variable);
        let prepared = prepare(class, criteria.into(), options)?;

        let graph = Graph::with_db(self);
        graph.set_variable(&prepared.variable);
        for (column, model) in &prepared.models {
            graph.add_model(column, model);
        }
        if let Some(links) = prepared.links {
            graph.set_links(links);
        }
        graph.run(&prepared.query, prepared.parameters).await?;

        let mut nodes = graph.nodes(&prepared.variable);
        if prepared.singular {
            nodes.truncate(1);
        }
        Ok(NodeCollection::new(class, nodes))
    }

    /// First node matching the criteria
    pub async fn get<C: Into<Criteria>>(
        &self,
        class: &Arc<ModelClass>,
        criteria: C,
        options: QueryOptions,
    ) -> Result<Option<Node>> {
        let nodes = self.find(class, criteria, options.singular(true)).await?;
        Ok(nodes.into_vec().into_iter().next())
    }

    pub async fn all(&self, class: &Arc<ModelClass>, options: QueryOptions) -> Result<NodeCollection> {
        self.find(class, Criteria::All, options).await
    }

    /// Find with a custom MATCH clause
    pub async fn query_nodes(
        &self,
        class: &Arc<ModelClass>,
        query: &str,
        parameters: Params,
        options: QueryOptions,
    ) -> Result<NodeCollection> {
        let options = options.query(query).parameters(parameters);
        self.find(class, Criteria::All, options).await
    }

    /// Find with a WHERE condition
    pub async fn find_where(
        &self,
        class: &Arc<ModelClass>,
        condition: &str,
        parameters: Params,
        options: QueryOptions,
    ) -> Result<NodeCollection> {
        let options = options.where_clause(condition).parameters(parameters);
        self.find(class, Criteria::All, options).await
    }

    /// Count distinct nodes matching the criteria
    pub async fn count<C: Into<Criteria>>(
        &self,
        class: &Arc<ModelClass>,
        criteria: C,
        options: QueryOptions,
    ) -> Result<i64> {
        let mut options = options.default_variable(&self.config().default_variable);
        let (conditions, parameters) = parse_query_filters(&criteria.into(), &options.variable);
        options.where_clauses.extend(conditions);
        options.parameters.extend(parameters);
        options.return_clause = Some(format!("count(distinct({})) as total", options.variable));

        let query = build_query(class, &options)?;
        let total = self.scalar(&query, options.parameters).await?;
        match total {
            Some(Value::Integer(total)) => Ok(total),
            Some(Value::Float(total)) => Ok(total as i64),
            None | Some(Value::Null) => Ok(0),
            Some(other) => Err(Error::invalid_state(format!(
                "count returned a {}",
                other.type_name()
            ))),
        }
    }

    /// Match a node on `criteria` or create it
    ///
    /// A created node gets a fresh stable id. The criteria, then
    /// `properties`, are set on the node either way.
    pub async fn merge(
        &self,
        class: &Arc<ModelClass>,
        criteria: PropertyMap,
        properties: Option<PropertyMap>,
        options: QueryOptions,
    ) -> Result<Option<Node>> {
        let options = options
            .default_variable(&self.config().default_variable)
            .singular(true);
        let variable = options.variable.clone();

        let mut keys: Vec<&String> = criteria.keys().collect();
        keys.sort();
        let mut query = format!("MERGE ({}:{}", variable, class.labels().join(":"));
        if !keys.is_empty() {
            let pairs: Vec<String> = keys.iter().map(|k| format!("{}: $criteria.{}", k, k)).collect();
            query.push_str(&format!(" {{{}}}", pairs.join(", ")));
        }
        query.push_str(")\n");
        query.push_str(&format!("ON CREATE SET {}.id = $id\n", variable));
        if let Some(clause) = &options.on_create {
            query.push_str(&format!("ON CREATE {}\n", clause));
        }
        if let Some(clause) = &options.on_match {
            query.push_str(&format!("ON MATCH {}\n", clause));
        }

        let mut options = options.set(format!("{} += $criteria", variable));
        let mut parameters = Params::new();
        parameters.insert("id".to_string(), Value::from(self.generate_id()));
        parameters.insert("criteria".to_string(), Value::Map(criteria));
        if let Some(properties) = properties {
            options = options.set(format!("{} += $properties", variable));
            parameters.insert("properties".to_string(), Value::Map(properties));
        }

        let nodes = self.query_nodes(class, &query, parameters, options).await?;
        Ok(nodes.into_vec().into_iter().next())
    }
}
