// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Property filters rendered into WHERE conditions

use crate::entity::StoreId;
use crate::error::{Error, Result};
use crate::value::{Params, Value};
use regex::Regex;

/// Key matched against the store identity instead of a property
pub const STORE_ID_KEY: &str = "$id";

/// Condition on one property
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Eq(Value),
    In(Vec<Value>),
    Regex(String),
}

/// Ordered set of property conditions, joined with AND
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    conditions: Vec<(String, Condition)>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Property equals value
    pub fn eq<K: Into<String>, V: Into<Value>>(mut self, key: K, value: V) -> Self {
        self.conditions.push((key.into(), Condition::Eq(value.into())));
        self
    }

    /// Property is one of the values
    pub fn any_of<K, I, V>(mut self, key: K, values: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let values = values.into_iter().map(Into::into).collect();
        self.conditions.push((key.into(), Condition::In(values)));
        self
    }

    /// Property matches a regular expression
    ///
    /// Flags go inline, e.g. `(?i)^ali`.
    pub fn regex<K: Into<String>>(mut self, key: K, pattern: &str) -> Result<Self> {
        Regex::new(pattern)
            .map_err(|e| Error::invalid_argument(format!("Invalid filter pattern '{}': {}", pattern, e)))?;
        self.conditions
            .push((key.into(), Condition::Regex(pattern.to_string())));
        Ok(self)
    }

    /// Store identity equals `id`
    pub fn store_id(self, id: StoreId) -> Self {
        self.eq(STORE_ID_KEY, id)
    }

    /// Filter from a JSON object
    ///
    /// Arrays become membership tests and `{"$regex": "…"}` a pattern
    /// match; every other value is compared for equality.
    pub fn from_json(json: &serde_json::Value) -> Result<Self> {
        let object = json
            .as_object()
            .ok_or_else(|| Error::invalid_argument(format!("Invalid filter object: {}", json)))?;

        let mut filter = Filter::new();
        for (key, value) in object {
            filter = match value {
                serde_json::Value::Array(items) => filter.any_of(key, items.iter().cloned()),
                serde_json::Value::Object(inner) if inner.contains_key("$regex") => {
                    let pattern = inner
                        .get("$regex")
                        .and_then(|p| p.as_str())
                        .ok_or_else(|| Error::invalid_argument(format!("Invalid filter object: {}", json)))?;
                    filter.regex(key, pattern)?
                }
                other => filter.eq(key, other.clone()),
            };
        }
        Ok(filter)
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.conditions.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Condition)> {
        self.conditions.iter().map(|(k, c)| (k.as_str(), c))
    }

    /// Append another filter's conditions
    pub fn extend(&mut self, other: Filter) {
        self.conditions.extend(other.conditions);
    }

    /// WHERE conditions on `variable` and their parameters
    ///
    /// Parameters are named `{variable}_{key}`; membership values get an
    /// index suffix.
    pub(crate) fn to_conditions(&self, variable: &str) -> (Vec<String>, Params) {
        let mut conditions = Vec::with_capacity(self.conditions.len());
        let mut params = Params::new();

        for (key, condition) in &self.conditions {
            let (subject, name) = if key == STORE_ID_KEY {
                (format!("id({})", variable), format!("{}_identity", variable))
            } else {
                (format!("{}.{}", variable, key), format!("{}_{}", variable, key))
            };

            let rendered = match condition {
                Condition::Eq(value) => {
                    params.insert(name.clone(), value.clone());
                    format!("{} = ${}", subject, name)
                }
                Condition::Regex(pattern) => {
                    params.insert(name.clone(), Value::from(pattern.as_str()));
                    format!("{} =~ ${}", subject, name)
                }
                Condition::In(values) => {
                    let names: Vec<String> = values
                        .iter()
                        .enumerate()
                        .map(|(i, value)| {
                            let indexed = format!("{}{}", name, i);
                            params.insert(indexed.clone(), value.clone());
                            format!("${}", indexed)
                        })
                        .collect();
                    format!("{} IN [{}]", subject, names.join(", "))
                }
            };
            conditions.push(rendered);
        }

        (conditions, params)
    }
}
