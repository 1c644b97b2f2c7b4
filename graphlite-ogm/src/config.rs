// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Database handle configuration

use crate::error::Result;
use serde::{Deserialize, Serialize};

/// How stable node ids are generated on first save
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdStrategy {
    /// Short random alphanumeric id
    #[default]
    ShortId,
    /// Random UUID (v4)
    Uuid,
}

/// Configuration owned by a [`crate::db::Db`] handle
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DbConfig {
    /// Create registered indexes and constraints before the next statement
    pub ensure_constraints: bool,

    /// Stable id generation strategy
    pub id_strategy: IdStrategy,

    /// Query variable bound to the primary node
    pub default_variable: String,

    /// Length of generated short ids
    pub id_length: usize,

    /// Include parameter values (not only keys) in debug logs
    pub log_parameters: bool,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            ensure_constraints: true,
            id_strategy: IdStrategy::ShortId,
            default_variable: "n".to_string(),
            id_length: 9,
            log_parameters: false,
        }
    }
}

impl DbConfig {
    /// Parse a JSON document; missing fields take their defaults
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
