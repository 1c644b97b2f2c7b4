// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Database handle
//!
//! [`Db`] wraps a [`Driver`] together with everything scoped to one store:
//! configuration, the constraint registry, id generation and the last query
//! diagnostics. Handles are cheap to clone and share all of it.

pub mod constraints;
pub mod driver;
pub mod transaction;

pub use constraints::{Constraint, ConstraintKind, ConstraintRegistry};
pub use driver::{Driver, DriverTransaction};
pub use transaction::Transaction;

use crate::config::DbConfig;
use crate::error::{Result, StoreError};
use crate::id;
use crate::model::ModelClass;
use crate::value::{Params, Record, Value};
use parking_lot::{Mutex, RwLock};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

/// Custom stable id generator
pub type IdGenerator = Arc<dyn Fn() -> String + Send + Sync>;

/// Last statement sent to the store
#[derive(Debug, Clone, PartialEq)]
pub struct QueryLog {
    pub query: String,
    pub parameters: Params,
    pub error: Option<String>,
}

struct DbInner {
    driver: Arc<dyn Driver>,
    config: DbConfig,
    constraints: Mutex<ConstraintRegistry>,
    id_generator: RwLock<Option<IdGenerator>>,
    last_query: Mutex<Option<QueryLog>>,
}

/// Handle to a store
#[derive(Clone)]
pub struct Db {
    inner: Arc<DbInner>,
}

impl Db {
    pub fn new<D: Driver + 'static>(driver: D) -> Self {
        Self::with_config(driver, DbConfig::default())
    }

    pub fn with_config<D: Driver + 'static>(driver: D, config: DbConfig) -> Self {
        Self::from_arc(Arc::new(driver), config)
    }

    pub fn from_arc(driver: Arc<dyn Driver>, config: DbConfig) -> Self {
        Self {
            inner: Arc::new(DbInner {
                driver,
                config,
                constraints: Mutex::new(ConstraintRegistry::new()),
                id_generator: RwLock::new(None),
                last_query: Mutex::new(None),
            }),
        }
    }

    /// Replace the configured id strategy with a custom generator
    pub fn with_id_generator<F>(self, generator: F) -> Self
    where
        F: Fn() -> String + Send + Sync + 'static,
    {
        *self.inner.id_generator.write() = Some(Arc::new(generator));
        self
    }

    pub fn config(&self) -> &DbConfig {
        &self.inner.config
    }

    /// Generate a new stable id
    pub fn generate_id(&self) -> String {
        let generator = self.inner.id_generator.read().clone();
        match generator {
            Some(generator) => generator(),
            None => id::generate(self.inner.config.id_strategy, self.inner.config.id_length),
        }
    }

    /// Run a statement in an auto-commit session
    pub async fn query(&self, query: &str, params: Params) -> Result<Vec<Record>> {
        self.ensure_pending_constraints().await?;
        self.run_raw(query, params).await
    }

    /// First column of the first record, if any
    pub async fn scalar(&self, query: &str, params: Params) -> Result<Option<Value>> {
        let records = self.query(query, params).await?;
        Ok(records.first().and_then(|r| r.get_index(0)).cloned())
    }

    pub async fn begin_transaction(&self) -> Result<Transaction> {
        self.ensure_pending_constraints().await?;
        let handle = self.inner.driver.begin().await?;
        Ok(Transaction::new(self.clone(), handle))
    }

    /// Last statement sent to the store, with its error if it failed
    pub fn last_query(&self) -> Option<QueryLog> {
        self.inner.last_query.lock().clone()
    }

    /// Register a model class's constraints
    ///
    /// Adds an `id` index on the base label plus the class's own indexes
    /// and unique constraints.
    pub fn register(&self, class: &ModelClass) {
        let label = class.base_label();
        let mut registry = self.inner.constraints.lock();

        registry.add(ConstraintKind::Index, label, "id");
        for property in class.indexes() {
            registry.add(ConstraintKind::Index, label, property);
        }
        for property in class.uniques() {
            registry.add(ConstraintKind::Unique, label, property);
        }
    }

    pub fn add_index(&self, label: &str, property: &str) -> bool {
        self.inner
            .constraints
            .lock()
            .add(ConstraintKind::Index, label, property)
    }

    pub fn add_unique(&self, label: &str, property: &str) -> bool {
        self.inner
            .constraints
            .lock()
            .add(ConstraintKind::Unique, label, property)
    }

    pub async fn drop_index(&self, label: &str, property: &str) -> Result<()> {
        self.drop_constraint(ConstraintKind::Index, label, property)
            .await
    }

    pub async fn drop_unique(&self, label: &str, property: &str) -> Result<()> {
        self.drop_constraint(ConstraintKind::Unique, label, property)
            .await
    }

    async fn drop_constraint(&self, kind: ConstraintKind, label: &str, property: &str) -> Result<()> {
        let constraint = Constraint {
            kind,
            label: label.to_string(),
            property: property.to_string(),
            added: true,
        };
        self.run_raw(&constraint.drop_statement(), Params::new())
            .await?;
        self.inner.constraints.lock().remove(kind, label, property);
        log::info!("Dropped {}", constraint);
        Ok(())
    }

    /// Registered constraints, created or pending
    pub fn constraints(&self) -> Vec<Constraint> {
        self.inner.constraints.lock().iter().cloned().collect()
    }

    /// Indexes present in the store, grouped by label
    pub async fn indexes(&self) -> Result<HashMap<String, HashSet<String>>> {
        let records = self.run_raw("CALL db.indexes()", Params::new()).await?;
        let descriptions: Vec<&str> = records
            .iter()
            .filter_map(|r| r.get("description").and_then(Value::as_str))
            .collect();
        constraints::index_map(descriptions)
    }

    /// Create every pending constraint
    ///
    /// Indexes the store already reports are marked created without a
    /// statement. Returns the number of statements issued.
    pub async fn ensure_constraints(&self) -> Result<usize> {
        let pending = self.inner.constraints.lock().pending();
        if pending.is_empty() {
            return Ok(0);
        }

        let existing = if pending.iter().any(|c| c.kind == ConstraintKind::Index) {
            self.indexes().await?
        } else {
            HashMap::new()
        };

        let mut issued = 0;
        for constraint in pending {
            let exists = constraint.kind == ConstraintKind::Index
                && existing
                    .get(&constraint.label)
                    .map_or(false, |props| props.contains(&constraint.property));

            if !exists {
                self.run_raw(&constraint.create_statement(), Params::new())
                    .await?;
                log::info!("Created {}", constraint);
                issued += 1;
            }

            self.inner.constraints.lock().mark_added(
                constraint.kind,
                &constraint.label,
                &constraint.property,
            );
        }
        Ok(issued)
    }

    pub(crate) async fn ensure_pending_constraints(&self) -> Result<()> {
        if !self.inner.config.ensure_constraints {
            return Ok(());
        }
        let has_pending = self.inner.constraints.lock().has_pending();
        if has_pending {
            self.ensure_constraints().await?;
        }
        Ok(())
    }

    async fn run_raw(&self, query: &str, params: Params) -> Result<Vec<Record>> {
        self.log_query(query, &params);
        let result = self.inner.driver.run(query, &params).await;
        self.record_query(query, params, result.as_ref().err());
        Ok(result?)
    }

    pub(crate) fn log_query(&self, query: &str, params: &Params) {
        if self.inner.config.log_parameters {
            log::debug!("Running query: {} with {:?}", query.trim(), params);
        } else {
            let mut keys: Vec<&str> = params.keys().map(String::as_str).collect();
            keys.sort_unstable();
            log::debug!("Running query: {} with parameters {:?}", query.trim(), keys);
        }
    }

    pub(crate) fn record_query(&self, query: &str, parameters: Params, error: Option<&StoreError>) {
        if let Some(e) = error {
            log::debug!("Query failed: {}", e);
        }
        *self.inner.last_query.lock() = Some(QueryLog {
            query: query.to_string(),
            parameters,
            error: error.map(ToString::to_string),
        });
    }
}

impl fmt::Debug for Db {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Db")
            .field("config", &self.inner.config)
            .field("constraints", &self.inner.constraints.lock().len())
            .finish()
    }
}
