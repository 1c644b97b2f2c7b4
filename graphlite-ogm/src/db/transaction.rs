// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Transactions with cycle tracking for cascading operations
//!
//! A transaction carries the set of stable ids already visited by the
//! current save or delete call tree, so a cascade over a circular graph
//! processes every node at most once.

use super::driver::DriverTransaction;
use super::Db;
use crate::error::{Error, Result};
use crate::value::{Params, Record};
use std::collections::HashSet;

/// Active store transaction
///
/// - Must be finished explicitly with [`Transaction::commit`] or
///   [`Transaction::rollback`]
/// - A transaction dropped while still open is logged and left to the
///   driver to discard
pub struct Transaction {
    db: Db,
    handle: Option<Box<dyn DriverTransaction>>,
    visited: HashSet<String>,
}

impl Transaction {
    pub(crate) fn new(db: Db, handle: Box<dyn DriverTransaction>) -> Self {
        Self {
            db,
            handle: Some(handle),
            visited: HashSet::new(),
        }
    }

    /// Database handle this transaction belongs to
    pub fn db(&self) -> &Db {
        &self.db
    }

    /// Run a statement inside the transaction
    pub async fn run(&mut self, query: &str, params: Params) -> Result<Vec<Record>> {
        if self.handle.is_none() {
            return Err(Error::invalid_state("transaction already finished"));
        }

        self.db.ensure_pending_constraints().await?;

        let handle = self
            .handle
            .as_mut()
            .ok_or_else(|| Error::invalid_state("transaction already finished"))?;

        self.db.log_query(query, &params);
        let result = handle.run(query, &params).await;
        self.db.record_query(query, params, result.as_ref().err());

        Ok(result?)
    }

    /// Whether a stable id was already processed in this transaction
    pub fn visited(&self, id: &str) -> bool {
        self.visited.contains(id)
    }

    /// Mark a stable id processed; returns false if it already was
    pub fn visit<T: Into<String>>(&mut self, id: T) -> bool {
        self.visited.insert(id.into())
    }

    pub fn is_active(&self) -> bool {
        self.handle.is_some()
    }

    pub async fn commit(mut self) -> Result<()> {
        let handle = self
            .handle
            .take()
            .ok_or_else(|| Error::invalid_state("transaction already finished"))?;

        log::debug!("Committing transaction ({} nodes visited)", self.visited.len());
        handle.commit().await?;
        Ok(())
    }

    pub async fn rollback(mut self) -> Result<()> {
        let handle = self
            .handle
            .take()
            .ok_or_else(|| Error::invalid_state("transaction already finished"))?;

        log::debug!("Rolling back transaction");
        handle.rollback().await?;
        Ok(())
    }

    /// Commit on success, roll back on failure
    ///
    /// The original error is returned unchanged when the operation failed;
    /// a rollback failure on top of it is only logged.
    pub async fn finish<T>(self, result: Result<T>) -> Result<T> {
        match result {
            Ok(value) => {
                self.commit().await?;
                Ok(value)
            }
            Err(e) => {
                if let Err(rollback) = self.rollback().await {
                    log::warn!("Rollback failed after error '{}': {}", e, rollback);
                }
                Err(e)
            }
        }
    }
}

impl Drop for Transaction {
    fn drop(&mut self) {
        if self.handle.is_some() {
            log::warn!("Transaction dropped without commit or rollback");
        }
    }
}
