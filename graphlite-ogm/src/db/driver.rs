// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Store driver capability
//!
//! The mapper never talks to a wire protocol itself. A driver executes
//! opaque parameterized query strings and hands back ordered records.

use crate::error::StoreError;
use crate::value::{Params, Record};
use async_trait::async_trait;

/// Connection to a Cypher-speaking store
#[async_trait]
pub trait Driver: Send + Sync {
    /// Run one statement in its own auto-commit session
    async fn run(&self, query: &str, params: &Params) -> Result<Vec<Record>, StoreError>;

    /// Open an explicit transaction
    async fn begin(&self) -> Result<Box<dyn DriverTransaction>, StoreError>;
}

/// Open store transaction
///
/// Dropping a transaction without commit or rollback leaves it to the
/// driver to discard.
#[async_trait]
pub trait DriverTransaction: Send {
    async fn run(&mut self, query: &str, params: &Params) -> Result<Vec<Record>, StoreError>;

    async fn commit(self: Box<Self>) -> Result<(), StoreError>;

    async fn rollback(self: Box<Self>) -> Result<(), StoreError>;
}
