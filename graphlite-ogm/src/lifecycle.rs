// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Entity lifecycle: save, delete and label operations
//!
//! Every top-level call opens its own transaction and commits it only when
//! the whole call tree succeeded. The `_in` variants run inside a caller's
//! transaction and share its visited-id set, so cascades over circular
//! relationship graphs touch each node once.

use crate::db::{Db, Transaction};
use crate::error::{Error, Result};
use crate::node::Node;
use crate::value::{Params, Value};
use std::future::Future;
use std::pin::Pin;

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Which relationships a save or delete recurses into
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Cascade {
    #[default]
    None,
    All,
    /// The named relationships, one level deep
    Only(Vec<String>),
}

impl Cascade {
    pub fn is_none(&self) -> bool {
        match self {
            Cascade::None => true,
            Cascade::All => false,
            Cascade::Only(names) => names.is_empty(),
        }
    }

    fn names(&self, node: &Node) -> Vec<String> {
        match self {
            Cascade::None => Vec::new(),
            Cascade::All => node.class().relationship_names(),
            Cascade::Only(names) => names.clone(),
        }
    }

    fn nested(&self) -> Cascade {
        match self {
            Cascade::All => Cascade::All,
            _ => Cascade::None,
        }
    }
}

impl From<bool> for Cascade {
    fn from(cascade: bool) -> Self {
        if cascade {
            Cascade::All
        } else {
            Cascade::None
        }
    }
}

impl From<&str> for Cascade {
    fn from(name: &str) -> Self {
        Cascade::Only(vec![name.to_string()])
    }
}

impl From<Vec<&str>> for Cascade {
    fn from(names: Vec<&str>) -> Self {
        Cascade::Only(names.into_iter().map(str::to_string).collect())
    }
}

impl From<Vec<String>> for Cascade {
    fn from(names: Vec<String>) -> Self {
        Cascade::Only(names)
    }
}

fn id_params(id: &str) -> Params {
    let mut params = Params::new();
    params.insert("id".to_string(), Value::from(id));
    params
}

impl Node {
    /// Save the node, and optionally what it relates to, atomically
    pub async fn save<C: Into<Cascade>>(&self, db: &Db, cascade: C) -> Result<()> {
        let mut tx = db.begin_transaction().await?;
        let result = self.save_in(&mut tx, cascade.into()).await;
        tx.finish(result).await
    }

    /// Save inside an existing transaction
    ///
    /// Assigns a stable id if the node has none and upserts it when dirty.
    /// Related nodes are saved before the edges pointing at them.
    pub fn save_in<'a>(&'a self, tx: &'a mut Transaction, cascade: Cascade) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            if self.is_deleted() {
                return Err(Error::missing_identity());
            }

            let id = match self.id() {
                Some(id) => id,
                None => {
                    let id = tx.db().generate_id();
                    self.set_id(id.clone());
                    id
                }
            };
            if !tx.visit(id.clone()) {
                log::trace!("Node {} already saved in this transaction", id);
                return Ok(());
            }

            if self.is_dirty() {
                self.upsert(tx, &id).await?;
            }

            for name in cascade.names(self) {
                let related = self.related(&name)?;
                for item in related.into_vec() {
                    item.node().save_in(tx, cascade.nested()).await?;
                    if item.rel().is_dirty() {
                        item.rel().save_in(tx).await?;
                    }
                }
            }
            Ok(())
        })
    }

    async fn upsert(&self, tx: &mut Transaction, id: &str) -> Result<()> {
        let labels = self.labels();
        let mut query = format!("MERGE (n:{} {{id: $id}})\n", self.base_label());
        if !labels.is_empty() {
            query.push_str(&format!("SET n:{}\n", labels.join(":")));
        }
        query.push_str("SET n += $properties\nRETURN n");

        let mut params = id_params(id);
        params.insert("properties".to_string(), Value::Map(self.properties()));

        let records = tx.run(&query, params).await?;
        let entity = records
            .first()
            .and_then(|r| r.get("n"))
            .and_then(Value::as_node)
            .cloned()
            .ok_or_else(|| Error::not_found(format!("Node {} was not returned by the store", id)))?;

        log::debug!("Saved {} {} (store id {})", self.class().name(), id, entity.identity);
        self.mark_saved(entity);
        Ok(())
    }

    /// Delete the node, and optionally what it relates to, atomically
    pub async fn delete<C: Into<Cascade>>(&self, db: &Db, cascade: C) -> Result<()> {
        let mut tx = db.begin_transaction().await?;
        let result = self.delete_in(&mut tx, cascade.into()).await;
        tx.finish(result).await
    }

    /// Delete inside an existing transaction
    ///
    /// The node is detached from its graph and loses its stable id and
    /// backing entity. Related nodes that were never saved are skipped.
    pub fn delete_in<'a>(&'a self, tx: &'a mut Transaction, cascade: Cascade) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let id = self.id().ok_or_else(Error::missing_identity)?;
            if !tx.visit(id.clone()) {
                return Ok(());
            }

            let mut related = Vec::new();
            for name in cascade.names(self) {
                related.extend(self.related(&name)?.into_vec().into_iter().map(|item| item.into_node()));
            }

            let query = format!("MATCH (n:{})\nWHERE n.id = $id\nDETACH DELETE n", self.base_label());
            tx.run(&query, id_params(&id)).await?;

            if let Some(graph) = self.graph() {
                graph.remove(self)?;
            }

            for node in related {
                if node.id().is_none() {
                    continue;
                }
                node.delete_in(tx, Cascade::All).await?;
            }

            log::debug!("Deleted {} {}", self.class().name(), id);
            self.mark_deleted();
            Ok(())
        })
    }

    pub async fn add_label(&self, db: &Db, label: &str) -> Result<()> {
        self.add_labels(db, &[label]).await
    }

    pub async fn add_labels(&self, db: &Db, labels: &[&str]) -> Result<()> {
        let mut tx = db.begin_transaction().await?;
        let result = self.add_labels_in(&mut tx, labels).await;
        tx.finish(result).await
    }

    /// Add labels in the store and to the local label list
    pub async fn add_labels_in(&self, tx: &mut Transaction, labels: &[&str]) -> Result<()> {
        let labels = owned_labels(labels)?;
        self.label_query(tx, "SET", &labels).await?;
        self.add_local_labels(&labels);
        Ok(())
    }

    pub async fn remove_label(&self, db: &Db, label: &str) -> Result<()> {
        self.remove_labels(db, &[label]).await
    }

    pub async fn remove_labels(&self, db: &Db, labels: &[&str]) -> Result<()> {
        let mut tx = db.begin_transaction().await?;
        let result = self.remove_labels_in(&mut tx, labels).await;
        tx.finish(result).await
    }

    pub async fn remove_labels_in(&self, tx: &mut Transaction, labels: &[&str]) -> Result<()> {
        let labels = owned_labels(labels)?;
        self.label_query(tx, "REMOVE", &labels).await?;
        self.remove_local_labels(&labels);
        Ok(())
    }

    async fn label_query(&self, tx: &mut Transaction, clause: &str, labels: &[String]) -> Result<()> {
        let id = self.id().ok_or_else(Error::missing_identity)?;
        let mut query = format!("MATCH (n:{})\nWHERE n.id = $id", self.base_label());
        for label in labels {
            query.push_str(&format!("\n{} n:{}", clause, label));
        }
        tx.run(&query, id_params(&id)).await?;
        Ok(())
    }
}

fn owned_labels(labels: &[&str]) -> Result<Vec<String>> {
    if labels.is_empty() || labels.iter().any(|l| l.trim().is_empty()) {
        return Err(Error::invalid_argument("labels must be non-empty"));
    }
    Ok(labels.iter().map(|l| l.to_string()).collect())
}
