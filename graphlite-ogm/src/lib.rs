// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! GraphLite OGM - object-graph mapping over Cypher-speaking graph stores
//!
//! This crate turns query results into typed, identity-deduplicated node and
//! relationship wrappers, resolves declared relationships between them, and
//! writes changes back with cascading, transactional saves and deletes.
//!
//! # Quick Start
//!
//! ```no_run
//! use graphlite_ogm::{Db, Driver, ModelClass, QueryOptions, RelationshipDef, Result};
//!
//! # async fn demo<D: Driver + 'static>(driver: D) -> Result<()> {
//! let person = ModelClass::builder("Person")
//!     .relationship("friends", RelationshipDef::of_type("knows"))
//!     .build();
//!
//! let db = Db::new(driver);
//! db.register(&person);
//!
//! // Load Alice together with her friends in one query
//! let alice = db
//!     .get(&person, "alice", QueryOptions::new().with("friends"))
//!     .await?
//!     .expect("alice exists");
//!
//! for friend in alice.related("friends")?.iter() {
//!     println!("{:?} since {:?}", friend.node().get("name"), friend.rel().get("since"));
//! }
//!
//! alice.set("age", 42);
//! alice.save(&db, false).await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │   Application Code                      │
//! └─────────────────────────────────────────┘
//!                  │
//!                  ▼
//! ┌─────────────────────────────────────────┐
//! │  Query building (query, planner)        │
//! │  Lifecycle (save / delete / labels)     │
//! └─────────────────────────────────────────┘
//!                  │
//!                  ▼
//! ┌─────────────────────────────────────────┐
//! │  Graph cache (graph, resolver)          │
//! │  Wrappers (node, relationship)          │
//! └─────────────────────────────────────────┘
//!                  │
//!                  ▼
//! ┌─────────────────────────────────────────┐
//! │  Db handle + Driver (db)                │
//! └─────────────────────────────────────────┘
//! ```
//!
//! # Module Organization
//!
//! - [`graph`] - Identity-deduplicated cache of query results
//! - [`resolver`] - Entity classification and identity lookup
//! - [`model`] - Model classes and relationship definitions
//! - [`node`], [`relationship`], [`related`] - Wrappers
//! - [`planner`] - Expansion of related nodes into query clauses
//! - [`query`] - Query building and model queries
//! - [`lifecycle`] - Cascading saves, deletes and label changes
//! - [`db`] - Store handle, driver traits, transactions and constraints
//! - [`error`] - Error types

pub mod collection;
pub mod config;
pub mod db;
pub mod entity;
pub mod error;
pub mod graph;
pub mod id;
pub mod lifecycle;
pub mod model;
pub mod node;
pub mod planner;
pub mod query;
pub mod related;
pub mod relationship;
pub mod resolver;
pub mod value;

pub use collection::NodeCollection;
pub use config::{DbConfig, IdStrategy};
pub use db::{Db, Driver, DriverTransaction, QueryLog, Transaction};
pub use entity::{RawEntity, RawNode, RawRelationship, StoreId};
pub use error::{Error, Result, StoreError};
pub use graph::{Graph, LinkSpec, LinkedValue, Reference};
pub use lifecycle::Cascade;
pub use model::{Direction, ModelClass, ModelClassBuilder, ModelRef, RelationshipDef};
pub use node::Node;
pub use planner::{Plan, WithSpec};
pub use query::{build_query, parse_query_filters, Criteria, Filter, QueryOptions};
pub use related::{RelatedNode, Resolved};
pub use relationship::Relationship;
pub use resolver::{EntityKind, EntityRef};
pub use value::{Params, PropertyMap, Record, Value};
