//! Test utilities for graphlite-ogm integration tests
//!
//! Two drivers are available:
//! - ScriptedDriver: replays queued responses and records every statement
//! - FakeStore: small in-memory store that understands the statements the
//!   mapper itself emits, with snapshot transactions
//!
//! Each test builds its own driver, so tests stay independent.

#![allow(dead_code)]

pub mod fake_store;
pub mod scripted_driver;

use graphlite_ogm::{RawNode, RawRelationship, Record, StoreId, Value};

/// Enable log output for a test run (`RUST_LOG=debug cargo test`)
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Raw node with one label and a stable id
pub fn raw_node(identity: StoreId, label: &str, id: &str) -> RawNode {
    RawNode::new(identity)
        .with_label(label)
        .with_property("id", id)
}

pub fn raw_rel(identity: StoreId, rel_type: &str, start: StoreId, end: StoreId) -> RawRelationship {
    RawRelationship::new(identity, rel_type, start, end)
}

/// Record from `(column, value)` pairs
pub fn record<I, K, V>(pairs: I) -> Record
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<Value>,
{
    Record::from_pairs(pairs)
}
