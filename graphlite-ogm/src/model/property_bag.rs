// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Property storage with change tracking

use crate::value::{PropertyMap, Value};
use std::collections::HashSet;

/// Property map that remembers which keys changed since the last reset
///
/// Named relationships are tracked through [`PropertyBag::set_changed`] so
/// that reassigning related nodes marks the owner dirty without the
/// relationship becoming a stored property.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PropertyBag {
    data: PropertyMap,
    changed: HashSet<String>,
}

impl PropertyBag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a clean bag from existing data
    pub fn from_map(data: PropertyMap) -> Self {
        Self {
            data,
            changed: HashSet::new(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    /// Set a value, marking the key changed when the value differs
    pub fn set<K: Into<String>, V: Into<Value>>(&mut self, key: K, value: V) {
        let key = key.into();
        let value = value.into();
        if self.data.get(&key) == Some(&value) {
            return;
        }
        self.data.insert(key.clone(), value);
        self.changed.insert(key);
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        let removed = self.data.remove(key);
        if removed.is_some() {
            self.changed.insert(key.to_string());
        }
        removed
    }

    /// Mark a key changed without storing anything under it
    pub fn set_changed<K: Into<String>>(&mut self, key: K) {
        self.changed.insert(key.into());
    }

    /// Current property snapshot
    pub fn data(&self) -> &PropertyMap {
        &self.data
    }

    pub fn is_dirty(&self) -> bool {
        !self.changed.is_empty()
    }

    pub fn is_changed(&self, key: &str) -> bool {
        self.changed.contains(key)
    }

    /// Forget all changes
    pub fn reset(&mut self) {
        self.changed.clear();
    }

    /// Replace all data and forget changes
    pub fn replace(&mut self, data: PropertyMap) {
        self.data = data;
        self.changed.clear();
    }
}
