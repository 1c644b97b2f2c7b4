// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Runtime model class descriptors

use super::relationship_def::RelationshipDef;
use crate::error::{Error, Result};
use once_cell::sync::Lazy;
use std::fmt;
use std::sync::Arc;

/// Name and label of the generic node class
pub const GENERIC_CLASS: &str = "Node";

static GENERIC: Lazy<Arc<ModelClass>> = Lazy::new(|| ModelClass::builder(GENERIC_CLASS).build());

/// Descriptor of a typed node wrapper
///
/// Holds the labels written on save (base label first), the declared
/// relationships in declaration order, and the index and uniqueness
/// constraints to register for the base label.
pub struct ModelClass {
    name: String,
    labels: Vec<String>,
    relationships: Vec<(String, RelationshipDef)>,
    indexes: Vec<String>,
    uniques: Vec<String>,
}

impl ModelClass {
    pub fn builder<T: Into<String>>(name: T) -> ModelClassBuilder {
        ModelClassBuilder::new(name)
    }

    /// The generic `Node` class used when nothing more specific is configured
    pub fn generic() -> Arc<ModelClass> {
        GENERIC.clone()
    }

    pub fn is_generic(&self) -> bool {
        self.name == GENERIC_CLASS
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Label used to match nodes of this class by id
    pub fn base_label(&self) -> &str {
        self.labels.first().map(String::as_str).unwrap_or(&self.name)
    }

    pub fn relationships(&self) -> impl Iterator<Item = (&str, &RelationshipDef)> {
        self.relationships.iter().map(|(name, def)| (name.as_str(), def))
    }

    pub fn relationship_names(&self) -> Vec<String> {
        self.relationships.iter().map(|(name, _)| name.clone()).collect()
    }

    pub fn relationship(&self, name: &str) -> Option<&RelationshipDef> {
        self.relationships
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, def)| def)
    }

    pub fn has_relationship(&self, name: &str) -> bool {
        self.relationship(name).is_some()
    }

    /// Look up a relationship, failing for undeclared names
    pub fn get_relationship(&self, name: &str) -> Result<&RelationshipDef> {
        self.relationship(name).ok_or_else(|| {
            Error::invalid_argument(format!(
                "Unknown relationship '{}' on {}",
                name, self.name
            ))
        })
    }

    pub fn indexes(&self) -> &[String] {
        &self.indexes
    }

    pub fn uniques(&self) -> &[String] {
        &self.uniques
    }
}

impl fmt::Debug for ModelClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelClass")
            .field("name", &self.name)
            .field("labels", &self.labels)
            .field("relationships", &self.relationship_names())
            .finish()
    }
}

/// Builder for [`ModelClass`]
pub struct ModelClassBuilder {
    name: String,
    labels: Vec<String>,
    relationships: Vec<(String, RelationshipDef)>,
    indexes: Vec<String>,
    uniques: Vec<String>,
}

impl ModelClassBuilder {
    fn new<T: Into<String>>(name: T) -> Self {
        let name = name.into();
        Self {
            labels: vec![name.clone()],
            name,
            relationships: Vec::new(),
            indexes: Vec::new(),
            uniques: Vec::new(),
        }
    }

    /// Inherit labels and relationships from a parent class
    ///
    /// Parent labels follow this class's own label; the generic class
    /// contributes no label.
    pub fn extends(mut self, parent: &Arc<ModelClass>) -> Self {
        if !parent.is_generic() {
            for label in &parent.labels {
                if !self.labels.contains(label) {
                    self.labels.push(label.clone());
                }
            }
        }
        for (name, def) in &parent.relationships {
            if !self.relationships.iter().any(|(n, _)| n == name) {
                self.relationships.push((name.clone(), def.clone()));
            }
        }
        self.indexes.extend(parent.indexes.iter().cloned());
        self.uniques.extend(parent.uniques.iter().cloned());
        self
    }

    /// Add an extra label
    pub fn label<T: Into<String>>(mut self, label: T) -> Self {
        let label = label.into();
        if !self.labels.contains(&label) {
            self.labels.push(label);
        }
        self
    }

    /// Declare a relationship; redeclaring a name replaces the inherited one
    pub fn relationship<T: Into<String>>(mut self, name: T, def: RelationshipDef) -> Self {
        let name = name.into();
        match self.relationships.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = def,
            None => self.relationships.push((name, def)),
        }
        self
    }

    pub fn index<T: Into<String>>(mut self, property: T) -> Self {
        self.indexes.push(property.into());
        self
    }

    pub fn unique<T: Into<String>>(mut self, property: T) -> Self {
        self.uniques.push(property.into());
        self
    }

    pub fn build(mut self) -> Arc<ModelClass> {
        self.indexes.dedup();
        self.uniques.dedup();
        Arc::new(ModelClass {
            name: self.name,
            labels: self.labels,
            relationships: self.relationships,
            indexes: self.indexes,
            uniques: self.uniques,
        })
    }
}
