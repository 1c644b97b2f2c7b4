// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Declarative relationship definitions

use super::class::ModelClass;
use crate::error::{Error, Result};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Relationship type used when a definition names none
pub const DEFAULT_TYPE: &str = "is_related_to";

/// Direction of a relationship, seen from the node declaring it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    #[default]
    Out,
    In,
    /// Persisted as two edges, one per direction
    Both,
    Any,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Out => "OUT",
            Direction::In => "IN",
            Direction::Both => "BOTH",
            Direction::Any => "ANY",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Direction {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "OUT" => Ok(Direction::Out),
            "IN" => Ok(Direction::In),
            "BOTH" => Ok(Direction::Both),
            "ANY" => Ok(Direction::Any),
            other => Err(Error::invalid_argument(format!(
                "Unknown relationship direction: {}",
                other
            ))),
        }
    }
}

type ModelThunk = Arc<dyn Fn() -> Arc<ModelClass> + Send + Sync>;

/// Class of the nodes on the other end of a relationship
///
/// A lazy reference breaks definition cycles between mutually related
/// classes. It is resolved on first use and the result is shared by every
/// clone of the definition.
#[derive(Clone, Default)]
pub enum ModelRef {
    /// The generic `Node` class
    #[default]
    Default,
    Class(Arc<ModelClass>),
    Lazy {
        thunk: ModelThunk,
        resolved: Arc<OnceCell<Arc<ModelClass>>>,
    },
}

impl ModelRef {
    pub fn lazy<F>(thunk: F) -> Self
    where
        F: Fn() -> Arc<ModelClass> + Send + Sync + 'static,
    {
        ModelRef::Lazy {
            thunk: Arc::new(thunk),
            resolved: Arc::new(OnceCell::new()),
        }
    }

    pub fn resolve(&self) -> Arc<ModelClass> {
        match self {
            ModelRef::Default => ModelClass::generic(),
            ModelRef::Class(class) => class.clone(),
            ModelRef::Lazy { thunk, resolved } => resolved.get_or_init(|| thunk()).clone(),
        }
    }
}

impl fmt::Debug for ModelRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelRef::Default => write!(f, "ModelRef::Default"),
            ModelRef::Class(class) => write!(f, "ModelRef::Class({})", class.name()),
            ModelRef::Lazy { resolved, .. } => match resolved.get() {
                Some(class) => write!(f, "ModelRef::Lazy({})", class.name()),
                None => write!(f, "ModelRef::Lazy(<unresolved>)"),
            },
        }
    }
}

/// Relationship declared on a model class
///
/// Plain data: the related class, the relationship type, the direction and
/// whether at most one related node is expected.
#[derive(Debug, Clone, Default)]
pub struct RelationshipDef {
    model: ModelRef,
    rel_type: Option<String>,
    direction: Direction,
    singular: bool,
}

impl RelationshipDef {
    pub fn new() -> Self {
        Self::default()
    }

    /// Relationship of the given type with all other settings defaulted
    pub fn of_type<T: Into<String>>(rel_type: T) -> Self {
        Self::new().rel_type(rel_type)
    }

    pub fn model(mut self, class: &Arc<ModelClass>) -> Self {
        self.model = ModelRef::Class(class.clone());
        self
    }

    /// Related class resolved on first use
    pub fn lazy_model<F>(mut self, thunk: F) -> Self
    where
        F: Fn() -> Arc<ModelClass> + Send + Sync + 'static,
    {
        self.model = ModelRef::lazy(thunk);
        self
    }

    pub fn rel_type<T: Into<String>>(mut self, rel_type: T) -> Self {
        self.rel_type = Some(rel_type.into());
        self
    }

    pub fn direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }

    pub fn singular(mut self, singular: bool) -> Self {
        self.singular = singular;
        self
    }

    /// Related class, resolving a lazy reference if needed
    pub fn related_class(&self) -> Arc<ModelClass> {
        self.model.resolve()
    }

    pub fn type_name(&self) -> &str {
        self.rel_type.as_deref().unwrap_or(DEFAULT_TYPE)
    }

    pub fn get_direction(&self) -> Direction {
        self.direction
    }

    pub fn is_singular(&self) -> bool {
        self.singular
    }

    /// Key under which edge wrappers for this definition are cached
    ///
    /// Definitions of one type share the wrapper whatever their direction,
    /// so an edge resolved from either end is the same wrapper.
    pub(crate) fn wrapper_key(&self) -> String {
        self.type_name().to_string()
    }
}
