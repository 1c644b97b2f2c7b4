// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Model classes, relationship definitions and the property bag
//!
//! A [`ModelClass`] is the runtime description of a typed node wrapper: its
//! labels and its declared relationships. Wrappers themselves live in
//! [`crate::node`] and [`crate::relationship`].

pub mod class;
pub mod property_bag;
pub mod relationship_def;

pub use class::{ModelClass, ModelClassBuilder, GENERIC_CLASS};
pub use property_bag::PropertyBag;
pub use relationship_def::{Direction, ModelRef, RelationshipDef, DEFAULT_TYPE};
