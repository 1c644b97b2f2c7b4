// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Stable id generation

use crate::config::IdStrategy;

const ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Random alphanumeric id of `length` characters
pub fn short_id(length: usize) -> String {
    (0..length)
        .map(|_| ALPHABET[fastrand::usize(..ALPHABET.len())] as char)
        .collect()
}

pub fn uuid() -> String {
    uuid::Uuid::new_v4().to_string()
}

pub fn generate(strategy: IdStrategy, length: usize) -> String {
    match strategy {
        IdStrategy::ShortId => short_id(length),
        IdStrategy::Uuid => uuid(),
    }
}
