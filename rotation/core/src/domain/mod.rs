// Copyright (c) 2026 Banner Rotation Contributors
// SPDX-License-Identifier: AGPL-3.0
//! Domain
//!
//! Identifiers, ledger rows, the banner selection engine and the persistence
//! contracts the rest of the crate is written against.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Pure types and rules; no I/O

pub mod banner;
pub mod bandit;
pub mod events;
pub mod repository;
pub mod node_config;
