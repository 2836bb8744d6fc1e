// Copyright (c) 2026 Banner Rotation Contributors
// SPDX-License-Identifier: AGPL-3.0
//! Banner Rotation Core
//!
//! Picks the banner to show for a slot and audience segment, records the
//! resulting impression/click ledger rows, and announces each recorded event
//! on a message broker.
//!
//! # Architecture
//!
//! - **Layer:** Core System
//! - **Purpose:** Domain model, use cases, persistence/broker adapters and the gRPC surface

pub mod domain;
pub mod application;
pub mod infrastructure;
pub mod presentation;

pub use domain::*;
