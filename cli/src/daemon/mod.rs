// Copyright (c) 2026 Banner Rotation Contributors
// SPDX-License-Identifier: AGPL-3.0

//! Daemon mode implementation
//!
//! Handles:
//! - Wiring Postgres, the broker publisher and the gRPC service
//! - Graceful shutdown on Ctrl+C / SIGTERM

pub mod server;

pub use server::start_daemon;
