// Copyright (c) 2026 Banner Rotation Contributors
// SPDX-License-Identifier: AGPL-3.0

pub mod db;
pub mod event_bus;
pub mod messaging;
pub mod metrics;
pub mod repositories;
