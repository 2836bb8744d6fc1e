// Copyright (c) 2026 Banner Rotation Contributors
// SPDX-License-Identifier: AGPL-3.0
//! Banner rotation CLI library - exposes testable components

pub mod commands;
pub mod daemon;
