// Copyright (c) 2026 Banner Rotation Contributors
// SPDX-License-Identifier: AGPL-3.0

//! Command implementations for the rotation CLI

pub mod banner;
pub mod config;

pub use self::banner::BannerCommand;
pub use self::config::ConfigCommand;
