// Copyright (c) 2026 Banner Rotation Contributors
// SPDX-License-Identifier: AGPL-3.0
//! # Presentation Layer (`banner-rotation-core`)
//!
//! gRPC surface that translates remote calls into application service calls.
//! No business logic lives here; all real work is delegated to
//! `crate::application::AssignmentGateway`.

pub mod grpc;
