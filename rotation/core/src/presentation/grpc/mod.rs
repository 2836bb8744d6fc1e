// Copyright (c) 2026 Banner Rotation Contributors
// SPDX-License-Identifier: AGPL-3.0

pub mod server;

/// Generated protobuf types, server trait and client for `rotation.v1`
pub mod rotation_v1 {
    tonic::include_proto!("rotation.v1");
}

pub use server::{start_grpc_server, BannerRotationService};
