// Copyright (c) 2026 Banner Rotation Contributors
// SPDX-License-Identifier: AGPL-3.0
//! Build Script for banner-rotation-core
//!
//! Compiles the `rotation.v1` Protocol Buffer definition into tonic server
//! and client stubs. Generated code lands in `OUT_DIR` and is included via
//! `tonic::include_proto!` in `src/presentation/grpc/mod.rs`.
//!
//! # Dependencies
//!
//! - **protoc**: Protocol buffer compiler (vendored via `protoc-bin-vendored`)
//! - **tonic-prost-build**: Code generator for Rust gRPC stubs

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Point prost at the vendored protoc so builds do not depend on a system install
    std::env::set_var("PROTOC", protoc_bin_vendored::protoc_bin_path().unwrap());

    tonic_prost_build::configure()
        .build_server(true)
        .build_client(true)
        .compile_protos(&["../../proto/banner_rotation.proto"], &["../../proto"])?;

    println!("cargo:rerun-if-changed=../../proto/banner_rotation.proto");

    Ok(())
}
