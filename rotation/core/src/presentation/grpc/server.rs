// Copyright (c) 2026 Banner Rotation Contributors
// SPDX-License-Identifier: AGPL-3.0

//! gRPC Server Implementation for the banner rotation service
//! Exposes AddBanner, RemoveBanner, ClickBanner, PickBanner

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tonic::{Request, Response, Status};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use super::rotation_v1::banner_rotation_server::{BannerRotation, BannerRotationServer};
use super::rotation_v1::*;
use crate::application::{AssignmentGateway, RotationError};
use crate::domain::banner::{BannerId, SlotId, UserGroupId};

/// Implementation of the BannerRotation gRPC service
pub struct BannerRotationService {
    gateway: Arc<AssignmentGateway>,
}

impl BannerRotationService {
    pub fn new(gateway: Arc<AssignmentGateway>) -> Self {
        Self { gateway }
    }

    /// Create a gRPC server instance
    pub fn into_server(self) -> BannerRotationServer<Self> {
        BannerRotationServer::new(self)
    }
}

/// Map a use-case failure to a status. Validation failures carry fixed
/// messages; everything else is internal and prefixed with the operation.
fn status_for(operation: &str, err: RotationError) -> Status {
    match err {
        RotationError::BannerNotFound(_)
        | RotationError::SlotNotFound(_)
        | RotationError::UserGroupNotFound(_) => Status::not_found(err.to_string()),
        RotationError::AlreadyAssigned { .. } => Status::already_exists(err.to_string()),
        RotationError::NoBannersForSlot(_) | RotationError::Storage(_) => {
            error!("Failed to {}: {}", operation, err);
            Status::internal(format!("failed to {}: {}", operation, err))
        }
    }
}

#[tonic::async_trait]
impl BannerRotation for BannerRotationService {
    async fn add_banner(
        &self,
        request: Request<AddBannerRequest>,
    ) -> Result<Response<AddBannerResponse>, Status> {
        let req = request.into_inner();
        self.gateway
            .add_banner(BannerId(req.banner_id), SlotId(req.slot_id))
            .await
            .map_err(|e| status_for("add banner", e))?;

        Ok(Response::new(AddBannerResponse {
            message: "Banner added successfully".to_string(),
        }))
    }

    async fn remove_banner(
        &self,
        request: Request<RemoveBannerRequest>,
    ) -> Result<Response<RemoveBannerResponse>, Status> {
        let req = request.into_inner();
        self.gateway
            .remove_banner(BannerId(req.banner_id), SlotId(req.slot_id))
            .await
            .map_err(|e| status_for("remove banner", e))?;

        Ok(Response::new(RemoveBannerResponse {
            message: "Banner removed successfully".to_string(),
        }))
    }

    async fn click_banner(
        &self,
        request: Request<ClickBannerRequest>,
    ) -> Result<Response<ClickBannerResponse>, Status> {
        let req = request.into_inner();
        self.gateway
            .click_banner(
                BannerId(req.banner_id),
                SlotId(req.slot_id),
                UserGroupId(req.usergroup_id),
            )
            .await
            .map_err(|e| status_for("click banner", e))?;

        Ok(Response::new(ClickBannerResponse {
            message: "Banner clicked successfully".to_string(),
        }))
    }

    async fn pick_banner(
        &self,
        request: Request<PickBannerRequest>,
    ) -> Result<Response<PickBannerResponse>, Status> {
        let req = request.into_inner();
        let picked = self
            .gateway
            .pick_banner(SlotId(req.slot_id), UserGroupId(req.usergroup_id))
            .await
            .map_err(|e| status_for("pick banner", e))?;

        Ok(Response::new(PickBannerResponse {
            banner_id: picked.banner_id.0,
            message: "Banner picked successfully".to_string(),
        }))
    }
}

/// Serve the rotation API until `shutdown` resolves
pub async fn start_grpc_server<F>(
    addr: SocketAddr,
    gateway: Arc<AssignmentGateway>,
    shutdown: F,
) -> Result<(), tonic::transport::Error>
where
    F: Future<Output = ()> + Send,
{
    let server = BannerRotationService::new(gateway).into_server();

    info!("Starting banner rotation gRPC server on {}", addr);

    tonic::transport::Server::builder()
        .layer(TraceLayer::new_for_grpc())
        .add_service(server)
        .serve_with_shutdown(addr, shutdown)
        .await?;

    info!("gRPC server stopped");
    Ok(())
}
