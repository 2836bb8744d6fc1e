// Copyright (c) 2026 Banner Rotation Contributors
// SPDX-License-Identifier: AGPL-3.0

//! Daemon gRPC server bootstrap

use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use rotation_core::{
    application::{AssignmentGateway, EventRecorder, NotificationDispatcher, NotificationPublisher},
    domain::node_config::NodeConfigManifest,
    infrastructure::{
        db::Database,
        event_bus::NotificationBus,
        messaging::{AmqpConnector, BackoffPolicy, ReconnectingPublisher},
        metrics::init_metrics,
        repositories::PostgresRotationRepository,
    },
    presentation::grpc::start_grpc_server,
};

pub async fn start_daemon(config: NodeConfigManifest) -> Result<()> {
    config
        .validate()
        .context("Configuration validation failed")?;

    info!(
        "Banner rotation daemon starting (PID: {}, config: {})",
        std::process::id(),
        config.metadata.name
    );

    let spec = &config.spec;
    init_metrics(&spec.observability.metrics)?;

    // Storage
    let database = Database::from_config(&spec.database).await?;
    let repository = Arc::new(PostgresRotationRepository::new(database.get_pool().clone()));

    // Broker publisher; connects in the background
    let connector = Arc::new(
        AmqpConnector::from_config(&spec.broker).context("Invalid broker configuration")?,
    );
    let publisher = Arc::new(ReconnectingPublisher::start(
        connector,
        BackoffPolicy::from(&spec.reconnect),
        spec.broker.publish_wait,
    ));

    // Notification handoff
    let (bus, receiver) = NotificationBus::new();
    let shutdown = CancellationToken::new();
    let dispatcher =
        NotificationDispatcher::new(publisher.clone(), receiver).start(shutdown.clone());

    let gateway = Arc::new(AssignmentGateway::new(
        repository.clone(),
        repository.clone(),
        EventRecorder::new(repository, bus),
    ));

    let addr = spec
        .grpc
        .socket_addr()
        .context("Invalid gRPC listen address")?;
    let served = start_grpc_server(addr, gateway, shutdown_signal()).await;

    info!("Daemon shutting down");
    shutdown.cancel();
    match dispatcher.await {
        Ok(stats) => info!(
            published = stats.published,
            failed = stats.failed,
            "Notification dispatcher stopped"
        ),
        Err(e) => error!("Notification dispatcher task failed: {}", e),
    }
    publisher.close().await;

    served.context("gRPC server failed")?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            info!("Received SIGTERM signal");
        },
    }
}
