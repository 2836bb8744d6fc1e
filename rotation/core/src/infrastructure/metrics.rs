// Copyright (c) 2026 Banner Rotation Contributors
// SPDX-License-Identifier: AGPL-3.0

//! Prometheus metrics for the rotation service.
//!
//! Counters are recorded through the `metrics` facade everywhere in the
//! crate; this module installs the Prometheus recorder with its HTTP scrape
//! listener when `observability.metrics.enabled` is set. Without a recorder
//! the counters are no-ops.

use anyhow::Context;
use metrics::describe_counter;
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::{Ipv4Addr, SocketAddr};
use tracing::info;

use crate::domain::node_config::MetricsConfig;

pub const IMPRESSIONS_TOTAL: &str = "rotation_impressions_total";
pub const CLICKS_TOTAL: &str = "rotation_clicks_total";
pub const NOTIFICATIONS_PUBLISHED_TOTAL: &str = "rotation_notifications_published_total";
pub const NOTIFICATIONS_FAILED_TOTAL: &str = "rotation_notifications_failed_total";
pub const BROKER_RECONNECTS_TOTAL: &str = "rotation_broker_reconnects_total";
pub const RECONNECT_CAMPAIGNS_EXHAUSTED_TOTAL: &str = "rotation_reconnect_campaigns_exhausted_total";

/// Install the Prometheus recorder and serve `/metrics` on the configured port.
///
/// Must be called from within a Tokio runtime, at most once per process.
pub fn init_metrics(config: &MetricsConfig) -> anyhow::Result<()> {
    if !config.enabled {
        return Ok(());
    }

    let addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, config.port));
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .context("Failed to install Prometheus exporter")?;

    register_metrics();
    info!("Prometheus metrics exposed on {}", addr);
    Ok(())
}

fn register_metrics() {
    describe_counter!(IMPRESSIONS_TOTAL, "Impressions recorded by banner picks");
    describe_counter!(CLICKS_TOTAL, "Clicks recorded");
    describe_counter!(
        NOTIFICATIONS_PUBLISHED_TOTAL,
        "Notifications accepted by the broker"
    );
    describe_counter!(
        NOTIFICATIONS_FAILED_TOTAL,
        "Notifications whose publish attempt failed"
    );
    describe_counter!(
        BROKER_RECONNECTS_TOTAL,
        "Broker connections re-established after a loss"
    );
    describe_counter!(
        RECONNECT_CAMPAIGNS_EXHAUSTED_TOTAL,
        "Reconnect campaigns that ran out of their elapsed-time budget"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_metrics_install_nothing() {
        let config = MetricsConfig {
            enabled: false,
            port: 0,
        };
        assert!(init_metrics(&config).is_ok());
    }
}
