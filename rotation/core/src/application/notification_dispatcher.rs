// Copyright (c) 2026 Banner Rotation Contributors
// SPDX-License-Identifier: AGPL-3.0

//! Notification Dispatcher Application Service
//!
//! Drains the notification bus and hands each notification to the publisher
//! in enqueue order. Runs as a background task and never fails: publish
//! errors are logged and counted, and the next notification is processed.
//!
//! On shutdown the dispatcher delivers whatever is already queued, then stops.

use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::publisher::NotificationPublisher;
use crate::domain::events::Notification;
use crate::infrastructure::event_bus::{EventBusError, NotificationReceiver};
use crate::infrastructure::metrics::{NOTIFICATIONS_FAILED_TOTAL, NOTIFICATIONS_PUBLISHED_TOTAL};

/// Totals reported when the dispatcher stops
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchStats {
    pub published: u64,
    pub failed: u64,
}

pub struct NotificationDispatcher {
    publisher: Arc<dyn NotificationPublisher>,
    receiver: NotificationReceiver,
    stats: DispatchStats,
}

impl NotificationDispatcher {
    pub fn new(publisher: Arc<dyn NotificationPublisher>, receiver: NotificationReceiver) -> Self {
        Self {
            publisher,
            receiver,
            stats: DispatchStats::default(),
        }
    }

    /// Start the background delivery task
    ///
    /// The task runs until the bus closes or `shutdown` is cancelled.
    pub fn start(mut self, shutdown: CancellationToken) -> JoinHandle<DispatchStats> {
        info!("Starting notification dispatcher background task");

        tokio::spawn(async move {
            loop {
                let next = tokio::select! {
                    received = self.receiver.recv() => received,
                    _ = shutdown.cancelled() => {
                        debug!("Shutdown requested, draining queued notifications");
                        break;
                    }
                };

                match next {
                    Ok(notification) => self.dispatch(&notification).await,
                    Err(EventBusError::Closed) => {
                        info!("Notification bus closed");
                        break;
                    }
                    Err(EventBusError::Empty) => continue,
                }
            }

            while let Ok(notification) = self.receiver.try_recv() {
                self.dispatch(&notification).await;
            }

            info!(
                "Notification dispatcher shut down gracefully \
                 ({} published, {} failed)",
                self.stats.published, self.stats.failed
            );
            self.stats
        })
    }

    async fn dispatch(&mut self, notification: &Notification) {
        match self.publisher.publish(notification).await {
            Ok(()) => {
                self.stats.published += 1;
                metrics::counter!(NOTIFICATIONS_PUBLISHED_TOTAL).increment(1);
            }
            Err(e) => {
                self.stats.failed += 1;
                metrics::counter!(NOTIFICATIONS_FAILED_TOTAL).increment(1);
                error!(
                    type_event = %notification.type_event,
                    slot_id = %notification.slot_id,
                    banner_id = %notification.banner_id,
                    usergroup_id = %notification.usergroup_id,
                    error = %e,
                    "Failed to publish notification"
                );

                // Log warning every 10 failures to surface a persistent outage
                if self.stats.failed % 10 == 0 {
                    warn!("Notification publishing has failed {} times", self.stats.failed);
                }
            }
        }
    }
}
