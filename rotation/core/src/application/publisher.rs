// Copyright (c) 2026 Banner Rotation Contributors
// SPDX-License-Identifier: AGPL-3.0

use async_trait::async_trait;

use crate::domain::events::Notification;
use crate::infrastructure::messaging::PublishError;

/// Outbound delivery of ledger notifications.
///
/// Implementations attempt delivery at least once per call; a returned error
/// means the attempt failed and the caller decides whether to log or retry.
#[async_trait]
pub trait NotificationPublisher: Send + Sync {
    async fn publish(&self, notification: &Notification) -> Result<(), PublishError>;

    /// Stop background work and release the connection
    async fn close(&self);
}
