// Copyright (c) 2026 Banner Rotation Contributors
// SPDX-License-Identifier: AGPL-3.0

// Notification Bus - in-process handoff from the request path to the publisher
//
// Backed by an unbounded tokio mpsc channel: enqueueing never blocks a request
// and never drops a notification. Exactly one receiver (the dispatcher) drains
// it in enqueue order.

use crate::domain::events::Notification;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Sending half, cloned into every component that records ledger events
#[derive(Clone)]
pub struct NotificationBus {
    sender: mpsc::UnboundedSender<Notification>,
}

/// Receiving half owned by the notification dispatcher
pub struct NotificationReceiver {
    receiver: mpsc::UnboundedReceiver<Notification>,
}

impl NotificationBus {
    pub fn new() -> (Self, NotificationReceiver) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, NotificationReceiver { receiver })
    }

    /// Enqueue a notification for delivery
    pub fn publish(&self, notification: Notification) {
        debug!(
            type_event = %notification.type_event,
            slot_id = %notification.slot_id,
            banner_id = %notification.banner_id,
            "Enqueueing notification"
        );

        if let Err(e) = self.sender.send(notification) {
            warn!(
                notification = ?e.0,
                "Notification dispatcher has stopped; notification not delivered"
            );
        }
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

impl NotificationReceiver {
    /// Receive the next notification; `Closed` once every bus handle is dropped
    pub async fn recv(&mut self) -> Result<Notification, EventBusError> {
        self.receiver.recv().await.ok_or(EventBusError::Closed)
    }

    /// Receive without waiting
    pub fn try_recv(&mut self) -> Result<Notification, EventBusError> {
        self.receiver.try_recv().map_err(|e| match e {
            mpsc::error::TryRecvError::Empty => EventBusError::Empty,
            mpsc::error::TryRecvError::Disconnected => EventBusError::Closed,
        })
    }
}

/// Errors that can occur when receiving notifications
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum EventBusError {
    #[error("Notification bus is closed")]
    Closed,

    #[error("No notifications available")]
    Empty,
}
