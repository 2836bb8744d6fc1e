// Copyright (c) 2026 Banner Rotation Contributors
// SPDX-License-Identifier: AGPL-3.0
//! # Application Layer
//!
//! Use cases that coordinate the domain (selection engine, ledger contracts)
//! with infrastructure (repositories, notification bus, publisher).
//!
//! | Service | Responsibility |
//! |---------|----------------|
//! | `AssignmentGateway` | Registry validation in front of every remote operation |
//! | `EventRecorder` | Ledger write, then notification handoff |
//! | `NotificationDispatcher` | Background delivery of enqueued notifications |

pub mod assignment_gateway;
pub mod event_recorder;
pub mod notification_dispatcher;
pub mod publisher;

pub use assignment_gateway::AssignmentGateway;
pub use event_recorder::{EventRecorder, PickedBanner};
pub use notification_dispatcher::NotificationDispatcher;
pub use publisher::NotificationPublisher;

use crate::domain::banner::{BannerId, SlotId, UserGroupId};
use crate::domain::repository::RepositoryError;

/// Failures surfaced to callers of the rotation use cases
#[derive(Debug, thiserror::Error)]
pub enum RotationError {
    #[error("specified banner does not exist")]
    BannerNotFound(BannerId),

    #[error("specified slot does not exist")]
    SlotNotFound(SlotId),

    #[error("specified userGroup does not exist")]
    UserGroupNotFound(UserGroupId),

    #[error("banner is already assigned to the slot")]
    AlreadyAssigned { banner_id: BannerId, slot_id: SlotId },

    #[error("no banners for slot {0}")]
    NoBannersForSlot(SlotId),

    #[error("storage failure: {0}")]
    Storage(#[from] RepositoryError),
}
