// Copyright (c) 2026 Banner Rotation Contributors
// SPDX-License-Identifier: AGPL-3.0

//! Event Recorder
//!
//! Turns one pick or click into a ledger row plus a notification. The row is
//! committed first; the notification is then handed to the bus and delivered
//! by the dispatcher, so publish outcomes never reach the caller and a caller
//! that goes away does not cancel delivery.

use std::sync::Arc;
use tracing::{debug, info};

use super::RotationError;
use crate::domain::bandit;
use crate::domain::banner::{BannerId, Click, Impression, SlotId, UserGroupId};
use crate::domain::events::Notification;
use crate::domain::repository::RotationRepository;
use crate::infrastructure::event_bus::NotificationBus;
use crate::infrastructure::metrics::{CLICKS_TOTAL, IMPRESSIONS_TOTAL};

/// Outcome of a pick: the chosen banner and the impression recorded for it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PickedBanner {
    pub banner_id: BannerId,
    pub impression: Impression,
}

#[derive(Clone)]
pub struct EventRecorder {
    repository: Arc<dyn RotationRepository>,
    bus: NotificationBus,
}

impl EventRecorder {
    pub fn new(repository: Arc<dyn RotationRepository>, bus: NotificationBus) -> Self {
        Self { repository, bus }
    }

    pub async fn pick_banner(
        &self,
        slot_id: SlotId,
        usergroup_id: UserGroupId,
    ) -> Result<PickedBanner, RotationError> {
        // Statistics read and impression write are separate statements; see
        // `domain::repository` for the resulting race under concurrent picks.
        let candidates = self
            .repository
            .statistics_for_slot(slot_id, usergroup_id)
            .await?;

        let banner_id =
            bandit::pick(&candidates).ok_or(RotationError::NoBannersForSlot(slot_id))?;
        debug!(%slot_id, %usergroup_id, candidates = candidates.len(), %banner_id, "Banner selected");

        let impression = self
            .repository
            .record_impression(banner_id, slot_id, usergroup_id)
            .await?;
        metrics::counter!(IMPRESSIONS_TOTAL).increment(1);

        self.bus.publish(Notification::from(&impression));
        info!(%slot_id, %usergroup_id, %banner_id, impression_id = impression.id, "Banner picked");

        Ok(PickedBanner {
            banner_id,
            impression,
        })
    }

    pub async fn click_banner(
        &self,
        banner_id: BannerId,
        slot_id: SlotId,
        usergroup_id: UserGroupId,
    ) -> Result<Click, RotationError> {
        let click = self
            .repository
            .record_click(banner_id, slot_id, usergroup_id)
            .await?;
        metrics::counter!(CLICKS_TOTAL).increment(1);

        self.bus.publish(Notification::from(&click));
        info!(%slot_id, %usergroup_id, %banner_id, click_id = click.id, "Banner clicked");

        Ok(click)
    }
}
