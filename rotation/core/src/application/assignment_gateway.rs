// Copyright (c) 2026 Banner Rotation Contributors
// SPDX-License-Identifier: AGPL-3.0

//! Assignment Gateway
//!
//! Entry point for the four remote operations. Registry checks run before
//! any mutation, in a fixed order (banner, slot, usergroup), so a rejected
//! request leaves the ledger untouched and is safe to retry verbatim.

use std::sync::Arc;
use tracing::{debug, info};

use super::event_recorder::{EventRecorder, PickedBanner};
use super::RotationError;
use crate::domain::banner::{BannerId, Click, SlotId, UserGroupId};
use crate::domain::repository::{Registry, RepositoryError, RotationRepository};

#[derive(Clone)]
pub struct AssignmentGateway {
    registry: Arc<dyn Registry>,
    repository: Arc<dyn RotationRepository>,
    recorder: EventRecorder,
}

impl AssignmentGateway {
    pub fn new(
        registry: Arc<dyn Registry>,
        repository: Arc<dyn RotationRepository>,
        recorder: EventRecorder,
    ) -> Self {
        Self {
            registry,
            repository,
            recorder,
        }
    }

    pub async fn add_banner(&self, banner_id: BannerId, slot_id: SlotId) -> Result<(), RotationError> {
        self.require_banner(banner_id).await?;
        self.require_slot(slot_id).await?;

        if self.repository.assignment_exists(banner_id, slot_id).await? {
            return Err(RotationError::AlreadyAssigned { banner_id, slot_id });
        }

        // A concurrent add can still win between the check and the insert
        match self.repository.add_assignment(banner_id, slot_id).await {
            Ok(()) => {}
            Err(RepositoryError::Duplicate(_)) => {
                return Err(RotationError::AlreadyAssigned { banner_id, slot_id })
            }
            Err(e) => return Err(e.into()),
        }

        info!(%banner_id, %slot_id, "Banner added to rotation");
        Ok(())
    }

    /// Removing an assignment that does not exist succeeds
    pub async fn remove_banner(&self, banner_id: BannerId, slot_id: SlotId) -> Result<(), RotationError> {
        self.repository.remove_assignment(banner_id, slot_id).await?;
        info!(%banner_id, %slot_id, "Banner removed from rotation");
        Ok(())
    }

    pub async fn click_banner(
        &self,
        banner_id: BannerId,
        slot_id: SlotId,
        usergroup_id: UserGroupId,
    ) -> Result<Click, RotationError> {
        self.require_banner(banner_id).await?;
        self.require_slot(slot_id).await?;
        self.require_usergroup(usergroup_id).await?;

        self.recorder.click_banner(banner_id, slot_id, usergroup_id).await
    }

    pub async fn pick_banner(
        &self,
        slot_id: SlotId,
        usergroup_id: UserGroupId,
    ) -> Result<PickedBanner, RotationError> {
        self.require_usergroup(usergroup_id).await?;

        self.recorder.pick_banner(slot_id, usergroup_id).await
    }

    async fn require_banner(&self, banner_id: BannerId) -> Result<(), RotationError> {
        if !self.registry.banner_exists(banner_id).await? {
            debug!(%banner_id, "Unknown banner");
            return Err(RotationError::BannerNotFound(banner_id));
        }
        Ok(())
    }

    async fn require_slot(&self, slot_id: SlotId) -> Result<(), RotationError> {
        if !self.registry.slot_exists(slot_id).await? {
            debug!(%slot_id, "Unknown slot");
            return Err(RotationError::SlotNotFound(slot_id));
        }
        Ok(())
    }

    async fn require_usergroup(&self, usergroup_id: UserGroupId) -> Result<(), RotationError> {
        if !self.registry.usergroup_exists(usergroup_id).await? {
            debug!(%usergroup_id, "Unknown usergroup");
            return Err(RotationError::UserGroupNotFound(usergroup_id));
        }
        Ok(())
    }
}
