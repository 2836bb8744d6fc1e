// Copyright (c) 2026 Banner Rotation Contributors
// SPDX-License-Identifier: AGPL-3.0
//! # Domain Repository Interfaces
//!
//! Persistence contracts for the rotation ledger, defined in the domain layer
//! and implemented in `crate::infrastructure::repositories`.
//!
//! | Trait | Owns | Implementations |
//! |-------|------|----------------|
//! | `RotationRepository` | `rotations`, `impressions`, `clicks` | `InMemoryRotationRepository`, `PostgresRotationRepository` |
//! | `Registry` | existence checks against `banners`, `slots`, `usergroups` | `InMemoryRotationRepository`, `PostgresRotationRepository` |
//!
//! ## Consistency
//!
//! `statistics_for_slot` followed by `record_impression` is two independent
//! statements. Concurrent picks on the same slot/usergroup can read the same
//! snapshot and choose the same banner; nothing here serializes them.

use async_trait::async_trait;
use crate::domain::banner::{BannerId, BannerStatistic, Click, Impression, SlotId, UserGroupId};

/// Rotation assignments and the append-only event ledger
#[async_trait]
pub trait RotationRepository: Send + Sync {
    /// Assign a banner to a slot. Fails with `Duplicate` if the pair exists.
    async fn add_assignment(&self, banner_id: BannerId, slot_id: SlotId) -> Result<(), RepositoryError>;

    /// Remove an assignment. Removing an absent pair succeeds.
    async fn remove_assignment(&self, banner_id: BannerId, slot_id: SlotId) -> Result<(), RepositoryError>;

    /// Whether the banner is currently assigned to the slot
    async fn assignment_exists(&self, banner_id: BannerId, slot_id: SlotId) -> Result<bool, RepositoryError>;

    /// One row per banner assigned to the slot. Counts cover the usergroup in
    /// every slot the banner has been shown in.
    /// An empty vector means the slot has no banners.
    async fn statistics_for_slot(
        &self,
        slot_id: SlotId,
        usergroup_id: UserGroupId,
    ) -> Result<Vec<BannerStatistic>, RepositoryError>;

    /// Append a click row and return it as stored
    async fn record_click(
        &self,
        banner_id: BannerId,
        slot_id: SlotId,
        usergroup_id: UserGroupId,
    ) -> Result<Click, RepositoryError>;

    /// Append an impression row and return it as stored
    async fn record_impression(
        &self,
        banner_id: BannerId,
        slot_id: SlotId,
        usergroup_id: UserGroupId,
    ) -> Result<Impression, RepositoryError>;
}

/// Existence checks against the externally owned registries
#[async_trait]
pub trait Registry: Send + Sync {
    async fn banner_exists(&self, banner_id: BannerId) -> Result<bool, RepositoryError>;

    async fn slot_exists(&self, slot_id: SlotId) -> Result<bool, RepositoryError>;

    async fn usergroup_exists(&self, usergroup_id: UserGroupId) -> Result<bool, RepositoryError>;
}

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("Entity not found: {0}")]
    NotFound(String),

    #[error("Duplicate entity: {0}")]
    Duplicate(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Unknown error: {0}")]
    Unknown(String),
}
