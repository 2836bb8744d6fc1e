// Copyright (c) 2026 Banner Rotation Contributors
// SPDX-License-Identifier: AGPL-3.0

//! Repository Implementations
//!
//! Infrastructure implementations of the repository abstractions defined in
//! the domain layer.
//!
//! # Available Implementations
//!
//! - **PostgresRotationRepository** - production ledger backed by PostgreSQL
//! - **InMemoryRotationRepository** - thread-safe in-process ledger for tests
//!   and local development, with seedable registries
//!
//! Both implement `RotationRepository` and `Registry` with the same observable
//! semantics: duplicate assignments are `Duplicate`, removing an absent pair
//! succeeds, and statistics list banners in assignment order.

pub mod postgres_rotation;

pub use postgres_rotation::PostgresRotationRepository;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::domain::banner::{
    BannerId, BannerStatistic, Click, Impression, Rotation, SlotId, UserGroupId,
};
use crate::domain::repository::{Registry, RepositoryError, RotationRepository};

#[derive(Default)]
struct Ledger {
    banners: HashSet<BannerId>,
    slots: HashSet<SlotId>,
    usergroups: HashSet<UserGroupId>,
    rotations: Vec<Rotation>,
    impressions: Vec<Impression>,
    clicks: Vec<Click>,
    next_event_id: i64,
}

#[derive(Clone, Default)]
pub struct InMemoryRotationRepository {
    ledger: Arc<RwLock<Ledger>>,
    unavailable: Arc<AtomicBool>,
}

impl InMemoryRotationRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_banner(&self, banner_id: BannerId) {
        self.ledger.write().banners.insert(banner_id);
    }

    pub fn register_slot(&self, slot_id: SlotId) {
        self.ledger.write().slots.insert(slot_id);
    }

    pub fn register_usergroup(&self, usergroup_id: UserGroupId) {
        self.ledger.write().usergroups.insert(usergroup_id);
    }

    /// Make every subsequent call fail as if the database were unreachable
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn rotations(&self) -> Vec<Rotation> {
        self.ledger.read().rotations.clone()
    }

    pub fn impressions(&self) -> Vec<Impression> {
        self.ledger.read().impressions.clone()
    }

    pub fn clicks(&self) -> Vec<Click> {
        self.ledger.read().clicks.clone()
    }

    fn check_available(&self) -> Result<(), RepositoryError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(RepositoryError::Database("connection refused".to_string()));
        }
        Ok(())
    }
}

impl Ledger {
    fn next_id(&mut self) -> i64 {
        self.next_event_id += 1;
        self.next_event_id
    }
}

#[async_trait]
impl RotationRepository for InMemoryRotationRepository {
    async fn add_assignment(&self, banner_id: BannerId, slot_id: SlotId) -> Result<(), RepositoryError> {
        self.check_available()?;
        let mut ledger = self.ledger.write();
        if ledger
            .rotations
            .iter()
            .any(|r| r.banner_id == banner_id && r.slot_id == slot_id)
        {
            return Err(RepositoryError::Duplicate(format!(
                "banner {} in slot {}",
                banner_id, slot_id
            )));
        }
        ledger.rotations.push(Rotation {
            slot_id,
            banner_id,
            created_at: Utc::now(),
        });
        Ok(())
    }

    async fn remove_assignment(&self, banner_id: BannerId, slot_id: SlotId) -> Result<(), RepositoryError> {
        self.check_available()?;
        self.ledger
            .write()
            .rotations
            .retain(|r| !(r.banner_id == banner_id && r.slot_id == slot_id));
        Ok(())
    }

    async fn assignment_exists(&self, banner_id: BannerId, slot_id: SlotId) -> Result<bool, RepositoryError> {
        self.check_available()?;
        Ok(self
            .ledger
            .read()
            .rotations
            .iter()
            .any(|r| r.banner_id == banner_id && r.slot_id == slot_id))
    }

    async fn statistics_for_slot(
        &self,
        slot_id: SlotId,
        usergroup_id: UserGroupId,
    ) -> Result<Vec<BannerStatistic>, RepositoryError> {
        self.check_available()?;
        let ledger = self.ledger.read();
        let stats = ledger
            .rotations
            .iter()
            .filter(|r| r.slot_id == slot_id)
            .map(|r| {
                // Counts span every slot the banner was shown in
                let matches = |b: BannerId, u: UserGroupId| b == r.banner_id && u == usergroup_id;
                let impressions = ledger
                    .impressions
                    .iter()
                    .filter(|i| matches(i.banner_id, i.usergroup_id))
                    .count() as u64;
                let clicks = ledger
                    .clicks
                    .iter()
                    .filter(|c| matches(c.banner_id, c.usergroup_id))
                    .count() as u64;
                BannerStatistic::new(r.banner_id, impressions, clicks)
            })
            .collect();
        Ok(stats)
    }

    async fn record_click(
        &self,
        banner_id: BannerId,
        slot_id: SlotId,
        usergroup_id: UserGroupId,
    ) -> Result<Click, RepositoryError> {
        self.check_available()?;
        let mut ledger = self.ledger.write();
        let click = Click {
            id: ledger.next_id(),
            slot_id,
            banner_id,
            usergroup_id,
            created_at: Utc::now(),
        };
        ledger.clicks.push(click.clone());
        Ok(click)
    }

    async fn record_impression(
        &self,
        banner_id: BannerId,
        slot_id: SlotId,
        usergroup_id: UserGroupId,
    ) -> Result<Impression, RepositoryError> {
        self.check_available()?;
        let mut ledger = self.ledger.write();
        let impression = Impression {
            id: ledger.next_id(),
            slot_id,
            banner_id,
            usergroup_id,
            created_at: Utc::now(),
        };
        ledger.impressions.push(impression.clone());
        Ok(impression)
    }
}

#[async_trait]
impl Registry for InMemoryRotationRepository {
    async fn banner_exists(&self, banner_id: BannerId) -> Result<bool, RepositoryError> {
        self.check_available()?;
        Ok(self.ledger.read().banners.contains(&banner_id))
    }

    async fn slot_exists(&self, slot_id: SlotId) -> Result<bool, RepositoryError> {
        self.check_available()?;
        Ok(self.ledger.read().slots.contains(&slot_id))
    }

    async fn usergroup_exists(&self, usergroup_id: UserGroupId) -> Result<bool, RepositoryError> {
        self.check_available()?;
        Ok(self.ledger.read().usergroups.contains(&usergroup_id))
    }
}
