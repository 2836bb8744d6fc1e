// Copyright (c) 2026 Banner Rotation Contributors
// SPDX-License-Identifier: AGPL-3.0

//! PostgreSQL implementation of `RotationRepository` and `Registry`
//!
//! Writes go to `rotations`, `impressions` and `clicks`; the `banners`,
//! `slots` and `usergroups` registries are read-only from here.

use crate::domain::banner::{BannerId, BannerStatistic, Click, Impression, SlotId, UserGroupId};
use crate::domain::repository::{Registry, RepositoryError, RotationRepository};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};
use tracing::{debug, error};

/// SQLSTATE for unique_violation
const UNIQUE_VIOLATION: &str = "23505";

pub struct PostgresRotationRepository {
    pool: PgPool,
}

impl PostgresRotationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn database_error(e: sqlx::Error) -> RepositoryError {
        RepositoryError::Database(e.to_string())
    }

    fn is_unique_violation(e: &sqlx::Error) -> bool {
        e.as_database_error()
            .and_then(|db| db.code())
            .is_some_and(|code| code == UNIQUE_VIOLATION)
    }

    /// Rows of `impressions` and `clicks` share one shape
    fn ledger_fields(
        row: &sqlx::postgres::PgRow,
    ) -> Result<(i64, SlotId, BannerId, UserGroupId, DateTime<Utc>), RepositoryError> {
        let field = |name: &str, e: sqlx::Error| {
            RepositoryError::Database(format!("Missing {}: {}", name, e))
        };
        Ok((
            row.try_get("id").map_err(|e| field("id", e))?,
            SlotId(row.try_get("slot_id").map_err(|e| field("slot_id", e))?),
            BannerId(row.try_get("banner_id").map_err(|e| field("banner_id", e))?),
            UserGroupId(row.try_get("usergroup_id").map_err(|e| field("usergroup_id", e))?),
            row.try_get("created_at").map_err(|e| field("created_at", e))?,
        ))
    }

    async fn exists(&self, query: &'static str, id: i64) -> Result<bool, RepositoryError> {
        let row = sqlx::query(query)
            .bind(id)
            .fetch_one(&self.pool)
            .await
            .map_err(Self::database_error)?;

        row.try_get::<bool, _>(0).map_err(Self::database_error)
    }
}

#[async_trait]
impl RotationRepository for PostgresRotationRepository {
    async fn add_assignment(&self, banner_id: BannerId, slot_id: SlotId) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO rotations (slot_id, banner_id, created_at)
            VALUES ($1, $2, NOW())
            "#,
        )
        .bind(slot_id.0)
        .bind(banner_id.0)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if Self::is_unique_violation(&e) {
                RepositoryError::Duplicate(format!("banner {} in slot {}", banner_id, slot_id))
            } else {
                error!(%banner_id, %slot_id, "Failed to insert rotation: {}", e);
                Self::database_error(e)
            }
        })?;

        debug!(%banner_id, %slot_id, "Rotation added");
        Ok(())
    }

    async fn remove_assignment(&self, banner_id: BannerId, slot_id: SlotId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM rotations WHERE slot_id = $1 AND banner_id = $2")
            .bind(slot_id.0)
            .bind(banner_id.0)
            .execute(&self.pool)
            .await
            .map_err(Self::database_error)?;

        debug!(%banner_id, %slot_id, removed = result.rows_affected(), "Rotation removed");
        Ok(())
    }

    async fn assignment_exists(&self, banner_id: BannerId, slot_id: SlotId) -> Result<bool, RepositoryError> {
        let row = sqlx::query(
            "SELECT EXISTS (SELECT 1 FROM rotations WHERE banner_id = $1 AND slot_id = $2)",
        )
        .bind(banner_id.0)
        .bind(slot_id.0)
        .fetch_one(&self.pool)
        .await
        .map_err(Self::database_error)?;

        row.try_get::<bool, _>(0).map_err(Self::database_error)
    }

    async fn statistics_for_slot(
        &self,
        slot_id: SlotId,
        usergroup_id: UserGroupId,
    ) -> Result<Vec<BannerStatistic>, RepositoryError> {
        let rows = sqlx::query(
            r#"
            SELECT
                r.banner_id,
                (SELECT COUNT(*) FROM impressions i
                  WHERE i.banner_id = r.banner_id AND i.usergroup_id = $1) AS impressions,
                (SELECT COUNT(*) FROM clicks c
                  WHERE c.banner_id = r.banner_id AND c.usergroup_id = $1) AS clicks
            FROM rotations r
            WHERE r.slot_id = $2
            ORDER BY r.created_at, r.banner_id
            "#,
        )
        .bind(usergroup_id.0)
        .bind(slot_id.0)
        .fetch_all(&self.pool)
        .await
        .map_err(Self::database_error)?;

        rows.iter()
            .map(|row| {
                let banner_id: i64 = row.try_get("banner_id").map_err(Self::database_error)?;
                let impressions: i64 = row.try_get("impressions").map_err(Self::database_error)?;
                let clicks: i64 = row.try_get("clicks").map_err(Self::database_error)?;
                Ok(BannerStatistic::new(
                    BannerId(banner_id),
                    impressions.max(0) as u64,
                    clicks.max(0) as u64,
                ))
            })
            .collect()
    }

    async fn record_click(
        &self,
        banner_id: BannerId,
        slot_id: SlotId,
        usergroup_id: UserGroupId,
    ) -> Result<Click, RepositoryError> {
        let row = sqlx::query(
            r#"
            INSERT INTO clicks (slot_id, banner_id, usergroup_id, created_at)
            VALUES ($1, $2, $3, NOW())
            RETURNING id, slot_id, banner_id, usergroup_id, created_at
            "#,
        )
        .bind(slot_id.0)
        .bind(banner_id.0)
        .bind(usergroup_id.0)
        .fetch_one(&self.pool)
        .await
        .map_err(Self::database_error)?;

        let (id, slot_id, banner_id, usergroup_id, created_at) = Self::ledger_fields(&row)?;
        Ok(Click {
            id,
            slot_id,
            banner_id,
            usergroup_id,
            created_at,
        })
    }

    async fn record_impression(
        &self,
        banner_id: BannerId,
        slot_id: SlotId,
        usergroup_id: UserGroupId,
    ) -> Result<Impression, RepositoryError> {
        let row = sqlx::query(
            r#"
            INSERT INTO impressions (slot_id, banner_id, usergroup_id, created_at)
            VALUES ($1, $2, $3, NOW())
            RETURNING id, slot_id, banner_id, usergroup_id, created_at
            "#,
        )
        .bind(slot_id.0)
        .bind(banner_id.0)
        .bind(usergroup_id.0)
        .fetch_one(&self.pool)
        .await
        .map_err(Self::database_error)?;

        let (id, slot_id, banner_id, usergroup_id, created_at) = Self::ledger_fields(&row)?;
        Ok(Impression {
            id,
            slot_id,
            banner_id,
            usergroup_id,
            created_at,
        })
    }
}

#[async_trait]
impl Registry for PostgresRotationRepository {
    async fn banner_exists(&self, banner_id: BannerId) -> Result<bool, RepositoryError> {
        self.exists("SELECT EXISTS (SELECT 1 FROM banners WHERE id = $1)", banner_id.0)
            .await
    }

    async fn slot_exists(&self, slot_id: SlotId) -> Result<bool, RepositoryError> {
        self.exists("SELECT EXISTS (SELECT 1 FROM slots WHERE id = $1)", slot_id.0)
            .await
    }

    async fn usergroup_exists(&self, usergroup_id: UserGroupId) -> Result<bool, RepositoryError> {
        self.exists("SELECT EXISTS (SELECT 1 FROM usergroups WHERE id = $1)", usergroup_id.0)
            .await
    }
}
