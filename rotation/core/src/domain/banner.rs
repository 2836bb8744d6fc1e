// Copyright (c) 2026 Banner Rotation Contributors
// SPDX-License-Identifier: AGPL-3.0

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(value: i64) -> Self {
                Self(value)
            }
        }
    };
}

entity_id!(
    /// Advertising unit; registered outside this service
    BannerId
);
entity_id!(
    /// Display placement that hosts zero or more banners
    SlotId
);
entity_id!(
    /// Audience segment used to scope statistics
    UserGroupId
);

/// Assignment of a banner to a slot. Unique per (slot, banner).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rotation {
    pub slot_id: SlotId,
    pub banner_id: BannerId,
    pub created_at: DateTime<Utc>,
}

/// A recorded showing of a banner. Append-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Impression {
    pub id: i64,
    pub slot_id: SlotId,
    pub banner_id: BannerId,
    pub usergroup_id: UserGroupId,
    pub created_at: DateTime<Utc>,
}

/// A recorded click on a banner. Append-only; no prior impression is required.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Click {
    pub id: i64,
    pub slot_id: SlotId,
    pub banner_id: BannerId,
    pub usergroup_id: UserGroupId,
    pub created_at: DateTime<Utc>,
}

/// Impression/click counts for one banner, scoped to a (slot, usergroup) pair.
///
/// Derived from the ledger on demand, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BannerStatistic {
    pub banner_id: BannerId,
    pub impressions: u64,
    pub clicks: u64,
}

impl BannerStatistic {
    pub fn new(banner_id: BannerId, impressions: u64, clicks: u64) -> Self {
        Self {
            banner_id,
            impressions,
            clicks,
        }
    }
}
