// Copyright (c) 2026 Banner Rotation Contributors
// SPDX-License-Identifier: AGPL-3.0

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::banner::{BannerId, Click, Impression, SlotId, UserGroupId};

/// Kind of ledger event a notification announces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventType {
    Click,
    Impress,
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventType::Click => write!(f, "click"),
            EventType::Impress => write!(f, "impress"),
        }
    }
}

/// Broker message derived 1:1 from a persisted click or impression.
///
/// Wire format is one JSON object with the fixed keys `type_event`, `slot_id`,
/// `banner_id`, `usergroup_id` and `date_time` (RFC 3339). Delivery is
/// at-least-once, so consumers dedupe on all five fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub type_event: EventType,
    pub slot_id: SlotId,
    pub banner_id: BannerId,
    pub usergroup_id: UserGroupId,
    pub date_time: DateTime<Utc>,
}

impl Notification {
    pub fn to_json(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }
}

impl From<&Click> for Notification {
    fn from(click: &Click) -> Self {
        Self {
            type_event: EventType::Click,
            slot_id: click.slot_id,
            banner_id: click.banner_id,
            usergroup_id: click.usergroup_id,
            date_time: click.created_at,
        }
    }
}

impl From<&Impression> for Notification {
    fn from(impression: &Impression) -> Self {
        Self {
            type_event: EventType::Impress,
            slot_id: impression.slot_id,
            banner_id: impression.banner_id,
            usergroup_id: impression.usergroup_id,
            date_time: impression.created_at,
        }
    }
}
