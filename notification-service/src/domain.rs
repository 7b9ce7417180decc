// This file is part of auction-platform.
// Copyright (C) 2025 Auction Platform Contributors
// SPDX-License-Identifier: Apache-2.0
// Licensed under the Apache License, Version 2.0 (the "License");
// You may not use this file except in compliance with the License.
// You may obtain a copy of the License at
// http://www.apache.org/licenses/LICENSE-2.0
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

pub mod storage;

use auction_common::domain::{LotId, NotificationId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{
    fmt::{self, Display},
    str::FromStr,
};
use thiserror::Error;

/// A notification delivered to a user. `(user_id, lot_id, type)` is unique;
/// it is the deduplication key against re-delivered events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub id: NotificationId,
    pub user_id: UserId,
    pub lot_id: LotId,

    #[serde(rename = "type")]
    pub notification_type: NotificationType,

    pub title: String,
    pub message: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

/// A notification to be persisted; id and creation time are assigned by
/// storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewNotification {
    pub user_id: UserId,
    pub lot_id: LotId,
    pub notification_type: NotificationType,
    pub title: String,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    BidOutbid,
    AuctionWon,
    AuctionLost,
    AuctionEnded,
}

impl Display for NotificationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            NotificationType::BidOutbid => "bid_outbid",
            NotificationType::AuctionWon => "auction_won",
            NotificationType::AuctionLost => "auction_lost",
            NotificationType::AuctionEnded => "auction_ended",
        };

        f.write_str(s)
    }
}

impl FromStr for NotificationType {
    type Err = UnknownNotificationTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "bid_outbid" => Ok(NotificationType::BidOutbid),
            "auction_won" => Ok(NotificationType::AuctionWon),
            "auction_lost" => Ok(NotificationType::AuctionLost),
            "auction_ended" => Ok(NotificationType::AuctionEnded),
            other => Err(UnknownNotificationTypeError(other.to_string())),
        }
    }
}

#[derive(Debug, Error)]
#[error("unknown notification type {0}")]
pub struct UnknownNotificationTypeError(String);

/// Filters and pagination for listing notifications.
#[derive(Debug, Clone)]
pub struct NotificationFilter {
    pub is_read: Option<bool>,
    pub limit: i64,
    pub offset: i64,
    pub newest_first: bool,
}

impl Default for NotificationFilter {
    fn default() -> Self {
        Self {
            is_read: None,
            limit: 20,
            offset: 0,
            newest_first: true,
        }
    }
}
