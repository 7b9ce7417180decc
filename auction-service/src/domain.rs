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
pub mod wallet;

#[cfg(test)]
pub mod testing;

use auction_common::domain::{Amount, BidId, LotId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{
    fmt::{self, Display},
    str::FromStr,
};
use thiserror::Error;

/// An auctionable item with a price/step schedule and a time window.
/// `winner_id` and `current_bid_id` are zero while unset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Lot {
    pub id: LotId,
    pub seller_id: UserId,
    pub title: String,
    pub description: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub start_price: Amount,
    pub current_price: Amount,
    pub min_step: Amount,
    pub status: LotStatus,
    pub winner_id: UserId,
    pub current_bid_id: BidId,
}

impl Lot {
    /// The smallest acceptable amount for the next bid.
    pub fn min_required(&self) -> Amount {
        self.current_price + self.min_step
    }
}

/// Lifecycle of a lot: `draft` -> `active` -> `completed`, one-way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LotStatus {
    Draft,
    Active,
    Completed,
}

impl Display for LotStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LotStatus::Draft => "draft",
            LotStatus::Active => "active",
            LotStatus::Completed => "completed",
        };

        f.write_str(s)
    }
}

impl FromStr for LotStatus {
    type Err = UnknownLotStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(LotStatus::Draft),
            "active" => Ok(LotStatus::Active),
            "completed" => Ok(LotStatus::Completed),
            other => Err(UnknownLotStatusError(other.to_string())),
        }
    }
}

#[derive(Debug, Error)]
#[error("unknown lot status {0}")]
pub struct UnknownLotStatusError(String);

/// An accepted offer on a lot. Bids are immutable; the accepted bids of a
/// lot form a strictly increasing chain by amount.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Bid {
    pub id: BidId,
    pub lot_id: LotId,
    pub user_id: UserId,
    pub amount: Amount,
    pub created_at: DateTime<Utc>,
}

/// Parameters for creating a lot; dates default to "now" and "now + 24h".
#[derive(Debug, Clone)]
pub struct NewLot {
    pub title: String,
    pub description: String,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub start_price: Amount,
    pub min_step: Amount,
}

/// Fields of a draft lot that may be updated; `None` leaves a field as is.
#[derive(Debug, Clone, Default)]
pub struct LotUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub start_price: Option<Amount>,
    pub min_step: Option<Amount>,
    pub end_date: Option<DateTime<Utc>>,
}

/// Filters for listing lots; an absent status defaults to active upstream.
#[derive(Debug, Clone, Default)]
pub struct LotFilter {
    pub status: Option<LotStatus>,
    pub min_price: Option<Amount>,
    pub max_price: Option<Amount>,
    pub min_end_date: Option<DateTime<Utc>>,
    pub max_end_date: Option<DateTime<Utc>>,
}
