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

use crate::domain::{Amount, LotId, UserId};
use serde::{Deserialize, Serialize};

/// A message published to the event bus: a topic plus a partition key.
/// Messages with the same key are delivered in publish order.
pub trait TopicMessage {
    const TOPIC: &'static str;

    fn key(&self) -> String;
}

/// All topics used by the platform; the event bus client provisions these.
pub const TOPICS: [&str; 2] = [BidPlaced::TOPIC, LotCompleted::TOPIC];

/// Published by the auction service after a bid has been accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BidPlaced {
    pub lot_id: LotId,
    pub previous_leader_id: UserId,
    pub new_bid_amount: Amount,
}

impl TopicMessage for BidPlaced {
    const TOPIC: &'static str = "bid_placed";

    fn key(&self) -> String {
        self.lot_id.to_string()
    }
}

/// Published by the auction service after a lot has been completed. `winner`
/// is zero when the lot expired without bids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LotCompleted {
    pub lot_id: LotId,
    pub winner: UserId,
    pub final_price: Amount,
    pub loser_ids: Vec<UserId>,
}

impl TopicMessage for LotCompleted {
    const TOPIC: &'static str = "lot_completed";

    fn key(&self) -> String {
        self.lot_id.to_string()
    }
}
