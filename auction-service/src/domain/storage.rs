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

use crate::domain::{Bid, Lot, LotFilter, LotUpdate};
use auction_common::domain::{Amount, BidId, LotId, UserId};
use chrono::{DateTime, Utc};

/// Storage abstraction for lots and bids.
#[trait_variant::make(Send)]
pub trait Storage
where
    Self: Clone + Send + Sync + 'static,
{
    /// Save a new lot (its `id` is ignored) and return it with the assigned
    /// id.
    async fn save_lot(&self, lot: &Lot) -> Result<Lot, sqlx::Error>;

    async fn get_lot(&self, id: LotId) -> Result<Option<Lot>, sqlx::Error>;

    /// Apply the given update to a lot, provided it still is a draft.
    /// Returns the updated lot, or `None` when the lot does not exist or is
    /// no longer a draft.
    async fn update_draft_lot(
        &self,
        id: LotId,
        update: &LotUpdate,
        current_price: Option<Amount>,
    ) -> Result<Option<Lot>, sqlx::Error>;

    /// Transition a draft lot to active, seeding `current_price`. Returns
    /// `false` when the lot does not exist or is not a draft.
    async fn publish_lot(&self, id: LotId, current_price: Amount) -> Result<bool, sqlx::Error>;

    /// List lots matching the filter, ordered by id, paginated.
    async fn get_lots(
        &self,
        filter: &LotFilter,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Lot>, sqlx::Error>;

    async fn get_lots_by_seller(&self, seller_id: UserId) -> Result<Vec<Lot>, sqlx::Error>;

    /// All active lots whose end date has passed.
    async fn get_expired_active_lots(&self, now: DateTime<Utc>) -> Result<Vec<Lot>, sqlx::Error>;

    /// Record acceptance of a bid: set the lot's current price and current
    /// bid, conditional on the lot still being active and its current bid
    /// still being `previous_bid_id`. Returns `false` when a concurrent bid
    /// was accepted in between.
    async fn update_lot_for_bid(
        &self,
        lot_id: LotId,
        amount: Amount,
        bid_id: BidId,
        previous_bid_id: BidId,
    ) -> Result<bool, sqlx::Error>;

    /// Transition an active lot to completed, setting the winner. Returns
    /// `false` when the lot is not active (anymore), making completion
    /// idempotent in effect.
    async fn complete_lot(&self, lot_id: LotId, winner_id: UserId) -> Result<bool, sqlx::Error>;

    async fn save_bid(
        &self,
        lot_id: LotId,
        user_id: UserId,
        amount: Amount,
        created_at: DateTime<Utc>,
    ) -> Result<Bid, sqlx::Error>;

    async fn get_bid(&self, id: BidId) -> Result<Option<Bid>, sqlx::Error>;

    /// Remove a bid again; only used as saga compensation.
    async fn delete_bid(&self, id: BidId) -> Result<(), sqlx::Error>;

    /// Bids of a lot, newest first.
    async fn get_bids_by_lot(&self, lot_id: LotId) -> Result<Vec<Bid>, sqlx::Error>;

    /// Bids of a user, newest first.
    async fn get_bids_by_user(&self, user_id: UserId) -> Result<Vec<Bid>, sqlx::Error>;

    /// Distinct users that have bid on the given lot.
    async fn get_distinct_bidders(&self, lot_id: LotId) -> Result<Vec<UserId>, sqlx::Error>;
}
