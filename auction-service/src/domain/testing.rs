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

//! In-memory doubles of the storage, wallet and event bus seams, shared by
//! the application and API tests.

use crate::domain::{Bid, Lot, LotFilter, LotStatus, LotUpdate, storage::Storage, wallet::WalletClient};
use auction_common::domain::{Amount, BidId, LotId, Publisher, TopicMessage, UserId};
use chrono::{DateTime, TimeZone, Utc};
use serde::Serialize;
use serde_json::Value;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// The pinned "now" used by tests.
pub fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 7, 1, 12, 0, 0).unwrap()
}

#[derive(Debug, Default)]
pub struct StorageState {
    lots: Vec<Lot>,
    bids: Vec<Bid>,
    conflict_on_lot_update: bool,
}

#[derive(Debug, Clone, Default)]
pub struct MockStorage(Arc<Mutex<StorageState>>);

impl MockStorage {
    pub fn with_lot(lot: Lot) -> Self {
        let storage = Self::default();
        storage.push_lot(lot);
        storage
    }

    pub fn push_lot(&self, lot: Lot) {
        self.0.lock().unwrap().lots.push(lot);
    }

    pub fn push_bid(&self, lot_id: LotId, user_id: UserId, amount: Amount) -> BidId {
        let mut state = self.0.lock().unwrap();
        let id = state.bids.len() as BidId + 1;
        state.bids.push(Bid {
            id,
            lot_id,
            user_id,
            amount,
            created_at: now(),
        });
        id
    }

    pub fn set_current_bid(&self, lot_id: LotId, bid_id: BidId, amount: Amount) {
        let mut state = self.0.lock().unwrap();
        let lot = state
            .lots
            .iter_mut()
            .find(|lot| lot.id == lot_id)
            .expect("lot exists");
        lot.current_bid_id = bid_id;
        lot.current_price = amount;
    }

    pub fn conflict_on_lot_update(&self) {
        self.0.lock().unwrap().conflict_on_lot_update = true;
    }

    pub fn lot(&self, id: LotId) -> Lot {
        self.0
            .lock()
            .unwrap()
            .lots
            .iter()
            .find(|lot| lot.id == id)
            .expect("lot exists")
            .clone()
    }

    pub fn bids(&self) -> Vec<Bid> {
        self.0.lock().unwrap().bids.clone()
    }
}

impl Storage for MockStorage {
    async fn save_lot(&self, lot: &Lot) -> Result<Lot, sqlx::Error> {
        let mut state = self.0.lock().unwrap();
        let lot = Lot {
            id: state.lots.len() as LotId + 1,
            ..lot.clone()
        };
        state.lots.push(lot.clone());
        Ok(lot)
    }

    async fn get_lot(&self, id: LotId) -> Result<Option<Lot>, sqlx::Error> {
        let state = self.0.lock().unwrap();
        Ok(state.lots.iter().find(|lot| lot.id == id).cloned())
    }

    async fn update_draft_lot(
        &self,
        id: LotId,
        update: &LotUpdate,
        current_price: Option<Amount>,
    ) -> Result<Option<Lot>, sqlx::Error> {
        let mut state = self.0.lock().unwrap();
        let Some(lot) = state
            .lots
            .iter_mut()
            .find(|lot| lot.id == id && lot.status == LotStatus::Draft)
        else {
            return Ok(None);
        };

        if let Some(title) = &update.title {
            lot.title = title.clone();
        }
        if let Some(description) = &update.description {
            lot.description = description.clone();
        }
        if let Some(start_price) = update.start_price {
            lot.start_price = start_price;
        }
        if let Some(min_step) = update.min_step {
            lot.min_step = min_step;
        }
        if let Some(end_date) = update.end_date {
            lot.end_date = end_date;
        }
        if let Some(current_price) = current_price {
            lot.current_price = current_price;
        }

        Ok(Some(lot.clone()))
    }

    async fn publish_lot(
        &self,
        id: LotId,
        current_price: Amount,
    ) -> Result<bool, sqlx::Error> {
        let mut state = self.0.lock().unwrap();
        let Some(lot) = state
            .lots
            .iter_mut()
            .find(|lot| lot.id == id && lot.status == LotStatus::Draft)
        else {
            return Ok(false);
        };

        lot.status = LotStatus::Active;
        lot.current_price = current_price;
        Ok(true)
    }

    async fn get_lots(
        &self,
        filter: &LotFilter,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Lot>, sqlx::Error> {
        let state = self.0.lock().unwrap();
        let lots = state
            .lots
            .iter()
            .filter(|lot| filter.status.is_none_or(|status| lot.status == status))
            .filter(|lot| filter.min_price.is_none_or(|min| lot.current_price >= min))
            .filter(|lot| filter.max_price.is_none_or(|max| lot.current_price <= max))
            .filter(|lot| filter.min_end_date.is_none_or(|min| lot.end_date >= min))
            .filter(|lot| filter.max_end_date.is_none_or(|max| lot.end_date <= max))
            .skip(offset as usize)
            .take(limit as usize)
            .cloned()
            .collect();
        Ok(lots)
    }

    async fn get_lots_by_seller(&self, seller_id: UserId) -> Result<Vec<Lot>, sqlx::Error> {
        let state = self.0.lock().unwrap();
        Ok(state
            .lots
            .iter()
            .filter(|lot| lot.seller_id == seller_id)
            .cloned()
            .collect())
    }

    async fn get_expired_active_lots(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<Lot>, sqlx::Error> {
        let state = self.0.lock().unwrap();
        Ok(state
            .lots
            .iter()
            .filter(|lot| lot.status == LotStatus::Active && lot.end_date < now)
            .cloned()
            .collect())
    }

    async fn update_lot_for_bid(
        &self,
        lot_id: LotId,
        amount: Amount,
        bid_id: BidId,
        previous_bid_id: BidId,
    ) -> Result<bool, sqlx::Error> {
        let mut state = self.0.lock().unwrap();
        if state.conflict_on_lot_update {
            return Ok(false);
        }

        let Some(lot) = state.lots.iter_mut().find(|lot| {
            lot.id == lot_id
                && lot.status == LotStatus::Active
                && lot.current_bid_id == previous_bid_id
        }) else {
            return Ok(false);
        };

        lot.current_price = amount;
        lot.current_bid_id = bid_id;
        Ok(true)
    }

    async fn complete_lot(
        &self,
        lot_id: LotId,
        winner_id: UserId,
    ) -> Result<bool, sqlx::Error> {
        let mut state = self.0.lock().unwrap();
        let Some(lot) = state
            .lots
            .iter_mut()
            .find(|lot| lot.id == lot_id && lot.status == LotStatus::Active)
        else {
            return Ok(false);
        };

        lot.status = LotStatus::Completed;
        lot.winner_id = winner_id;
        Ok(true)
    }

    async fn save_bid(
        &self,
        lot_id: LotId,
        user_id: UserId,
        amount: Amount,
        created_at: DateTime<Utc>,
    ) -> Result<Bid, sqlx::Error> {
        let mut state = self.0.lock().unwrap();
        let bid = Bid {
            id: state.bids.len() as BidId + 1,
            lot_id,
            user_id,
            amount,
            created_at,
        };
        state.bids.push(bid.clone());
        Ok(bid)
    }

    async fn get_bid(&self, id: BidId) -> Result<Option<Bid>, sqlx::Error> {
        let state = self.0.lock().unwrap();
        Ok(state.bids.iter().find(|bid| bid.id == id).cloned())
    }

    async fn delete_bid(&self, id: BidId) -> Result<(), sqlx::Error> {
        let mut state = self.0.lock().unwrap();
        state.bids.retain(|bid| bid.id != id);
        Ok(())
    }

    async fn get_bids_by_lot(&self, lot_id: LotId) -> Result<Vec<Bid>, sqlx::Error> {
        let state = self.0.lock().unwrap();
        Ok(state
            .bids
            .iter()
            .filter(|bid| bid.lot_id == lot_id)
            .rev()
            .cloned()
            .collect())
    }

    async fn get_bids_by_user(&self, user_id: UserId) -> Result<Vec<Bid>, sqlx::Error> {
        let state = self.0.lock().unwrap();
        Ok(state
            .bids
            .iter()
            .filter(|bid| bid.user_id == user_id)
            .rev()
            .cloned()
            .collect())
    }

    async fn get_distinct_bidders(&self, lot_id: LotId) -> Result<Vec<UserId>, sqlx::Error> {
        let state = self.0.lock().unwrap();
        let mut bidders = Vec::new();
        for bid in state.bids.iter().filter(|bid| bid.lot_id == lot_id) {
            if !bidders.contains(&bid.user_id) {
                bidders.push(bid.user_id);
            }
        }
        Ok(bidders)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalletCall {
    Freeze,
    Unfreeze,
    Charge,
}

#[derive(Debug, Default)]
pub struct WalletState {
    calls: Vec<(WalletCall, UserId, Amount)>,
    fail_freeze: bool,
    fail_charge: bool,
}

#[derive(Debug, Clone, Default)]
pub struct MockWallet(Arc<Mutex<WalletState>>);

impl MockWallet {
    pub fn fail_freeze(&self) {
        self.0.lock().unwrap().fail_freeze = true;
    }

    pub fn fail_charge(&self) {
        self.0.lock().unwrap().fail_charge = true;
    }

    pub fn calls(&self) -> Vec<(WalletCall, UserId, Amount)> {
        self.0.lock().unwrap().calls.clone()
    }
}

#[derive(Debug, Error)]
#[error("wallet service returned 409: insufficient available balance")]
pub struct MockWalletError;

impl WalletClient for MockWallet {
    type Error = MockWalletError;

    async fn freeze(
        &self,
        user_id: UserId,
        amount: Amount,
        _description: &str,
    ) -> Result<(), Self::Error> {
        let mut state = self.0.lock().unwrap();
        if state.fail_freeze {
            return Err(MockWalletError);
        }
        state.calls.push((WalletCall::Freeze, user_id, amount));
        Ok(())
    }

    async fn unfreeze(
        &self,
        user_id: UserId,
        amount: Amount,
        _description: &str,
    ) -> Result<(), Self::Error> {
        let mut state = self.0.lock().unwrap();
        state.calls.push((WalletCall::Unfreeze, user_id, amount));
        Ok(())
    }

    async fn charge(
        &self,
        user_id: UserId,
        amount: Amount,
        _description: &str,
    ) -> Result<(), Self::Error> {
        let mut state = self.0.lock().unwrap();
        if state.fail_charge {
            return Err(MockWalletError);
        }
        state.calls.push((WalletCall::Charge, user_id, amount));
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct PublisherState {
    events: Vec<(String, Value)>,
    fail: bool,
}

#[derive(Debug, Clone, Default)]
pub struct MockPublisher(Arc<Mutex<PublisherState>>);

impl MockPublisher {
    pub fn fail(&self) {
        self.0.lock().unwrap().fail = true;
    }

    pub fn events(&self) -> Vec<(String, Value)> {
        self.0.lock().unwrap().events.clone()
    }
}

#[derive(Debug, Error)]
#[error("event bus unavailable")]
pub struct MockPublishError;

impl Publisher for MockPublisher {
    type Error = MockPublishError;

    async fn publish<T>(&self, message: &T) -> Result<(), Self::Error>
    where
        T: TopicMessage + Serialize + Sync,
    {
        let mut state = self.0.lock().unwrap();
        if state.fail {
            return Err(MockPublishError);
        }

        let value = serde_json::to_value(message).expect("message is serializable");
        state.events.push((T::TOPIC.to_string(), value));
        Ok(())
    }
}
