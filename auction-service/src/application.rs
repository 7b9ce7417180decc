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

mod metrics;

use crate::{
    application::metrics::Metrics,
    domain::{
        Bid, Lot, LotFilter, LotStatus, LotUpdate, NewLot, storage::Storage,
        wallet::WalletClient,
    },
};
use auction_common::domain::{
    Amount, BidId, BidPlaced, Clock, LotCompleted, LotId, Publisher, UserId,
};
use chrono::TimeDelta;
use fastrace::trace;
use log::{debug, error, info, warn};
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use tokio::{select, signal::unix::Signal, time::interval};

/// The auction application: lot lifecycle, the bid-placement saga and lot
/// completion. Wallet state lives in a separate service, so bid placement is
/// a saga with per-step compensations rather than a transaction.
#[derive(Clone)]
pub struct Application<S, W, P, C> {
    storage: S,
    wallet: W,
    publisher: P,
    clock: C,
    metrics: Metrics,
}

impl<S, W, P, C> Application<S, W, P, C>
where
    S: Storage,
    W: WalletClient,
    P: Publisher,
    C: Clock,
{
    pub fn new(storage: S, wallet: W, publisher: P, clock: C) -> Self {
        Self {
            storage,
            wallet,
            publisher,
            clock,
            metrics: Metrics::new(),
        }
    }

    /// Create a lot in draft status. Dates default to "now" and
    /// "start + 24h"; the current price is seeded from the start price.
    pub async fn create_lot(&self, seller_id: UserId, new_lot: NewLot) -> Result<Lot, LotError> {
        let now = self.clock.now();

        let NewLot {
            title,
            description,
            start_date,
            end_date,
            start_price,
            min_step,
        } = new_lot;

        if title.trim().is_empty() {
            return Err(LotError::Validation("title must not be empty".to_string()));
        }
        if start_price < 0 {
            return Err(LotError::Validation(
                "start_price must not be negative".to_string(),
            ));
        }
        if min_step < 1 {
            return Err(LotError::Validation(
                "min_step must be at least 1".to_string(),
            ));
        }

        let start_date = start_date.unwrap_or(now);
        let end_date = end_date.unwrap_or(start_date + TimeDelta::hours(24));

        if start_date < now {
            return Err(LotError::Validation(
                "start_date must not be in the past".to_string(),
            ));
        }
        if end_date <= start_date {
            return Err(LotError::Validation(
                "end_date must be after start_date".to_string(),
            ));
        }

        let lot = Lot {
            id: 0,
            seller_id,
            title,
            description,
            start_date,
            end_date,
            start_price,
            current_price: start_price,
            min_step,
            status: LotStatus::Draft,
            winner_id: 0,
            current_bid_id: 0,
        };

        let lot = self.storage.save_lot(&lot).await?;
        info!(lot_id = lot.id, seller_id; "lot created");

        Ok(lot)
    }

    pub async fn get_lot(&self, lot_id: LotId) -> Result<Lot, LotError> {
        self.storage
            .get_lot(lot_id)
            .await?
            .ok_or(LotError::NotFound)
    }

    /// Update a draft lot. Only the owning seller or an admin may update;
    /// non-draft lots are immutable through this operation.
    pub async fn update_lot(
        &self,
        actor_id: UserId,
        admin: bool,
        lot_id: LotId,
        update: LotUpdate,
    ) -> Result<Lot, LotError> {
        let lot = self.get_lot(lot_id).await?;

        if !admin && lot.seller_id != actor_id {
            return Err(LotError::NotOwner);
        }
        if lot.status != LotStatus::Draft {
            return Err(LotError::NotDraft);
        }

        let start_price = update.start_price.unwrap_or(lot.start_price);
        let min_step = update.min_step.unwrap_or(lot.min_step);
        let end_date = update.end_date.unwrap_or(lot.end_date);

        if let Some(title) = &update.title {
            if title.trim().is_empty() {
                return Err(LotError::Validation("title must not be empty".to_string()));
            }
        }
        if start_price < 0 {
            return Err(LotError::Validation(
                "start_price must not be negative".to_string(),
            ));
        }
        if min_step < 1 {
            return Err(LotError::Validation(
                "min_step must be at least 1".to_string(),
            ));
        }
        if end_date <= lot.start_date {
            return Err(LotError::Validation(
                "end_date must be after start_date".to_string(),
            ));
        }

        // While in draft the current price tracks the start price.
        let current_price = update.start_price;

        self.storage
            .update_draft_lot(lot_id, &update, current_price)
            .await?
            .ok_or(LotError::NotDraft)
    }

    /// Publish a draft lot: draft -> active, irreversible. Re-seeds the
    /// current price from the start price if it is unset.
    pub async fn publish_lot(
        &self,
        actor_id: UserId,
        admin: bool,
        lot_id: LotId,
    ) -> Result<Lot, LotError> {
        let lot = self.get_lot(lot_id).await?;

        if !admin && lot.seller_id != actor_id {
            return Err(LotError::NotOwner);
        }
        if lot.status != LotStatus::Draft {
            return Err(LotError::NotDraft);
        }

        let current_price = if lot.current_price == 0 {
            lot.start_price
        } else {
            lot.current_price
        };

        let published = self.storage.publish_lot(lot_id, current_price).await?;
        if !published {
            return Err(LotError::NotDraft);
        }

        info!(lot_id; "lot published");

        self.get_lot(lot_id).await
    }

    pub async fn list_lots(
        &self,
        mut filter: LotFilter,
        page: i64,
        limit: i64,
    ) -> Result<Vec<Lot>, LotError> {
        // Without an explicit status only active lots are listed.
        if filter.status.is_none() {
            filter.status = Some(LotStatus::Active);
        }

        let offset = (page - 1) * limit;
        let lots = self.storage.get_lots(&filter, limit, offset).await?;

        Ok(lots)
    }

    pub async fn list_lots_by_seller(&self, seller_id: UserId) -> Result<Vec<Lot>, LotError> {
        Ok(self.storage.get_lots_by_seller(seller_id).await?)
    }

    pub async fn list_bids(&self, lot_id: LotId) -> Result<Vec<Bid>, LotError> {
        // Listing bids of an unknown lot is a 404, not an empty list.
        self.get_lot(lot_id).await?;
        Ok(self.storage.get_bids_by_lot(lot_id).await?)
    }

    pub async fn list_bids_by_user(&self, user_id: UserId) -> Result<Vec<Bid>, LotError> {
        Ok(self.storage.get_bids_by_user(user_id).await?)
    }

    /// The bid-placement saga. Four state changes across two stores and the
    /// event bus, with a compensation for every step after funds have been
    /// frozen:
    ///
    /// 1. admission checks against the lot (lifecycle, window, price)
    /// 2. freeze the new bidder's funds in the wallet service
    /// 3. persist the bid
    /// 4. conditionally update the lot; on a lost race delete the bid and
    ///    unfreeze again
    /// 5. unfreeze the previous leader (warn-only)
    /// 6. emit `bid_placed` (warn-only)
    #[trace]
    pub async fn place_bid(
        &self,
        lot_id: LotId,
        user_id: UserId,
        amount: Amount,
    ) -> Result<Bid, PlaceBidError> {
        // Server-stamped; used both for window validation and persistence.
        let now = self.clock.now();

        let lot = self
            .storage
            .get_lot(lot_id)
            .await?
            .ok_or(PlaceBidError::LotNotFound)?;

        if lot.status != LotStatus::Active {
            return Err(PlaceBidError::LotNotActive);
        }
        if now < lot.start_date || now > lot.end_date {
            return Err(PlaceBidError::OutsideBiddingWindow);
        }

        let min_required = lot.min_required();
        if amount < min_required {
            self.metrics.bid_rejected();
            return Err(PlaceBidError::AmountTooLow { min_required });
        }

        // Remember the previous leader for the later unfreeze. A missing bid
        // row is tolerated.
        let previous_bid = match lot.current_bid_id {
            0 => None,
            previous_bid_id => {
                let previous_bid = self.storage.get_bid(previous_bid_id).await?;
                if previous_bid.is_none() {
                    warn!(lot_id, previous_bid_id; "previous bid not found");
                }
                previous_bid
            }
        };

        // Nothing to compensate if this fails.
        self.wallet
            .freeze(user_id, amount, &format!("Bid on lot #{lot_id}"))
            .await
            .map_err(|error| PlaceBidError::FreezeFailed(error.to_string()))?;

        let bid = match self.storage.save_bid(lot_id, user_id, amount, now).await {
            Ok(bid) => bid,
            Err(error) => {
                self.unfreeze_bidder(user_id, amount, lot_id).await;
                return Err(PlaceBidError::BidPersistFailed(error));
            }
        };

        if bid.id == 0 {
            self.unfreeze_bidder(user_id, amount, lot_id).await;
            return Err(PlaceBidError::PersistSanityFailed);
        }

        match self
            .storage
            .update_lot_for_bid(lot_id, amount, bid.id, lot.current_bid_id)
            .await
        {
            Ok(true) => {}

            // A concurrent bid won the race; undo bid and freeze.
            Ok(false) => {
                self.remove_bid(bid.id).await;
                self.unfreeze_bidder(user_id, amount, lot_id).await;
                self.metrics.bid_rejected();
                return Err(PlaceBidError::ConcurrentBid);
            }

            Err(error) => {
                self.remove_bid(bid.id).await;
                self.unfreeze_bidder(user_id, amount, lot_id).await;
                return Err(PlaceBidError::LotUpdateFailed(error));
            }
        }

        // From here on the bid is canonically accepted; failures are logged
        // but do not roll back.
        if let Some(previous_bid) = &previous_bid {
            let description = format!("Outbid on lot #{lot_id}");
            if let Err(error) = self
                .wallet
                .unfreeze(previous_bid.user_id, previous_bid.amount, &description)
                .await
            {
                warn!(
                    lot_id,
                    previous_leader_id = previous_bid.user_id,
                    amount = previous_bid.amount,
                    error:% = error;
                    "cannot unfreeze previous leader, needs reconciliation"
                );
            }
        }

        let bid_placed = BidPlaced {
            lot_id,
            previous_leader_id: previous_bid.map(|bid| bid.user_id).unwrap_or_default(),
            new_bid_amount: amount,
        };
        if let Err(error) = self.publisher.publish(&bid_placed).await {
            warn!(lot_id, error:% = error; "cannot publish bid_placed event");
        }

        self.metrics.bid_accepted();
        info!(lot_id, user_id, amount, bid_id = bid.id; "bid accepted");

        Ok(bid)
    }

    /// Complete an active lot: set winner, charge the winner's wallet and
    /// emit `lot_completed`. Charge and emission failures are logged but the
    /// completion stands.
    #[trace]
    pub async fn complete_lot(&self, lot_id: LotId) -> Result<Lot, LotError> {
        let lot = self.get_lot(lot_id).await?;

        if lot.status != LotStatus::Active {
            return Err(LotError::NotActive);
        }

        let winner_id = match lot.current_bid_id {
            0 => 0,
            bid_id => self
                .storage
                .get_bid(bid_id)
                .await?
                .map(|bid| bid.user_id)
                .unwrap_or_default(),
        };

        let completed = self.storage.complete_lot(lot_id, winner_id).await?;
        if !completed {
            // Lost the race against the expiry worker or a force-complete.
            return Err(LotError::NotActive);
        }

        if winner_id != 0 && lot.current_price > 0 {
            let description = format!("Auction payment for lot #{lot_id}");
            if let Err(error) = self
                .wallet
                .charge(winner_id, lot.current_price, &description)
                .await
            {
                warn!(
                    lot_id,
                    winner_id,
                    amount = lot.current_price,
                    error:% = error;
                    "cannot charge winner, funds remain frozen"
                );
            }
        }

        let loser_ids = match self.storage.get_distinct_bidders(lot_id).await {
            Ok(bidders) => bidders.into_iter().filter(|id| *id != winner_id).collect(),
            Err(error) => {
                warn!(lot_id, error:% = error; "cannot determine losers");
                Vec::new()
            }
        };

        let lot_completed = LotCompleted {
            lot_id,
            winner: winner_id,
            final_price: lot.current_price,
            loser_ids,
        };
        if let Err(error) = self.publisher.publish(&lot_completed).await {
            warn!(lot_id, error:% = error; "cannot publish lot_completed event");
        }

        self.metrics.lot_completed();
        info!(lot_id, winner_id, final_price = lot.current_price; "lot completed");

        Ok(Lot {
            status: LotStatus::Completed,
            winner_id,
            ..lot
        })
    }

    /// Complete all active lots whose end date has passed, one by one.
    /// Per-lot failures are logged and skipped.
    #[trace]
    pub async fn complete_expired(&self) -> Result<usize, sqlx::Error> {
        let now = self.clock.now();
        let lots = self.storage.get_expired_active_lots(now).await?;

        let mut completed = 0;
        for lot in lots {
            match self.complete_lot(lot.id).await {
                Ok(_) => completed += 1,
                Err(error) => {
                    error!(lot_id = lot.id, error:% = error; "cannot complete expired lot")
                }
            }
        }

        Ok(completed)
    }

    async fn unfreeze_bidder(&self, user_id: UserId, amount: Amount, lot_id: LotId) {
        let description = format!("Rejected bid on lot #{lot_id}");

        if let Err(error) = self.wallet.unfreeze(user_id, amount, &description).await {
            warn!(
                lot_id,
                user_id,
                amount,
                error:% = error;
                "cannot unfreeze rejected bidder, needs reconciliation"
            );
        }
    }

    async fn remove_bid(&self, bid_id: BidId) {
        if let Err(error) = self.storage.delete_bid(bid_id).await {
            warn!(bid_id, error:% = error; "cannot delete rejected bid");
        }
    }
}

/// Run the expiry worker until SIGTERM: every tick, complete all lots whose
/// end date has passed. A failed sweep is logged; the worker keeps running.
pub async fn run<S, W, P, C>(
    config: WorkerConfig,
    application: Application<S, W, P, C>,
    mut sigterm: Signal,
) -> anyhow::Result<()>
where
    S: Storage,
    W: WalletClient,
    P: Publisher,
    C: Clock,
{
    let mut ticker = interval(config.expiry_interval);

    loop {
        select! {
            _ = ticker.tick() => {
                match application.complete_expired().await {
                    Ok(count) if count > 0 => info!(count; "expired lots completed"),
                    Ok(_) => debug!("no expired lots"),
                    Err(error) => error!(error:% = error; "expiry sweep failed"),
                }
            }

            _ = sigterm.recv() => {
                warn!("SIGTERM received");
                return Ok(());
            }
        }
    }
}

/// Configuration settings for the expiry worker.
#[derive(Debug, Clone, Deserialize)]
pub struct WorkerConfig {
    #[serde(with = "humantime_serde", default = "expiry_interval_default")]
    pub expiry_interval: Duration,
}

const fn expiry_interval_default() -> Duration {
    Duration::from_secs(5 * 60)
}

#[derive(Debug, Error)]
pub enum LotError {
    #[error("lot not found")]
    NotFound,

    #[error("lot is not in draft status")]
    NotDraft,

    #[error("lot is not active")]
    NotActive,

    #[error("not the seller of this lot")]
    NotOwner,

    #[error("{0}")]
    Validation(String),

    #[error("cannot access database")]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, Error)]
pub enum PlaceBidError {
    #[error("lot not found")]
    LotNotFound,

    #[error("lot is not active")]
    LotNotActive,

    #[error("lot is not open for bids at this time")]
    OutsideBiddingWindow,

    #[error("bid amount must be at least {min_required}")]
    AmountTooLow { min_required: Amount },

    #[error("cannot freeze bidder funds: {0}")]
    FreezeFailed(String),

    #[error("cannot persist bid")]
    BidPersistFailed(#[source] sqlx::Error),

    #[error("persisted bid has no id")]
    PersistSanityFailed,

    #[error("cannot update lot")]
    LotUpdateFailed(#[source] sqlx::Error),

    #[error("a concurrent bid was accepted first")]
    ConcurrentBid,

    #[error("cannot access database")]
    Database(#[from] sqlx::Error),
}

#[cfg(test)]
mod tests {
    use crate::{
        application::{Application, LotError, PlaceBidError},
        domain::{
            Lot, LotFilter, LotStatus, LotUpdate, NewLot,
            testing::{MockPublisher, MockStorage, MockWallet, WalletCall, now},
        },
    };
    use assert_matches::assert_matches;
    use auction_common::domain::{Amount, FixedClock, UserId};
    use chrono::TimeDelta;
    use serde_json::json;

    const SELLER: UserId = 10;
    const BUYER_A: UserId = 1;
    const BUYER_B: UserId = 2;

    fn active_lot(start_price: Amount, min_step: Amount) -> Lot {
        Lot {
            id: 1,
            seller_id: SELLER,
            title: "Vintage synthesizer".to_string(),
            description: String::new(),
            start_date: now() - TimeDelta::hours(1),
            end_date: now() + TimeDelta::hours(1),
            start_price,
            current_price: start_price,
            min_step,
            status: LotStatus::Active,
            winner_id: 0,
            current_bid_id: 0,
        }
    }

    fn application(
        storage: MockStorage,
        wallet: MockWallet,
        publisher: MockPublisher,
    ) -> Application<MockStorage, MockWallet, MockPublisher, FixedClock> {
        Application::new(storage, wallet, publisher, FixedClock(now()))
    }

    #[tokio::test]
    async fn test_happy_bid_chain() {
        let storage = MockStorage::with_lot(active_lot(1_000, 100));
        let wallet = MockWallet::default();
        let publisher = MockPublisher::default();
        let application = application(storage.clone(), wallet.clone(), publisher.clone());

        let bid_a = application
            .place_bid(1, BUYER_A, 1_100)
            .await
            .expect("first bid is accepted");
        assert_eq!(bid_a.amount, 1_100);

        let lot = storage.lot(1);
        assert_eq!(lot.current_price, 1_100);
        assert_eq!(lot.current_bid_id, bid_a.id);
        assert_eq!(wallet.calls(), vec![(WalletCall::Freeze, BUYER_A, 1_100)]);

        let bid_b = application
            .place_bid(1, BUYER_B, 1_200)
            .await
            .expect("second bid is accepted");

        let lot = storage.lot(1);
        assert_eq!(lot.current_price, 1_200);
        assert_eq!(lot.current_bid_id, bid_b.id);
        assert_eq!(
            wallet.calls(),
            vec![
                (WalletCall::Freeze, BUYER_A, 1_100),
                (WalletCall::Freeze, BUYER_B, 1_200),
                (WalletCall::Unfreeze, BUYER_A, 1_100),
            ]
        );

        // Accepted bids form a strictly increasing chain.
        let amounts = storage
            .bids()
            .into_iter()
            .map(|bid| bid.amount)
            .collect::<Vec<_>>();
        assert_eq!(amounts, vec![1_100, 1_200]);

        assert_eq!(
            publisher.events(),
            vec![
                (
                    "bid_placed".to_string(),
                    json!({ "lot_id": 1, "previous_leader_id": 0, "new_bid_amount": 1_100 })
                ),
                (
                    "bid_placed".to_string(),
                    json!({ "lot_id": 1, "previous_leader_id": BUYER_A, "new_bid_amount": 1_200 })
                ),
            ]
        );
    }

    #[tokio::test]
    async fn test_under_step_rejected() {
        let mut lot = active_lot(1_000, 100);
        lot.current_price = 1_200;
        let storage = MockStorage::with_lot(lot.clone());
        let wallet = MockWallet::default();
        let publisher = MockPublisher::default();
        let application = application(storage.clone(), wallet.clone(), publisher.clone());

        let error = application
            .place_bid(1, BUYER_A, 1_250)
            .await
            .expect_err("under-step bid is rejected");
        assert_eq!(error.to_string(), "bid amount must be at least 1300");

        // Rejection leaves lot, bids and wallets untouched.
        assert_eq!(storage.lot(1), lot);
        assert!(storage.bids().is_empty());
        assert!(wallet.calls().is_empty());
        assert!(publisher.events().is_empty());
    }

    #[tokio::test]
    async fn test_bid_requires_active_lot() {
        let mut lot = active_lot(1_000, 100);
        lot.status = LotStatus::Draft;
        let application = application(
            MockStorage::with_lot(lot),
            MockWallet::default(),
            MockPublisher::default(),
        );

        assert_matches!(
            application.place_bid(1, BUYER_A, 1_100).await,
            Err(PlaceBidError::LotNotActive)
        );
        assert_matches!(
            application.place_bid(2, BUYER_A, 1_100).await,
            Err(PlaceBidError::LotNotFound)
        );
    }

    #[tokio::test]
    async fn test_bid_outside_window() {
        let mut lot = active_lot(1_000, 100);
        lot.end_date = now() - TimeDelta::minutes(1);
        let application = application(
            MockStorage::with_lot(lot),
            MockWallet::default(),
            MockPublisher::default(),
        );

        assert_matches!(
            application.place_bid(1, BUYER_A, 1_100).await,
            Err(PlaceBidError::OutsideBiddingWindow)
        );
    }

    #[tokio::test]
    async fn test_freeze_failure_leaves_no_trace() {
        let storage = MockStorage::with_lot(active_lot(1_000, 100));
        let wallet = MockWallet::default();
        wallet.fail_freeze();
        let publisher = MockPublisher::default();
        let application = application(storage.clone(), wallet.clone(), publisher.clone());

        assert_matches!(
            application.place_bid(1, BUYER_A, 1_100).await,
            Err(PlaceBidError::FreezeFailed(_))
        );

        assert_eq!(storage.lot(1).current_price, 1_000);
        assert!(storage.bids().is_empty());
        assert!(publisher.events().is_empty());
        assert!(wallet.calls().is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_bid_compensates() {
        let storage = MockStorage::with_lot(active_lot(1_000, 100));
        storage.conflict_on_lot_update();
        let wallet = MockWallet::default();
        let publisher = MockPublisher::default();
        let application = application(storage.clone(), wallet.clone(), publisher.clone());

        assert_matches!(
            application.place_bid(1, BUYER_B, 1_100).await,
            Err(PlaceBidError::ConcurrentBid)
        );

        // The loser's funds are unfrozen and its bid row removed.
        assert_eq!(
            wallet.calls(),
            vec![
                (WalletCall::Freeze, BUYER_B, 1_100),
                (WalletCall::Unfreeze, BUYER_B, 1_100),
            ]
        );
        assert!(storage.bids().is_empty());
        assert!(publisher.events().is_empty());
    }

    #[tokio::test]
    async fn test_emission_failure_does_not_fail_bid() {
        let storage = MockStorage::with_lot(active_lot(1_000, 100));
        let wallet = MockWallet::default();
        let publisher = MockPublisher::default();
        publisher.fail();
        let application = application(storage.clone(), wallet.clone(), publisher.clone());

        let bid = application
            .place_bid(1, BUYER_A, 1_100)
            .await
            .expect("bid is accepted in spite of emission failure");
        assert_eq!(storage.lot(1).current_bid_id, bid.id);
    }

    #[tokio::test]
    async fn test_completion_charges_winner_and_notifies_losers() {
        let mut lot = active_lot(1_000, 100);
        lot.current_price = 1_200;
        let storage = MockStorage::with_lot(lot);
        let wallet = MockWallet::default();
        let publisher = MockPublisher::default();
        let application = application(storage.clone(), wallet.clone(), publisher.clone());

        storage.push_bid(1, BUYER_A, 1_100);
        let bid_b = storage.push_bid(1, BUYER_B, 1_200);
        storage.set_current_bid(1, bid_b, 1_200);

        let lot = application.complete_lot(1).await.expect("lot is completed");
        assert_eq!(lot.status, LotStatus::Completed);
        assert_eq!(lot.winner_id, BUYER_B);

        let stored = storage.lot(1);
        assert_eq!(stored.status, LotStatus::Completed);
        assert_eq!(stored.winner_id, BUYER_B);

        assert_eq!(wallet.calls(), vec![(WalletCall::Charge, BUYER_B, 1_200)]);

        assert_eq!(
            publisher.events(),
            vec![(
                "lot_completed".to_string(),
                json!({
                    "lot_id": 1,
                    "winner": BUYER_B,
                    "final_price": 1_200,
                    "loser_ids": [BUYER_A]
                })
            )]
        );

        // Completed is terminal.
        assert_matches!(application.complete_lot(1).await, Err(LotError::NotActive));
    }

    #[tokio::test]
    async fn test_completion_without_bids() {
        let storage = MockStorage::with_lot(active_lot(1_000, 100));
        let wallet = MockWallet::default();
        let publisher = MockPublisher::default();
        let application = application(storage.clone(), wallet.clone(), publisher.clone());

        let lot = application.complete_lot(1).await.expect("lot is completed");
        assert_eq!(lot.winner_id, 0);
        assert!(wallet.calls().is_empty());

        assert_eq!(
            publisher.events(),
            vec![(
                "lot_completed".to_string(),
                json!({ "lot_id": 1, "winner": 0, "final_price": 1_000, "loser_ids": [] })
            )]
        );
    }

    #[tokio::test]
    async fn test_charge_failure_leaves_lot_completed() {
        let storage = MockStorage::with_lot(active_lot(1_000, 100));
        let bid = storage.push_bid(1, BUYER_B, 1_200);
        storage.set_current_bid(1, bid, 1_200);
        let wallet = MockWallet::default();
        wallet.fail_charge();
        let publisher = MockPublisher::default();
        let application = application(storage.clone(), wallet.clone(), publisher.clone());

        let lot = application.complete_lot(1).await.expect("completion stands");
        assert_eq!(lot.status, LotStatus::Completed);
        assert_eq!(storage.lot(1).status, LotStatus::Completed);
        assert_eq!(publisher.events().len(), 1);
    }

    #[tokio::test]
    async fn test_complete_expired_is_idempotent() {
        let mut expired = active_lot(1_000, 100);
        expired.end_date = now() - TimeDelta::minutes(1);
        let mut running = active_lot(1_000, 100);
        running.id = 2;

        let storage = MockStorage::default();
        storage.push_lot(expired);
        storage.push_lot(running);
        let application = application(
            storage.clone(),
            MockWallet::default(),
            MockPublisher::default(),
        );

        let completed = application
            .complete_expired()
            .await
            .expect("sweep succeeds");
        assert_eq!(completed, 1);
        assert_eq!(storage.lot(1).status, LotStatus::Completed);
        assert_eq!(storage.lot(2).status, LotStatus::Active);

        let completed = application
            .complete_expired()
            .await
            .expect("second sweep succeeds");
        assert_eq!(completed, 0);
    }

    #[tokio::test]
    async fn test_lot_lifecycle() {
        let storage = MockStorage::default();
        let application = application(
            storage.clone(),
            MockWallet::default(),
            MockPublisher::default(),
        );

        let new_lot = NewLot {
            title: "Vintage synthesizer".to_string(),
            description: "With original case".to_string(),
            start_date: None,
            end_date: None,
            start_price: 1_000,
            min_step: 100,
        };
        let lot = application
            .create_lot(SELLER, new_lot.clone())
            .await
            .expect("lot is created");
        assert_eq!(lot.status, LotStatus::Draft);
        assert_eq!(lot.start_date, now());
        assert_eq!(lot.end_date, now() + TimeDelta::hours(24));
        assert_eq!(lot.current_price, 1_000);

        // Only the owner (or an admin) may update or publish.
        assert_matches!(
            application
                .update_lot(BUYER_A, false, lot.id, LotUpdate::default())
                .await,
            Err(LotError::NotOwner)
        );

        let update = LotUpdate {
            start_price: Some(1_500),
            ..Default::default()
        };
        let updated = application
            .update_lot(SELLER, false, lot.id, update)
            .await
            .expect("draft can be updated");
        assert_eq!(updated.start_price, 1_500);
        assert_eq!(updated.current_price, 1_500);

        let published = application
            .publish_lot(SELLER, false, lot.id)
            .await
            .expect("draft can be published");
        assert_eq!(published.status, LotStatus::Active);

        // Publishing is one-way, active lots are immutable via update.
        assert_matches!(
            application.publish_lot(SELLER, false, lot.id).await,
            Err(LotError::NotDraft)
        );
        assert_matches!(
            application
                .update_lot(SELLER, false, lot.id, LotUpdate::default())
                .await,
            Err(LotError::NotDraft)
        );

        // Validation failures.
        let invalid = NewLot {
            end_date: Some(now() - TimeDelta::hours(1)),
            ..new_lot.clone()
        };
        assert_matches!(
            application.create_lot(SELLER, invalid).await,
            Err(LotError::Validation(_))
        );
        let invalid = NewLot {
            min_step: 0,
            ..new_lot
        };
        assert_matches!(
            application.create_lot(SELLER, invalid).await,
            Err(LotError::Validation(_))
        );
    }

    #[tokio::test]
    async fn test_list_lots_defaults_to_active() {
        let mut draft = active_lot(1_000, 100);
        draft.status = LotStatus::Draft;
        let mut active = active_lot(1_000, 100);
        active.id = 2;

        let storage = MockStorage::default();
        storage.push_lot(draft);
        storage.push_lot(active);
        let application = application(
            storage,
            MockWallet::default(),
            MockPublisher::default(),
        );

        let lots = application
            .list_lots(LotFilter::default(), 1, 10)
            .await
            .expect("lots are listed");
        assert_eq!(lots.len(), 1);
        assert_eq!(lots[0].id, 2);
    }

}
