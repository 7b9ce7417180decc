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

use crate::domain::{NewNotification, NotificationType, storage::Storage};
use anyhow::Context;
use auction_common::{
    domain::{BidPlaced, LotCompleted, MessageHandler, Subscriber},
    error::BoxError,
};
use log::{debug, info, warn};
use serde::Deserialize;
use tokio::{select, signal::unix::Signal, task};

/// Translates bus events into notification rows. Retryable failures (e.g. a
/// database outage) are returned as errors so the message stays unacked and
/// is re-delivered; the unique index on `(user_id, lot_id, type)` keeps the
/// re-delivery idempotent.
#[derive(Debug, Clone)]
pub struct EventHandler<S> {
    storage: S,
}

impl<S> EventHandler<S>
where
    S: Storage,
{
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    async fn save(&self, notification: NewNotification) -> Result<(), BoxError> {
        let inserted = self.storage.save_notification(&notification).await?;

        if inserted {
            info!(
                user_id = notification.user_id,
                lot_id = notification.lot_id,
                notification_type:% = notification.notification_type;
                "notification created"
            );
        } else {
            debug!(
                user_id = notification.user_id,
                lot_id = notification.lot_id,
                notification_type:% = notification.notification_type;
                "duplicate event, notification already exists"
            );
        }

        Ok(())
    }
}

impl<S> MessageHandler<BidPlaced> for EventHandler<S>
where
    S: Storage,
{
    async fn handle(&self, event: BidPlaced) -> Result<(), BoxError> {
        // The very first bid has nobody to outbid.
        if event.previous_leader_id == 0 {
            debug!(lot_id = event.lot_id; "bid_placed without previous leader");
            return Ok(());
        }

        self.save(NewNotification {
            user_id: event.previous_leader_id,
            lot_id: event.lot_id,
            notification_type: NotificationType::BidOutbid,
            title: "You have been outbid".to_string(),
            message: format!(
                "Your bid on lot #{} has been outbid. The new bid is {}.",
                event.lot_id, event.new_bid_amount
            ),
        })
        .await
    }
}

impl<S> MessageHandler<LotCompleted> for EventHandler<S>
where
    S: Storage,
{
    async fn handle(&self, event: LotCompleted) -> Result<(), BoxError> {
        if event.winner != 0 {
            self.save(NewNotification {
                user_id: event.winner,
                lot_id: event.lot_id,
                notification_type: NotificationType::AuctionWon,
                title: "Auction won".to_string(),
                message: format!(
                    "Congratulations, you won lot #{} with a bid of {}.",
                    event.lot_id, event.final_price
                ),
            })
            .await?;
        }

        for loser_id in &event.loser_ids {
            self.save(NewNotification {
                user_id: *loser_id,
                lot_id: event.lot_id,
                notification_type: NotificationType::AuctionLost,
                title: "Auction lost".to_string(),
                message: format!("Lot #{} was sold to another bidder.", event.lot_id),
            })
            .await?;
        }

        Ok(())
    }
}

/// Run the consumers for both topics until SIGTERM.
pub async fn run<S, B>(
    config: Config,
    storage: S,
    subscriber: B,
    mut sigterm: Signal,
) -> anyhow::Result<()>
where
    S: Storage,
    B: Subscriber,
{
    let bid_placed_task = task::spawn({
        let subscriber = subscriber.clone();
        let handler = EventHandler::new(storage.clone());
        let group = config.group.clone();

        async move {
            subscriber
                .consume::<BidPlaced, _>(&group, &handler)
                .await
                .context("consume bid_placed")?;

            warn!("bid_placed_task completed");

            Ok::<_, anyhow::Error>(())
        }
    });

    let lot_completed_task = task::spawn({
        let handler = EventHandler::new(storage);
        let group = config.group.clone();

        async move {
            subscriber
                .consume::<LotCompleted, _>(&group, &handler)
                .await
                .context("consume lot_completed")?;

            warn!("lot_completed_task completed");

            Ok::<_, anyhow::Error>(())
        }
    });

    select! {
        result = bid_placed_task => result
            .context("bid_placed_task panicked")
            .and_then(|r| r.context("bid_placed_task failed")),

        result = lot_completed_task => result
            .context("lot_completed_task panicked")
            .and_then(|r| r.context("lot_completed_task failed")),

        _ = sigterm.recv() => {
            warn!("SIGTERM received");
            Ok(())
        }
    }
}

/// Configuration settings for the consumers.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default = "group_default")]
    pub group: String,
}

fn group_default() -> String {
    "notifications".to_string()
}
