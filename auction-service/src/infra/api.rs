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

pub mod bid;
pub mod lot;

use crate::{
    application::{Application, LotError, PlaceBidError},
    domain::{storage::Storage, wallet::WalletClient},
};
use anyhow::Context;
use auction_common::{
    domain::{Clock, Publisher},
    infra::api::{ApiError, database_error},
};
use axum::{
    Router,
    routing::{get, post},
};
use log::{error, info};
use serde::Deserialize;
use tokio::{net::TcpListener, signal::unix::Signal};

/// Build the auction service router.
pub fn app<S, W, P, C>(application: Application<S, W, P, C>) -> Router
where
    S: Storage,
    W: WalletClient,
    P: Publisher,
    C: Clock,
{
    Router::new()
        .route(
            "/api/lots",
            post(lot::create::<S, W, P, C>).get(lot::list::<S, W, P, C>),
        )
        .route(
            "/api/lots/complete-expired",
            post(lot::complete_expired::<S, W, P, C>),
        )
        .route(
            "/api/lots/{id}",
            get(lot::get::<S, W, P, C>).put(lot::update::<S, W, P, C>),
        )
        .route("/api/lots/{id}/publish", post(lot::publish::<S, W, P, C>))
        .route(
            "/api/lots/{id}/force-complete",
            post(lot::force_complete::<S, W, P, C>),
        )
        .route(
            "/api/lots/{id}/bids",
            post(bid::place::<S, W, P, C>).get(bid::list::<S, W, P, C>),
        )
        .route("/api/users/{id}/lots", get(lot::list_by_user::<S, W, P, C>))
        .route("/api/users/{id}/bids", get(bid::list_by_user::<S, W, P, C>))
        .with_state(application)
}

/// Serve the API until SIGTERM.
pub async fn serve<S, W, P, C>(
    config: Config,
    application: Application<S, W, P, C>,
    mut sigterm: Signal,
) -> anyhow::Result<()>
where
    S: Storage,
    W: WalletClient,
    P: Publisher,
    C: Clock,
{
    let app = app(application);

    let listener = TcpListener::bind((config.address.as_str(), config.port))
        .await
        .context("bind TcpListener")?;
    info!(address:% = config.address, port = config.port; "api listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            sigterm.recv().await;
        })
        .await
        .context("serve api")
}

/// Configuration settings for the API.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default = "address_default")]
    pub address: String,

    pub port: u16,
}

fn address_default() -> String {
    "0.0.0.0".to_string()
}

fn lot_error(error: LotError) -> ApiError {
    match error {
        LotError::NotFound => ApiError::NotFound(error.to_string()),
        LotError::NotDraft | LotError::NotActive => ApiError::BadRequest(error.to_string()),
        LotError::NotOwner => ApiError::Forbidden(error.to_string()),
        LotError::Validation(message) => ApiError::BadRequest(message),
        LotError::Database(error) => database_error(error),
    }
}

fn place_bid_error(error: PlaceBidError) -> ApiError {
    match error {
        PlaceBidError::LotNotFound => ApiError::NotFound(error.to_string()),

        PlaceBidError::LotNotActive
        | PlaceBidError::OutsideBiddingWindow
        | PlaceBidError::AmountTooLow { .. } => ApiError::BadRequest(error.to_string()),

        // The wallet service refused or was unreachable.
        PlaceBidError::FreezeFailed(_) => ApiError::BadGateway(error.to_string()),

        PlaceBidError::ConcurrentBid => ApiError::Conflict(error.to_string()),

        PlaceBidError::BidPersistFailed(_)
        | PlaceBidError::PersistSanityFailed
        | PlaceBidError::LotUpdateFailed(_) => {
            error!(error:% = error; "bid saga failed");
            ApiError::Internal("internal error".to_string())
        }

        PlaceBidError::Database(error) => database_error(error),
    }
}
