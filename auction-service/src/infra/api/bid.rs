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

use crate::{
    application::Application,
    domain::{Bid, storage::Storage, wallet::WalletClient},
    infra::api::{lot_error, place_bid_error},
};
use auction_common::{
    domain::{Amount, Clock, LotId, Publisher, UserId},
    infra::api::{ApiError, ApiResult, Identity},
};
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct PlaceBidRequest {
    pub amount: Amount,
}

#[derive(Debug, Serialize)]
pub struct BidsResponse {
    pub bids: Vec<Bid>,
}

pub async fn place<S, W, P, C>(
    State(application): State<Application<S, W, P, C>>,
    identity: Identity,
    Path(lot_id): Path<LotId>,
    Json(request): Json<PlaceBidRequest>,
) -> ApiResult<(StatusCode, Json<Bid>)>
where
    S: Storage,
    W: WalletClient,
    P: Publisher,
    C: Clock,
{
    if request.amount < 1 {
        return Err(ApiError::BadRequest("amount must be at least 1".to_string()));
    }

    let bid = application
        .place_bid(lot_id, identity.user_id, request.amount)
        .await
        .map_err(place_bid_error)?;

    Ok((StatusCode::CREATED, Json(bid)))
}

pub async fn list<S, W, P, C>(
    State(application): State<Application<S, W, P, C>>,
    _identity: Identity,
    Path(lot_id): Path<LotId>,
) -> ApiResult<Json<BidsResponse>>
where
    S: Storage,
    W: WalletClient,
    P: Publisher,
    C: Clock,
{
    let bids = application.list_bids(lot_id).await.map_err(lot_error)?;
    Ok(Json(BidsResponse { bids }))
}

pub async fn list_by_user<S, W, P, C>(
    State(application): State<Application<S, W, P, C>>,
    _identity: Identity,
    Path(user_id): Path<UserId>,
) -> ApiResult<Json<BidsResponse>>
where
    S: Storage,
    W: WalletClient,
    P: Publisher,
    C: Clock,
{
    let bids = application
        .list_bids_by_user(user_id)
        .await
        .map_err(lot_error)?;

    Ok(Json(BidsResponse { bids }))
}
