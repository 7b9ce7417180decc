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
    domain::{
        Lot, LotFilter, LotStatus, LotUpdate, NewLot, storage::Storage, wallet::WalletClient,
    },
    infra::api::lot_error,
};
use auction_common::{
    domain::{Amount, Clock, LotId, Publisher, Role, UserId},
    infra::api::{ApiError, ApiResult, Identity},
};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_with::{DefaultOnError, serde_as};

const PAGE_DEFAULT: i64 = 1;
const LIMIT_DEFAULT: i64 = 10;
const LIMIT_MAX: i64 = 100;

#[derive(Debug, Deserialize)]
pub struct CreateLotRequest {
    pub title: String,

    #[serde(default)]
    pub description: String,

    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub start_price: Amount,
    pub min_step: Amount,
}

impl From<CreateLotRequest> for NewLot {
    fn from(request: CreateLotRequest) -> Self {
        Self {
            title: request.title,
            description: request.description,
            start_date: request.start_date,
            end_date: request.end_date,
            start_price: request.start_price,
            min_step: request.min_step,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateLotRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub start_price: Option<Amount>,
    pub min_step: Option<Amount>,
    pub end_date: Option<DateTime<Utc>>,
}

impl From<UpdateLotRequest> for LotUpdate {
    fn from(request: UpdateLotRequest) -> Self {
        Self {
            title: request.title,
            description: request.description,
            start_price: request.start_price,
            min_step: request.min_step,
            end_date: request.end_date,
        }
    }
}

#[serde_as]
#[derive(Debug, Default, Deserialize)]
pub struct LotsQuery {
    #[serde_as(as = "DefaultOnError")]
    #[serde(default)]
    pub page: Option<i64>,

    #[serde_as(as = "DefaultOnError")]
    #[serde(default)]
    pub limit: Option<i64>,

    #[serde_as(as = "DefaultOnError")]
    #[serde(default)]
    pub status: Option<LotStatus>,

    #[serde_as(as = "DefaultOnError")]
    #[serde(default)]
    pub min_price: Option<Amount>,

    #[serde_as(as = "DefaultOnError")]
    #[serde(default)]
    pub max_price: Option<Amount>,

    #[serde_as(as = "DefaultOnError")]
    #[serde(default)]
    pub min_end_date: Option<DateTime<Utc>>,

    #[serde_as(as = "DefaultOnError")]
    #[serde(default)]
    pub max_end_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct LotsResponse {
    pub lots: Vec<Lot>,
}

#[derive(Debug, Serialize)]
pub struct CompleteExpiredResponse {
    pub completed: usize,
}

pub async fn create<S, W, P, C>(
    State(application): State<Application<S, W, P, C>>,
    identity: Identity,
    Json(request): Json<CreateLotRequest>,
) -> ApiResult<(StatusCode, Json<Lot>)>
where
    S: Storage,
    W: WalletClient,
    P: Publisher,
    C: Clock,
{
    identity.require_role(&[Role::Seller, Role::Admin])?;

    let lot = application
        .create_lot(identity.user_id, request.into())
        .await
        .map_err(lot_error)?;

    Ok((StatusCode::CREATED, Json(lot)))
}

pub async fn get<S, W, P, C>(
    State(application): State<Application<S, W, P, C>>,
    _identity: Identity,
    Path(id): Path<LotId>,
) -> ApiResult<Json<Lot>>
where
    S: Storage,
    W: WalletClient,
    P: Publisher,
    C: Clock,
{
    let lot = application.get_lot(id).await.map_err(lot_error)?;
    Ok(Json(lot))
}

pub async fn update<S, W, P, C>(
    State(application): State<Application<S, W, P, C>>,
    identity: Identity,
    Path(id): Path<LotId>,
    Json(request): Json<UpdateLotRequest>,
) -> ApiResult<Json<Lot>>
where
    S: Storage,
    W: WalletClient,
    P: Publisher,
    C: Clock,
{
    let role = identity.require_role(&[Role::Seller, Role::Admin])?;

    let lot = application
        .update_lot(
            identity.user_id,
            role == Role::Admin,
            id,
            request.into(),
        )
        .await
        .map_err(lot_error)?;

    Ok(Json(lot))
}

pub async fn publish<S, W, P, C>(
    State(application): State<Application<S, W, P, C>>,
    identity: Identity,
    Path(id): Path<LotId>,
) -> ApiResult<Json<Lot>>
where
    S: Storage,
    W: WalletClient,
    P: Publisher,
    C: Clock,
{
    let role = identity.require_role(&[Role::Seller, Role::Admin])?;

    let lot = application
        .publish_lot(identity.user_id, role == Role::Admin, id)
        .await
        .map_err(lot_error)?;

    Ok(Json(lot))
}

pub async fn list<S, W, P, C>(
    State(application): State<Application<S, W, P, C>>,
    _identity: Identity,
    Query(query): Query<LotsQuery>,
) -> ApiResult<Json<LotsResponse>>
where
    S: Storage,
    W: WalletClient,
    P: Publisher,
    C: Clock,
{
    let page = query.page.filter(|page| *page > 0).unwrap_or(PAGE_DEFAULT);
    let limit = query
        .limit
        .filter(|limit| *limit > 0)
        .unwrap_or(LIMIT_DEFAULT)
        .min(LIMIT_MAX);

    let filter = LotFilter {
        status: query.status,
        min_price: query.min_price,
        max_price: query.max_price,
        min_end_date: query.min_end_date,
        max_end_date: query.max_end_date,
    };

    let lots = application
        .list_lots(filter, page, limit)
        .await
        .map_err(lot_error)?;

    Ok(Json(LotsResponse { lots }))
}

pub async fn list_by_user<S, W, P, C>(
    State(application): State<Application<S, W, P, C>>,
    _identity: Identity,
    Path(user_id): Path<UserId>,
) -> ApiResult<Json<LotsResponse>>
where
    S: Storage,
    W: WalletClient,
    P: Publisher,
    C: Clock,
{
    let lots = application
        .list_lots_by_seller(user_id)
        .await
        .map_err(lot_error)?;

    Ok(Json(LotsResponse { lots }))
}

pub async fn force_complete<S, W, P, C>(
    State(application): State<Application<S, W, P, C>>,
    identity: Identity,
    Path(id): Path<LotId>,
) -> ApiResult<Json<Lot>>
where
    S: Storage,
    W: WalletClient,
    P: Publisher,
    C: Clock,
{
    let role = identity.require_role(&[Role::Seller, Role::Admin])?;

    let lot = application.get_lot(id).await.map_err(lot_error)?;
    if role != Role::Admin && lot.seller_id != identity.user_id {
        return Err(ApiError::Forbidden(
            "not the seller of this lot".to_string(),
        ));
    }

    let lot = application.complete_lot(id).await.map_err(lot_error)?;
    Ok(Json(lot))
}

pub async fn complete_expired<S, W, P, C>(
    State(application): State<Application<S, W, P, C>>,
    identity: Identity,
) -> ApiResult<Json<CompleteExpiredResponse>>
where
    S: Storage,
    W: WalletClient,
    P: Publisher,
    C: Clock,
{
    identity.require_role(&[Role::Admin])?;

    let completed = application
        .complete_expired()
        .await
        .map_err(auction_common::infra::api::database_error)?;

    Ok(Json(CompleteExpiredResponse { completed }))
}
