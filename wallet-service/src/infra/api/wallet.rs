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
    domain::{
        TransactionType, Wallet, WalletError, WalletTransaction,
        storage::{MutateWalletError, Storage},
    },
    infra::api::AppState,
};
use auction_common::{
    domain::{Amount, Clock, TransactionId},
    infra::api::{ApiError, ApiResult, Identity, database_error},
};
use axum::{
    Json,
    extract::{Query, State},
};
use log::info;
use serde::{Deserialize, Serialize};
use serde_with::{DefaultOnError, serde_as};

const LIMIT_DEFAULT: i64 = 20;
const LIMIT_MAX: i64 = 100;
const OFFSET_MAX: i64 = 10_000;

#[derive(Debug, Deserialize)]
pub struct MutateRequest {
    pub amount: Amount,
    pub description: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct MutateResponse {
    pub wallet: Wallet,
    pub transaction_id: TransactionId,
}

pub async fn get_wallet<S, C>(
    State(state): State<AppState<S, C>>,
    identity: Identity,
) -> ApiResult<Json<Wallet>>
where
    S: Storage,
    C: Clock,
{
    let wallet = state
        .storage
        .get_or_create_wallet(identity.user_id)
        .await
        .map_err(database_error)?;

    Ok(Json(wallet))
}

pub async fn deposit<S, C>(
    state: State<AppState<S, C>>,
    identity: Identity,
    request: Json<MutateRequest>,
) -> ApiResult<Json<MutateResponse>>
where
    S: Storage,
    C: Clock,
{
    mutate(state, identity, TransactionType::Deposit, request).await
}

pub async fn freeze<S, C>(
    state: State<AppState<S, C>>,
    identity: Identity,
    request: Json<MutateRequest>,
) -> ApiResult<Json<MutateResponse>>
where
    S: Storage,
    C: Clock,
{
    mutate(state, identity, TransactionType::Freeze, request).await
}

pub async fn unfreeze<S, C>(
    state: State<AppState<S, C>>,
    identity: Identity,
    request: Json<MutateRequest>,
) -> ApiResult<Json<MutateResponse>>
where
    S: Storage,
    C: Clock,
{
    mutate(state, identity, TransactionType::Unfreeze, request).await
}

pub async fn charge<S, C>(
    state: State<AppState<S, C>>,
    identity: Identity,
    request: Json<MutateRequest>,
) -> ApiResult<Json<MutateResponse>>
where
    S: Storage,
    C: Clock,
{
    mutate(state, identity, TransactionType::Charge, request).await
}

async fn mutate<S, C>(
    State(state): State<AppState<S, C>>,
    identity: Identity,
    transaction_type: TransactionType,
    Json(request): Json<MutateRequest>,
) -> ApiResult<Json<MutateResponse>>
where
    S: Storage,
    C: Clock,
{
    let description = request
        .description
        .unwrap_or_else(|| transaction_type.to_string());

    let (wallet, transaction_id) = state
        .storage
        .mutate_wallet(
            identity.user_id,
            transaction_type,
            request.amount,
            &description,
        )
        .await
        .map_err(mutate_wallet_error)?;

    info!(
        user_id = identity.user_id,
        transaction_type:%,
        amount = request.amount,
        transaction_id;
        "wallet mutated"
    );

    Ok(Json(MutateResponse {
        wallet,
        transaction_id,
    }))
}

#[serde_as]
#[derive(Debug, Default, Deserialize)]
pub struct TransactionsQuery {
    #[serde_as(as = "DefaultOnError")]
    #[serde(default)]
    pub limit: Option<i64>,

    #[serde_as(as = "DefaultOnError")]
    #[serde(default)]
    pub offset: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct TransactionsResponse {
    pub transactions: Vec<WalletTransaction>,
}

pub async fn list_transactions<S, C>(
    State(state): State<AppState<S, C>>,
    identity: Identity,
    Query(query): Query<TransactionsQuery>,
) -> ApiResult<Json<TransactionsResponse>>
where
    S: Storage,
    C: Clock,
{
    let limit = query
        .limit
        .filter(|limit| *limit > 0)
        .unwrap_or(LIMIT_DEFAULT)
        .min(LIMIT_MAX);
    let offset = query
        .offset
        .filter(|offset| *offset >= 0)
        .unwrap_or(0)
        .min(OFFSET_MAX);

    let transactions = state
        .storage
        .get_transactions(identity.user_id, limit, offset)
        .await
        .map_err(database_error)?;

    Ok(Json(TransactionsResponse { transactions }))
}

fn mutate_wallet_error(error: MutateWalletError) -> ApiError {
    match error {
        MutateWalletError::Wallet(error @ WalletError::AmountNotPositive) => {
            ApiError::BadRequest(error.to_string())
        }

        MutateWalletError::Wallet(error @ WalletError::WalletNotFound) => {
            ApiError::NotFound(error.to_string())
        }

        MutateWalletError::Wallet(error) => ApiError::Conflict(error.to_string()),

        MutateWalletError::Database(error) => database_error(error),
    }
}
