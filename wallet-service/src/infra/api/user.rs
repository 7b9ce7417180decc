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
    domain::storage::Storage,
    infra::api::{AppState, UserBody, auth::save_user_error, hash_password, normalize_email},
};
use auction_common::{
    domain::Clock,
    infra::api::{ApiError, ApiResult, Identity, database_error},
};
use axum::{Json, extract::State};
use serde::Deserialize;

pub async fn me<S, C>(
    State(state): State<AppState<S, C>>,
    identity: Identity,
) -> ApiResult<Json<UserBody>>
where
    S: Storage,
    C: Clock,
{
    let user = state
        .storage
        .get_user_by_id(identity.user_id)
        .await
        .map_err(database_error)?
        .ok_or_else(|| ApiError::NotFound("user not found".to_string()))?;

    Ok(Json(user.into()))
}

#[derive(Debug, Deserialize)]
pub struct UpdateUserRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

pub async fn update_me<S, C>(
    State(state): State<AppState<S, C>>,
    identity: Identity,
    Json(request): Json<UpdateUserRequest>,
) -> ApiResult<Json<UserBody>>
where
    S: Storage,
    C: Clock,
{
    let email = request
        .email
        .as_deref()
        .map(normalize_email)
        .transpose()?;

    let password_hash = match request.password {
        Some(password) => Some(hash_password(password).await?),
        None => None,
    };

    let user = state
        .storage
        .update_user(identity.user_id, email.as_deref(), password_hash.as_deref())
        .await
        .map_err(save_user_error)?
        .ok_or_else(|| ApiError::NotFound("user not found".to_string()))?;

    Ok(Json(user.into()))
}
