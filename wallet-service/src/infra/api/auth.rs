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
    domain::storage::{SaveUserError, Storage},
    infra::api::{AppState, UserBody, hash_password, normalize_email, verify_password},
};
use auction_common::{
    domain::{Clock, Role},
    infra::api::{ApiError, ApiResult, database_error},
};
use axum::{Json, extract::State, http::StatusCode};
use log::info;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,

    #[serde(default = "role_default")]
    pub role: Role,
}

fn role_default() -> Role {
    Role::Buyer
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: UserBody,
}

pub async fn register<S, C>(
    State(state): State<AppState<S, C>>,
    Json(request): Json<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<AuthResponse>)>
where
    S: Storage,
    C: Clock,
{
    let email = normalize_email(&request.email)?;
    let password_hash = hash_password(request.password).await?;

    let user = state
        .storage
        .save_user(&email, &password_hash, request.role)
        .await
        .map_err(save_user_error)?;

    info!(user_id = user.id, role:% = user.role; "user registered");

    let token = state
        .token_service
        .generate(user.id, user.role, state.clock.now())
        .map_err(|_| ApiError::Internal("internal error".to_string()))?;

    let response = AuthResponse {
        token,
        user: user.into(),
    };

    Ok((StatusCode::CREATED, Json(response)))
}

pub async fn login<S, C>(
    State(state): State<AppState<S, C>>,
    Json(request): Json<LoginRequest>,
) -> ApiResult<Json<AuthResponse>>
where
    S: Storage,
    C: Clock,
{
    let email = normalize_email(&request.email)?;

    let user = state
        .storage
        .get_user_by_email(&email)
        .await
        .map_err(database_error)?
        .ok_or_else(invalid_credentials)?;

    let valid = verify_password(request.password, user.password_hash.clone()).await?;
    if !valid {
        return Err(invalid_credentials());
    }

    let token = state
        .token_service
        .generate(user.id, user.role, state.clock.now())
        .map_err(|_| ApiError::Internal("internal error".to_string()))?;

    let response = AuthResponse {
        token,
        user: user.into(),
    };

    Ok(Json(response))
}

pub(super) fn save_user_error(error: SaveUserError) -> ApiError {
    match error {
        SaveUserError::EmailTaken => ApiError::Conflict("email already registered".to_string()),
        SaveUserError::Database(error) => database_error(error),
    }
}

fn invalid_credentials() -> ApiError {
    ApiError::Unauthorized("invalid credentials".to_string())
}
