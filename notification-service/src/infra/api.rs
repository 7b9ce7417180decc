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

use crate::domain::{Notification, NotificationFilter, storage::Storage};
use anyhow::Context;
use auction_common::{
    domain::NotificationId,
    infra::api::{ApiError, ApiResult, Identity, database_error},
};
use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, patch},
};
use log::info;
use serde::{Deserialize, Serialize};
use serde_with::{DefaultOnError, serde_as};
use tokio::{net::TcpListener, signal::unix::Signal};

const LIMIT_DEFAULT: i64 = 20;
const LIMIT_MAX: i64 = 100;
const OFFSET_MAX: i64 = 10_000;

/// Build the notification service router.
pub fn app<S>(storage: S) -> Router
where
    S: Storage,
{
    Router::new()
        .route("/api/notifications", get(list::<S>))
        .route("/api/notifications/", get(list::<S>))
        .route("/api/notifications/{id}/read", patch(mark_as_read::<S>))
        .route("/api/notifications/unread-count", get(unread_count::<S>))
        .with_state(storage)
}

/// Serve the API until SIGTERM.
pub async fn serve<S>(config: Config, storage: S, mut sigterm: Signal) -> anyhow::Result<()>
where
    S: Storage,
{
    let app = app(storage);

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

#[serde_as]
#[derive(Debug, Default, Deserialize)]
pub struct NotificationsQuery {
    #[serde_as(as = "DefaultOnError")]
    #[serde(default)]
    pub is_read: Option<bool>,

    #[serde_as(as = "DefaultOnError")]
    #[serde(default)]
    pub limit: Option<i64>,

    #[serde_as(as = "DefaultOnError")]
    #[serde(default)]
    pub offset: Option<i64>,

    #[serde(default)]
    pub order: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct NotificationsResponse {
    pub notifications: Vec<Notification>,
}

#[derive(Debug, Serialize)]
pub struct UnreadCountResponse {
    pub count: u64,
}

async fn list<S>(
    State(storage): State<S>,
    identity: Identity,
    Query(query): Query<NotificationsQuery>,
) -> ApiResult<Json<NotificationsResponse>>
where
    S: Storage,
{
    let filter = NotificationFilter {
        is_read: query.is_read,
        limit: query
            .limit
            .filter(|limit| *limit > 0)
            .unwrap_or(LIMIT_DEFAULT)
            .min(LIMIT_MAX),
        offset: query
            .offset
            .filter(|offset| *offset >= 0)
            .unwrap_or(0)
            .min(OFFSET_MAX),
        newest_first: query.order.as_deref() != Some("asc"),
    };

    let notifications = storage
        .get_notifications(identity.user_id, &filter)
        .await
        .map_err(database_error)?;

    Ok(Json(NotificationsResponse { notifications }))
}

async fn mark_as_read<S>(
    State(storage): State<S>,
    identity: Identity,
    Path(id): Path<NotificationId>,
) -> ApiResult<StatusCode>
where
    S: Storage,
{
    let marked = storage
        .mark_as_read(identity.user_id, id)
        .await
        .map_err(database_error)?;

    if !marked {
        return Err(ApiError::NotFound("notification not found".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}

async fn unread_count<S>(
    State(storage): State<S>,
    identity: Identity,
) -> ApiResult<Json<UnreadCountResponse>>
where
    S: Storage,
{
    let count = storage
        .count_unread(identity.user_id)
        .await
        .map_err(database_error)?;

    Ok(Json(UnreadCountResponse { count }))
}
