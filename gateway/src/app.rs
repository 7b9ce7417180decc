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
    auth::{self, AuthenticatedUser},
    proxy::Proxy,
    rate_limit::{self, RateLimiter},
};
use anyhow::Context;
use auction_common::domain::TokenService;
use axum::{
    Router,
    body::Body,
    extract::State,
    http::{HeaderValue, Request, Response, StatusCode, header},
    middleware::{self, Next},
};
use log::info;
use serde::Deserialize;
use std::sync::Arc;
use tokio::{net::TcpListener, signal::unix::Signal};
use tower_http::limit::RequestBodyLimitLayer;

const REQUEST_BODY_LIMIT: usize = 1 << 20;

/// Shared state of the gateway: the token validator, the bucket tables and
/// the reverse proxy. Stateless apart from the in-memory buckets.
#[derive(Clone)]
pub struct Gateway {
    pub token_service: TokenService,
    pub rate_limiter: Arc<RateLimiter>,
    pub proxy: Arc<Proxy>,
}

impl Gateway {
    pub fn new(token_service: TokenService, rate_limiter: RateLimiter, proxy: Proxy) -> Self {
        Self {
            token_service,
            rate_limiter: Arc::new(rate_limiter),
            proxy: Arc::new(proxy),
        }
    }
}

/// Build the gateway router: authentication, then rate limiting, then the
/// catch-all proxy.
pub fn app(gateway: Gateway) -> Router {
    Router::new()
        .fallback(forward)
        .layer(middleware::from_fn_with_state(
            gateway.clone(),
            rate_limit_middleware,
        ))
        .layer(middleware::from_fn_with_state(gateway.clone(), auth::middleware))
        .layer(RequestBodyLimitLayer::new(REQUEST_BODY_LIMIT))
        .with_state(gateway)
}

/// Serve the gateway until SIGTERM.
pub async fn serve(config: Config, gateway: Gateway, mut sigterm: Signal) -> anyhow::Result<()> {
    let app = app(gateway);

    let listener = TcpListener::bind((config.address.as_str(), config.port))
        .await
        .context("bind TcpListener")?;
    info!(address:% = config.address, port = config.port; "gateway listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            sigterm.recv().await;
        })
        .await
        .context("serve gateway")
}

async fn forward(State(gateway): State<Gateway>, request: Request<Body>) -> Response<Body> {
    gateway.proxy.forward(request).await
}

/// Rate limiting keyed by the authenticated user; unauthenticated (auth
/// exempt) requests are not limited.
async fn rate_limit_middleware(
    State(gateway): State<Gateway>,
    request: Request<Body>,
    next: Next,
) -> Response<Body> {
    let Some(AuthenticatedUser(user_id)) =
        request.extensions().get::<AuthenticatedUser>().copied()
    else {
        return next.run(request).await;
    };

    if !gateway.rate_limiter.allow_user(user_id) {
        return too_many_requests();
    }

    if rate_limit::is_bid_path(request.uri().path()) && !gateway.rate_limiter.allow_bid(user_id) {
        return too_many_requests();
    }

    next.run(request).await
}

fn too_many_requests() -> Response<Body> {
    let mut response = Response::new(Body::from(r#"{"error":"rate limit exceeded"}"#));
    *response.status_mut() = StatusCode::TOO_MANY_REQUESTS;
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    response
}

/// Configuration settings for the gateway listener.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default = "address_default")]
    pub address: String,

    pub port: u16,
}

fn address_default() -> String {
    "0.0.0.0".to_string()
}
