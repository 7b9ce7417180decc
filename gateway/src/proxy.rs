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

use axum::{
    body::Body,
    http::{Request, Response, StatusCode, header},
};
use log::error;
use serde::Deserialize;
use std::time::Duration;

const UPSTREAM_UNAVAILABLE_BODY: &str = r#"{"error":"upstream service unavailable"}"#;
const BODY_MAX: usize = 1 << 20;

/// Reverse proxy with a longest-prefix route table. Requests are forwarded
/// verbatim to a single upstream per prefix; upstream failures surface as a
/// fixed 502 body.
#[derive(Debug, Clone)]
pub struct Proxy {
    client: reqwest::Client,
    routes: Vec<Route>,
}

#[derive(Debug, Clone)]
pub struct Route {
    pub prefix: String,
    pub upstream: String,
}

impl Proxy {
    /// Create a new [Proxy] with the given configuration.
    pub fn new(config: &Config) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .read_timeout(config.read_timeout)
            .build()?;

        // Longest prefix wins, e.g. /api/users/me before /api/users.
        let mut routes = config.routes();
        routes.sort_by_key(|route| std::cmp::Reverse(route.prefix.len()));

        Ok(Self { client, routes })
    }

    fn upstream_for(&self, path: &str) -> Option<&str> {
        self.routes
            .iter()
            .find(|route| path.starts_with(route.prefix.as_str()))
            .map(|route| route.upstream.as_str())
    }

    /// Forward the given request to its upstream and relay the response.
    pub async fn forward(&self, request: Request<Body>) -> Response<Body> {
        let path = request.uri().path().to_string();

        let Some(upstream) = self.upstream_for(&path) else {
            return plain_response(StatusCode::NOT_FOUND, r#"{"error":"not found"}"#);
        };

        let path_and_query = request
            .uri()
            .path_and_query()
            .map(|path_and_query| path_and_query.as_str())
            .unwrap_or("/");
        let url = format!("{upstream}{path_and_query}");

        let (parts, body) = request.into_parts();

        let body = match axum::body::to_bytes(body, BODY_MAX).await {
            Ok(body) => body,
            Err(error) => {
                error!(path:% = path, error:% = error; "cannot read request body");
                return plain_response(StatusCode::BAD_REQUEST, r#"{"error":"bad_request"}"#);
            }
        };

        let mut headers = parts.headers;
        headers.remove(header::HOST);
        headers.remove(header::CONNECTION);
        headers.remove(header::CONTENT_LENGTH);

        let upstream_response = self
            .client
            .request(parts.method, &url)
            .headers(headers)
            .body(body)
            .send()
            .await;

        let upstream_response = match upstream_response {
            Ok(response) => response,
            Err(error) => {
                error!(path:% = path, error:% = error; "upstream service error");
                return plain_response(StatusCode::BAD_GATEWAY, UPSTREAM_UNAVAILABLE_BODY);
            }
        };

        let status = upstream_response.status();
        let mut headers = upstream_response.headers().clone();
        headers.remove(header::CONNECTION);
        headers.remove(header::TRANSFER_ENCODING);
        headers.remove(header::CONTENT_LENGTH);

        let body = match upstream_response.bytes().await {
            Ok(body) => body,
            Err(error) => {
                error!(path:% = path, error:% = error; "cannot read upstream response");
                return plain_response(StatusCode::BAD_GATEWAY, UPSTREAM_UNAVAILABLE_BODY);
            }
        };

        let mut response = Response::new(Body::from(body));
        *response.status_mut() = status;
        *response.headers_mut() = headers;
        response
    }
}

fn plain_response(status: StatusCode, body: &'static str) -> Response<Body> {
    let mut response = Response::new(Body::from(body));
    *response.status_mut() = status;
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        header::HeaderValue::from_static("application/json"),
    );
    response
}

/// Configuration settings for [Proxy]. The default route table maps the
/// public prefixes onto the three services; `routes` may add or override
/// entries.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub auction_service_url: String,
    pub wallet_service_url: String,
    pub notification_service_url: String,

    #[serde(with = "humantime_serde", default = "read_timeout_default")]
    pub read_timeout: Duration,

    #[serde(default)]
    pub routes: Vec<RouteConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RouteConfig {
    pub prefix: String,
    pub upstream: String,
}

impl Config {
    fn routes(&self) -> Vec<Route> {
        let mut routes = vec![
            route("/api/auth", &self.wallet_service_url),
            route("/api/users/me", &self.wallet_service_url),
            route("/api/wallet", &self.wallet_service_url),
            route("/api/users", &self.auction_service_url),
            route("/api/lots", &self.auction_service_url),
            route("/api/notifications", &self.notification_service_url),
        ];

        for extra in &self.routes {
            routes.retain(|route| route.prefix != extra.prefix);
            routes.push(Route {
                prefix: extra.prefix.clone(),
                upstream: extra.upstream.clone(),
            });
        }

        routes
    }
}

fn route(prefix: &str, upstream: &str) -> Route {
    Route {
        prefix: prefix.to_string(),
        upstream: upstream.to_string(),
    }
}

const fn read_timeout_default() -> Duration {
    Duration::from_millis(500)
}
