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

use crate::app::Gateway;
use auction_common::{
    domain::UserId,
    infra::api::{USER_ID_HEADER, USER_ROLE_HEADER},
};
use axum::{
    body::Body,
    extract::State,
    http::{HeaderValue, Request, Response, StatusCode, header},
    middleware::Next,
};
use log::debug;

const AUTH_PREFIX: &str = "/api/auth/";

/// The authenticated caller, attached as a request extension for the rate
/// limiting middleware.
#[derive(Debug, Clone, Copy)]
pub struct AuthenticatedUser(pub UserId);

/// Bearer-token middleware. Requests under `/api/auth/` pass through
/// unauthenticated; everything else needs a valid token. Caller-supplied
/// identity headers are always dropped and replaced from the token claims.
pub async fn middleware(
    State(gateway): State<Gateway>,
    mut request: Request<Body>,
    next: Next,
) -> Response<Body> {
    if request.uri().path().starts_with(AUTH_PREFIX) {
        return next.run(request).await;
    }

    let token = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "));

    let Some(token) = token else {
        return unauthorized("missing bearer token");
    };

    let claims = match gateway.token_service.parse(token) {
        Ok(claims) => claims,
        Err(error) => {
            debug!(error:% = error; "token rejected");
            return unauthorized("invalid token");
        }
    };

    // Identity spoofing prevention: whatever the caller sent is dropped.
    let headers = request.headers_mut();
    headers.remove(USER_ID_HEADER);
    headers.remove(USER_ROLE_HEADER);

    let user_id = HeaderValue::from_str(&claims.uid.to_string());
    let role = HeaderValue::from_str(&claims.role.to_string());
    let (Ok(user_id), Ok(role)) = (user_id, role) else {
        return unauthorized("invalid token");
    };
    headers.insert(USER_ID_HEADER, user_id);
    headers.insert(USER_ROLE_HEADER, role);

    request
        .extensions_mut()
        .insert(AuthenticatedUser(claims.uid));

    next.run(request).await
}

fn unauthorized(message: &str) -> Response<Body> {
    let body = format!(r#"{{"error":"{message}"}}"#);

    let mut response = Response::new(Body::from(body));
    *response.status_mut() = StatusCode::UNAUTHORIZED;
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    response
}
