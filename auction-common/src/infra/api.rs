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

use crate::domain::{Role, UserId};
use axum::{
    Json,
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Response},
};
use log::error;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Identity header set by the gateway on forwarded requests; never trusted
/// from external callers.
pub const USER_ID_HEADER: &str = "x-user-id";

/// Role header set by the gateway on forwarded requests.
pub const USER_ROLE_HEADER: &str = "x-user-role";

pub type ApiResult<T> = Result<T, ApiError>;

/// The caller identity propagated by the gateway. The role is optional
/// because internal service-to-service calls only carry the user id.
#[derive(Debug, Clone, Copy)]
pub struct Identity {
    pub user_id: UserId,
    pub role: Option<Role>,
}

impl Identity {
    /// Return the caller's role if it is one of the allowed ones, otherwise
    /// a 403 error (401 if no role was propagated at all).
    pub fn require_role(&self, allowed: &[Role]) -> ApiResult<Role> {
        let role = self
            .role
            .ok_or_else(|| ApiError::Unauthorized("missing role".to_string()))?;

        if allowed.contains(&role) {
            Ok(role)
        } else {
            Err(ApiError::Forbidden(format!(
                "role {role} is not allowed to perform this operation"
            )))
        }
    }
}

impl<S> FromRequestParts<S> for Identity
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.parse::<UserId>().ok())
            .ok_or_else(|| ApiError::Unauthorized("missing identity".to_string()))?;

        let role = parts
            .headers
            .get(USER_ROLE_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.parse::<Role>().ok());

        Ok(Self { user_id, role })
    }
}

/// Error surfaced at the HTTP layer, rendered as `{"error": "..."}` with the
/// matching status code.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    TooManyRequests(String),

    #[error("{0}")]
    BadGateway(String),

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::TooManyRequests(_) => StatusCode::TOO_MANY_REQUESTS,
            ApiError::BadGateway(_) => StatusCode::BAD_GATEWAY,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.to_string(),
        };

        (self.status(), Json(body)).into_response()
    }
}

/// Map a database error onto a generic 500, logging the details which must
/// not leak to the client.
pub fn database_error(error: sqlx::Error) -> ApiError {
    error!(error:% = error; "database error");
    ApiError::Internal("internal error".to_string())
}

/// Wire shape of all error responses.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

#[cfg(test)]
mod tests {
    use crate::{
        domain::Role,
        infra::api::{ApiError, Identity},
    };
    use assert_matches::assert_matches;

    #[test]
    fn test_require_role() {
        let identity = Identity {
            user_id: 1,
            role: Some(Role::Seller),
        };
        assert_matches!(
            identity.require_role(&[Role::Seller, Role::Admin]),
            Ok(Role::Seller)
        );
        assert_matches!(
            identity.require_role(&[Role::Admin]),
            Err(ApiError::Forbidden(_))
        );

        let identity = Identity {
            user_id: 1,
            role: None,
        };
        assert_matches!(
            identity.require_role(&[Role::Buyer]),
            Err(ApiError::Unauthorized(_))
        );
    }
}
