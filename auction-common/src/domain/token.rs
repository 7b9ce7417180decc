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
use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

const SUBJECT: &str = "user_auth";

/// Claims carried by a platform bearer token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub uid: UserId,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
    pub sub: String,
}

/// Mints and validates HMAC-signed bearer tokens. The wallet service mints,
/// the gateway validates; both share the secret via configuration.
#[derive(Clone)]
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl: Duration,
}

impl TokenService {
    pub fn new(config: &TokenConfig) -> Self {
        let secret = config.secret.expose_secret().as_bytes();

        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            ttl: config.ttl,
        }
    }

    /// Produce a signed token for the given user, valid for the configured
    /// TTL starting at `now`.
    pub fn generate(
        &self,
        uid: UserId,
        role: Role,
        now: DateTime<Utc>,
    ) -> Result<String, TokenError> {
        let claims = Claims {
            uid,
            role,
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
            sub: SUBJECT.to_string(),
        };

        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(TokenError::Encode)
    }

    /// Validate the given token and return its claims. Rejects tokens that
    /// are expired, carry a bad signature or use a non-HMAC algorithm.
    pub fn parse(&self, token: &str) -> Result<Claims, TokenError> {
        let validation = Validation::new(Algorithm::HS256);

        jsonwebtoken::decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(TokenError::Invalid)
    }
}

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("cannot encode token")]
    Encode(#[source] jsonwebtoken::errors::Error),

    #[error("invalid token")]
    Invalid(#[source] jsonwebtoken::errors::Error),
}

/// Configuration settings for [TokenService].
#[derive(Debug, Clone, Deserialize)]
pub struct TokenConfig {
    pub secret: SecretString,

    #[serde(with = "humantime_serde", default = "ttl_default")]
    pub ttl: Duration,
}

const fn ttl_default() -> Duration {
    Duration::from_secs(24 * 60 * 60)
}
