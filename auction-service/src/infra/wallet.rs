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

use crate::domain::wallet::WalletClient;
use auction_common::{
    domain::{Amount, UserId},
    infra::api::USER_ID_HEADER,
};
use fastrace::trace;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

const BODY_SNIPPET_MAX: usize = 256;

/// HTTP client for the wallet service, implementing [WalletClient].
#[derive(Debug, Clone)]
pub struct HttpWalletClient {
    client: reqwest::Client,
    url: String,
}

impl HttpWalletClient {
    /// Create a new [HttpWalletClient] with the given configuration.
    pub fn new(config: Config) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .read_timeout(config.read_timeout)
            .build()?;

        Ok(Self {
            client,
            url: config.url,
        })
    }

    async fn post(
        &self,
        operation: &str,
        user_id: UserId,
        amount: Amount,
        description: &str,
    ) -> Result<(), WalletClientError> {
        let url = format!("{}/api/wallet/{operation}", self.url);
        let body = MutateRequest {
            amount,
            description,
        };

        let response = self
            .client
            .post(&url)
            .header(USER_ID_HEADER, user_id.to_string())
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            // Keep a snippet of the upstream body for the error surface.
            let body = response.text().await.unwrap_or_default();
            let body = body.chars().take(BODY_SNIPPET_MAX).collect();

            return Err(WalletClientError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(())
    }
}

impl WalletClient for HttpWalletClient {
    type Error = WalletClientError;

    #[trace]
    async fn freeze(
        &self,
        user_id: UserId,
        amount: Amount,
        description: &str,
    ) -> Result<(), Self::Error> {
        self.post("freeze", user_id, amount, description).await
    }

    #[trace]
    async fn unfreeze(
        &self,
        user_id: UserId,
        amount: Amount,
        description: &str,
    ) -> Result<(), Self::Error> {
        self.post("unfreeze", user_id, amount, description).await
    }

    #[trace]
    async fn charge(
        &self,
        user_id: UserId,
        amount: Amount,
        description: &str,
    ) -> Result<(), Self::Error> {
        self.post("charge", user_id, amount, description).await
    }
}

#[derive(Debug, Serialize)]
struct MutateRequest<'a> {
    amount: Amount,
    description: &'a str,
}

#[derive(Debug, Error)]
pub enum WalletClientError {
    #[error("cannot call wallet service")]
    Request(#[from] reqwest::Error),

    #[error("wallet service returned {status}: {body}")]
    Status { status: u16, body: String },
}

/// Configuration settings for [HttpWalletClient].
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub url: String,

    #[serde(with = "humantime_serde", default = "read_timeout_default")]
    pub read_timeout: Duration,
}

const fn read_timeout_default() -> Duration {
    Duration::from_millis(500)
}
