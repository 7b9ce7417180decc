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

pub mod auth;
pub mod user;
pub mod wallet;

use crate::domain::{User, storage::Storage};
use anyhow::Context;
use auction_common::{
    domain::{Clock, Role, TokenService, UserId},
    infra::api::{ApiError, ApiResult},
};
use axum::{
    Router,
    routing::{get, post},
};
use log::info;
use serde::{Deserialize, Serialize};
use tokio::{net::TcpListener, signal::unix::Signal, task};

/// Shared state of all handlers.
#[derive(Clone)]
pub struct AppState<S, C> {
    pub storage: S,
    pub token_service: TokenService,
    pub clock: C,
}

/// Build the wallet service router.
pub fn app<S, C>(storage: S, token_service: TokenService, clock: C) -> Router
where
    S: Storage,
    C: Clock,
{
    let state = AppState {
        storage,
        token_service,
        clock,
    };

    Router::new()
        .route("/api/auth/register", post(auth::register::<S, C>))
        .route("/api/auth/login", post(auth::login::<S, C>))
        .route(
            "/api/users/me",
            get(user::me::<S, C>).put(user::update_me::<S, C>),
        )
        .route("/api/wallet", get(wallet::get_wallet::<S, C>))
        .route("/api/wallet/", get(wallet::get_wallet::<S, C>))
        .route("/api/wallet/deposit", post(wallet::deposit::<S, C>))
        .route("/api/wallet/freeze", post(wallet::freeze::<S, C>))
        .route("/api/wallet/unfreeze", post(wallet::unfreeze::<S, C>))
        .route("/api/wallet/charge", post(wallet::charge::<S, C>))
        .route(
            "/api/wallet/transactions",
            get(wallet::list_transactions::<S, C>),
        )
        .with_state(state)
}

/// Serve the API until SIGTERM.
pub async fn serve<S, C>(
    config: Config,
    storage: S,
    token_service: TokenService,
    clock: C,
    mut sigterm: Signal,
) -> anyhow::Result<()>
where
    S: Storage,
    C: Clock,
{
    let app = app(storage, token_service, clock);

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

/// Wire shape of a user; the password hash stays internal.
#[derive(Debug, Serialize)]
pub struct UserBody {
    pub id: UserId,
    pub email: String,
    pub role: Role,
}

impl From<User> for UserBody {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            role: user.role,
        }
    }
}

fn normalize_email(email: &str) -> ApiResult<String> {
    let email = email.trim().to_lowercase();

    if email.is_empty() || !email.contains('@') {
        return Err(ApiError::BadRequest("invalid email".to_string()));
    }

    Ok(email)
}

async fn hash_password(password: String) -> ApiResult<String> {
    if password.is_empty() {
        return Err(ApiError::BadRequest("password must not be empty".to_string()));
    }

    task::spawn_blocking(move || bcrypt::hash(password, bcrypt::DEFAULT_COST))
        .await
        .map_err(|_| ApiError::Internal("internal error".to_string()))?
        .map_err(|_| ApiError::Internal("internal error".to_string()))
}

async fn verify_password(password: String, password_hash: String) -> ApiResult<bool> {
    task::spawn_blocking(move || bcrypt::verify(password, &password_hash))
        .await
        .map_err(|_| ApiError::Internal("internal error".to_string()))?
        .map_err(|_| ApiError::Internal("internal error".to_string()))
}

#[cfg(test)]
mod tests {
    use crate::{
        domain::{
            TransactionType, User, Wallet, WalletTransaction,
            storage::{MutateWalletError, SaveUserError, Storage},
        },
        infra::api,
    };
    use auction_common::domain::{
        Amount, FixedClock, Role, TokenConfig, TokenService, TransactionId, UserId,
    };
    use axum::{
        Router,
        body::Body,
        http::{Request, StatusCode, header::CONTENT_TYPE},
    };
    use chrono::{DateTime, Utc};
    use serde_json::{Value, json};
    use std::sync::{Arc, Mutex};
    use tower::ServiceExt;

    #[derive(Debug, Default)]
    struct MockState {
        users: Vec<User>,
        wallets: Vec<Wallet>,
        transactions: Vec<WalletTransaction>,
    }

    #[derive(Debug, Clone, Default)]
    struct MockStorage(Arc<Mutex<MockState>>);

    impl MockStorage {
        fn created_at() -> DateTime<Utc> {
            DateTime::UNIX_EPOCH
        }
    }

    impl Storage for MockStorage {
        async fn save_user(
            &self,
            email: &str,
            password_hash: &str,
            role: Role,
        ) -> Result<User, SaveUserError> {
            let mut state = self.0.lock().unwrap();

            if state.users.iter().any(|user| user.email == email) {
                return Err(SaveUserError::EmailTaken);
            }

            let user = User {
                id: state.users.len() as UserId + 1,
                email: email.to_string(),
                password_hash: password_hash.to_string(),
                role,
                created_at: Self::created_at(),
            };
            state.users.push(user.clone());

            Ok(user)
        }

        async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, sqlx::Error> {
            let state = self.0.lock().unwrap();
            Ok(state.users.iter().find(|user| user.email == email).cloned())
        }

        async fn get_user_by_id(&self, id: UserId) -> Result<Option<User>, sqlx::Error> {
            let state = self.0.lock().unwrap();
            Ok(state.users.iter().find(|user| user.id == id).cloned())
        }

        async fn update_user(
            &self,
            id: UserId,
            email: Option<&str>,
            password_hash: Option<&str>,
        ) -> Result<Option<User>, SaveUserError> {
            let mut state = self.0.lock().unwrap();

            let Some(user) = state.users.iter_mut().find(|user| user.id == id) else {
                return Ok(None);
            };
            if let Some(email) = email {
                user.email = email.to_string();
            }
            if let Some(password_hash) = password_hash {
                user.password_hash = password_hash.to_string();
            }

            Ok(Some(user.clone()))
        }

        async fn get_or_create_wallet(&self, user_id: UserId) -> Result<Wallet, sqlx::Error> {
            let mut state = self.0.lock().unwrap();

            if let Some(wallet) = state.wallets.iter().find(|wallet| wallet.user_id == user_id) {
                return Ok(*wallet);
            }

            let wallet = Wallet {
                id: state.wallets.len() as u64 + 1,
                user_id,
                balance: 0,
                frozen_balance: 0,
            };
            state.wallets.push(wallet);

            Ok(wallet)
        }

        async fn mutate_wallet(
            &self,
            user_id: UserId,
            transaction_type: TransactionType,
            amount: Amount,
            description: &str,
        ) -> Result<(Wallet, TransactionId), MutateWalletError> {
            let mut state = self.0.lock().unwrap();

            let index = match state
                .wallets
                .iter()
                .position(|wallet| wallet.user_id == user_id)
            {
                Some(index) => index,

                None if transaction_type == TransactionType::Deposit => {
                    let wallet = Wallet {
                        id: state.wallets.len() as u64 + 1,
                        user_id,
                        balance: 0,
                        frozen_balance: 0,
                    };
                    state.wallets.push(wallet);
                    state.wallets.len() - 1
                }

                None => {
                    return Err(crate::domain::WalletError::WalletNotFound.into());
                }
            };

            let wallet = &mut state.wallets[index];
            let balance_before = wallet.balance;
            let frozen_before = wallet.frozen_balance;
            wallet.apply(transaction_type, amount)?;
            let wallet = *wallet;

            let transaction = WalletTransaction {
                id: state.transactions.len() as TransactionId + 1,
                wallet_id: wallet.id,
                user_id,
                transaction_type,
                amount,
                balance_before,
                balance_after: wallet.balance,
                frozen_before,
                frozen_after: wallet.frozen_balance,
                description: description.to_string(),
                created_at: Self::created_at(),
            };
            let transaction_id = transaction.id;
            state.transactions.push(transaction);

            Ok((wallet, transaction_id))
        }

        async fn get_transactions(
            &self,
            user_id: UserId,
            limit: i64,
            offset: i64,
        ) -> Result<Vec<WalletTransaction>, sqlx::Error> {
            let state = self.0.lock().unwrap();

            Ok(state
                .transactions
                .iter()
                .filter(|transaction| transaction.user_id == user_id)
                .rev()
                .skip(offset as usize)
                .take(limit as usize)
                .cloned()
                .collect())
        }
    }

    fn test_app() -> Router {
        let token_service = TokenService::new(&TokenConfig {
            secret: "test-secret".into(),
            ttl: std::time::Duration::from_secs(3_600),
        });

        api::app(
            MockStorage::default(),
            token_service,
            FixedClock(DateTime::UNIX_EPOCH),
        )
    }

    fn json_request(method: &str, uri: &str, user_id: Option<UserId>, body: Value) -> Request<Body> {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(CONTENT_TYPE, "application/json");
        if let Some(user_id) = user_id {
            builder = builder.header("x-user-id", user_id.to_string());
        }

        builder
            .body(Body::from(body.to_string()))
            .expect("request can be built")
    }

    async fn response_json(response: axum::response::Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body can be read");
        serde_json::from_slice(&bytes).expect("body is JSON")
    }

    #[tokio::test]
    async fn test_register_login() {
        let app = test_app();

        let request = json_request(
            "POST",
            "/api/auth/register",
            None,
            json!({ "email": "Alice@Example.com", "password": "correct horse", "role": "seller" }),
        );
        let response = app.clone().oneshot(request).await.expect("response");
        assert_eq!(response.status(), StatusCode::CREATED);
        let body = response_json(response).await;
        assert_eq!(body["user"]["email"], "alice@example.com");
        assert_eq!(body["user"]["role"], "seller");
        assert!(body["token"].as_str().is_some_and(|token| !token.is_empty()));

        // Same email again, even in different case.
        let request = json_request(
            "POST",
            "/api/auth/register",
            None,
            json!({ "email": "alice@example.com", "password": "correct horse" }),
        );
        let response = app.clone().oneshot(request).await.expect("response");
        assert_eq!(response.status(), StatusCode::CONFLICT);

        let request = json_request(
            "POST",
            "/api/auth/login",
            None,
            json!({ "email": "alice@example.com", "password": "wrong horse" }),
        );
        let response = app.clone().oneshot(request).await.expect("response");
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let request = json_request(
            "POST",
            "/api/auth/login",
            None,
            json!({ "email": "alice@example.com", "password": "correct horse" }),
        );
        let response = app.clone().oneshot(request).await.expect("response");
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_wallet_operations() {
        let app = test_app();

        // Identity is required.
        let request = json_request("POST", "/api/wallet/deposit", None, json!({ "amount": 100 }));
        let response = app.clone().oneshot(request).await.expect("response");
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let request = json_request(
            "POST",
            "/api/wallet/deposit",
            Some(1),
            json!({ "amount": 2_000 }),
        );
        let response = app.clone().oneshot(request).await.expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        let body = response_json(response).await;
        assert_eq!(body["wallet"]["balance"], 2_000);
        assert_eq!(body["transaction_id"], 1);

        // More than available cannot be frozen.
        let request = json_request(
            "POST",
            "/api/wallet/freeze",
            Some(1),
            json!({ "amount": 2_500 }),
        );
        let response = app.clone().oneshot(request).await.expect("response");
        assert_eq!(response.status(), StatusCode::CONFLICT);

        let request = json_request(
            "POST",
            "/api/wallet/freeze",
            Some(1),
            json!({ "amount": 1_100, "description": "Bid on lot #1" }),
        );
        let response = app.clone().oneshot(request).await.expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        let body = response_json(response).await;
        assert_eq!(body["wallet"]["frozen_balance"], 1_100);

        // Freezing on behalf of a user without a wallet fails.
        let request = json_request(
            "POST",
            "/api/wallet/freeze",
            Some(2),
            json!({ "amount": 100 }),
        );
        let response = app.clone().oneshot(request).await.expect("response");
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        // Invalid amount.
        let request = json_request(
            "POST",
            "/api/wallet/deposit",
            Some(1),
            json!({ "amount": 0 }),
        );
        let response = app.clone().oneshot(request).await.expect("response");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        // Transactions are listed newest first.
        let request = Request::builder()
            .method("GET")
            .uri("/api/wallet/transactions?limit=10&offset=0")
            .header("x-user-id", "1")
            .body(Body::empty())
            .expect("request can be built");
        let response = app.clone().oneshot(request).await.expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        let body = response_json(response).await;
        let transactions = body["transactions"].as_array().expect("array");
        assert_eq!(transactions.len(), 2);
        assert_eq!(transactions[0]["type"], "freeze");
        assert_eq!(transactions[1]["type"], "deposit");

        // Bogus pagination values fall back to defaults.
        let request = Request::builder()
            .method("GET")
            .uri("/api/wallet/transactions?limit=bogus&offset=-3")
            .header("x-user-id", "1")
            .body(Body::empty())
            .expect("request can be built");
        let response = app.clone().oneshot(request).await.expect("response");
        assert_eq!(response.status(), StatusCode::OK);
    }
}
