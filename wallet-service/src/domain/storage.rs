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

use crate::domain::{TransactionType, User, Wallet, WalletError, WalletTransaction};
use auction_common::domain::{Amount, Role, TransactionId, UserId};
use thiserror::Error;

/// Storage abstraction for users, wallets and the ledger.
#[trait_variant::make(Send)]
pub trait Storage
where
    Self: Clone + Send + Sync + 'static,
{
    /// Create a user with the given normalised email.
    async fn save_user(
        &self,
        email: &str,
        password_hash: &str,
        role: Role,
    ) -> Result<User, SaveUserError>;

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, sqlx::Error>;

    async fn get_user_by_id(&self, id: UserId) -> Result<Option<User>, sqlx::Error>;

    /// Update email and/or password hash of an existing user; `None` fields
    /// are left unchanged. Returns `None` for an unknown user.
    async fn update_user(
        &self,
        id: UserId,
        email: Option<&str>,
        password_hash: Option<&str>,
    ) -> Result<Option<User>, SaveUserError>;

    /// Get the wallet of the given user, creating an empty one if absent.
    async fn get_or_create_wallet(&self, user_id: UserId) -> Result<Wallet, sqlx::Error>;

    /// Execute the given balance mutation atomically: lock the wallet row,
    /// validate, mutate and append a ledger entry with before/after
    /// snapshots. A failed precondition rolls everything back; no ledger
    /// entry is written. Only a deposit creates an absent wallet.
    async fn mutate_wallet(
        &self,
        user_id: UserId,
        transaction_type: TransactionType,
        amount: Amount,
        description: &str,
    ) -> Result<(Wallet, TransactionId), MutateWalletError>;

    /// List ledger entries of the given user, newest first.
    async fn get_transactions(
        &self,
        user_id: UserId,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<WalletTransaction>, sqlx::Error>;
}

#[derive(Debug, Error)]
pub enum SaveUserError {
    #[error("email already registered")]
    EmailTaken,

    #[error("cannot access database")]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, Error)]
pub enum MutateWalletError {
    #[error(transparent)]
    Wallet(#[from] WalletError),

    #[error("cannot access database")]
    Database(#[from] sqlx::Error),
}
