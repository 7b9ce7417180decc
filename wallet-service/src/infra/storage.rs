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

use crate::domain::{
    TransactionType, User, Wallet, WalletError, WalletTransaction,
    storage::{MutateWalletError, SaveUserError, Storage},
};
use auction_common::{
    domain::{Amount, Role, TransactionId, UserId},
    infra::pool::postgres::PostgresPool,
};
use chrono::{DateTime, Utc};
use fastrace::trace;
use indoc::indoc;

type UserRow = (i64, String, String, String, DateTime<Utc>);
type TransactionRow = (
    i64,
    i64,
    i64,
    String,
    i64,
    i64,
    i64,
    i64,
    i64,
    String,
    DateTime<Utc>,
);

/// Postgres based implementation of [Storage].
#[derive(Debug, Clone)]
pub struct PostgresStorage {
    pool: PostgresPool,
}

impl PostgresStorage {
    /// Create a new [PostgresStorage].
    pub fn new(pool: PostgresPool) -> Self {
        Self { pool }
    }
}

impl Storage for PostgresStorage {
    #[trace]
    async fn save_user(
        &self,
        email: &str,
        password_hash: &str,
        role: Role,
    ) -> Result<User, SaveUserError> {
        let query = indoc! {"
            INSERT INTO users (email, password_hash, role)
            VALUES ($1, $2, $3)
            RETURNING id, created_at
        "};

        let (id, created_at) = sqlx::query_as::<_, (i64, DateTime<Utc>)>(query)
            .bind(email)
            .bind(password_hash)
            .bind(role.to_string())
            .fetch_one(&*self.pool)
            .await
            .map_err(|error| {
                if error
                    .as_database_error()
                    .is_some_and(|e| e.is_unique_violation())
                {
                    SaveUserError::EmailTaken
                } else {
                    SaveUserError::Database(error)
                }
            })?;

        Ok(User {
            id: id as UserId,
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            role,
            created_at,
        })
    }

    #[trace]
    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, sqlx::Error> {
        let query = indoc! {"
            SELECT id, email, password_hash, role, created_at
            FROM users
            WHERE email = $1
        "};

        sqlx::query_as::<_, UserRow>(query)
            .bind(email)
            .fetch_optional(&*self.pool)
            .await?
            .map(user_from_row)
            .transpose()
    }

    #[trace]
    async fn get_user_by_id(&self, id: UserId) -> Result<Option<User>, sqlx::Error> {
        let query = indoc! {"
            SELECT id, email, password_hash, role, created_at
            FROM users
            WHERE id = $1
        "};

        sqlx::query_as::<_, UserRow>(query)
            .bind(id as i64)
            .fetch_optional(&*self.pool)
            .await?
            .map(user_from_row)
            .transpose()
    }

    #[trace]
    async fn update_user(
        &self,
        id: UserId,
        email: Option<&str>,
        password_hash: Option<&str>,
    ) -> Result<Option<User>, SaveUserError> {
        let query = indoc! {"
            UPDATE users
            SET email = COALESCE($2, email),
                password_hash = COALESCE($3, password_hash)
            WHERE id = $1
            RETURNING id, email, password_hash, role, created_at
        "};

        let user = sqlx::query_as::<_, UserRow>(query)
            .bind(id as i64)
            .bind(email)
            .bind(password_hash)
            .fetch_optional(&*self.pool)
            .await
            .map_err(|error| {
                if error
                    .as_database_error()
                    .is_some_and(|e| e.is_unique_violation())
                {
                    SaveUserError::EmailTaken
                } else {
                    SaveUserError::Database(error)
                }
            })?;

        user.map(user_from_row).transpose().map_err(Into::into)
    }

    #[trace]
    async fn get_or_create_wallet(&self, user_id: UserId) -> Result<Wallet, sqlx::Error> {
        let insert = indoc! {"
            INSERT INTO wallets (user_id)
            VALUES ($1)
            ON CONFLICT (user_id) DO NOTHING
        "};

        sqlx::query(insert)
            .bind(user_id as i64)
            .execute(&*self.pool)
            .await?;

        let select = indoc! {"
            SELECT id, user_id, balance, frozen_balance
            FROM wallets
            WHERE user_id = $1
        "};

        let (id, user_id, balance, frozen_balance) =
            sqlx::query_as::<_, (i64, i64, i64, i64)>(select)
                .bind(user_id as i64)
                .fetch_one(&*self.pool)
                .await?;

        Ok(Wallet {
            id: id as u64,
            user_id: user_id as UserId,
            balance,
            frozen_balance,
        })
    }

    #[trace]
    async fn mutate_wallet(
        &self,
        user_id: UserId,
        transaction_type: TransactionType,
        amount: Amount,
        description: &str,
    ) -> Result<(Wallet, TransactionId), MutateWalletError> {
        if amount <= 0 {
            return Err(WalletError::AmountNotPositive.into());
        }

        let mut tx = self.pool.begin().await?;

        let select = indoc! {"
            SELECT id, user_id, balance, frozen_balance
            FROM wallets
            WHERE user_id = $1
            FOR UPDATE
        "};

        let wallet = sqlx::query_as::<_, (i64, i64, i64, i64)>(select)
            .bind(user_id as i64)
            .fetch_optional(&mut *tx)
            .await?;

        let mut wallet = match wallet {
            Some((id, user_id, balance, frozen_balance)) => Wallet {
                id: id as u64,
                user_id: user_id as UserId,
                balance,
                frozen_balance,
            },

            // Wallets are created lazily, but only a deposit makes sense on
            // a wallet that never existed.
            None if transaction_type == TransactionType::Deposit => {
                let insert = indoc! {"
                    INSERT INTO wallets (user_id)
                    VALUES ($1)
                    RETURNING id
                "};

                let (id,) = sqlx::query_as::<_, (i64,)>(insert)
                    .bind(user_id as i64)
                    .fetch_one(&mut *tx)
                    .await?;

                Wallet {
                    id: id as u64,
                    user_id,
                    balance: 0,
                    frozen_balance: 0,
                }
            }

            None => return Err(WalletError::WalletNotFound.into()),
        };

        let balance_before = wallet.balance;
        let frozen_before = wallet.frozen_balance;

        wallet.apply(transaction_type, amount)?;

        let update = indoc! {"
            UPDATE wallets
            SET balance = $1, frozen_balance = $2
            WHERE id = $3
        "};

        sqlx::query(update)
            .bind(wallet.balance)
            .bind(wallet.frozen_balance)
            .bind(wallet.id as i64)
            .execute(&mut *tx)
            .await?;

        let insert_transaction = indoc! {"
            INSERT INTO transactions (
                wallet_id,
                user_id,
                type,
                amount,
                balance_before,
                balance_after,
                frozen_before,
                frozen_after,
                description
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING id
        "};

        let (transaction_id,) = sqlx::query_as::<_, (i64,)>(insert_transaction)
            .bind(wallet.id as i64)
            .bind(user_id as i64)
            .bind(transaction_type.to_string())
            .bind(amount)
            .bind(balance_before)
            .bind(wallet.balance)
            .bind(frozen_before)
            .bind(wallet.frozen_balance)
            .bind(description)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok((wallet, transaction_id as TransactionId))
    }

    #[trace]
    async fn get_transactions(
        &self,
        user_id: UserId,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<WalletTransaction>, sqlx::Error> {
        let query = indoc! {"
            SELECT
                id,
                wallet_id,
                user_id,
                type,
                amount,
                balance_before,
                balance_after,
                frozen_before,
                frozen_after,
                description,
                created_at
            FROM transactions
            WHERE user_id = $1
            ORDER BY id DESC
            LIMIT $2 OFFSET $3
        "};

        sqlx::query_as::<_, TransactionRow>(query)
            .bind(user_id as i64)
            .bind(limit)
            .bind(offset)
            .fetch_all(&*self.pool)
            .await?
            .into_iter()
            .map(transaction_from_row)
            .collect()
    }
}

fn user_from_row(row: UserRow) -> Result<User, sqlx::Error> {
    let (id, email, password_hash, role, created_at) = row;

    let role = role
        .parse::<Role>()
        .map_err(|error| sqlx::Error::Decode(error.into()))?;

    Ok(User {
        id: id as UserId,
        email,
        password_hash,
        role,
        created_at,
    })
}

fn transaction_from_row(row: TransactionRow) -> Result<WalletTransaction, sqlx::Error> {
    let (
        id,
        wallet_id,
        user_id,
        transaction_type,
        amount,
        balance_before,
        balance_after,
        frozen_before,
        frozen_after,
        description,
        created_at,
    ) = row;

    let transaction_type = transaction_type
        .parse::<TransactionType>()
        .map_err(|error| sqlx::Error::Decode(error.into()))?;

    Ok(WalletTransaction {
        id: id as u64,
        wallet_id: wallet_id as u64,
        user_id: user_id as UserId,
        transaction_type,
        amount,
        balance_before,
        balance_after,
        frozen_before,
        frozen_after,
        description,
        created_at,
    })
}

#[cfg(test)]
mod tests {
    use crate::{
        domain::{TransactionType, WalletError, storage::MutateWalletError, storage::Storage},
        infra::storage::PostgresStorage,
    };
    use anyhow::Context;
    use assert_matches::assert_matches;
    use auction_common::{domain::Role, infra::pool::postgres::PostgresPool};
    use testcontainers::runners::AsyncRunner;
    use testcontainers_modules::postgres::Postgres;

    #[tokio::test]
    async fn test() -> anyhow::Result<()> {
        let postgres_container = Postgres::default()
            .start()
            .await
            .context("start Postgres container")?;
        let postgres_port = postgres_container
            .get_host_port_ipv4(5432)
            .await
            .context("get Postgres port")?;

        let config = auction_common::infra::pool::postgres::Config {
            host: "localhost".to_string(),
            port: postgres_port,
            dbname: "postgres".to_string(),
            user: "postgres".to_string(),
            password: "postgres".into(),
            max_connections: 5,
        };
        let pool = PostgresPool::new(config)
            .await
            .context("create PostgresPool")?;
        sqlx::migrate!().run(&*pool).await.context("run migrations")?;

        let storage = PostgresStorage::new(pool);

        // Users.
        let user = storage
            .save_user("alice@example.com", "hash", Role::Buyer)
            .await
            .context("save user")?;
        assert_matches!(
            storage.save_user("alice@example.com", "hash", Role::Buyer).await,
            Err(crate::domain::storage::SaveUserError::EmailTaken)
        );
        let loaded = storage
            .get_user_by_email("alice@example.com")
            .await
            .context("get user by email")?;
        assert_eq!(loaded.as_ref(), Some(&user));

        // Wallet is created lazily.
        let wallet = storage
            .get_or_create_wallet(user.id)
            .await
            .context("get or create wallet")?;
        assert_eq!(wallet.balance, 0);
        assert_eq!(wallet.frozen_balance, 0);

        // Mutations only on a valid precondition, with ledger snapshots.
        let (wallet, _) = storage
            .mutate_wallet(user.id, TransactionType::Deposit, 2_000, "Deposit")
            .await
            .context("deposit")?;
        assert_eq!(wallet.balance, 2_000);

        let (wallet, _) = storage
            .mutate_wallet(user.id, TransactionType::Freeze, 1_100, "Bid on lot #1")
            .await
            .context("freeze")?;
        assert_eq!(wallet.frozen_balance, 1_100);

        let frozen_too_much = storage
            .mutate_wallet(user.id, TransactionType::Freeze, 1_000, "Bid on lot #2")
            .await;
        assert_matches!(
            frozen_too_much,
            Err(MutateWalletError::Wallet(WalletError::InsufficientAvailable))
        );

        let (wallet, _) = storage
            .mutate_wallet(user.id, TransactionType::Charge, 1_100, "Auction payment")
            .await
            .context("charge")?;
        assert_eq!(wallet.balance, 900);
        assert_eq!(wallet.frozen_balance, 0);

        // Ledger is newest first and gap-free.
        let transactions = storage
            .get_transactions(user.id, 10, 0)
            .await
            .context("get transactions")?;
        assert_eq!(transactions.len(), 3);
        assert_eq!(transactions[0].transaction_type, TransactionType::Charge);
        assert_eq!(transactions[2].transaction_type, TransactionType::Deposit);
        for pair in transactions.windows(2) {
            assert_eq!(pair[1].balance_after, pair[0].balance_before);
            assert_eq!(pair[1].frozen_after, pair[0].frozen_before);
        }

        // Freeze on a missing wallet must not create one.
        assert_matches!(
            storage.mutate_wallet(999, TransactionType::Freeze, 1, "Bid").await,
            Err(MutateWalletError::Wallet(WalletError::WalletNotFound))
        );

        Ok(())
    }
}
