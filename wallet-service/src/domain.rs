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

pub mod storage;

use auction_common::domain::{Amount, Role, TransactionId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{
    fmt::{self, Display},
    str::FromStr,
};
use thiserror::Error;

/// Identifier of a wallet. Distinct from the owning user's id.
pub type WalletId = u64;

/// A registered user. The password hash never leaves this service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

/// A user's wallet. `frozen_balance` is the part of `balance` reserved
/// against outstanding bids; the invariant `0 <= frozen_balance <= balance`
/// holds at all times.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Wallet {
    pub id: WalletId,
    pub user_id: UserId,
    pub balance: Amount,
    pub frozen_balance: Amount,
}

impl Wallet {
    /// Balance not reserved against outstanding bids.
    pub fn available(&self) -> Amount {
        self.balance - self.frozen_balance
    }

    /// Apply the given balance mutation, validating its preconditions. On
    /// error the wallet is unchanged.
    pub fn apply(
        &mut self,
        transaction_type: TransactionType,
        amount: Amount,
    ) -> Result<(), WalletError> {
        if amount <= 0 {
            return Err(WalletError::AmountNotPositive);
        }

        match transaction_type {
            TransactionType::Deposit => {
                self.balance += amount;
            }

            TransactionType::Freeze => {
                if self.available() < amount {
                    return Err(WalletError::InsufficientAvailable);
                }
                self.frozen_balance += amount;
            }

            TransactionType::Unfreeze => {
                if self.frozen_balance < amount {
                    return Err(WalletError::InsufficientFrozen);
                }
                self.frozen_balance -= amount;
            }

            TransactionType::Charge => {
                if self.frozen_balance < amount {
                    return Err(WalletError::InsufficientFrozen);
                }
                if self.balance - amount < 0 {
                    return Err(WalletError::ResultingNegative);
                }
                self.balance -= amount;
                self.frozen_balance -= amount;
            }
        }

        Ok(())
    }
}

/// The four balance mutations recorded in the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    Deposit,
    Freeze,
    Unfreeze,
    Charge,
}

impl Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TransactionType::Deposit => "deposit",
            TransactionType::Freeze => "freeze",
            TransactionType::Unfreeze => "unfreeze",
            TransactionType::Charge => "charge",
        };

        f.write_str(s)
    }
}

impl FromStr for TransactionType {
    type Err = UnknownTransactionTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "deposit" => Ok(TransactionType::Deposit),
            "freeze" => Ok(TransactionType::Freeze),
            "unfreeze" => Ok(TransactionType::Unfreeze),
            "charge" => Ok(TransactionType::Charge),
            other => Err(UnknownTransactionTypeError(other.to_string())),
        }
    }
}

#[derive(Debug, Error)]
#[error("unknown transaction type {0}")]
pub struct UnknownTransactionTypeError(String);

/// An entry of the append-only ledger. The before/after snapshots bracket the
/// wallet state around the mutation and linearise the ledger per wallet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WalletTransaction {
    pub id: TransactionId,
    pub wallet_id: WalletId,
    pub user_id: UserId,

    #[serde(rename = "type")]
    pub transaction_type: TransactionType,

    pub amount: Amount,
    pub balance_before: Amount,
    pub balance_after: Amount,
    pub frozen_before: Amount,
    pub frozen_after: Amount,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

/// Precondition failures of wallet mutations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum WalletError {
    #[error("amount must be positive")]
    AmountNotPositive,

    #[error("wallet not found")]
    WalletNotFound,

    #[error("insufficient available balance")]
    InsufficientAvailable,

    #[error("insufficient frozen balance")]
    InsufficientFrozen,

    #[error("resulting balance would be negative")]
    ResultingNegative,
}
