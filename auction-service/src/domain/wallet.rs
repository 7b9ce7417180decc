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

use auction_common::domain::{Amount, UserId};
use std::error::Error as StdError;

/// The wallet service operations used by the bid saga and lot completion.
/// The wallet service owns all balances; this service only ever asks it to
/// reserve, release or collect funds on behalf of a user.
#[trait_variant::make(Send)]
pub trait WalletClient
where
    Self: Clone + Send + Sync + 'static,
{
    type Error: StdError + Send + Sync + 'static;

    /// Reserve funds of the given user against an outstanding bid.
    async fn freeze(
        &self,
        user_id: UserId,
        amount: Amount,
        description: &str,
    ) -> Result<(), Self::Error>;

    /// Release previously reserved funds.
    async fn unfreeze(
        &self,
        user_id: UserId,
        amount: Amount,
        description: &str,
    ) -> Result<(), Self::Error>;

    /// Collect previously reserved funds.
    async fn charge(
        &self,
        user_id: UserId,
        amount: Amount,
        description: &str,
    ) -> Result<(), Self::Error>;
}
