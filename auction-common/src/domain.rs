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

mod clock;
mod event;
mod pub_sub;
mod role;
mod token;

pub use clock::*;
pub use event::*;
pub use pub_sub::*;
pub use role::*;
pub use token::*;

/// Identifier of a user; minted by the wallet service.
pub type UserId = u64;

/// Identifier of a lot; minted by the auction service.
pub type LotId = u64;

/// Identifier of a bid; minted by the auction service.
pub type BidId = u64;

/// Identifier of a notification; minted by the notification service.
pub type NotificationId = u64;

/// Identifier of a wallet ledger entry.
pub type TransactionId = u64;

/// A monetary amount in the smallest currency unit.
pub type Amount = i64;
