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

use auction_common::domain::UserId;
use dashmap::DashMap;
use parking_lot::Mutex;
use serde::Deserialize;
use std::time::Instant;

/// Two independent token-bucket tables keyed by user id: a general one for
/// all requests and a stricter one for the bid path. Buckets are created
/// lazily and never evicted; the table is bounded by the active user count.
pub struct RateLimiter {
    user_buckets: DashMap<UserId, Mutex<TokenBucket>>,
    bid_buckets: DashMap<UserId, Mutex<TokenBucket>>,
    config: Config,
}

impl RateLimiter {
    pub fn new(config: Config) -> Self {
        Self {
            user_buckets: DashMap::new(),
            bid_buckets: DashMap::new(),
            config,
        }
    }

    /// Take one token from the user's general bucket.
    pub fn allow_user(&self, user_id: UserId) -> bool {
        Self::allow(
            &self.user_buckets,
            user_id,
            self.config.user_capacity,
            self.config.user_refill_per_second,
            Instant::now(),
        )
    }

    /// Take one token from the user's bid bucket.
    pub fn allow_bid(&self, user_id: UserId) -> bool {
        Self::allow(
            &self.bid_buckets,
            user_id,
            self.config.bid_capacity,
            self.config.bid_refill_per_second,
            Instant::now(),
        )
    }

    fn allow(
        buckets: &DashMap<UserId, Mutex<TokenBucket>>,
        user_id: UserId,
        capacity: u32,
        refill_per_second: f64,
        now: Instant,
    ) -> bool {
        let bucket = buckets
            .entry(user_id)
            .or_insert_with(|| Mutex::new(TokenBucket::new(capacity, refill_per_second)));

        bucket.lock().allow(now)
    }
}

/// A single token bucket. Refill is computed from elapsed wall-clock time
/// since the last refill, capped at capacity; a request consumes one token.
#[derive(Debug)]
pub struct TokenBucket {
    capacity: f64,
    tokens: f64,
    refill_per_second: f64,
    last_refill: Instant,
}

impl TokenBucket {
    pub fn new(capacity: u32, refill_per_second: f64) -> Self {
        Self {
            capacity: capacity as f64,
            tokens: capacity as f64,
            refill_per_second,
            last_refill: Instant::now(),
        }
    }

    pub fn allow(&mut self, now: Instant) -> bool {
        let elapsed = now.saturating_duration_since(self.last_refill).as_secs_f64();
        self.last_refill = now;

        self.tokens = (self.tokens + elapsed * self.refill_per_second).min(self.capacity);

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

/// Configuration settings for [RateLimiter]. The defaults are 100 requests
/// per minute overall and 10 bids per minute.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default = "user_capacity_default")]
    pub user_capacity: u32,

    #[serde(default = "user_refill_default")]
    pub user_refill_per_second: f64,

    #[serde(default = "bid_capacity_default")]
    pub bid_capacity: u32,

    #[serde(default = "bid_refill_default")]
    pub bid_refill_per_second: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            user_capacity: user_capacity_default(),
            user_refill_per_second: user_refill_default(),
            bid_capacity: bid_capacity_default(),
            bid_refill_per_second: bid_refill_default(),
        }
    }
}

const fn user_capacity_default() -> u32 {
    100
}

fn user_refill_default() -> f64 {
    100.0 / 60.0
}

const fn bid_capacity_default() -> u32 {
    10
}

fn bid_refill_default() -> f64 {
    10.0 / 60.0
}

/// A request on the bid path consumes from the bid bucket as well.
pub fn is_bid_path(path: &str) -> bool {
    path.ends_with("/bids") || path.contains("/bids/")
}
