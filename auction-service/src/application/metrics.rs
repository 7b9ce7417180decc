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

use metrics::{Counter, counter, describe_counter};

/// Saga and lifecycle counters.
#[derive(Clone)]
pub struct Metrics {
    bids_accepted: Counter,
    bids_rejected: Counter,
    lots_completed: Counter,
}

impl Metrics {
    pub fn new() -> Self {
        describe_counter!("auction_bids_accepted", "Number of accepted bids");
        describe_counter!(
            "auction_bids_rejected",
            "Number of bids rejected for price or concurrency reasons"
        );
        describe_counter!("auction_lots_completed", "Number of completed lots");

        Self {
            bids_accepted: counter!("auction_bids_accepted"),
            bids_rejected: counter!("auction_bids_rejected"),
            lots_completed: counter!("auction_lots_completed"),
        }
    }

    pub fn bid_accepted(&self) {
        self.bids_accepted.increment(1);
    }

    pub fn bid_rejected(&self) {
        self.bids_rejected.increment(1);
    }

    pub fn lot_completed(&self) {
        self.lots_completed.increment(1);
    }
}
