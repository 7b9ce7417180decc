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

use crate::{application, infra::api};
use auction_common::{infra::{pool::postgres, pub_sub::nats}, telemetry};
use serde::Deserialize;

/// Configuration of the notification service.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub api: api::Config,
    pub storage: postgres::Config,
    pub pub_sub: nats::Config,

    #[serde(default = "consumer_default")]
    pub consumer: application::Config,

    #[serde(default)]
    pub telemetry: telemetry::Config,
}

impl Config {
    pub fn load() -> Result<Self, figment::Error> {
        auction_common::config::load()
    }
}

fn consumer_default() -> application::Config {
    application::Config {
        group: "notifications".to_string(),
    }
}
