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

use logforth::append;
use logforth::filter::env_filter::EnvFilterBuilder;
use serde::Deserialize;

/// Initialize logging to stderr with the configured level. Must be called
/// once, early in `main`.
pub fn init_logging(config: &Config) {
    let level = EnvFilterBuilder::from_spec(&config.level).build();

    logforth::starter_log::builder()
        .dispatch(|dispatch| dispatch.filter(level).append(append::Stderr::default()))
        .apply();
}

/// Configuration settings for logging.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default = "level_default")]
    pub level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            level: level_default(),
        }
    }
}

fn level_default() -> String {
    "info".to_string()
}
