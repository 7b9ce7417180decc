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

use figment::{
    Figment,
    providers::{Env, Format, Yaml},
};
use serde::de::DeserializeOwned;

const CONFIG_FILE_ENV: &str = "CONFIG_FILE";
const DEFAULT_CONFIG_FILE: &str = "config.yaml";
const ENV_PREFIX: &str = "APP__";
const ENV_SEPARATOR: &str = "__";

/// Load the configuration for a service: an optional YAML file (path taken
/// from `CONFIG_FILE`, defaulting to `config.yaml`) overridden by environment
/// variables prefixed with `APP__` and nested via `__`, e.g. `APP__API__PORT`.
pub fn load<T>() -> Result<T, figment::Error>
where
    T: DeserializeOwned,
{
    let config_file =
        std::env::var(CONFIG_FILE_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());

    Figment::new()
        .merge(Yaml::file(config_file))
        .merge(Env::prefixed(ENV_PREFIX).split(ENV_SEPARATOR))
        .extract()
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;
    use std::time::Duration;

    #[derive(Debug, Deserialize)]
    struct Config {
        api: ApiConfig,
    }

    #[derive(Debug, Deserialize)]
    struct ApiConfig {
        port: u16,

        #[serde(with = "humantime_serde")]
        timeout: Duration,
    }

    #[test]
    fn test_load() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("APP__API__PORT", "8080");
            jail.set_env("APP__API__TIMEOUT", "500ms");

            let config = super::load::<Config>()?;
            assert_eq!(config.api.port, 8080);
            assert_eq!(config.api.timeout, Duration::from_millis(500));

            Ok(())
        });
    }
}
