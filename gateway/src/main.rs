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

mod app;
mod auth;
mod config;
mod proxy;
mod rate_limit;

use crate::{
    app::Gateway, config::Config, proxy::Proxy, rate_limit::RateLimiter,
};
use anyhow::Context;
use auction_common::{domain::TokenService, telemetry};
use log::info;
use tokio::signal::unix::{SignalKind, signal};

#[tokio::main]
async fn main() {
    // Logging may not be initialized yet when this fails, hence stderr.
    if let Err(error) = run().await {
        eprintln!("gateway exited with error: {error:#}");
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let config = Config::load().context("load configuration")?;
    telemetry::init_logging(&config.telemetry);
    info!("starting gateway");

    let token_service = TokenService::new(&config.token);
    let rate_limiter = RateLimiter::new(config.rate_limit);
    let proxy = Proxy::new(&config.proxy).context("create proxy")?;
    let gateway = Gateway::new(token_service, rate_limiter, proxy);

    let sigterm = signal(SignalKind::terminate()).context("install SIGTERM handler")?;

    app::serve(config.api, gateway, sigterm).await
}
