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

mod application;
mod config;
mod domain;
mod infra;

use crate::{
    application::Application,
    config::Config,
    infra::{storage::PostgresStorage, wallet::HttpWalletClient},
};
use anyhow::Context;
use auction_common::{
    domain::SystemClock,
    infra::{pool::postgres::PostgresPool, pub_sub::nats::NatsPubSub},
    telemetry,
};
use log::info;
use tokio::{
    select,
    signal::unix::{SignalKind, signal},
    task,
};

#[tokio::main]
async fn main() {
    // Logging may not be initialized yet when this fails, hence stderr.
    if let Err(error) = run().await {
        eprintln!("auction-service exited with error: {error:#}");
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let config = Config::load().context("load configuration")?;
    telemetry::init_logging(&config.telemetry);
    info!("starting auction-service");

    let pool = PostgresPool::new(config.storage)
        .await
        .context("create Postgres pool")?;
    sqlx::migrate!()
        .run(&*pool)
        .await
        .context("run database migrations")?;

    let storage = PostgresStorage::new(pool);
    let wallet = HttpWalletClient::new(config.wallet).context("create wallet client")?;
    let publisher = NatsPubSub::new(config.pub_sub)
        .await
        .context("create NATS pub/sub")?;

    let application = Application::new(storage, wallet, publisher, SystemClock);

    let api_sigterm = signal(SignalKind::terminate()).context("install SIGTERM handler")?;
    let worker_sigterm = signal(SignalKind::terminate()).context("install SIGTERM handler")?;

    let api_task = task::spawn(infra::api::serve(
        config.api,
        application.clone(),
        api_sigterm,
    ));
    let worker_task = task::spawn(application::run(
        config.worker,
        application,
        worker_sigterm,
    ));

    select! {
        result = api_task => result
            .context("api_task panicked")
            .and_then(|r| r.context("api_task failed")),

        result = worker_task => result
            .context("worker_task panicked")
            .and_then(|r| r.context("worker_task failed")),
    }
}
