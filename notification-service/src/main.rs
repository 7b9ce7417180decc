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

use crate::{config::Config, infra::storage::PostgresStorage};
use anyhow::Context;
use auction_common::{
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
        eprintln!("notification-service exited with error: {error:#}");
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let config = Config::load().context("load configuration")?;
    telemetry::init_logging(&config.telemetry);
    info!("starting notification-service");

    let pool = PostgresPool::new(config.storage)
        .await
        .context("create Postgres pool")?;
    sqlx::migrate!()
        .run(&*pool)
        .await
        .context("run database migrations")?;

    let storage = PostgresStorage::new(pool);
    let subscriber = NatsPubSub::new(config.pub_sub)
        .await
        .context("create NATS pub/sub")?;

    let api_sigterm = signal(SignalKind::terminate()).context("install SIGTERM handler")?;
    let consumer_sigterm = signal(SignalKind::terminate()).context("install SIGTERM handler")?;

    let api_task = task::spawn(infra::api::serve(
        config.api,
        storage.clone(),
        api_sigterm,
    ));
    let consumer_task = task::spawn(application::run(
        config.consumer,
        storage,
        subscriber,
        consumer_sigterm,
    ));

    select! {
        result = api_task => result
            .context("api_task panicked")
            .and_then(|r| r.context("api_task failed")),

        result = consumer_task => result
            .context("consumer_task panicked")
            .and_then(|r| r.context("consumer_task failed")),
    }
}
