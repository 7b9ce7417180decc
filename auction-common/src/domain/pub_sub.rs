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

use crate::{domain::TopicMessage, error::BoxError};
use serde::{Serialize, de::DeserializeOwned};
use std::error::Error as StdError;

/// Publishing side of the event bus, at-least-once.
#[trait_variant::make(Send)]
pub trait Publisher
where
    Self: Clone + Send + Sync + 'static,
{
    type Error: StdError + Send + Sync + 'static;

    /// Publish the given message to its topic, keyed by its partition key.
    /// Returns once the bus has acknowledged the message as durable.
    async fn publish<T>(&self, message: &T) -> Result<(), Self::Error>
    where
        T: TopicMessage + Serialize + Sync;
}

/// Consuming side of the event bus, at-least-once within a consumer group.
#[trait_variant::make(Send)]
pub trait Subscriber
where
    Self: Clone + Send + Sync + 'static,
{
    type Error: StdError + Send + Sync + 'static;

    /// Consume messages of the given topic on behalf of the given group,
    /// passing each decoded message to the handler. A message is acknowledged
    /// only after the handler returns `Ok`; handler failures leave it
    /// unacknowledged so the bus re-delivers it. Messages that cannot be
    /// decoded are acknowledged and dropped.
    ///
    /// Only returns on a bus error; run under task supervision.
    async fn consume<T, H>(&self, group: &str, handler: &H) -> Result<(), Self::Error>
    where
        T: TopicMessage + DeserializeOwned + Send,
        H: MessageHandler<T> + Sync;
}

/// Handler seam for [Subscriber::consume]. An `Err` signals a retryable
/// failure, e.g. an unavailable database; the message will be re-delivered.
#[trait_variant::make(Send)]
pub trait MessageHandler<T>
where
    Self: Send + Sync,
{
    async fn handle(&self, message: T) -> Result<(), BoxError>;
}
