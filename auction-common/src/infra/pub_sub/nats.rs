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

use crate::{
    domain::{MessageHandler, Publisher, Subscriber, TOPICS, TopicMessage},
    error::BoxError,
};
use async_nats::{
    ConnectError, ConnectOptions,
    jetstream::{
        self, Context as Jetstream,
        consumer::{self, AckPolicy, pull},
        context::{CreateStreamError, GetStreamError, PublishError},
        stream,
    },
};
use fastrace::trace;
use futures::StreamExt;
use log::warn;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use thiserror::Error;

/// NATS JetStream based implementation of [Publisher] and [Subscriber]. One
/// stream per topic with subjects `{topic}.{key}` keeps messages with the
/// same key ordered; durable pull consumers named by group give at-least-once
/// delivery with explicit acks.
#[derive(Clone)]
pub struct NatsPubSub {
    jetstream: Jetstream,
}

impl NatsPubSub {
    /// Connect to the NATS server with the given configuration and provision
    /// the platform topics.
    pub async fn new(config: Config) -> Result<Self, Error> {
        let Config {
            url,
            username,
            password,
        } = config;

        let options =
            ConnectOptions::new().user_and_password(username, password.expose_secret().to_owned());
        let client = options.connect(url).await?;
        let jetstream = jetstream::new(client);

        for topic in TOPICS {
            jetstream
                .get_or_create_stream(stream::Config {
                    name: topic.to_string(),
                    subjects: vec![format!("{topic}.>")],
                    ..Default::default()
                })
                .await
                .map_err(|error| Error::CreateStream(topic, error))?;
        }

        Ok(Self { jetstream })
    }
}

impl Publisher for NatsPubSub {
    type Error = NatsPublishError;

    #[trace]
    async fn publish<T>(&self, message: &T) -> Result<(), Self::Error>
    where
        T: TopicMessage + Serialize + Sync,
    {
        let subject = format!("{}.{}", T::TOPIC, message.key());
        let payload = serde_json::to_vec(message)?;

        self.jetstream
            .publish(subject, payload.into())
            .await?
            .await?;

        Ok(())
    }
}

impl Subscriber for NatsPubSub {
    type Error = NatsConsumeError;

    async fn consume<T, H>(&self, group: &str, handler: &H) -> Result<(), Self::Error>
    where
        T: TopicMessage + DeserializeOwned + Send,
        H: MessageHandler<T> + Sync,
    {
        let stream = self.jetstream.get_stream(T::TOPIC).await?;

        let consumer = stream
            .get_or_create_consumer(
                group,
                pull::Config {
                    durable_name: Some(group.to_string()),
                    ack_policy: AckPolicy::Explicit,
                    ..Default::default()
                },
            )
            .await?;

        let mut messages = consumer.messages().await?;

        while let Some(message) = messages.next().await {
            let message = message?;

            match serde_json::from_slice::<T>(&message.payload) {
                Ok(decoded) => match handler.handle(decoded).await {
                    Ok(()) => message.ack().await.map_err(NatsConsumeError::Ack)?,

                    // Not acked, the bus re-delivers the message.
                    Err(error) => {
                        warn!(
                            topic = T::TOPIC,
                            error:% = error;
                            "cannot handle message, awaiting redelivery"
                        );
                    }
                },

                // Poisoned message, ack and drop.
                Err(error) => {
                    warn!(topic = T::TOPIC, error:%; "dropping undecodable message");
                    message.ack().await.map_err(NatsConsumeError::Ack)?;
                }
            }
        }

        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("cannot connect to NATS server")]
    Connect(#[from] ConnectError),

    #[error("cannot create stream for topic {0}")]
    CreateStream(&'static str, #[source] CreateStreamError),
}

#[derive(Debug, Error)]
pub enum NatsPublishError {
    #[error("cannot serialize message")]
    Serialize(#[from] serde_json::Error),

    #[error("cannot publish message")]
    Publish(#[from] PublishError),
}

#[derive(Debug, Error)]
pub enum NatsConsumeError {
    #[error("cannot get stream")]
    GetStream(#[from] GetStreamError),

    #[error("cannot create consumer")]
    CreateConsumer(#[from] stream::ConsumerError),

    #[error("cannot get messages")]
    Messages(#[from] consumer::StreamError),

    #[error("cannot get next message")]
    NextMessage(#[from] pull::MessagesError),

    #[error("cannot acknowledge message: {0}")]
    Ack(BoxError),
}

/// Configuration settings for [NatsPubSub].
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub url: String,
    pub username: String,
    pub password: SecretString,
}
