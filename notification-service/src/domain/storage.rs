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

use crate::domain::{NewNotification, Notification, NotificationFilter};
use auction_common::domain::{NotificationId, UserId};

/// Storage abstraction for notifications.
#[trait_variant::make(Send)]
pub trait Storage
where
    Self: Clone + Send + Sync + 'static,
{
    /// Insert the given notification idempotently: a duplicate on the
    /// `(user_id, lot_id, type)` key is treated as success. Returns whether
    /// a new row was actually inserted.
    async fn save_notification(
        &self,
        notification: &NewNotification,
    ) -> Result<bool, sqlx::Error>;

    async fn get_notifications(
        &self,
        user_id: UserId,
        filter: &NotificationFilter,
    ) -> Result<Vec<Notification>, sqlx::Error>;

    /// Mark one of the user's notifications as read. Returns `false` when it
    /// does not exist or belongs to someone else.
    async fn mark_as_read(
        &self,
        user_id: UserId,
        id: NotificationId,
    ) -> Result<bool, sqlx::Error>;

    async fn count_unread(&self, user_id: UserId) -> Result<u64, sqlx::Error>;
}
