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

use crate::domain::{
    NewNotification, Notification, NotificationFilter, NotificationType, storage::Storage,
};
use auction_common::{
    domain::{LotId, NotificationId, UserId},
    infra::pool::postgres::PostgresPool,
};
use chrono::{DateTime, Utc};
use fastrace::trace;
use indoc::indoc;
use sqlx::{Postgres, QueryBuilder};

type NotificationRow = (i64, i64, i64, String, String, String, bool, DateTime<Utc>);

/// Postgres based implementation of [Storage].
#[derive(Debug, Clone)]
pub struct PostgresStorage {
    pool: PostgresPool,
}

impl PostgresStorage {
    /// Create a new [PostgresStorage].
    pub fn new(pool: PostgresPool) -> Self {
        Self { pool }
    }
}

impl Storage for PostgresStorage {
    #[trace]
    async fn save_notification(
        &self,
        notification: &NewNotification,
    ) -> Result<bool, sqlx::Error> {
        // The unique index on (user_id, lot_id, type) makes re-delivered
        // events no-ops.
        let query = indoc! {"
            INSERT INTO notifications (user_id, lot_id, type, title, message)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (user_id, lot_id, type) DO NOTHING
        "};

        let result = sqlx::query(query)
            .bind(notification.user_id as i64)
            .bind(notification.lot_id as i64)
            .bind(notification.notification_type.to_string())
            .bind(&notification.title)
            .bind(&notification.message)
            .execute(&*self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    #[trace]
    async fn get_notifications(
        &self,
        user_id: UserId,
        filter: &NotificationFilter,
    ) -> Result<Vec<Notification>, sqlx::Error> {
        let mut query = QueryBuilder::<Postgres>::new(indoc! {"
            SELECT id, user_id, lot_id, type, title, message, is_read, created_at
            FROM notifications
            WHERE user_id =
        "});
        query.push_bind(user_id as i64);

        if let Some(is_read) = filter.is_read {
            query.push(" AND is_read = ").push_bind(is_read);
        }

        if filter.newest_first {
            query.push(" ORDER BY id DESC");
        } else {
            query.push(" ORDER BY id");
        }
        query.push(" LIMIT ").push_bind(filter.limit);
        query.push(" OFFSET ").push_bind(filter.offset);

        query
            .build_query_as::<NotificationRow>()
            .fetch_all(&*self.pool)
            .await?
            .into_iter()
            .map(notification_from_row)
            .collect()
    }

    #[trace]
    async fn mark_as_read(
        &self,
        user_id: UserId,
        id: NotificationId,
    ) -> Result<bool, sqlx::Error> {
        let query = indoc! {"
            UPDATE notifications
            SET is_read = TRUE
            WHERE id = $1 AND user_id = $2
        "};

        let result = sqlx::query(query)
            .bind(id as i64)
            .bind(user_id as i64)
            .execute(&*self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    #[trace]
    async fn count_unread(&self, user_id: UserId) -> Result<u64, sqlx::Error> {
        let query = indoc! {"
            SELECT count(*)
            FROM notifications
            WHERE user_id = $1 AND NOT is_read
        "};

        let (count,) = sqlx::query_as::<_, (i64,)>(query)
            .bind(user_id as i64)
            .fetch_one(&*self.pool)
            .await?;

        Ok(count as u64)
    }
}

fn notification_from_row(row: NotificationRow) -> Result<Notification, sqlx::Error> {
    let (id, user_id, lot_id, notification_type, title, message, is_read, created_at) = row;

    let notification_type = notification_type
        .parse::<NotificationType>()
        .map_err(|error| sqlx::Error::Decode(error.into()))?;

    Ok(Notification {
        id: id as NotificationId,
        user_id: user_id as UserId,
        lot_id: lot_id as LotId,
        notification_type,
        title,
        message,
        is_read,
        created_at,
    })
}
