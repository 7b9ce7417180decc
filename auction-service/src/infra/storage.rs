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

use crate::domain::{Bid, Lot, LotFilter, LotStatus, LotUpdate, storage::Storage};
use auction_common::{
    domain::{Amount, BidId, LotId, UserId},
    infra::pool::postgres::PostgresPool,
};
use chrono::{DateTime, Utc};
use fastrace::trace;
use indoc::indoc;
use sqlx::{Postgres, QueryBuilder};

type LotRow = (
    i64,
    i64,
    String,
    String,
    DateTime<Utc>,
    DateTime<Utc>,
    i64,
    i64,
    i64,
    String,
    i64,
    i64,
);
type BidRow = (i64, i64, i64, i64, DateTime<Utc>);

const LOT_COLUMNS: &str = indoc! {"
    id,
    seller_id,
    title,
    description,
    start_date,
    end_date,
    start_price,
    current_price,
    min_step,
    status,
    winner_id,
    current_bid_id
"};

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
    async fn save_lot(&self, lot: &Lot) -> Result<Lot, sqlx::Error> {
        let query = indoc! {"
            INSERT INTO lots (
                seller_id,
                title,
                description,
                start_date,
                end_date,
                start_price,
                current_price,
                min_step,
                status,
                winner_id,
                current_bid_id
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING id
        "};

        let (id,) = sqlx::query_as::<_, (i64,)>(query)
            .bind(lot.seller_id as i64)
            .bind(&lot.title)
            .bind(&lot.description)
            .bind(lot.start_date)
            .bind(lot.end_date)
            .bind(lot.start_price)
            .bind(lot.current_price)
            .bind(lot.min_step)
            .bind(lot.status.to_string())
            .bind(lot.winner_id as i64)
            .bind(lot.current_bid_id as i64)
            .fetch_one(&*self.pool)
            .await?;

        Ok(Lot {
            id: id as LotId,
            ..lot.clone()
        })
    }

    #[trace]
    async fn get_lot(&self, id: LotId) -> Result<Option<Lot>, sqlx::Error> {
        let query = format!("SELECT {LOT_COLUMNS} FROM lots WHERE id = $1");

        sqlx::query_as::<_, LotRow>(&query)
            .bind(id as i64)
            .fetch_optional(&*self.pool)
            .await?
            .map(lot_from_row)
            .transpose()
    }

    #[trace]
    async fn update_draft_lot(
        &self,
        id: LotId,
        update: &LotUpdate,
        current_price: Option<Amount>,
    ) -> Result<Option<Lot>, sqlx::Error> {
        let query = format!(
            indoc! {"
                UPDATE lots
                SET title = COALESCE($2, title),
                    description = COALESCE($3, description),
                    start_price = COALESCE($4, start_price),
                    min_step = COALESCE($5, min_step),
                    end_date = COALESCE($6, end_date),
                    current_price = COALESCE($7, current_price)
                WHERE id = $1 AND status = 'draft'
                RETURNING {}
            "},
            LOT_COLUMNS
        );

        sqlx::query_as::<_, LotRow>(&query)
            .bind(id as i64)
            .bind(update.title.as_deref())
            .bind(update.description.as_deref())
            .bind(update.start_price)
            .bind(update.min_step)
            .bind(update.end_date)
            .bind(current_price)
            .fetch_optional(&*self.pool)
            .await?
            .map(lot_from_row)
            .transpose()
    }

    #[trace]
    async fn publish_lot(&self, id: LotId, current_price: Amount) -> Result<bool, sqlx::Error> {
        let query = indoc! {"
            UPDATE lots
            SET status = 'active', current_price = $2
            WHERE id = $1 AND status = 'draft'
        "};

        let result = sqlx::query(query)
            .bind(id as i64)
            .bind(current_price)
            .execute(&*self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    #[trace]
    async fn get_lots(
        &self,
        filter: &LotFilter,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Lot>, sqlx::Error> {
        let mut query = QueryBuilder::<Postgres>::new(format!(
            "SELECT {LOT_COLUMNS} FROM lots WHERE TRUE"
        ));

        if let Some(status) = filter.status {
            query.push(" AND status = ").push_bind(status.to_string());
        }
        if let Some(min_price) = filter.min_price {
            query.push(" AND current_price >= ").push_bind(min_price);
        }
        if let Some(max_price) = filter.max_price {
            query.push(" AND current_price <= ").push_bind(max_price);
        }
        if let Some(min_end_date) = filter.min_end_date {
            query.push(" AND end_date >= ").push_bind(min_end_date);
        }
        if let Some(max_end_date) = filter.max_end_date {
            query.push(" AND end_date <= ").push_bind(max_end_date);
        }
        query.push(" ORDER BY id LIMIT ").push_bind(limit);
        query.push(" OFFSET ").push_bind(offset);

        query
            .build_query_as::<LotRow>()
            .fetch_all(&*self.pool)
            .await?
            .into_iter()
            .map(lot_from_row)
            .collect()
    }

    #[trace]
    async fn get_lots_by_seller(&self, seller_id: UserId) -> Result<Vec<Lot>, sqlx::Error> {
        let query = format!("SELECT {LOT_COLUMNS} FROM lots WHERE seller_id = $1 ORDER BY id");

        sqlx::query_as::<_, LotRow>(&query)
            .bind(seller_id as i64)
            .fetch_all(&*self.pool)
            .await?
            .into_iter()
            .map(lot_from_row)
            .collect()
    }

    #[trace]
    async fn get_expired_active_lots(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<Lot>, sqlx::Error> {
        let query = format!(
            "SELECT {LOT_COLUMNS} FROM lots WHERE status = 'active' AND end_date < $1 ORDER BY id"
        );

        sqlx::query_as::<_, LotRow>(&query)
            .bind(now)
            .fetch_all(&*self.pool)
            .await?
            .into_iter()
            .map(lot_from_row)
            .collect()
    }

    #[trace]
    async fn update_lot_for_bid(
        &self,
        lot_id: LotId,
        amount: Amount,
        bid_id: BidId,
        previous_bid_id: BidId,
    ) -> Result<bool, sqlx::Error> {
        // Zero rows affected means a concurrent bid won the race.
        let query = indoc! {"
            UPDATE lots
            SET current_price = $2, current_bid_id = $3
            WHERE id = $1 AND current_bid_id = $4 AND status = 'active'
        "};

        let result = sqlx::query(query)
            .bind(lot_id as i64)
            .bind(amount)
            .bind(bid_id as i64)
            .bind(previous_bid_id as i64)
            .execute(&*self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    #[trace]
    async fn complete_lot(&self, lot_id: LotId, winner_id: UserId) -> Result<bool, sqlx::Error> {
        let query = indoc! {"
            UPDATE lots
            SET status = 'completed', winner_id = $2
            WHERE id = $1 AND status = 'active'
        "};

        let result = sqlx::query(query)
            .bind(lot_id as i64)
            .bind(winner_id as i64)
            .execute(&*self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    #[trace]
    async fn save_bid(
        &self,
        lot_id: LotId,
        user_id: UserId,
        amount: Amount,
        created_at: DateTime<Utc>,
    ) -> Result<Bid, sqlx::Error> {
        let query = indoc! {"
            INSERT INTO bids (lot_id, user_id, amount, created_at)
            VALUES ($1, $2, $3, $4)
            RETURNING id
        "};

        let (id,) = sqlx::query_as::<_, (i64,)>(query)
            .bind(lot_id as i64)
            .bind(user_id as i64)
            .bind(amount)
            .bind(created_at)
            .fetch_one(&*self.pool)
            .await?;

        Ok(Bid {
            id: id as BidId,
            lot_id,
            user_id,
            amount,
            created_at,
        })
    }

    #[trace]
    async fn get_bid(&self, id: BidId) -> Result<Option<Bid>, sqlx::Error> {
        let query = indoc! {"
            SELECT id, lot_id, user_id, amount, created_at
            FROM bids
            WHERE id = $1
        "};

        sqlx::query_as::<_, BidRow>(query)
            .bind(id as i64)
            .fetch_optional(&*self.pool)
            .await?
            .map(bid_from_row)
            .transpose()
    }

    #[trace]
    async fn delete_bid(&self, id: BidId) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM bids WHERE id = $1")
            .bind(id as i64)
            .execute(&*self.pool)
            .await?;

        Ok(())
    }

    #[trace]
    async fn get_bids_by_lot(&self, lot_id: LotId) -> Result<Vec<Bid>, sqlx::Error> {
        let query = indoc! {"
            SELECT id, lot_id, user_id, amount, created_at
            FROM bids
            WHERE lot_id = $1
            ORDER BY id DESC
        "};

        sqlx::query_as::<_, BidRow>(query)
            .bind(lot_id as i64)
            .fetch_all(&*self.pool)
            .await?
            .into_iter()
            .map(bid_from_row)
            .collect()
    }

    #[trace]
    async fn get_bids_by_user(&self, user_id: UserId) -> Result<Vec<Bid>, sqlx::Error> {
        let query = indoc! {"
            SELECT id, lot_id, user_id, amount, created_at
            FROM bids
            WHERE user_id = $1
            ORDER BY id DESC
        "};

        sqlx::query_as::<_, BidRow>(query)
            .bind(user_id as i64)
            .fetch_all(&*self.pool)
            .await?
            .into_iter()
            .map(bid_from_row)
            .collect()
    }

    #[trace]
    async fn get_distinct_bidders(&self, lot_id: LotId) -> Result<Vec<UserId>, sqlx::Error> {
        let query = indoc! {"
            SELECT DISTINCT user_id
            FROM bids
            WHERE lot_id = $1
        "};

        let bidders = sqlx::query_as::<_, (i64,)>(query)
            .bind(lot_id as i64)
            .fetch_all(&*self.pool)
            .await?
            .into_iter()
            .map(|(user_id,)| user_id as UserId)
            .collect();

        Ok(bidders)
    }
}

fn lot_from_row(row: LotRow) -> Result<Lot, sqlx::Error> {
    let (
        id,
        seller_id,
        title,
        description,
        start_date,
        end_date,
        start_price,
        current_price,
        min_step,
        status,
        winner_id,
        current_bid_id,
    ) = row;

    let status = status
        .parse::<LotStatus>()
        .map_err(|error| sqlx::Error::Decode(error.into()))?;

    Ok(Lot {
        id: id as LotId,
        seller_id: seller_id as UserId,
        title,
        description,
        start_date,
        end_date,
        start_price,
        current_price,
        min_step,
        status,
        winner_id: winner_id as UserId,
        current_bid_id: current_bid_id as BidId,
    })
}

fn bid_from_row(row: BidRow) -> Result<Bid, sqlx::Error> {
    let (id, lot_id, user_id, amount, created_at) = row;

    Ok(Bid {
        id: id as BidId,
        lot_id: lot_id as LotId,
        user_id: user_id as UserId,
        amount,
        created_at,
    })
}
