// 只追加的点按事件

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::database::traits::TapRepository;
use crate::error::AppResult;
use crate::models::{Tap, TapTally};

pub struct PgTapRepository {
    db: Arc<PgPool>,
}

impl PgTapRepository {
    pub fn new(db: Arc<PgPool>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl TapRepository for PgTapRepository {
    async fn append(&self, tap: Tap) -> AppResult<Tap> {
        let stored = sqlx::query_as::<_, Tap>(
            r#"
            INSERT INTO taps (from_uid, to_uid, from_username, to_username, timestamp)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING from_uid, to_uid, from_username, to_username, timestamp
            "#,
        )
        .bind(&tap.from_uid)
        .bind(&tap.to_uid)
        .bind(&tap.from_username)
        .bind(&tap.to_username)
        .bind(tap.timestamp)
        .fetch_one(&*self.db)
        .await?;

        Ok(stored)
    }

    async fn count_between(&self, from_uid: &str, to_uid: &str, since: DateTime<Utc>) -> AppResult<u64> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM taps
            WHERE from_uid = $1 AND to_uid = $2 AND timestamp >= $3
            "#,
        )
        .bind(from_uid)
        .bind(to_uid)
        .bind(since)
        .fetch_one(&*self.db)
        .await?;

        Ok(count.max(0) as u64)
    }

    async fn count_by_sender_since(&self, to_uid: &str, since: DateTime<Utc>) -> AppResult<TapTally> {
        let rows: Vec<(String, i64)> = sqlx::query_as(
            r#"
            SELECT from_username, COUNT(*)
            FROM taps
            WHERE to_uid = $1 AND timestamp >= $2
            GROUP BY from_username
            "#,
        )
        .bind(to_uid)
        .bind(since)
        .fetch_all(&*self.db)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(username, count)| (username, count.max(0) as u64))
            .collect())
    }
}
