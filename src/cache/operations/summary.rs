use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redis::{AsyncCommands, Client as RedisClient};

use crate::cache::keys::{summary_data_key, summary_time_key};
use crate::database::traits::SummaryCacheRepository;
use crate::error::AppResult;
use crate::models::SummaryCounts;

/// 保存在 Redis 中的汇总缓存，不设过期，由刷新判断决定是否过时
pub struct SummaryCacheOperations {
    redis: Arc<RedisClient>,
}

impl SummaryCacheOperations {
    pub fn new(redis: Arc<RedisClient>) -> Self {
        Self { redis }
    }
}

#[async_trait]
impl SummaryCacheRepository for SummaryCacheOperations {
    async fn load_time(&self, uid: &str) -> AppResult<Option<DateTime<Utc>>> {
        let mut conn = self.redis.get_multiplexed_async_connection().await?;
        let raw: Option<String> = conn.get(summary_time_key(uid)).await?;

        Ok(raw.and_then(|s| match DateTime::parse_from_rfc3339(&s) {
            Ok(t) => Some(t.with_timezone(&Utc)),
            Err(e) => {
                // 无法解析的时间视为没有时间，刷新判断会重新计算
                tracing::warn!("Discarding unreadable summary time for {}: {}", uid, e);
                None
            }
        }))
    }

    async fn load_data(&self, uid: &str) -> AppResult<Option<SummaryCounts>> {
        let mut conn = self.redis.get_multiplexed_async_connection().await?;
        let raw: Option<String> = conn.get(summary_data_key(uid)).await?;

        Ok(raw.and_then(|json| match serde_json::from_str(&json) {
            Ok(data) => Some(data),
            Err(e) => {
                tracing::warn!("Discarding unreadable summary data for {}: {}", uid, e);
                None
            }
        }))
    }

    async fn store(&self, uid: &str, data: &SummaryCounts, computed_at: DateTime<Utc>) -> AppResult<()> {
        let mut conn = self.redis.get_multiplexed_async_connection().await?;
        let json = serde_json::to_string(data)?;

        let _: () = redis::pipe()
            .atomic()
            .set(summary_data_key(uid), json)
            .set(summary_time_key(uid), computed_at.to_rfc3339())
            .query_async(&mut conn)
            .await?;

        tracing::debug!("Stored summary for {} computed at {}", uid, computed_at);
        Ok(())
    }
}
