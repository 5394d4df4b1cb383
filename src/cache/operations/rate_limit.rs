use std::sync::Arc;

use redis::Client as RedisClient;

use crate::cache::keys::rate_limit_key;

/// 固定窗口请求计数
pub struct RateLimitCacheOperations;

impl RateLimitCacheOperations {
    /// 为 `client` 计一次请求，返回当前窗口内的请求数
    pub async fn hit(
        redis: &Arc<RedisClient>,
        client: &str,
        window_secs: u64,
    ) -> Result<u32, redis::RedisError> {
        let mut conn = redis.get_multiplexed_async_connection().await?;
        let key = rate_limit_key(client);

        // 窗口不存在时才创建并设置过期，计数与过期在同一事务中
        let (count,): (u32,) = redis::pipe()
            .atomic()
            .cmd("SET")
            .arg(&key)
            .arg(0)
            .arg("NX")
            .arg("EX")
            .arg(window_secs)
            .ignore()
            .incr(&key, 1)
            .query_async(&mut conn)
            .await?;

        Ok(count)
    }
}
