// Redis 缓存：汇总快照、偏好设置和请求计数

pub mod keys;
pub mod operations;

pub use operations::{PreferenceCacheOperations, RateLimitCacheOperations, SummaryCacheOperations};
