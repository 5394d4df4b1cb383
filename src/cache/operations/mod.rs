/// 基于 Redis 的键值操作

pub mod preferences;
pub mod rate_limit;
pub mod summary;

pub use preferences::PreferenceCacheOperations;
pub use rate_limit::RateLimitCacheOperations;
pub use summary::SummaryCacheOperations;
