//! 文档存储和键值存储的数据访问 trait
//!
//! 实现只负责读取和持久化。自我添加、重复检测、冷却等规则
//! 都在外层服务中实现。

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::AppResult;
use crate::models::{
    Connection, NewConnection, NewUser, Preferences, SummaryCounts, Tap, TapTally, User, UserRef,
};

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_uid(&self, uid: &str) -> AppResult<Option<User>>;

    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>>;

    /// 通过用户名占用记录解析用户
    async fn resolve_username(&self, username: &str) -> AppResult<Option<UserRef>>;

    /// 同时写入用户及其用户名占用记录
    ///
    /// 用户名已被占用时返回 `UsernameTaken`
    async fn create(&self, user: NewUser) -> AppResult<User>;

    /// uid 不存在时返回 `None`
    async fn update_display_name(&self, uid: &str, display_name: &str) -> AppResult<Option<User>>;
}

#[async_trait]
pub trait ConnectionRepository: Send + Sync {
    /// 按 (from_uid, to_uid) 精确查找
    async fn find_pair(&self, from_uid: &str, to_uid: &str) -> AppResult<Option<Connection>>;

    async fn find_by_id(&self, id: &str) -> AppResult<Option<Connection>>;

    /// 追加一行，ID 和创建时间由存储分配
    async fn insert(&self, connection: NewConnection) -> AppResult<Connection>;

    /// 所有者的连接，最新的在前
    async fn list_by_owner(&self, from_uid: &str) -> AppResult<Vec<Connection>>;

    /// 返回是否删除了一行
    async fn delete(&self, owner_uid: &str, id: &str) -> AppResult<bool>;
}

#[async_trait]
pub trait TapRepository: Send + Sync {
    async fn append(&self, tap: Tap) -> AppResult<Tap>;

    /// `from_uid` 发给 `to_uid` 且 `timestamp >= since` 的点按数
    async fn count_between(&self, from_uid: &str, to_uid: &str, since: DateTime<Utc>) -> AppResult<u64>;

    /// 发给 `to_uid` 且 `timestamp >= since` 的点按，按发送者用户名统计
    async fn count_by_sender_since(&self, to_uid: &str, since: DateTime<Utc>) -> AppResult<TapTally>;
}

/// 持久化的汇总，像浏览器的 `summaryData` / `summaryTime`
/// 一样存为两个独立的值
#[async_trait]
pub trait SummaryCacheRepository: Send + Sync {
    async fn load_time(&self, uid: &str) -> AppResult<Option<DateTime<Utc>>>;

    async fn load_data(&self, uid: &str) -> AppResult<Option<SummaryCounts>>;

    async fn store(&self, uid: &str, data: &SummaryCounts, computed_at: DateTime<Utc>) -> AppResult<()>;
}

#[async_trait]
pub trait PreferenceRepository: Send + Sync {
    async fn get_preferences(&self, uid: &str) -> AppResult<Preferences>;

    async fn put_preferences(&self, uid: &str, preferences: &Preferences) -> AppResult<()>;
}
