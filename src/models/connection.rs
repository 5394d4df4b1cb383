use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// 属于 `from_uid` 的有向“关注”关系
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Connection {
    pub id: String,
    pub from_uid: String,
    pub to_uid: String,
    pub from_username: String,
    pub to_username: String,
    pub to_display_name: String,
    pub created_at: DateTime<Utc>,
}

impl Connection {
    /// 显示名称，未设置时使用用户名
    pub fn label(&self) -> &str {
        if self.to_display_name.trim().is_empty() {
            &self.to_username
        } else {
            &self.to_display_name
        }
    }
}

/// 调用方提供的字段；ID 和创建时间由存储分配
#[derive(Debug, Clone)]
pub struct NewConnection {
    pub from_uid: String,
    pub to_uid: String,
    pub from_username: String,
    pub to_username: String,
    pub to_display_name: String,
}
