use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// 只追加的点按事件
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Tap {
    pub from_uid: String,
    pub to_uid: String,
    pub from_username: String,
    pub to_username: String,
    pub timestamp: DateTime<Utc>,
}
