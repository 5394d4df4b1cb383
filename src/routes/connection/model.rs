use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::Connection;
use crate::services::RemovalOutcome;

#[derive(Debug, Deserialize)]
pub struct AddConnectionRequest {
    /// 用户输入的用户名，`@` 可选
    pub username: String,
}

/// 列表中展示的一行连接
#[derive(Debug, Serialize)]
pub struct ConnectionInfo {
    pub id: String,
    pub to_uid: String,
    pub to_username: String,
    pub to_display_name: String,
    pub label: String,
    pub created_at: DateTime<Utc>,
    pub tapped_today: u64,
    pub cooldown_remaining_ms: u64,
}

impl ConnectionInfo {
    pub fn new(connection: Connection, tapped_today: u64, cooldown_remaining_ms: u64) -> Self {
        Self {
            label: connection.label().to_string(),
            id: connection.id,
            to_uid: connection.to_uid,
            to_username: connection.to_username,
            to_display_name: connection.to_display_name,
            created_at: connection.created_at,
            tapped_today,
            cooldown_remaining_ms,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RemoveConnectionResponse {
    pub outcome: RemovalOutcome,
}

#[derive(Debug, Serialize)]
pub struct TapResponse {
    pub timestamp: DateTime<Utc>,
    pub tapped_today: u64,
    pub cooldown_ms: u64,
}

#[derive(Debug, Serialize)]
pub struct TodayCountResponse {
    pub tapped_today: u64,
    pub can_tap: bool,
}
