use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct User {
    pub uid: String,
    pub username: String,
    pub display_name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

/// 通过用户名占用记录看到的用户
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct UserRef {
    pub uid: String,
    pub username: String,
    pub display_name: String,
}

impl From<&User> for UserRef {
    fn from(user: &User) -> Self {
        Self {
            uid: user.uid.clone(),
            username: user.username.clone(),
            display_name: user.display_name.clone(),
        }
    }
}

/// 用户及其用户名占用记录的插入数据
#[derive(Debug, Clone)]
pub struct NewUser {
    pub uid: String,
    pub username: String,
    pub display_name: String,
    pub email: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

/// 登出后仍保留的用户偏好设置
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preferences {
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub guide_dismissed: bool,
}
