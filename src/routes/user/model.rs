use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{error::AppError, models::{Preferences, User}};

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateDisplayNameRequest {
    pub display_name: String,
}

/// 未提供的字段保持原值
#[derive(Debug, Deserialize)]
pub struct UpdatePreferencesRequest {
    pub language: Option<String>,
    pub guide_dismissed: Option<bool>,
}

impl UpdatePreferencesRequest {
    pub fn apply(self, mut current: Preferences) -> Result<Preferences, AppError> {
        if let Some(language) = self.language {
            let valid = (2..=16).contains(&language.len())
                && language.chars().all(|c| c.is_ascii_alphanumeric() || c == '-');
            if !valid {
                return Err(AppError::Validation("invalid language tag".into()));
            }
            current.language = Some(language);
        }
        if let Some(dismissed) = self.guide_dismissed {
            current.guide_dismissed = dismissed;
        }
        Ok(current)
    }
}

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub uid: String,
    pub username: String,
    pub display_name: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

impl From<User> for ProfileResponse {
    fn from(user: User) -> Self {
        Self {
            uid: user.uid,
            username: user.username,
            display_name: user.display_name,
            email: user.email,
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct LogoutResponse {}
