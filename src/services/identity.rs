use std::sync::Arc;

use chrono::TimeDelta;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::clock::Clock;
use crate::config::Config;
use crate::database::traits::UserRepository;
use crate::error::{AppError, AppResult};
use crate::models::{NewUser, User};
use crate::throttle::SessionRegistry;
use crate::utils::{generate_token, hash_password, is_valid_username, verify_password};

const MIN_PASSWORD_LEN: usize = 6;
const MAX_DISPLAY_NAME_LEN: usize = 50;

#[derive(Debug, Deserialize)]
pub struct Registration {
    pub email: String,
    pub password: String,
    pub display_name: String,
    pub username: String,
}

#[derive(Debug, Serialize)]
pub struct SignedIn {
    pub token: String,
    pub expires_at: i64,
    pub user: User,
}

/// 基于用户存储的注册、登录和资料管理
pub struct IdentityProvider {
    users: Arc<dyn UserRepository>,
    sessions: Arc<SessionRegistry>,
    clock: Arc<dyn Clock>,
    config: Arc<Config>,
}

impl IdentityProvider {
    pub fn new(
        users: Arc<dyn UserRepository>,
        sessions: Arc<SessionRegistry>,
        clock: Arc<dyn Clock>,
        config: Arc<Config>,
    ) -> Self {
        Self {
            users,
            sessions,
            clock,
            config,
        }
    }

    pub async fn register(&self, req: Registration) -> AppResult<SignedIn> {
        let username = req.username.trim().to_lowercase();
        if !is_valid_username(&username) {
            return Err(AppError::Validation(
                "username must be 3-20 characters of a-z, 0-9 or _".into(),
            ));
        }
        let email = req.email.trim().to_string();
        if !email.contains('@') {
            return Err(AppError::Validation("invalid email address".into()));
        }
        if req.password.len() < MIN_PASSWORD_LEN {
            return Err(AppError::Validation(format!(
                "password must be at least {MIN_PASSWORD_LEN} characters"
            )));
        }
        let display_name = check_display_name(&req.display_name)?;

        if self.users.resolve_username(&username).await?.is_some() {
            return Err(AppError::UsernameTaken);
        }

        let user = self
            .users
            .create(NewUser {
                uid: Uuid::new_v4().to_string(),
                username,
                display_name,
                email,
                password_hash: hash_password(&req.password, self.config.bcrypt_cost)?,
                created_at: self.clock.now(),
            })
            .await?;

        self.open_session(user)
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> AppResult<SignedIn> {
        let user = self
            .users
            .find_by_email(email.trim())
            .await?
            .ok_or(AppError::Unauthorized)?;

        if !verify_password(password, &user.password_hash)? {
            tracing::info!("Rejected sign-in for {}", user.uid);
            return Err(AppError::Unauthorized);
        }

        self.open_session(user)
    }

    /// 结束会话。之后携带该会话令牌的请求都会被拒绝。
    pub fn sign_out(&self, session_id: &str) {
        if self.sessions.close(session_id) {
            tracing::debug!("Closed session {}", session_id);
        }
    }

    pub async fn current_user(&self, uid: &str) -> AppResult<User> {
        self.users
            .find_by_uid(uid)
            .await?
            .ok_or(AppError::Unauthorized)
    }

    pub async fn update_display_name(&self, uid: &str, display_name: &str) -> AppResult<User> {
        let display_name = check_display_name(display_name)?;
        if display_name.is_empty() {
            return Err(AppError::Validation("display name is required".into()));
        }
        self.users
            .update_display_name(uid, &display_name)
            .await?
            .ok_or(AppError::Unauthorized)
    }

    fn open_session(&self, user: User) -> AppResult<SignedIn> {
        let session_id = Uuid::new_v4().to_string();
        let (token, expires_at) =
            generate_token(&user.uid, &user.username, &session_id, &self.config)?;
        // 会话与令牌同时过期，时间以注入的时钟为准
        let now = self.clock.now();
        let session_expires_at = now + TimeDelta::seconds(self.config.jwt_expiration_secs as i64);
        self.sessions.open(&session_id, &user.uid, session_expires_at, now);

        Ok(SignedIn {
            token,
            expires_at,
            user,
        })
    }
}

fn check_display_name(raw: &str) -> AppResult<String> {
    let name = raw.trim();
    if name.chars().count() > MAX_DISPLAY_NAME_LEN {
        return Err(AppError::Validation(format!(
            "display name must be at most {MAX_DISPLAY_NAME_LEN} characters"
        )));
    }
    Ok(name.to_string())
}
