// users 表及用户名占用表

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::PgPool;

use crate::database::traits::UserRepository;
use crate::error::{AppError, AppResult};
use crate::models::{NewUser, User, UserRef};

use super::is_unique_violation;

const USER_COLUMNS: &str = "uid, username, display_name, email, password_hash, created_at";

pub struct PgUserRepository {
    db: Arc<PgPool>,
}

impl PgUserRepository {
    pub fn new(db: Arc<PgPool>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn find_by_uid(&self, uid: &str) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE uid = $1"
        ))
        .bind(uid)
        .fetch_optional(&*self.db)
        .await?;

        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE lower(email) = lower($1)"
        ))
        .bind(email)
        .fetch_optional(&*self.db)
        .await?;

        Ok(user)
    }

    async fn resolve_username(&self, username: &str) -> AppResult<Option<UserRef>> {
        let user = sqlx::query_as::<_, UserRef>(
            r#"
            SELECT u.uid, u.username, u.display_name
            FROM usernames n
            JOIN users u ON u.uid = n.uid
            WHERE n.username = $1
            "#,
        )
        .bind(username)
        .fetch_optional(&*self.db)
        .await?;

        Ok(user)
    }

    async fn create(&self, user: NewUser) -> AppResult<User> {
        let mut tx = self.db.begin().await?;

        // 先写用户名占用记录，用户名已被占用时不会写入用户行
        let reserved = sqlx::query("INSERT INTO usernames (username, uid) VALUES ($1, $2)")
            .bind(&user.username)
            .bind(&user.uid)
            .execute(&mut *tx)
            .await;
        if let Err(e) = reserved {
            if is_unique_violation(&e) {
                return Err(AppError::UsernameTaken);
            }
            return Err(e.into());
        }

        let created = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (uid, username, display_name, email, password_hash, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(&user.uid)
        .bind(&user.username)
        .bind(&user.display_name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.created_at)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::Validation("email already registered".into())
            } else {
                e.into()
            }
        })?;

        tx.commit().await?;
        tracing::info!("Registered user {} as @{}", created.uid, created.username);
        Ok(created)
    }

    async fn update_display_name(&self, uid: &str, display_name: &str) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "UPDATE users SET display_name = $1 WHERE uid = $2 RETURNING {USER_COLUMNS}"
        ))
        .bind(display_name)
        .bind(uid)
        .fetch_optional(&*self.db)
        .await?;

        Ok(user)
    }
}
