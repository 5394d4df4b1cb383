// 用户之间的有向连接

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::database::traits::ConnectionRepository;
use crate::error::{AppError, AppResult};
use crate::models::{Connection, NewConnection};

use super::is_unique_violation;

const CONNECTION_COLUMNS: &str =
    "id, from_uid, to_uid, from_username, to_username, to_display_name, created_at";

pub struct PgConnectionRepository {
    db: Arc<PgPool>,
}

impl PgConnectionRepository {
    pub fn new(db: Arc<PgPool>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ConnectionRepository for PgConnectionRepository {
    async fn find_pair(&self, from_uid: &str, to_uid: &str) -> AppResult<Option<Connection>> {
        let connection = sqlx::query_as::<_, Connection>(&format!(
            "SELECT {CONNECTION_COLUMNS} FROM connections WHERE from_uid = $1 AND to_uid = $2"
        ))
        .bind(from_uid)
        .bind(to_uid)
        .fetch_optional(&*self.db)
        .await?;

        Ok(connection)
    }

    async fn find_by_id(&self, id: &str) -> AppResult<Option<Connection>> {
        let connection = sqlx::query_as::<_, Connection>(&format!(
            "SELECT {CONNECTION_COLUMNS} FROM connections WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&*self.db)
        .await?;

        Ok(connection)
    }

    async fn insert(&self, connection: NewConnection) -> AppResult<Connection> {
        let id = Uuid::new_v4().to_string();

        let created = sqlx::query_as::<_, Connection>(&format!(
            r#"
            INSERT INTO connections (
                id, from_uid, to_uid, from_username, to_username, to_display_name, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, NOW())
            RETURNING {CONNECTION_COLUMNS}
            "#
        ))
        .bind(&id)
        .bind(&connection.from_uid)
        .bind(&connection.to_uid)
        .bind(&connection.from_username)
        .bind(&connection.to_username)
        .bind(&connection.to_display_name)
        .fetch_one(&*self.db)
        .await
        .map_err(|e| {
            // 并发添加同一对连接时落败
            if is_unique_violation(&e) {
                AppError::AlreadyConnected
            } else {
                e.into()
            }
        })?;

        Ok(created)
    }

    async fn list_by_owner(&self, from_uid: &str) -> AppResult<Vec<Connection>> {
        let connections = sqlx::query_as::<_, Connection>(&format!(
            r#"
            SELECT {CONNECTION_COLUMNS}
            FROM connections
            WHERE from_uid = $1
            ORDER BY created_at DESC
            "#
        ))
        .bind(from_uid)
        .fetch_all(&*self.db)
        .await?;

        Ok(connections)
    }

    async fn delete(&self, owner_uid: &str, id: &str) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM connections WHERE id = $1 AND from_uid = $2")
            .bind(id)
            .bind(owner_uid)
            .execute(&*self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
