use std::sync::Arc;

use serde::Serialize;

use crate::database::traits::{ConnectionRepository, UserRepository};
use crate::error::{AppError, AppResult};
use crate::models::{Connection, NewConnection, UserRef};
use crate::utils::normalize_username;

/// 删除请求的结果。存储失败在这里报告而不是抛出，
/// 调用方无论如何都可以刷新列表。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RemovalOutcome {
    Removed,
    Absent,
    Failed,
}

/// 用户发出的连接
pub struct ConnectionStore {
    users: Arc<dyn UserRepository>,
    connections: Arc<dyn ConnectionRepository>,
}

impl ConnectionStore {
    pub fn new(users: Arc<dyn UserRepository>, connections: Arc<dyn ConnectionRepository>) -> Self {
        Self { users, connections }
    }

    /// 不区分大小写查找，忽略开头的 `@`
    pub async fn find_by_username(&self, query: &str) -> AppResult<UserRef> {
        let username = normalize_username(query);
        if username.is_empty() {
            return Err(AppError::NotFound);
        }
        self.users
            .resolve_username(&username)
            .await?
            .ok_or(AppError::NotFound)
    }

    pub async fn add_connection(
        &self,
        from_uid: &str,
        from_username: &str,
        target: &UserRef,
    ) -> AppResult<Connection> {
        if target.username == from_username {
            return Err(AppError::SelfAddition);
        }
        // 先读后写，并发情况由 Postgres 唯一索引兜底
        if self.connections.find_pair(from_uid, &target.uid).await?.is_some() {
            return Err(AppError::AlreadyConnected);
        }

        let connection = self
            .connections
            .insert(NewConnection {
                from_uid: from_uid.to_string(),
                to_uid: target.uid.clone(),
                from_username: from_username.to_string(),
                to_username: target.username.clone(),
                to_display_name: target.display_name.clone(),
            })
            .await?;

        tracing::info!(
            "Connection {} added: @{} -> @{}",
            connection.id,
            from_username,
            connection.to_username
        );
        Ok(connection)
    }

    /// 解析 `query` 并添加连接。输入自己的用户名时
    /// 在访问存储之前就会被拒绝。
    pub async fn search_and_add(
        &self,
        from_uid: &str,
        from_username: &str,
        query: &str,
    ) -> AppResult<Connection> {
        let username = normalize_username(query);
        if username.is_empty() {
            return Err(AppError::Validation("username is required".into()));
        }
        if username == from_username {
            return Err(AppError::SelfAddition);
        }

        let target = self.find_by_username(&username).await?;
        self.add_connection(from_uid, from_username, &target).await
    }

    /// 最新的在前，每次调用都重新读取
    pub async fn list_connections(&self, from_uid: &str) -> AppResult<Vec<Connection>> {
        self.connections.list_by_owner(from_uid).await
    }

    /// `owner_uid` 的连接；他人的连接 ID 视为不存在
    pub async fn get_owned(&self, owner_uid: &str, connection_id: &str) -> AppResult<Connection> {
        match self.connections.find_by_id(connection_id).await? {
            Some(connection) if connection.from_uid == owner_uid => Ok(connection),
            _ => Err(AppError::NotFound),
        }
    }

    pub async fn remove_connection(&self, owner_uid: &str, connection_id: &str) -> RemovalOutcome {
        match self.connections.delete(owner_uid, connection_id).await {
            Ok(true) => {
                tracing::info!("Connection {} removed by {}", connection_id, owner_uid);
                RemovalOutcome::Removed
            }
            Ok(false) => RemovalOutcome::Absent,
            Err(e) => {
                tracing::error!("Remove failed for connection {}: {}", connection_id, e);
                RemovalOutcome::Failed
            }
        }
    }
}
