//! 实现所有仓储 trait 的内存存储
//!
//! 用于测试以及没有 Postgres/Redis 的本地运行。连接 ID
//! 和创建时间在这里分配，与数据库行为一致。

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::clock::{Clock, SystemClock};
use crate::database::traits::{
    ConnectionRepository, PreferenceRepository, SummaryCacheRepository, TapRepository,
    UserRepository,
};
use crate::error::{AppError, AppResult};
use crate::models::{
    Connection, NewConnection, NewUser, Preferences, SummaryCounts, Tap, TapTally, User, UserRef,
};

#[derive(Default)]
struct Collections {
    users: HashMap<String, User>,
    // 用户名 -> uid
    usernames: HashMap<String, String>,
    // (插入序号, 行)
    connections: Vec<(u64, Connection)>,
    taps: Vec<Tap>,
    summary_data: HashMap<String, SummaryCounts>,
    summary_time: HashMap<String, DateTime<Utc>>,
    preferences: HashMap<String, Preferences>,
}

pub struct MemoryStore {
    clock: Arc<dyn Clock>,
    data: RwLock<Collections>,
    sequence: AtomicU64,
    offline: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// 由 `clock` 分配时间戳的存储
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            data: RwLock::new(Collections::default()),
            sequence: AtomicU64::new(0),
            offline: AtomicBool::new(false),
        }
    }

    /// 离线时所有调用都返回 `StoreUnavailable`
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub async fn tap_count(&self) -> usize {
        self.data.read().await.taps.len()
    }

    pub async fn connection_count(&self) -> usize {
        self.data.read().await.connections.len()
    }

    fn check_online(&self) -> AppResult<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(AppError::StoreUnavailable("memory store offline".into()));
        }
        Ok(())
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn find_by_uid(&self, uid: &str) -> AppResult<Option<User>> {
        self.check_online()?;
        Ok(self.data.read().await.users.get(uid).cloned())
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>> {
        self.check_online()?;
        let data = self.data.read().await;
        Ok(data
            .users
            .values()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn resolve_username(&self, username: &str) -> AppResult<Option<UserRef>> {
        self.check_online()?;
        let data = self.data.read().await;
        Ok(data
            .usernames
            .get(username)
            .and_then(|uid| data.users.get(uid))
            .map(UserRef::from))
    }

    async fn create(&self, user: NewUser) -> AppResult<User> {
        self.check_online()?;
        let mut data = self.data.write().await;
        if data.usernames.contains_key(&user.username) {
            return Err(AppError::UsernameTaken);
        }
        if data.users.values().any(|u| u.email.eq_ignore_ascii_case(&user.email)) {
            return Err(AppError::Validation("email already registered".into()));
        }

        let created = User {
            uid: user.uid,
            username: user.username,
            display_name: user.display_name,
            email: user.email,
            password_hash: user.password_hash,
            created_at: user.created_at,
        };
        data.usernames.insert(created.username.clone(), created.uid.clone());
        data.users.insert(created.uid.clone(), created.clone());
        Ok(created)
    }

    async fn update_display_name(&self, uid: &str, display_name: &str) -> AppResult<Option<User>> {
        self.check_online()?;
        let mut data = self.data.write().await;
        Ok(data.users.get_mut(uid).map(|user| {
            user.display_name = display_name.to_string();
            user.clone()
        }))
    }
}

#[async_trait]
impl ConnectionRepository for MemoryStore {
    async fn find_pair(&self, from_uid: &str, to_uid: &str) -> AppResult<Option<Connection>> {
        self.check_online()?;
        let data = self.data.read().await;
        Ok(data
            .connections
            .iter()
            .map(|(_, c)| c)
            .find(|c| c.from_uid == from_uid && c.to_uid == to_uid)
            .cloned())
    }

    async fn find_by_id(&self, id: &str) -> AppResult<Option<Connection>> {
        self.check_online()?;
        let data = self.data.read().await;
        Ok(data
            .connections
            .iter()
            .map(|(_, c)| c)
            .find(|c| c.id == id)
            .cloned())
    }

    async fn insert(&self, connection: NewConnection) -> AppResult<Connection> {
        self.check_online()?;
        let seq = self.sequence.fetch_add(1, Ordering::SeqCst);
        let row = Connection {
            id: uuid::Uuid::new_v4().to_string(),
            from_uid: connection.from_uid,
            to_uid: connection.to_uid,
            from_username: connection.from_username,
            to_username: connection.to_username,
            to_display_name: connection.to_display_name,
            created_at: self.clock.now(),
        };
        self.data.write().await.connections.push((seq, row.clone()));
        Ok(row)
    }

    async fn list_by_owner(&self, from_uid: &str) -> AppResult<Vec<Connection>> {
        self.check_online()?;
        let data = self.data.read().await;
        let mut owned: Vec<&(u64, Connection)> = data
            .connections
            .iter()
            .filter(|(_, c)| c.from_uid == from_uid)
            .collect();
        // 最新的在前，时间相同时按插入顺序
        owned.sort_by(|(sa, a), (sb, b)| b.created_at.cmp(&a.created_at).then(sb.cmp(sa)));
        Ok(owned.into_iter().map(|(_, c)| c.clone()).collect())
    }

    async fn delete(&self, owner_uid: &str, id: &str) -> AppResult<bool> {
        self.check_online()?;
        let mut data = self.data.write().await;
        let before = data.connections.len();
        data.connections
            .retain(|(_, c)| !(c.id == id && c.from_uid == owner_uid));
        Ok(data.connections.len() != before)
    }
}

#[async_trait]
impl TapRepository for MemoryStore {
    async fn append(&self, tap: Tap) -> AppResult<Tap> {
        self.check_online()?;
        self.data.write().await.taps.push(tap.clone());
        Ok(tap)
    }

    async fn count_between(&self, from_uid: &str, to_uid: &str, since: DateTime<Utc>) -> AppResult<u64> {
        self.check_online()?;
        let data = self.data.read().await;
        Ok(data
            .taps
            .iter()
            .filter(|t| t.from_uid == from_uid && t.to_uid == to_uid && t.timestamp >= since)
            .count() as u64)
    }

    async fn count_by_sender_since(&self, to_uid: &str, since: DateTime<Utc>) -> AppResult<TapTally> {
        self.check_online()?;
        let data = self.data.read().await;
        let mut tally = TapTally::new();
        for tap in data.taps.iter().filter(|t| t.to_uid == to_uid && t.timestamp >= since) {
            *tally.entry(tap.from_username.clone()).or_insert(0) += 1;
        }
        Ok(tally)
    }
}

#[async_trait]
impl SummaryCacheRepository for MemoryStore {
    async fn load_time(&self, uid: &str) -> AppResult<Option<DateTime<Utc>>> {
        self.check_online()?;
        Ok(self.data.read().await.summary_time.get(uid).copied())
    }

    async fn load_data(&self, uid: &str) -> AppResult<Option<SummaryCounts>> {
        self.check_online()?;
        Ok(self.data.read().await.summary_data.get(uid).cloned())
    }

    async fn store(&self, uid: &str, data: &SummaryCounts, computed_at: DateTime<Utc>) -> AppResult<()> {
        self.check_online()?;
        let mut collections = self.data.write().await;
        collections.summary_data.insert(uid.to_string(), data.clone());
        collections.summary_time.insert(uid.to_string(), computed_at);
        Ok(())
    }
}

#[async_trait]
impl PreferenceRepository for MemoryStore {
    async fn get_preferences(&self, uid: &str) -> AppResult<Preferences> {
        self.check_online()?;
        Ok(self
            .data
            .read()
            .await
            .preferences
            .get(uid)
            .cloned()
            .unwrap_or_default())
    }

    async fn put_preferences(&self, uid: &str, preferences: &Preferences) -> AppResult<()> {
        self.check_online()?;
        self.data
            .write()
            .await
            .preferences
            .insert(uid.to_string(), preferences.clone());
        Ok(())
    }
}
