//! 按会话保存的点按冷却状态
//!
//! 状态只保存在进程内存中：登录时创建会话，登出、令牌过期或服务重启后丢失。

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};

/// 同一连接两次点按之间的默认间隔
pub const COOLDOWN: Duration = Duration::from_secs(180);

/// 每个连接最后一次被接受的点按时间
#[derive(Debug, Clone)]
pub struct TapThrottle {
    cooldown: Duration,
    last_tap: HashMap<String, DateTime<Utc>>,
}

impl TapThrottle {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            cooldown,
            last_tap: HashMap::new(),
        }
    }

    pub fn can_tap(&self, connection_id: &str, now: DateTime<Utc>) -> bool {
        self.remaining(connection_id, now).is_zero()
    }

    /// 距离该连接可再次点按的剩余时间
    pub fn remaining(&self, connection_id: &str, now: DateTime<Utc>) -> Duration {
        let Some(last) = self.last_tap.get(connection_id) else {
            return Duration::ZERO;
        };
        // 时钟回拨视为未经过任何时间
        let elapsed = (now - *last).to_std().unwrap_or(Duration::ZERO);
        self.cooldown.saturating_sub(elapsed)
    }

    pub fn record(&mut self, connection_id: &str, now: DateTime<Utc>) {
        self.last_tap.insert(connection_id.to_string(), now);
    }

    pub fn forget(&mut self, connection_id: &str) {
        self.last_tap.remove(connection_id);
    }
}

impl Default for TapThrottle {
    fn default() -> Self {
        Self::new(COOLDOWN)
    }
}

/// 单个登录会话持有的可变状态
#[derive(Debug, Clone)]
pub struct SessionState {
    pub expires_at: DateTime<Utc>,
    pub throttle: TapThrottle,
}

/// 会话 ID → 状态。登录时创建，登出或过期时移除。
#[derive(Debug)]
pub struct SessionRegistry {
    cooldown: Duration,
    sessions: Mutex<HashMap<String, SessionState>>,
}

impl SessionRegistry {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            cooldown,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, SessionState>> {
        self.sessions.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// 注册新会话，并顺带清理已过期的会话
    pub fn open(&self, session_id: &str, uid: &str, expires_at: DateTime<Utc>, now: DateTime<Utc>) {
        let mut sessions = self.lock();
        prune(&mut sessions, now);
        sessions.insert(
            session_id.to_string(),
            SessionState {
                expires_at,
                throttle: TapThrottle::new(self.cooldown),
            },
        );
        tracing::debug!("Opened session {} for {}", session_id, uid);
    }

    pub fn close(&self, session_id: &str) -> bool {
        self.lock().remove(session_id).is_some()
    }

    /// 会话是否仍然有效；过期会话在此被清理
    pub fn is_active(&self, session_id: &str, now: DateTime<Utc>) -> bool {
        let mut sessions = self.lock();
        prune(&mut sessions, now);
        sessions.contains_key(session_id)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 对有效会话的状态执行 `f`；未知或已过期的会话返回 `None`
    pub fn with_session<R>(
        &self,
        session_id: &str,
        now: DateTime<Utc>,
        f: impl FnOnce(&mut SessionState) -> R,
    ) -> Option<R> {
        let mut sessions = self.lock();
        match sessions.get_mut(session_id) {
            Some(state) if state.expires_at > now => Some(f(state)),
            Some(_) => {
                sessions.remove(session_id);
                None
            }
            None => None,
        }
    }
}

fn prune(sessions: &mut HashMap<String, SessionState>, now: DateTime<Utc>) {
    let before = sessions.len();
    sessions.retain(|_, s| s.expires_at > now);
    if sessions.len() != before {
        tracing::debug!("Pruned {} expired sessions", before - sessions.len());
    }
}
