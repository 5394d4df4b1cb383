use std::sync::Arc;

use chrono::{DateTime, FixedOffset, NaiveTime, Utc};
use serde::Serialize;

use crate::clock::Clock;
use crate::database::traits::TapRepository;
use crate::error::{AppError, AppResult};
use crate::models::{Connection, Tap, TapTally};
use crate::throttle::SessionRegistry;

/// `now` 在 `offset` 时区当天零点对应的 UTC 时间
pub fn start_of_local_day(now: DateTime<Utc>, offset: FixedOffset) -> DateTime<Utc> {
    let local = now.with_timezone(&offset);
    let midnight = local.date_naive().and_time(NaiveTime::MIN);
    // 固定偏移下每个本地时间都只有唯一对应
    (midnight - offset).and_utc()
}

#[derive(Debug, Clone, Serialize)]
pub struct TapOutcome {
    pub tap: Tap,
    pub today_count: u64,
}

/// 记录点按并统计
pub struct TapRecorder {
    taps: Arc<dyn TapRepository>,
    clock: Arc<dyn Clock>,
}

impl TapRecorder {
    pub fn new(taps: Arc<dyn TapRepository>, clock: Arc<dyn Clock>) -> Self {
        Self { taps, clock }
    }

    pub async fn send_tap(
        &self,
        from_uid: &str,
        from_username: &str,
        to_uid: &str,
        to_username: &str,
    ) -> AppResult<Tap> {
        let tap = Tap {
            from_uid: from_uid.to_string(),
            to_uid: to_uid.to_string(),
            from_username: from_username.to_string(),
            to_username: to_username.to_string(),
            timestamp: self.clock.now(),
        };
        self.taps.append(tap).await
    }

    pub async fn count_since(&self, from_uid: &str, to_uid: &str, since: DateTime<Utc>) -> AppResult<u64> {
        self.taps.count_between(from_uid, to_uid, since).await
    }

    pub async fn count_grouped_since(&self, to_uid: &str, since: DateTime<Utc>) -> AppResult<TapTally> {
        self.taps.count_by_sender_since(to_uid, since).await
    }

    /// 本地零点以来 `from_uid` 发给 `to_uid` 的点按数
    pub async fn today_count(&self, from_uid: &str, to_uid: &str, offset: FixedOffset) -> AppResult<u64> {
        let since = start_of_local_day(self.clock.now(), offset);
        self.count_since(from_uid, to_uid, since).await
    }

    /// 通过 `connection` 发送点按，除非该会话对此连接的冷却仍未结束。
    /// 点按写入成功后才开始冷却。
    pub async fn tap_connection(
        &self,
        sessions: &SessionRegistry,
        session_id: &str,
        connection: &Connection,
        offset: FixedOffset,
    ) -> AppResult<TapOutcome> {
        let now = self.clock.now();
        let remaining = sessions
            .with_session(session_id, now, |s| s.throttle.remaining(&connection.id, now))
            .ok_or(AppError::Unauthorized)?;
        if !remaining.is_zero() {
            tracing::debug!(
                "Tap on {} rejected, {}ms of cooldown left",
                connection.id,
                remaining.as_millis()
            );
            return Err(AppError::CooldownActive {
                retry_after: remaining,
            });
        }

        let tap = self
            .send_tap(
                &connection.from_uid,
                &connection.from_username,
                &connection.to_uid,
                &connection.to_username,
            )
            .await?;
        sessions.with_session(session_id, now, |s| s.throttle.record(&connection.id, now));

        let today_count = self
            .today_count(&connection.from_uid, &connection.to_uid, offset)
            .await?;
        Ok(TapOutcome { tap, today_count })
    }
}
