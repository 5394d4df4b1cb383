//! 收到的点按汇总，每天最多刷新一次
//!
//! 汇总是稳定的日终快照：只在刷新时刻（默认本地 23:00）之后
//! 重新计算，且每个本地自然日最多一次。
//! 在此之前访问看到的是上一次的快照。

use std::sync::Arc;

use chrono::{DateTime, Duration, FixedOffset, Timelike, Utc};
use serde::Serialize;

use crate::clock::Clock;
use crate::database::traits::SummaryCacheRepository;
use crate::error::AppResult;
use crate::models::SummaryCounts;
use crate::services::taps::TapRecorder;

pub const DEFAULT_REFRESH_HOUR: u32 = 23;

/// 返回的汇总是如何得到的
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SummaryState {
    /// 没有缓存，且还未到计算时间
    Empty,
    /// 缓存值，无需刷新
    Cached,
    /// 需要刷新但未到刷新时刻，返回上一次的值
    Stale,
    /// 本次调用中计算
    Refreshed,
}

#[derive(Debug, Clone, Serialize)]
pub struct SummaryView {
    pub state: SummaryState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<SummaryCounts>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub computed_at: Option<DateTime<Utc>>,
}

/// 上次在 `stored` 计算的汇总在 `now` 是否需要重新计算
pub fn is_due(
    stored: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    offset: FixedOffset,
    refresh_hour: u32,
) -> bool {
    let Some(stored) = stored else {
        return true;
    };
    let last = stored.with_timezone(&offset);
    let now = now.with_timezone(&offset);

    if last.date_naive() != now.date_naive() {
        return true;
    }
    last.hour() < refresh_hour && now.hour() >= refresh_hour
}

pub struct SummaryAggregator {
    recorder: Arc<TapRecorder>,
    cache: Arc<dyn SummaryCacheRepository>,
    clock: Arc<dyn Clock>,
    refresh_hour: u32,
}

impl SummaryAggregator {
    pub fn new(
        recorder: Arc<TapRecorder>,
        cache: Arc<dyn SummaryCacheRepository>,
        clock: Arc<dyn Clock>,
        refresh_hour: u32,
    ) -> Self {
        Self {
            recorder,
            cache,
            clock,
            refresh_hour,
        }
    }

    pub async fn get_summary(&self, uid: &str, offset: FixedOffset) -> AppResult<SummaryView> {
        self.summary_at(uid, self.clock.now(), offset).await
    }

    pub async fn summary_at(
        &self,
        uid: &str,
        now: DateTime<Utc>,
        offset: FixedOffset,
    ) -> AppResult<SummaryView> {
        let cached = self.cache.load_data(uid).await?;
        // 没有可用快照时忽略时间戳，到刷新时刻即重新计算
        let stored_time = match cached {
            Some(_) => self.cache.load_time(uid).await?,
            None => None,
        };
        let due = is_due(stored_time, now, offset, self.refresh_hour);

        if due && now.with_timezone(&offset).hour() >= self.refresh_hour {
            let summary = self.compute(uid, now).await?;
            self.cache.store(uid, &summary, now).await?;
            tracing::info!(
                "Refreshed summary for {}: {} senders in 24h, {} in 7d",
                uid,
                summary.count24.len(),
                summary.count7d.len()
            );
            return Ok(SummaryView {
                state: SummaryState::Refreshed,
                summary: Some(summary),
                computed_at: Some(now),
            });
        }

        let state = match (&cached, due) {
            (None, _) => SummaryState::Empty,
            (Some(_), true) => SummaryState::Stale,
            (Some(_), false) => SummaryState::Cached,
        };
        Ok(SummaryView {
            state,
            computed_at: stored_time,
            summary: cached,
        })
    }

    async fn compute(&self, uid: &str, now: DateTime<Utc>) -> AppResult<SummaryCounts> {
        let (count24, count7d) = futures_util::try_join!(
            self.recorder.count_grouped_since(uid, now - Duration::hours(24)),
            self.recorder.count_grouped_since(uid, now - Duration::days(7)),
        )?;
        Ok(SummaryCounts { count24, count7d })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::config::offset_from_minutes;
    use crate::database::MemoryStore;
    use crate::database::traits::TapRepository;
    use crate::models::{Tap, TapTally};
    use chrono::TimeZone;

    fn utc() -> FixedOffset {
        offset_from_minutes(0)
    }

    fn at(day: u32, hour: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, day, hour, min, 0).unwrap()
    }

    #[test]
    fn gate_refreshes_without_stored_time() {
        assert!(is_due(None, at(10, 8, 0), utc(), 23));
    }

    #[test]
    fn gate_refreshes_on_new_day() {
        assert!(is_due(Some(at(9, 22, 0)), at(10, 8, 0), utc(), 23));
    }

    #[test]
    fn gate_holds_within_same_evening() {
        assert!(!is_due(Some(at(10, 22, 0)), at(10, 22, 30), utc(), 23));
        assert!(!is_due(Some(at(10, 23, 5)), at(10, 23, 50), utc(), 23));
        assert!(!is_due(Some(at(10, 8, 0)), at(10, 12, 0), utc(), 23));
    }

    #[test]
    fn gate_refreshes_once_hour_crossed() {
        assert!(is_due(Some(at(10, 22, 0)), at(10, 23, 5), utc(), 23));
    }

    #[test]
    fn gate_uses_local_calendar() {
        // UTC 22:00 和 23:30 在 UTC+10 是次日 08:00 和 09:30
        let plus10 = offset_from_minutes(600);
        assert!(!is_due(Some(at(9, 22, 0)), at(9, 23, 30), plus10, 23));
        // 本地时间 5 月 9 日 22:00 和 5 月 10 日 11:00
        assert!(is_due(Some(at(9, 12, 0)), at(10, 1, 0), plus10, 23));
    }

    struct Fixture {
        clock: Arc<ManualClock>,
        store: Arc<MemoryStore>,
        aggregator: SummaryAggregator,
    }

    fn fixture(start: DateTime<Utc>) -> Fixture {
        let clock = Arc::new(ManualClock::new(start));
        let store = Arc::new(MemoryStore::with_clock(clock.clone()));
        let recorder = Arc::new(TapRecorder::new(store.clone(), clock.clone()));
        let aggregator = SummaryAggregator::new(recorder, store.clone(), clock.clone(), DEFAULT_REFRESH_HOUR);
        Fixture {
            clock,
            store,
            aggregator,
        }
    }

    async fn tap_from(store: &MemoryStore, sender: &str, when: DateTime<Utc>) {
        store
            .append(Tap {
                from_uid: format!("uid-{sender}"),
                to_uid: "bob".into(),
                from_username: sender.into(),
                to_username: "bob".into(),
                timestamp: when,
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn empty_before_refresh_hour() {
        let f = fixture(at(10, 9, 0));
        tap_from(&f.store, "alice", at(10, 8, 0)).await;

        let view = f.aggregator.get_summary("bob", utc()).await.unwrap();
        assert_eq!(view.state, SummaryState::Empty);
        assert!(view.summary.is_none());
    }

    #[tokio::test]
    async fn first_evening_call_computes_both_windows() {
        let now = at(10, 23, 15);
        let f = fixture(now);

        for i in 0..3 {
            tap_from(&f.store, "alice", now - Duration::hours(2 + i)).await;
        }
        tap_from(&f.store, "carol", now - Duration::hours(20)).await;
        for hours_ago in [30, 40, 50, 60, 80, 100, 150] {
            tap_from(&f.store, "alice", now - Duration::hours(hours_ago)).await;
        }
        tap_from(&f.store, "dave", now - Duration::days(7) - Duration::minutes(1)).await;

        let view = f.aggregator.get_summary("bob", utc()).await.unwrap();
        assert_eq!(view.state, SummaryState::Refreshed);
        assert_eq!(view.computed_at, Some(now));

        let summary = view.summary.unwrap();
        assert_eq!(
            summary.count24,
            TapTally::from([("alice".to_string(), 3), ("carol".to_string(), 1)])
        );
        assert_eq!(
            summary.count7d,
            TapTally::from([("alice".to_string(), 10), ("carol".to_string(), 1)])
        );
    }

    #[tokio::test]
    async fn refreshes_once_per_evening() {
        let f = fixture(at(10, 23, 0));
        tap_from(&f.store, "alice", at(10, 22, 0)).await;

        let first = f.aggregator.get_summary("bob", utc()).await.unwrap();
        assert_eq!(first.state, SummaryState::Refreshed);

        // 快照之后的新点按当晚不会计入
        tap_from(&f.store, "carol", at(10, 23, 10)).await;
        f.clock.set(at(10, 23, 30));
        let second = f.aggregator.get_summary("bob", utc()).await.unwrap();
        assert_eq!(second.state, SummaryState::Cached);
        assert_eq!(second.summary, first.summary);
        assert_eq!(second.computed_at, Some(at(10, 23, 0)));
    }

    #[tokio::test]
    async fn next_morning_serves_stale_snapshot_until_evening() {
        let f = fixture(at(10, 23, 0));
        tap_from(&f.store, "alice", at(10, 22, 0)).await;
        let snapshot = f.aggregator.get_summary("bob", utc()).await.unwrap().summary;

        tap_from(&f.store, "carol", at(11, 7, 0)).await;
        f.clock.set(at(11, 8, 0));
        let morning = f.aggregator.get_summary("bob", utc()).await.unwrap();
        assert_eq!(morning.state, SummaryState::Stale);
        assert_eq!(morning.summary, snapshot);

        f.clock.set(at(11, 23, 5));
        let evening = f.aggregator.get_summary("bob", utc()).await.unwrap();
        assert_eq!(evening.state, SummaryState::Refreshed);
        assert_eq!(evening.summary.unwrap().count24.get("carol"), Some(&1));
    }

    #[tokio::test]
    async fn same_day_snapshot_before_hour_refreshes_after_it() {
        let f = fixture(at(10, 22, 0));
        // 当天更早的快照，例如用更早的刷新时刻计算的
        f.aggregator
            .cache
            .store("bob", &SummaryCounts::default(), at(10, 22, 0))
            .await
            .unwrap();
        tap_from(&f.store, "alice", at(10, 22, 10)).await;

        f.clock.set(at(10, 22, 30));
        assert_eq!(
            f.aggregator.get_summary("bob", utc()).await.unwrap().state,
            SummaryState::Cached
        );

        f.clock.set(at(10, 23, 5));
        let view = f.aggregator.get_summary("bob", utc()).await.unwrap();
        assert_eq!(view.state, SummaryState::Refreshed);
        assert_eq!(view.summary.unwrap().count24.get("alice"), Some(&1));
    }

    /// 时间戳存在但数据不可读的缓存
    struct TimeOnlyCache {
        time: DateTime<Utc>,
        stored: std::sync::Mutex<Option<SummaryCounts>>,
    }

    #[async_trait::async_trait]
    impl SummaryCacheRepository for TimeOnlyCache {
        async fn load_time(&self, _uid: &str) -> AppResult<Option<DateTime<Utc>>> {
            Ok(Some(self.time))
        }

        async fn load_data(&self, _uid: &str) -> AppResult<Option<SummaryCounts>> {
            Ok(None)
        }

        async fn store(&self, _uid: &str, data: &SummaryCounts, _at: DateTime<Utc>) -> AppResult<()> {
            *self.stored.lock().unwrap() = Some(data.clone());
            Ok(())
        }
    }

    #[tokio::test]
    async fn missing_data_is_recomputed_despite_fresh_time() {
        let now = at(10, 23, 30);
        let clock = Arc::new(ManualClock::new(now));
        let store = Arc::new(MemoryStore::with_clock(clock.clone()));
        tap_from(&store, "alice", at(10, 22, 0)).await;

        let cache = Arc::new(TimeOnlyCache {
            time: at(10, 23, 10),
            stored: std::sync::Mutex::new(None),
        });
        let aggregator = SummaryAggregator::new(
            Arc::new(TapRecorder::new(store.clone(), clock.clone())),
            cache.clone(),
            clock,
            DEFAULT_REFRESH_HOUR,
        );

        let view = aggregator.get_summary("bob", utc()).await.unwrap();
        assert_eq!(view.state, SummaryState::Refreshed);
        assert_eq!(view.summary.unwrap().count24.get("alice"), Some(&1));
        assert!(cache.stored.lock().unwrap().is_some());
    }

    #[tokio::test]
    async fn missing_data_before_hour_reads_empty() {
        let clock = Arc::new(ManualClock::new(at(10, 9, 0)));
        let store = Arc::new(MemoryStore::with_clock(clock.clone()));
        let aggregator = SummaryAggregator::new(
            Arc::new(TapRecorder::new(store, clock.clone())),
            Arc::new(TimeOnlyCache {
                time: at(10, 8, 0),
                stored: std::sync::Mutex::new(None),
            }),
            clock,
            DEFAULT_REFRESH_HOUR,
        );

        let view = aggregator.get_summary("bob", utc()).await.unwrap();
        assert_eq!(view.state, SummaryState::Empty);
        assert_eq!(view.computed_at, None);
    }

    #[tokio::test]
    async fn store_failure_surfaces() {
        let f = fixture(at(10, 23, 0));
        f.store.set_offline(true);
        assert!(f.aggregator.get_summary("bob", utc()).await.is_err());
    }
}
