use std::sync::Arc;

use config::Config;
use redis::Client as RedisClient;
use sqlx::PgPool;

pub mod cache;
pub mod clock;
pub mod config;
pub mod database;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod throttle;
pub mod utils;

use cache::{PreferenceCacheOperations, SummaryCacheOperations};
use clock::Clock;
use database::{
    ConnectionRepository, MemoryStore, PgConnectionRepository, PgTapRepository, PgUserRepository,
    PreferenceRepository, SummaryCacheRepository, TapRepository, UserRepository,
};
use services::{ConnectionStore, IdentityProvider, SummaryAggregator, TapRecorder};
use throttle::SessionRegistry;

/// 各服务使用的存储后端
#[derive(Clone)]
pub struct Stores {
    pub users: Arc<dyn UserRepository>,
    pub connections: Arc<dyn ConnectionRepository>,
    pub taps: Arc<dyn TapRepository>,
    pub summary_cache: Arc<dyn SummaryCacheRepository>,
    pub preferences: Arc<dyn PreferenceRepository>,
}

impl Stores {
    /// Postgres 存文档，Redis 存键值状态
    pub fn live(pool: PgPool, redis: Arc<RedisClient>) -> Self {
        let pool = Arc::new(pool);
        Self {
            users: Arc::new(PgUserRepository::new(pool.clone())),
            connections: Arc::new(PgConnectionRepository::new(pool.clone())),
            taps: Arc::new(PgTapRepository::new(pool)),
            summary_cache: Arc::new(SummaryCacheOperations::new(redis.clone())),
            preferences: Arc::new(PreferenceCacheOperations::new(redis)),
        }
    }

    pub fn memory(store: Arc<MemoryStore>) -> Self {
        Self {
            users: store.clone(),
            connections: store.clone(),
            taps: store.clone(),
            summary_cache: store.clone(),
            preferences: store,
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub clock: Arc<dyn Clock>,
    pub sessions: Arc<SessionRegistry>,
    pub identity: Arc<IdentityProvider>,
    pub connections: Arc<ConnectionStore>,
    pub taps: Arc<TapRecorder>,
    pub summary: Arc<SummaryAggregator>,
    pub preferences: Arc<dyn PreferenceRepository>,
}

impl AppState {
    pub fn new(config: Config, stores: Stores, clock: Arc<dyn Clock>) -> Self {
        let config = Arc::new(config);
        let sessions = Arc::new(SessionRegistry::new(config.tap_cooldown()));
        let taps = Arc::new(TapRecorder::new(stores.taps, clock.clone()));

        Self {
            identity: Arc::new(IdentityProvider::new(
                stores.users.clone(),
                sessions.clone(),
                clock.clone(),
                config.clone(),
            )),
            connections: Arc::new(ConnectionStore::new(stores.users, stores.connections)),
            summary: Arc::new(SummaryAggregator::new(
                taps.clone(),
                stores.summary_cache,
                clock.clone(),
                config.summary_refresh_hour,
            )),
            taps,
            preferences: stores.preferences,
            sessions,
            clock,
            config,
        }
    }
}
