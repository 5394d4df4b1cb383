use std::sync::Arc;

use async_trait::async_trait;
use redis::{AsyncCommands, Client as RedisClient};

use crate::cache::keys::preferences_key;
use crate::database::traits::PreferenceRepository;
use crate::error::AppResult;
use crate::models::Preferences;

pub struct PreferenceCacheOperations {
    redis: Arc<RedisClient>,
}

impl PreferenceCacheOperations {
    pub fn new(redis: Arc<RedisClient>) -> Self {
        Self { redis }
    }
}

#[async_trait]
impl PreferenceRepository for PreferenceCacheOperations {
    async fn get_preferences(&self, uid: &str) -> AppResult<Preferences> {
        let mut conn = self.redis.get_multiplexed_async_connection().await?;
        let raw: Option<String> = conn.get(preferences_key(uid)).await?;

        match raw {
            Some(json) => Ok(serde_json::from_str(&json)?),
            None => Ok(Preferences::default()),
        }
    }

    async fn put_preferences(&self, uid: &str, preferences: &Preferences) -> AppResult<()> {
        let mut conn = self.redis.get_multiplexed_async_connection().await?;
        let json = serde_json::to_string(preferences)?;
        let _: () = conn.set(preferences_key(uid), json).await?;
        Ok(())
    }
}
