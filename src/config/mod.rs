use std::env;
use std::str::FromStr;
use std::time::Duration;

use chrono::{FixedOffset, Offset, Utc};

#[derive(Debug, Clone, serde::Deserialize)]
pub struct Config {
    pub database_url: String,
    pub redis_url: String,
    pub jwt_secret: String,
    pub jwt_expiration_secs: u64,
    pub rate_limit_window_secs: u64,
    pub rate_limit_requests: u32,
    pub server_host: String,
    pub server_port: u16,
    pub api_base_uri: String,
    pub tap_cooldown_secs: u64,
    pub summary_refresh_hour: u32,
    pub default_utc_offset_minutes: i32,
    pub bcrypt_cost: u32,
}

/// 读取可选环境变量，未设置或无法解析时使用默认值
fn var_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

impl Config {
    pub fn from_env() -> Result<Self, env::VarError> {
        dotenv::dotenv().ok();

        let jwt_expiration = env::var("JWT_EXPIRATION")
            .ok()
            .and_then(|v| v.trim_end_matches('h').parse::<u64>().ok())
            .unwrap_or(24);

        Ok(Config {
            database_url: env::var("DATABASE_URL")?,
            redis_url: env::var("REDIS_URL")?,
            jwt_secret: env::var("JWT_SECRET")?,
            jwt_expiration_secs: jwt_expiration * 3600,
            server_host: env::var("SERVER_HOST").unwrap_or_else(|_| "::".into()),
            server_port: var_or("SERVER_PORT", 3000),
            api_base_uri: env::var("API_BASE_URI").unwrap_or_else(|_| "/api".into()),
            rate_limit_window_secs: var_or("RATE_LIMIT_WINDOW", 60),
            rate_limit_requests: var_or("RATE_LIMIT_REQUESTS", 100),
            tap_cooldown_secs: var_or("TAP_COOLDOWN_SECS", 180),
            summary_refresh_hour: var_or("SUMMARY_REFRESH_HOUR", 23).min(23),
            default_utc_offset_minutes: var_or("DEFAULT_UTC_OFFSET_MINUTES", 0),
            bcrypt_cost: var_or("BCRYPT_COST", bcrypt::DEFAULT_COST),
        })
    }

    pub fn jwt_expiration(&self) -> Duration {
        Duration::from_secs(self.jwt_expiration_secs)
    }

    pub fn rate_limit_window(&self) -> Duration {
        Duration::from_secs(self.rate_limit_window_secs)
    }

    pub fn tap_cooldown(&self) -> Duration {
        Duration::from_secs(self.tap_cooldown_secs)
    }

    /// 请求未携带时区时使用的默认偏移
    pub fn default_offset(&self) -> FixedOffset {
        offset_from_minutes(self.default_utc_offset_minutes)
    }
}

/// 超出范围的偏移回退为 UTC
pub fn offset_from_minutes(minutes: i32) -> FixedOffset {
    minutes
        .checked_mul(60)
        .and_then(FixedOffset::east_opt)
        .unwrap_or_else(|| Utc.fix())
}
