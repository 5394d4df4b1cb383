use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::{cache::RateLimitCacheOperations, config::Config, error::AppError};

/// 按客户端的固定窗口请求限流，计数保存在 Redis
#[derive(Clone)]
pub struct RateLimiter {
    redis: Arc<redis::Client>,
    config: Arc<Config>,
}

impl RateLimiter {
    pub fn new(redis: Arc<redis::Client>, config: Arc<Config>) -> Self {
        Self { redis, config }
    }

    /// 优先使用代理头，否则使用连接地址
    fn client_key(req: &Request<Body>) -> String {
        let header = |name: &str| {
            req.headers()
                .get(name)
                .and_then(|h| h.to_str().ok())
                .and_then(|s| s.split(',').map(str::trim).find(|ip| !ip.is_empty()))
                .map(str::to_string)
        };

        header("x-real-ip")
            .or_else(|| header("x-forwarded-for"))
            .or_else(|| {
                req.extensions()
                    .get::<ConnectInfo<SocketAddr>>()
                    .map(|ci| ci.0.ip().to_string())
            })
            .unwrap_or_else(|| "unknown".to_string())
    }

    async fn check(&self, req: Request<Body>, next: Next) -> Response {
        let client = Self::client_key(&req);
        let window = self.config.rate_limit_window().as_secs();

        match RateLimitCacheOperations::hit(&self.redis, &client, window).await {
            Ok(count) if count > self.config.rate_limit_requests => {
                tracing::warn!("Rate limit exceeded for {} ({} requests)", client, count);
                AppError::RateLimited(window).into_response()
            }
            Ok(_) => next.run(req).await,
            Err(e) => AppError::StoreUnavailable(e.to_string()).into_response(),
        }
    }
}

pub async fn rate_limit(
    State(limiter): State<Arc<RateLimiter>>,
    req: Request<Body>,
    next: Next,
) -> Response {
    limiter.check(req, next).await
}
