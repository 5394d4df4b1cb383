use axum::{
    Router,
    routing::{delete, get, post, put},
};
use chrono::FixedOffset;
use serde::Deserialize;

use crate::{
    AppState,
    config::{Config, offset_from_minutes},
    middleware::auth_middleware,
};

pub mod connection;
pub mod summary;
pub mod user;

/// 客户端通过 `?tz_offset_minutes=` 传入本地时区偏移
#[derive(Debug, Default, Deserialize)]
pub struct LocalTime {
    pub tz_offset_minutes: Option<i32>,
}

impl LocalTime {
    pub fn offset(&self, config: &Config) -> FixedOffset {
        match self.tz_offset_minutes {
            Some(minutes) => offset_from_minutes(minutes),
            None => config.default_offset(),
        }
    }
}

/// 挂载在配置的基础路径下的所有 API 路由
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/users/register", post(user::register))
        .route("/users/login", post(user::login));

    let protected_routes = Router::new()
        .route("/users/logout", post(user::logout))
        .route("/users/me", get(user::me))
        .route("/users/display-name", put(user::update_display_name))
        .route(
            "/users/preferences",
            get(user::get_preferences).put(user::update_preferences),
        )
        .route(
            "/connections",
            get(connection::list_connections).post(connection::add_connection),
        )
        .route("/connections/{id}", delete(connection::remove_connection))
        .route("/connections/{id}/tap", post(connection::tap))
        .route("/connections/{id}/today", get(connection::today_count))
        .route("/summary", get(summary::get_summary))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .nest(
            &state.config.api_base_uri,
            Router::new().merge(public_routes).merge(protected_routes),
        )
        .with_state(state)
}
