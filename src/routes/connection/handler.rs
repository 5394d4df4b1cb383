use axum::{
    Json,
    extract::{Extension, Path, Query, State},
};
use futures_util::future::try_join_all;

use crate::{
    AppState,
    error::AppResult,
    middleware::CurrentUser,
    routes::LocalTime,
    services::RemovalOutcome,
    utils::{ApiResponse, success_to_api_response},
};

use super::model::{
    AddConnectionRequest, ConnectionInfo, RemoveConnectionResponse, TapResponse,
    TodayCountResponse,
};

pub async fn list_connections(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Query(local): Query<LocalTime>,
) -> AppResult<Json<ApiResponse<Vec<ConnectionInfo>>>> {
    let offset = local.offset(&state.config);
    let now = state.clock.now();
    let connections = state.connections.list_connections(&user.uid).await?;

    let counts = try_join_all(
        connections
            .iter()
            .map(|c| state.taps.today_count(&user.uid, &c.to_uid, offset)),
    )
    .await?;

    let rows = connections
        .into_iter()
        .zip(counts)
        .map(|(connection, tapped_today)| {
            let remaining = state
                .sessions
                .with_session(&user.session_id, now, |s| {
                    s.throttle.remaining(&connection.id, now)
                })
                .unwrap_or_default();
            ConnectionInfo::new(connection, tapped_today, remaining.as_millis() as u64)
        })
        .collect();

    Ok(success_to_api_response(rows))
}

pub async fn add_connection(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(req): Json<AddConnectionRequest>,
) -> AppResult<Json<ApiResponse<ConnectionInfo>>> {
    let connection = state
        .connections
        .search_and_add(&user.uid, &user.username, &req.username)
        .await?;
    Ok(success_to_api_response(ConnectionInfo::new(connection, 0, 0)))
}

pub async fn remove_connection(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(connection_id): Path<String>,
) -> Json<ApiResponse<RemoveConnectionResponse>> {
    let outcome = state
        .connections
        .remove_connection(&user.uid, &connection_id)
        .await;
    // 删除失败时连接仍在，冷却必须保留
    if outcome == RemovalOutcome::Removed {
        state.sessions.with_session(&user.session_id, state.clock.now(), |s| {
            s.throttle.forget(&connection_id)
        });
    }
    success_to_api_response(RemoveConnectionResponse { outcome })
}

pub async fn tap(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(connection_id): Path<String>,
    Query(local): Query<LocalTime>,
) -> AppResult<Json<ApiResponse<TapResponse>>> {
    let connection = state.connections.get_owned(&user.uid, &connection_id).await?;
    let outcome = state
        .taps
        .tap_connection(
            &state.sessions,
            &user.session_id,
            &connection,
            local.offset(&state.config),
        )
        .await?;

    Ok(success_to_api_response(TapResponse {
        timestamp: outcome.tap.timestamp,
        tapped_today: outcome.today_count,
        cooldown_ms: state.config.tap_cooldown().as_millis() as u64,
    }))
}

pub async fn today_count(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(connection_id): Path<String>,
    Query(local): Query<LocalTime>,
) -> AppResult<Json<ApiResponse<TodayCountResponse>>> {
    let connection = state.connections.get_owned(&user.uid, &connection_id).await?;
    let tapped_today = state
        .taps
        .today_count(&user.uid, &connection.to_uid, local.offset(&state.config))
        .await?;
    let now = state.clock.now();
    let can_tap = state
        .sessions
        .with_session(&user.session_id, now, |s| s.throttle.can_tap(&connection.id, now))
        .unwrap_or(true);

    Ok(success_to_api_response(TodayCountResponse {
        tapped_today,
        can_tap,
    }))
}
