use axum::{
    Json,
    extract::{Extension, Query, State},
};

use crate::{
    AppState,
    error::AppResult,
    middleware::CurrentUser,
    routes::LocalTime,
    services::SummaryView,
    utils::{ApiResponse, success_to_api_response},
};

/// 按发送者统计收到的点按。每天在刷新时刻之后最多刷新一次。
pub async fn get_summary(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Query(local): Query<LocalTime>,
) -> AppResult<Json<ApiResponse<SummaryView>>> {
    let view = state
        .summary
        .get_summary(&user.uid, local.offset(&state.config))
        .await?;
    Ok(success_to_api_response(view))
}
