use axum::{
    Json,
    extract::{Extension, State},
};

use crate::{
    AppState,
    error::AppResult,
    middleware::CurrentUser,
    models::Preferences,
    services::{Registration, SignedIn},
    utils::{ApiResponse, success_to_api_response},
};

use super::model::{
    LoginRequest, LogoutResponse, ProfileResponse, UpdateDisplayNameRequest,
    UpdatePreferencesRequest,
};

pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<Registration>,
) -> AppResult<Json<ApiResponse<SignedIn>>> {
    let signed_in = state.identity.register(req).await?;
    Ok(success_to_api_response(signed_in))
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> AppResult<Json<ApiResponse<SignedIn>>> {
    let signed_in = state.identity.sign_in(&req.email, &req.password).await?;
    Ok(success_to_api_response(signed_in))
}

pub async fn logout(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> Json<ApiResponse<LogoutResponse>> {
    state.identity.sign_out(&user.session_id);
    success_to_api_response(LogoutResponse {})
}

pub async fn me(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> AppResult<Json<ApiResponse<ProfileResponse>>> {
    let profile = state.identity.current_user(&user.uid).await?;
    Ok(success_to_api_response(profile.into()))
}

pub async fn update_display_name(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(req): Json<UpdateDisplayNameRequest>,
) -> AppResult<Json<ApiResponse<ProfileResponse>>> {
    let profile = state
        .identity
        .update_display_name(&user.uid, &req.display_name)
        .await?;
    Ok(success_to_api_response(profile.into()))
}

pub async fn get_preferences(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> AppResult<Json<ApiResponse<Preferences>>> {
    let preferences = state.preferences.get_preferences(&user.uid).await?;
    Ok(success_to_api_response(preferences))
}

pub async fn update_preferences(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(req): Json<UpdatePreferencesRequest>,
) -> AppResult<Json<ApiResponse<Preferences>>> {
    let current = state.preferences.get_preferences(&user.uid).await?;
    let updated = req.apply(current)?;
    state.preferences.put_preferences(&user.uid, &updated).await?;
    Ok(success_to_api_response(updated))
}
