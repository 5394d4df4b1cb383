use axum::{
    extract::{FromRequestParts, Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
};

use crate::{AppState, error::AppError, utils::verify_token};

/// 调用者身份，附加在每个受保护的请求上
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub uid: String,
    pub username: String,
    pub session_id: String,
}

pub async fn auth_middleware(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let (mut parts, body) = req.into_parts();

    let TypedHeader(Authorization(bearer)) =
        TypedHeader::<Authorization<Bearer>>::from_request_parts(&mut parts, &state)
            .await
            .map_err(|_| AppError::Unauthorized)?;

    let claims = verify_token(bearer.token(), &state.config).map_err(|e| {
        tracing::debug!("Rejected token: {}", e);
        AppError::Unauthorized
    })?;

    if !state.sessions.is_active(&claims.sid, state.clock.now()) {
        tracing::debug!("Rejected token for closed session {}", claims.sid);
        return Err(AppError::Unauthorized);
    }

    parts.extensions.insert(CurrentUser {
        uid: claims.sub,
        username: claims.username,
        session_id: claims.sid,
    });

    Ok(next.run(Request::from_parts(parts, body)).await)
}
