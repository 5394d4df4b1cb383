use std::time::Duration;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::utils::{error_codes, error_to_api_response};

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("user not found")]
    NotFound,
    #[error("cannot add yourself as a connection")]
    SelfAddition,
    #[error("already connected")]
    AlreadyConnected,
    #[error("tap cooldown active, retry in {}s", .retry_after.as_millis().div_ceil(1000))]
    CooldownActive { retry_after: Duration },
    #[error("username already taken")]
    UsernameTaken,
    #[error("{0}")]
    Validation(String),
    #[error("unauthorized")]
    Unauthorized,
    #[error("too many requests, retry in {0}s")]
    RateLimited(u64),
    #[error("{0}")]
    StoreUnavailable(String),
    #[error("{0}")]
    AuthUnavailable(String),
}

impl AppError {
    pub fn code(&self) -> i32 {
        match self {
            AppError::NotFound => error_codes::NOT_FOUND,
            AppError::SelfAddition => error_codes::SELF_ADDITION,
            AppError::AlreadyConnected => error_codes::ALREADY_CONNECTED,
            AppError::CooldownActive { .. } => error_codes::COOLDOWN_ACTIVE,
            AppError::UsernameTaken => error_codes::USERNAME_TAKEN,
            AppError::Validation(_) => error_codes::VALIDATION_ERROR,
            AppError::Unauthorized => error_codes::AUTH_FAILED,
            AppError::RateLimited(_) => error_codes::RATE_LIMIT,
            AppError::StoreUnavailable(_) => error_codes::STORE_UNAVAILABLE,
            AppError::AuthUnavailable(_) => error_codes::AUTH_UNAVAILABLE,
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::StoreUnavailable(_) | AppError::AuthUnavailable(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            // 业务错误通过响应中的 code 返回
            _ => StatusCode::OK,
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::StoreUnavailable(err.to_string())
    }
}

impl From<redis::RedisError> for AppError {
    fn from(err: redis::RedisError) -> Self {
        AppError::StoreUnavailable(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::StoreUnavailable(format!("corrupt cached value: {err}"))
    }
}

impl From<bcrypt::BcryptError> for AppError {
    fn from(err: bcrypt::BcryptError) -> Self {
        AppError::AuthUnavailable(err.to_string())
    }
}

impl From<jsonwebtoken::errors::Error> for AppError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        AppError::AuthUnavailable(err.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        (status, error_to_api_response::<()>(self.code(), self.to_string())).into_response()
    }
}
