use crate::application_port::*;
use serde::Serialize;
use std::convert::Infallible;
use thiserror::Error;
use tracing::{error, warn};
use warp::http::StatusCode;
use warp::{Rejection, reject};

use super::handler::ApiResponse;

pub async fn recover_error(err: Rejection) -> Result<impl warp::Reply, Infallible> {
    let error = if let Some(error) = err.find::<ApiError>() {
        error.clone()
    } else if let Some(e) = err.find::<warp::filters::body::BodyDeserializeError>() {
        ApiError::new(ApiErrorCode::BadUserInput, e.to_string())
    } else if err.is_not_found() || err.find::<reject::MethodNotAllowed>().is_some() {
        ApiError::from(ApiErrorCode::NotFound)
    } else if err.find::<reject::PayloadTooLarge>().is_some() {
        ApiError::from(ApiErrorCode::BadUserInput)
    } else {
        warn!(rejection = ?err, "unhandled rejection");
        ApiError::from(ApiErrorCode::InternalServerError)
    };

    let status = error.code.status();
    let json = warp::reply::json(&ApiResponse::<()>::err(error));
    Ok(warp::reply::with_status(json, status))
}

#[derive(Debug, Clone, Serialize)]
pub struct ApiError {
    pub code: ApiErrorCode,
    pub message: String,
}

impl ApiError {
    pub fn new(code: ApiErrorCode, message: impl Into<String>) -> Self {
        ApiError {
            code,
            message: message.into(),
        }
    }
}

impl reject::Reject for ApiError {}

impl From<ApiErrorCode> for ApiError {
    fn from(code: ApiErrorCode) -> Self {
        ApiError::new(code, code.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApiErrorCode {
    #[error("Authentication required")]
    Unauthenticated,
    #[error("Invalid credentials or token")]
    Unauthorized,
    #[error("Not allowed to access this resource")]
    Forbidden,
    #[error("Invalid input")]
    BadUserInput,
    #[error("Resource already exists")]
    Conflict,
    #[error("Resource not found")]
    NotFound,
    #[error("Internal error")]
    InternalServerError,
}

impl ApiErrorCode {
    pub fn status(self) -> StatusCode {
        match self {
            ApiErrorCode::Unauthenticated | ApiErrorCode::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiErrorCode::Forbidden => StatusCode::FORBIDDEN,
            ApiErrorCode::BadUserInput => StatusCode::BAD_REQUEST,
            ApiErrorCode::Conflict => StatusCode::CONFLICT,
            ApiErrorCode::NotFound => StatusCode::NOT_FOUND,
            ApiErrorCode::InternalServerError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn internal<E: std::fmt::Display>(error: E) -> ApiErrorCode {
        error!("Internal error: {}", error);
        ApiErrorCode::InternalServerError
    }
}

impl From<AuthError> for ApiError {
    fn from(error: AuthError) -> Self {
        match error {
            AuthError::InvalidCredentials | AuthError::TokenInvalid => {
                ApiErrorCode::Unauthorized.into()
            }
            AuthError::Unauthenticated => ApiErrorCode::Unauthenticated.into(),
            AuthError::Forbidden => ApiErrorCode::Forbidden.into(),
            AuthError::UserExists => ApiErrorCode::Conflict.into(),
            AuthError::UserNotFound => ApiErrorCode::NotFound.into(),
            // Validation messages describe the input, never stored state.
            AuthError::BadInput(message) => ApiError::new(ApiErrorCode::BadUserInput, message),
            e @ (AuthError::Config(_) | AuthError::Store(_) | AuthError::InternalError(_)) => {
                ApiErrorCode::internal(e).into()
            }
        }
    }
}

pub fn rejection(error: AuthError) -> Rejection {
    reject::custom(ApiError::from(error))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_details_are_not_exposed() {
        let api = ApiError::from(AuthError::Store("redis://secret-host refused".to_string()));

        assert_eq!(api.code, ApiErrorCode::InternalServerError);
        assert!(!api.message.contains("secret-host"));
    }

    #[test]
    fn credential_and_token_failures_share_a_code() {
        let credentials = ApiError::from(AuthError::InvalidCredentials);
        let token = ApiError::from(AuthError::TokenInvalid);

        assert_eq!(credentials.code, ApiErrorCode::Unauthorized);
        assert_eq!(credentials.message, token.message);
    }

    #[test]
    fn codes_serialize_in_screaming_case() -> testresult::TestResult {
        let json = serde_json::to_string(&ApiErrorCode::BadUserInput)?;
        assert_eq!(json, "\"BAD_USER_INPUT\"");
        Ok(())
    }
}
