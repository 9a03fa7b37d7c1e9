//! Custom error types for the API service
//!
//! Every error category the service can produce is mapped to the response
//! envelope in exactly one place, so no handler formats its own failures and
//! no internal detail leaks in production mode.

use axum::{
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::validation::ValidationErrors;

/// What kind of thing was not found
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotFoundKind {
    /// A resource looked up by id
    Resource,
    /// A route that does not exist
    Endpoint,
}

/// Custom error type for the API service
#[derive(Error, Debug)]
pub enum ApiError {
    /// Client input failed validation
    #[error("The given data was invalid.")]
    Validation(ValidationErrors),

    /// Missing, malformed, revoked or expired bearer token
    #[error("Authentication required.")]
    Unauthenticated,

    /// Valid token but insufficient rights
    #[error("Access denied.")]
    Forbidden,

    /// A rate-limit window was exhausted
    #[error("Too many requests. Please try again later.")]
    RateLimited { retry_after: u64 },

    /// Missing resource or route
    #[error("The requested resource was not found.")]
    NotFound(NotFoundKind),

    /// Anything unanticipated
    #[error("Internal server error")]
    Internal(#[from] anyhow::Error),
}

/// Full detail of an internal error, attached to the 500 response as an
/// extension. The client-visible message stays generic; the detail is
/// revealed only by the development-mode middleware.
#[derive(Debug, Clone)]
pub struct ErrorDetail(pub String);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Validation(errors) => crate::response::error(
                StatusCode::UNPROCESSABLE_ENTITY,
                "The given data was invalid.",
                json!(errors),
            ),
            ApiError::Unauthenticated => crate::response::error(
                StatusCode::UNAUTHORIZED,
                "Authentication required.",
                json!({"auth": ["Please log in to access this resource."]}),
            ),
            ApiError::Forbidden => crate::response::error(
                StatusCode::FORBIDDEN,
                "Access denied.",
                json!({"authorization": ["You do not have permission to access this resource."]}),
            ),
            ApiError::RateLimited { retry_after } => {
                let mut response = crate::response::error(
                    StatusCode::TOO_MANY_REQUESTS,
                    "Too many requests. Please try again later.",
                    json!({"rate_limit": [
                        "You have exceeded the maximum number of requests. Please try again later."
                    ]}),
                );
                if let Ok(value) = retry_after.to_string().parse() {
                    response.headers_mut().insert(header::RETRY_AFTER, value);
                }
                response
            }
            ApiError::NotFound(kind) => {
                let errors = match kind {
                    NotFoundKind::Resource => {
                        json!({"resource": ["The requested resource was not found."]})
                    }
                    NotFoundKind::Endpoint => {
                        json!({"endpoint": ["The requested endpoint does not exist."]})
                    }
                };
                crate::response::error(
                    StatusCode::NOT_FOUND,
                    "The requested resource was not found.",
                    errors,
                )
            }
            ApiError::Internal(err) => {
                error!("Unhandled error: {:#}", err);
                let mut response = crate::response::error(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An error occurred while processing your request.",
                    json!({"server": [
                        "An error occurred while processing your request. Please try again later."
                    ]}),
                );
                response
                    .extensions_mut()
                    .insert(ErrorDetail(format!("{err:#}")));
                response
            }
        }
    }
}

impl From<crate::auth::AuthError> for ApiError {
    fn from(err: crate::auth::AuthError) -> Self {
        use crate::auth::AuthError;
        match err {
            // Both credential failure modes surface the identical message.
            AuthError::InvalidCredentials => {
                ApiError::Validation(ValidationErrors::single("email", crate::auth::INVALID_CREDENTIALS))
            }
            AuthError::EmailTaken => ApiError::Validation(ValidationErrors::single(
                "email",
                "The email has already been taken.",
            )),
            AuthError::Unauthenticated => ApiError::Unauthenticated,
            AuthError::Internal(e) => ApiError::Internal(e),
        }
    }
}

/// Type alias for API results
pub type ApiResult<T> = Result<T, ApiError>;
