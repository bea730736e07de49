use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::auth::{jwt::TokenError, repo::StoreError};

/// Every way an authentication operation can fail.
///
/// Each variant maps to a status code and a short client-facing message.
/// Wrapped infrastructure errors are logged, never sent to the client.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("{0}")]
    Validation(String),
    #[error("Email already exists")]
    DuplicateEmail,
    /// Shared by "no such user" and "wrong password".
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("missing bearer token")]
    MissingToken,
    #[error("invalid token")]
    InvalidToken,
    #[error("token expired")]
    ExpiredToken,
    #[error("storage failure")]
    Storage(#[source] anyhow::Error),
    #[error("internal error")]
    Internal(#[source] anyhow::Error),
}

impl AuthError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::Validation(_) | AuthError::DuplicateEmail => StatusCode::BAD_REQUEST,
            AuthError::InvalidCredentials
            | AuthError::MissingToken
            | AuthError::InvalidToken
            | AuthError::ExpiredToken => StatusCode::UNAUTHORIZED,
            AuthError::Storage(_) | AuthError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<StoreError> for AuthError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Duplicate => AuthError::DuplicateEmail,
            StoreError::Backend(e) => AuthError::Storage(e),
        }
    }
}

impl From<TokenError> for AuthError {
    fn from(e: TokenError) -> Self {
        match e {
            TokenError::Invalid => AuthError::InvalidToken,
            TokenError::Expired => AuthError::ExpiredToken,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = match &self {
            AuthError::Validation(msg) => json!({ "message": msg }),
            AuthError::DuplicateEmail => json!({ "message": self.to_string() }),
            AuthError::InvalidCredentials => json!({ "error": self.to_string() }),
            AuthError::MissingToken | AuthError::InvalidToken | AuthError::ExpiredToken => {
                json!({ "message": "Unauthorized" })
            }
            AuthError::Storage(e) | AuthError::Internal(e) => {
                error!(error = ?e, kind = %self, "request failed");
                json!({ "message": "Internal server error" })
            }
        };
        (status, Json(body)).into_response()
    }
}
