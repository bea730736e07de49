use axum::{
    async_trait,
    extract::{rejection::JsonRejection, FromRequest, Request},
    Json,
};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::auth::error::AuthError;

/// `Json<T>` whose rejections become 400 `{message}` instead of axum's plain-text 4xx.
pub struct ValidJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ValidJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    T: Send,
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => {
                warn!(reason = %rejection.body_text(), "request body rejected");
                Err(AuthError::Validation(rejection_message(&rejection).into()))
            }
        }
    }
}

fn rejection_message(rejection: &JsonRejection) -> &'static str {
    match rejection {
        JsonRejection::MissingJsonContentType(_) => "Expected a JSON body",
        JsonRejection::JsonSyntaxError(_) => "Malformed JSON body",
        JsonRejection::JsonDataError(_) => "Missing or invalid fields",
        _ => "Invalid request body",
    }
}

/// Request body for `POST /auth/signup`.
#[derive(Debug, Deserialize, Serialize)]
pub struct SignUpRequest {
    pub email: String,
    pub name: String,
    pub password: String,
}

/// Request body for `POST /auth/signin`.
#[derive(Debug, Deserialize, Serialize)]
pub struct SignInRequest {
    pub email: String,
    pub password: String,
}

/// The only thing signup and signin ever hand back.
#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Single normalization applied to every email before lookup or storage.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

fn check_password_shape(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < 8 {
        return Err(AuthError::Validation(
            "Password must be at least 8 characters".into(),
        ));
    }
    if !password.chars().any(|c| c.is_ascii_alphabetic()) {
        return Err(AuthError::Validation(
            "Password must contain at least one letter".into(),
        ));
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Err(AuthError::Validation(
            "Password must contain at least one number".into(),
        ));
    }
    if password.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(AuthError::Validation(
            "Password must contain at least one special character".into(),
        ));
    }
    Ok(())
}

fn check_email(email: &str) -> Result<(), AuthError> {
    if !is_valid_email(email) {
        return Err(AuthError::Validation("Invalid email address".into()));
    }
    Ok(())
}

impl SignUpRequest {
    /// Normalizes the email in place, then checks every field.
    pub fn validate(&mut self) -> Result<(), AuthError> {
        self.email = normalize_email(&self.email);
        check_email(&self.email)?;
        if self.name.trim().is_empty() {
            return Err(AuthError::Validation("Name is required".into()));
        }
        check_password_shape(&self.password)
    }
}

impl SignInRequest {
    pub fn validate(&mut self) -> Result<(), AuthError> {
        self.email = normalize_email(&self.email);
        check_email(&self.email)?;
        if self.password.is_empty() {
            return Err(AuthError::Validation("Password is required".into()));
        }
        Ok(())
    }
}
