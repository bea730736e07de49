use axum::{
    extract::State,
    http::StatusCode,
    middleware,
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument};

use crate::{
    auth::{
        dto::{MessageResponse, SignInRequest, SignUpRequest, TokenResponse, ValidJson},
        error::AuthError,
        extractors::{require_session, AuthUser},
        services::AuthService,
    },
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/signup", post(signup))
        .route("/auth/signin", post(signin))
}

/// Routes that only run behind the session gate.
pub fn protected_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/auth/auth-validate", get(auth_validate))
        .route_layer(middleware::from_fn_with_state(state, require_session))
}

#[instrument(skip(auth, payload))]
pub async fn signup(
    State(auth): State<AuthService>,
    ValidJson(mut payload): ValidJson<SignUpRequest>,
) -> Result<(StatusCode, Json<TokenResponse>), AuthError> {
    payload.validate()?;
    let res = auth
        .sign_up(&payload.email, &payload.name, &payload.password)
        .await?;
    Ok((StatusCode::CREATED, Json(res)))
}

#[instrument(skip(auth, payload))]
pub async fn signin(
    State(auth): State<AuthService>,
    ValidJson(mut payload): ValidJson<SignInRequest>,
) -> Result<Json<TokenResponse>, AuthError> {
    payload.validate()?;
    let res = auth.sign_in(&payload.email, &payload.password).await?;
    Ok(Json(res))
}

#[instrument(skip_all, fields(user_id = %user.user_id))]
pub async fn auth_validate(AuthUser(user): AuthUser) -> Json<MessageResponse> {
    info!("session check ok");
    Json(MessageResponse {
        message: "Authenticated".into(),
    })
}
