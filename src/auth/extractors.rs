use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::warn;
use uuid::Uuid;

use super::{claims::SessionClaims, error::AuthError, jwt::JwtKeys};

/// Verified identity the gate hands to downstream handlers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub user_id: Uuid,
    pub email: String,
}

impl From<SessionClaims> for AuthenticatedUser {
    fn from(c: SessionClaims) -> Self {
        Self {
            user_id: c.sub,
            email: c.email,
        }
    }
}

/// Terminal result of checking one request.
#[derive(Debug)]
pub enum GateOutcome {
    Authorized(AuthenticatedUser),
    Rejected(AuthError),
}

/// Pulls `<token>` out of `Authorization: Bearer <token>`.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

pub fn check(headers: &HeaderMap, keys: &JwtKeys) -> GateOutcome {
    let Some(token) = bearer_token(headers) else {
        return GateOutcome::Rejected(AuthError::MissingToken);
    };
    match keys.verify(token) {
        Ok(claims) => GateOutcome::Authorized(claims.into()),
        Err(e) => GateOutcome::Rejected(e.into()),
    }
}

/// Wraps protected routes: rejects with 401 before the handler runs unless
/// the request carries a valid session token.
pub async fn require_session(
    State(keys): State<JwtKeys>,
    mut request: Request,
    next: Next,
) -> Response {
    match check(request.headers(), &keys) {
        GateOutcome::Authorized(user) => {
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        GateOutcome::Rejected(e) => {
            warn!(reason = %e, "session rejected");
            e.into_response()
        }
    }
}

/// The identity attached by [`require_session`]. Only usable behind it.
pub struct AuthUser(pub AuthenticatedUser);

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .cloned()
            .map(AuthUser)
            .ok_or_else(|| {
                warn!("AuthenticatedUser missing from request extensions");
                AuthError::MissingToken
            })
    }
}
