use std::sync::Arc;

use tracing::{info, warn};

use crate::auth::{
    claims::SessionClaims,
    dto::{normalize_email, TokenResponse},
    error::AuthError,
    jwt::JwtKeys,
    password::PasswordHasher,
    repo::UserStore,
    repo_types::NewUser,
};

/// Signup, signin and session validation against a [`UserStore`].
///
/// Holds no per-request state; clone freely.
#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UserStore>,
    hasher: PasswordHasher,
    keys: JwtKeys,
    // Verified against when the email is unknown, so both signin failures cost the same.
    dummy_hash: Arc<str>,
}

impl AuthService {
    pub fn new(
        users: Arc<dyn UserStore>,
        hasher: PasswordHasher,
        keys: JwtKeys,
    ) -> anyhow::Result<Self> {
        let dummy_hash = hasher.hash("gatekeep-timing-equalizer")?.into();
        Ok(Self {
            users,
            hasher,
            keys,
            dummy_hash,
        })
    }

    pub async fn sign_up(
        &self,
        email: &str,
        name: &str,
        password: &str,
    ) -> Result<TokenResponse, AuthError> {
        let email = normalize_email(email);

        // Fast path only; the store's insert is what actually enforces uniqueness.
        if self.users.find_by_email(&email).await?.is_some() {
            warn!(email = %email, "email already exists");
            return Err(AuthError::DuplicateEmail);
        }

        let password_hash = self.hash_blocking(password.to_owned()).await?;
        let user = self
            .users
            .insert(NewUser {
                email,
                name: name.trim().to_owned(),
                password_hash,
            })
            .await
            .map_err(|e| {
                let e = AuthError::from(e);
                if matches!(e, AuthError::DuplicateEmail) {
                    warn!("email claimed concurrently");
                }
                e
            })?;

        info!(user_id = %user.id, email = %user.email, "user created");
        self.issue(SessionClaims {
            sub: user.id,
            email: user.email,
        })
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<TokenResponse, AuthError> {
        let email = normalize_email(email);

        let Some(user) = self.users.find_by_email(&email).await? else {
            let _ = self
                .verify_blocking(password.to_owned(), self.dummy_hash.to_string())
                .await;
            warn!(email = %email, "signin unknown email");
            return Err(AuthError::InvalidCredentials);
        };

        let ok = self
            .verify_blocking(password.to_owned(), user.password_hash.clone())
            .await?;
        if !ok {
            warn!(email = %email, user_id = %user.id, "signin invalid password");
            return Err(AuthError::InvalidCredentials);
        }

        info!(user_id = %user.id, email = %user.email, "user signed in");
        self.issue(SessionClaims {
            sub: user.id,
            email: user.email,
        })
    }

    pub fn validate_session(&self, token: &str) -> Result<SessionClaims, AuthError> {
        Ok(self.keys.verify(token)?)
    }

    fn issue(&self, claims: SessionClaims) -> Result<TokenResponse, AuthError> {
        let access_token = self.keys.issue(&claims).map_err(AuthError::Internal)?;
        Ok(TokenResponse { access_token })
    }

    async fn hash_blocking(&self, password: String) -> Result<String, AuthError> {
        let hasher = self.hasher.clone();
        tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|e| AuthError::Internal(e.into()))?
            .map_err(AuthError::Internal)
    }

    async fn verify_blocking(&self, password: String, hash: String) -> Result<bool, AuthError> {
        let hasher = self.hasher.clone();
        tokio::task::spawn_blocking(move || hasher.verify(&password, &hash))
            .await
            .map_err(|e| AuthError::Internal(e.into()))
    }
}
