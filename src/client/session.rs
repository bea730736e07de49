use std::{sync::Arc, time::Duration};

use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::Serialize;
use tracing::{debug, warn};

use super::{
    error::ClientError,
    redirect::{RedirectOnce, UnauthorizedHandler},
    token_store::TokenStore,
};
use crate::auth::{
    dto::{SignInRequest, SignUpRequest, TokenResponse},
    error::AuthError,
};

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub timeout: Duration,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: Duration::from_secs(10),
        }
    }

    pub fn api_url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }
}

pub struct SessionClient {
    http: Client,
    config: ClientConfig,
    tokens: Arc<dyn TokenStore>,
    on_unauthorized: RedirectOnce,
}

impl SessionClient {
    pub fn new(
        config: ClientConfig,
        tokens: Arc<dyn TokenStore>,
        handler: Arc<dyn UnauthorizedHandler>,
    ) -> Result<Self, ClientError> {
        let http = Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            http,
            config,
            tokens,
            on_unauthorized: RedirectOnce::new(handler),
        })
    }

    pub fn token(&self) -> Option<String> {
        self.tokens.get()
    }

    /// Sends through the session pipeline with the stored token attached.
    pub async fn send(&self, method: Method, path: &str) -> Result<Response, ClientError> {
        self.send_with(method, path, |req| req).await
    }

    /// Like [`send`](Self::send), with a hook to add a body or headers.
    ///
    /// A 401 clears the token and triggers the sign-in redirect, but only while
    /// the slot still holds the token this request went out with. A 401 for a
    /// token that has since been replaced leaves the newer session alone.
    pub async fn send_with(
        &self,
        method: Method,
        path: &str,
        customize: impl FnOnce(RequestBuilder) -> RequestBuilder + Send,
    ) -> Result<Response, ClientError> {
        let attached = self.tokens.get();
        let mut req = self.http.request(method, self.config.api_url(path));
        if let Some(token) = &attached {
            req = req.bearer_auth(token);
        }
        let res = customize(req).send().await?;
        if res.status() != StatusCode::UNAUTHORIZED {
            return Ok(res);
        }

        let current = match &attached {
            Some(token) => self.tokens.clear_if(token)?,
            None => self.tokens.get().is_none(),
        };
        if current {
            warn!(url = %res.url(), "request unauthorized");
            self.on_unauthorized.trigger();
        } else {
            debug!(url = %res.url(), "unauthorized response for a replaced token");
        }
        Err(ClientError::Unauthorized)
    }

    pub async fn sign_up(&self, email: &str, name: &str, password: &str) -> Result<(), ClientError> {
        let mut body = SignUpRequest {
            email: email.into(),
            name: name.into(),
            password: password.into(),
        };
        body.validate().map_err(rejected_locally)?;
        self.obtain_token("/auth/signup", &body).await
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<(), ClientError> {
        let mut body = SignInRequest {
            email: email.into(),
            password: password.into(),
        };
        body.validate().map_err(rejected_locally)?;
        self.obtain_token("/auth/signin", &body).await
    }

    /// Asks the server whether the stored token is still good.
    pub async fn is_authenticated(&self) -> Result<bool, ClientError> {
        match self.send(Method::GET, "/auth/auth-validate").await {
            Ok(res) if res.status().is_success() => Ok(true),
            Ok(res) => Err(api_error(res).await),
            Err(ClientError::Unauthorized) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Purely local: the server keeps no session to invalidate.
    pub fn logout(&self) -> Result<(), ClientError> {
        self.tokens.clear()?;
        self.on_unauthorized.trigger();
        debug!("logged out");
        Ok(())
    }

    // A 401 here means bad credentials, not a lost session, so it bypasses `send`.
    async fn obtain_token<B: Serialize>(&self, path: &str, body: &B) -> Result<(), ClientError> {
        let res = self
            .http
            .post(self.config.api_url(path))
            .json(body)
            .send()
            .await?;
        if !res.status().is_success() {
            return Err(api_error(res).await);
        }
        let TokenResponse { access_token } = res.json().await?;
        self.tokens.set(&access_token)?;
        self.on_unauthorized.rearm();
        debug!(path, "session token stored");
        Ok(())
    }
}

/// Same shape the server would have answered with, without the round trip.
fn rejected_locally(e: AuthError) -> ClientError {
    debug!(reason = %e, "request rejected before sending");
    ClientError::Api {
        status: e.status_code().as_u16(),
        message: e.to_string(),
    }
}

async fn api_error(res: Response) -> ClientError {
    let status = res.status();
    let message = res
        .json::<serde_json::Value>()
        .await
        .ok()
        .and_then(|v| {
            v.get("message")
                .or_else(|| v.get("error"))
                .and_then(|m| m.as_str())
                .map(str::to_owned)
        })
        .unwrap_or_else(|| status.to_string());
    ClientError::Api {
        status: status.as_u16(),
        message,
    }
}
