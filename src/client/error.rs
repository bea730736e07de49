use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("network error: {0}")]
    Http(#[from] reqwest::Error),
    /// Server answered with a non-success status other than a session 401.
    #[error("{status}: {message}")]
    Api { status: u16, message: String },
    /// The session is gone; the sign-in redirect has been triggered.
    #[error("unauthorized")]
    Unauthorized,
    #[error("token store: {0}")]
    TokenStore(#[from] std::io::Error),
}
