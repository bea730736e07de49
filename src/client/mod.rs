//! Client-side custody of the session token.
//!
//! [`SessionClient`] attaches the stored token to every request it sends and,
//! on any 401, clears the token and fires the injected [`UnauthorizedHandler`]
//! at most once until a new token is stored.

mod error;
mod redirect;
mod session;
mod token_store;

pub use error::ClientError;
pub use redirect::{RedirectOnce, UnauthorizedHandler};
pub use session::{ClientConfig, SessionClient};
pub use token_store::{FileTokenStore, MemoryTokenStore, TokenStore};
