use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Core trait for identity providers. Credentials are verified and sessions issued by the
/// provider; this crate only relays them.
#[async_trait::async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Sign an existing account in with email and password
    async fn sign_in_with_password(&self, email: &str, password: &str)
        -> Result<AuthUser, AuthError>;

    /// Create an account with email and password; the new account is signed in
    async fn sign_up_with_password(&self, email: &str, password: &str)
        -> Result<AuthUser, AuthError>;

    /// Resolve a previously issued id token into its user, `None` if the token
    /// is no longer accepted by the provider
    async fn lookup(&self, id_token: &str) -> Result<Option<AuthUser>, AuthError>;

    /// Exchange a refresh token for a fresh id token, `None` if the provider no longer
    /// honours the refresh token
    async fn refresh(&self, refresh_token: &str) -> Result<Option<AuthUser>, AuthError>;
}

/// A signed-in user as reported by the provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub uid: String,
    pub email: Option<String>,
    /// Provider id token; persisted in the session cookie
    pub id_token: String,
    pub refresh_token: Option<String>,
    /// Token lifetime in seconds, when the provider reports it
    pub expires_in: Option<u64>,
}

/// Errors surfaced by identity operations.
///
/// `Provider` displays the provider's message verbatim: it is shown to the user as-is.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("{message}")]
    Provider { code: u16, message: String },

    #[error("identity provider unreachable: {0}")]
    Transport(String),

    #[error("unexpected identity provider response: {0}")]
    Malformed(String),
}

impl AuthError {
    /// Message to show on the login form; falls back when the provider sent nothing
    pub fn user_message(&self) -> String {
        let message = self.to_string();
        if message.trim().is_empty() {
            "Authentication failed".to_string()
        } else {
            message
        }
    }
}

pub mod firebase;
pub mod session;
pub mod token;
