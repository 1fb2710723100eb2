use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::{token, AuthError, AuthUser, IdentityProvider};

/// A session-state notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    SignedIn(AuthUser),
    SignedOut,
}

/// What the browser keeps between page loads: the id token and, when the provider issued
/// one, the refresh token that renews it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedSession {
    pub id_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
}

impl PersistedSession {
    pub fn from_user(user: &AuthUser) -> Self {
        Self {
            id_token: user.id_token.clone(),
            refresh_token: user.refresh_token.clone(),
        }
    }

    pub fn to_cookie_value(&self) -> String {
        // Two plain strings; serialization cannot fail
        serde_json::to_string(self).unwrap_or_default()
    }

    /// Parse a stored cookie value. A bare token (no JSON) is an id token without refresh.
    pub fn from_cookie_value(raw: &str) -> Self {
        serde_json::from_str(raw).unwrap_or_else(|_| Self {
            id_token: raw.to_string(),
            refresh_token: None,
        })
    }
}

/// Auth instance for one page load.
///
/// Holds the session stream (`None` until the persisted session has been resolved) and
/// relays sign-in, sign-up and sign-out to the provider, publishing every change.
#[derive(Clone)]
pub struct AuthClient {
    provider: Arc<dyn IdentityProvider>,
    state: Arc<watch::Sender<Option<SessionEvent>>>,
}

impl AuthClient {
    pub fn new(provider: Arc<dyn IdentityProvider>) -> Self {
        let (tx, _rx) = watch::channel(None);
        Self {
            provider,
            state: Arc::new(tx),
        }
    }

    /// Register a listener. It receives the current session once known, then every change.
    /// Dropping the subscription unregisters it.
    pub fn on_auth_state_changed(&self) -> SessionSubscription {
        SessionSubscription {
            rx: self.state.subscribe(),
            fresh: true,
        }
    }

    /// Number of live listeners
    pub fn listener_count(&self) -> usize {
        self.state.receiver_count()
    }

    /// Current session, `None` while still unresolved
    pub fn current(&self) -> Option<SessionEvent> {
        self.state.borrow().clone()
    }

    /// Resolve the persisted session and publish it.
    ///
    /// No session means signed out. A live id token is checked with the provider; an
    /// expired or rejected one is renewed with the refresh token when there is one.
    pub async fn restore(&self, persisted: Option<PersistedSession>) {
        let event = match persisted {
            None => SessionEvent::SignedOut,
            Some(session) => match self.resolve_persisted(&session).await {
                Some(user) => SessionEvent::SignedIn(user),
                None => SessionEvent::SignedOut,
            },
        };
        self.publish(event);
    }

    async fn resolve_persisted(&self, session: &PersistedSession) -> Option<AuthUser> {
        if token::is_expired(&session.id_token) == Some(true) {
            debug!("session: persisted id token expired, skipping lookup");
        } else {
            match self.provider.lookup(&session.id_token).await {
                Ok(Some(mut user)) => {
                    // Lookup does not echo the refresh token back
                    if user.refresh_token.is_none() {
                        user.refresh_token = session.refresh_token.clone();
                    }
                    return Some(user);
                }
                Ok(None) => debug!("session: id token rejected"),
                Err(e) => {
                    warn!("session: lookup failed, treating as signed out: {}", e);
                    return None;
                }
            }
        }

        let refresh_token = session.refresh_token.as_deref()?;
        match self.provider.refresh(refresh_token).await {
            Ok(Some(user)) => {
                info!(uid = %user.uid, "session: id token renewed");
                Some(user)
            }
            Ok(None) => {
                debug!("session: refresh token rejected");
                None
            }
            Err(e) => {
                warn!("session: refresh failed, treating as signed out: {}", e);
                None
            }
        }
    }

    pub async fn sign_in_with_email_and_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthUser, AuthError> {
        let user = self.provider.sign_in_with_password(email, password).await?;
        info!(uid = %user.uid, "session: signed in");
        self.publish(SessionEvent::SignedIn(user.clone()));
        Ok(user)
    }

    pub async fn create_user_with_email_and_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthUser, AuthError> {
        let user = self.provider.sign_up_with_password(email, password).await?;
        info!(uid = %user.uid, "session: account created");
        self.publish(SessionEvent::SignedIn(user.clone()));
        Ok(user)
    }

    /// Clear the local session. Tokens are bearer credentials; nothing is revoked remotely.
    pub async fn sign_out(&self) -> Result<(), AuthError> {
        self.publish(SessionEvent::SignedOut);
        info!("session: signed out");
        Ok(())
    }

    fn publish(&self, event: SessionEvent) {
        // Only changes are notified
        self.state.send_if_modified(|current| {
            if current.as_ref() == Some(&event) {
                false
            } else {
                *current = Some(event);
                true
            }
        });
    }
}

/// A registered session listener
pub struct SessionSubscription {
    rx: watch::Receiver<Option<SessionEvent>>,
    fresh: bool,
}

impl SessionSubscription {
    /// Wait for the next notification. The first call yields the current session as soon
    /// as it is known. Returns `None` once the auth instance is gone.
    pub async fn next(&mut self) -> Option<SessionEvent> {
        if self.fresh {
            self.fresh = false;
            if let Some(event) = self.rx.borrow_and_update().clone() {
                return Some(event);
            }
        }
        loop {
            self.rx.changed().await.ok()?;
            if let Some(event) = self.rx.borrow_and_update().clone() {
                return Some(event);
            }
        }
    }
}

impl Drop for SessionSubscription {
    fn drop(&mut self) {
        debug!("session: listener unregistered");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cookie_value_keeps_refresh_token() {
        let session = PersistedSession {
            id_token: "id-1".to_string(),
            refresh_token: Some("refresh-1".to_string()),
        };
        let raw = session.to_cookie_value();
        assert_eq!(PersistedSession::from_cookie_value(&raw), session);
    }

    #[test]
    fn bare_cookie_value_is_an_id_token() {
        let session = PersistedSession::from_cookie_value("eyJhbGciOiJSUzI1NiJ9.e30.sig");
        assert_eq!(session.id_token, "eyJhbGciOiJSUzI1NiJ9.e30.sig");
        assert_eq!(session.refresh_token, None);
    }
}
