use tracing::warn;

use crate::identity::session::AuthClient;
use crate::routes::DASHBOARD_PATH;

/// Which provider operation a submission performs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthMode {
    #[default]
    SignIn,
    SignUp,
}

impl AuthMode {
    /// Parse the `mode` form/query value; anything unrecognised means sign-in
    pub fn from_param(value: Option<&str>) -> Self {
        match value {
            Some("signup") => AuthMode::SignUp,
            _ => AuthMode::SignIn,
        }
    }

    pub fn as_param(&self) -> &'static str {
        match self {
            AuthMode::SignIn => "signin",
            AuthMode::SignUp => "signup",
        }
    }

    pub fn toggled(&self) -> Self {
        match self {
            AuthMode::SignIn => AuthMode::SignUp,
            AuthMode::SignUp => AuthMode::SignIn,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginOutcome {
    /// Navigate to the given path
    Navigate(&'static str),
    /// Stay on the form; `error` holds the message to show
    Stay,
}

/// Login form state
#[derive(Debug, Clone, Default)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
    pub mode: AuthMode,
    pub error: Option<String>,
    pub submitting: bool,
}

impl LoginForm {
    pub fn new(mode: AuthMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    /// Flip between sign-in and sign-up; clears any displayed error.
    pub fn toggle_mode(&mut self) {
        self.mode = self.mode.toggled();
        self.error = None;
    }

    pub async fn submit(&mut self, auth: &AuthClient) -> LoginOutcome {
        self.error = None;
        self.submitting = true;

        let result = match self.mode {
            AuthMode::SignUp => {
                auth.create_user_with_email_and_password(&self.email, &self.password)
                    .await
            }
            AuthMode::SignIn => {
                auth.sign_in_with_email_and_password(&self.email, &self.password)
                    .await
            }
        };

        self.submitting = false;
        match result {
            Ok(_) => LoginOutcome::Navigate(DASHBOARD_PATH),
            Err(e) => {
                warn!("login: {} failed: {}", self.mode.as_param(), e);
                self.error = Some(e.user_message());
                LoginOutcome::Stay
            }
        }
    }

    pub fn heading(&self) -> &'static str {
        match self.mode {
            AuthMode::SignIn => "Sign In",
            AuthMode::SignUp => "Create Account",
        }
    }

    pub fn submit_label(&self) -> &'static str {
        if self.submitting {
            "Loading..."
        } else {
            self.heading()
        }
    }

    pub fn toggle_label(&self) -> &'static str {
        match self.mode {
            AuthMode::SignIn => "Don't have an account? Sign up",
            AuthMode::SignUp => "Already have an account? Sign in",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::{AuthError, AuthUser, IdentityProvider};
    use std::sync::Arc;
    use std::sync::Mutex;

    /// Accepts one fixed password and records which operation was called
    #[derive(Default)]
    struct RecordingProvider {
        calls: Mutex<Vec<&'static str>>,
    }

    fn user(email: &str) -> AuthUser {
        AuthUser {
            uid: "uid-1".to_string(),
            email: Some(email.to_string()),
            id_token: "token-1".to_string(),
            refresh_token: None,
            expires_in: Some(3600),
        }
    }

    #[async_trait::async_trait]
    impl IdentityProvider for RecordingProvider {
        async fn sign_in_with_password(
            &self,
            email: &str,
            password: &str,
        ) -> Result<AuthUser, AuthError> {
            self.calls.lock().unwrap().push("sign_in");
            if password == "correct-horse" {
                Ok(user(email))
            } else {
                Err(AuthError::Provider {
                    code: 400,
                    message: "INVALID_PASSWORD".to_string(),
                })
            }
        }

        async fn sign_up_with_password(
            &self,
            email: &str,
            _password: &str,
        ) -> Result<AuthUser, AuthError> {
            self.calls.lock().unwrap().push("sign_up");
            Ok(user(email))
        }

        async fn lookup(&self, _id_token: &str) -> Result<Option<AuthUser>, AuthError> {
            Ok(None)
        }

        async fn refresh(&self, _refresh_token: &str) -> Result<Option<AuthUser>, AuthError> {
            Ok(None)
        }
    }

    fn client() -> (Arc<RecordingProvider>, AuthClient) {
        let provider = Arc::new(RecordingProvider::default());
        let client = AuthClient::new(provider.clone());
        (provider, client)
    }

    #[tokio::test]
    async fn failed_sign_in_shows_provider_message_verbatim() {
        let (_, auth) = client();
        let mut form = LoginForm::new(AuthMode::SignIn);
        form.email = "ana@example.com".to_string();
        form.password = "wrong".to_string();

        assert_eq!(form.submit(&auth).await, LoginOutcome::Stay);
        assert_eq!(form.error.as_deref(), Some("INVALID_PASSWORD"));
        assert!(!form.submitting);
    }

    #[tokio::test]
    async fn toggling_mode_clears_error() {
        let (_, auth) = client();
        let mut form = LoginForm::new(AuthMode::SignIn);
        form.password = "wrong".to_string();
        form.submit(&auth).await;
        assert!(form.error.is_some());

        form.toggle_mode();
        assert_eq!(form.mode, AuthMode::SignUp);
        assert!(form.error.is_none());
        assert_eq!(form.heading(), "Create Account");
    }

    #[tokio::test]
    async fn successful_sign_in_navigates_to_dashboard() {
        let (provider, auth) = client();
        let mut form = LoginForm::new(AuthMode::SignIn);
        form.email = "ana@example.com".to_string();
        form.password = "correct-horse".to_string();

        assert_eq!(form.submit(&auth).await, LoginOutcome::Navigate("/dashboard"));
        assert!(form.error.is_none());
        assert_eq!(*provider.calls.lock().unwrap(), vec!["sign_in"]);
        assert!(matches!(
            auth.current(),
            Some(crate::identity::session::SessionEvent::SignedIn(_))
        ));
    }

    #[tokio::test]
    async fn sign_up_mode_creates_account() {
        let (provider, auth) = client();
        let mut form = LoginForm::new(AuthMode::SignUp);
        form.email = "new@example.com".to_string();
        form.password = "whatever".to_string();

        assert_eq!(form.submit(&auth).await, LoginOutcome::Navigate("/dashboard"));
        assert_eq!(*provider.calls.lock().unwrap(), vec!["sign_up"]);
    }

    #[test]
    fn empty_provider_message_falls_back() {
        let err = AuthError::Provider {
            code: 400,
            message: String::new(),
        };
        assert_eq!(err.user_message(), "Authentication failed");
    }

    #[test]
    fn mode_param_round_trip() {
        assert_eq!(AuthMode::from_param(Some("signup")), AuthMode::SignUp);
        assert_eq!(AuthMode::from_param(Some("bogus")), AuthMode::SignIn);
        assert_eq!(AuthMode::from_param(None), AuthMode::SignIn);
    }
}
