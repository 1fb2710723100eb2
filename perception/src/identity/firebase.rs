use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;
use url::Url;

use super::{AuthError, AuthUser, IdentityProvider};

/// Firebase Authentication provider using the Identity Toolkit and Secure Token REST APIs
pub struct FirebaseIdentity {
    base_url: Url,
    token_url: Url,
    api_key: String,
    timeout: Duration,
    client: reqwest::Client,
}

impl FirebaseIdentity {
    pub fn new(base_url: Url, token_url: Url, api_key: impl Into<String>) -> Self {
        Self {
            base_url,
            token_url,
            api_key: api_key.into(),
            timeout: Duration::from_secs(10),
            client: reqwest::Client::new(),
        }
    }

    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout = Duration::from_secs(timeout_secs);
        self
    }

    fn endpoint(&self, base: &Url, path: &str) -> Result<Url, AuthError> {
        let mut url = base
            .join(path)
            .map_err(|e| AuthError::Malformed(format!("bad endpoint: {}", e)))?;
        url.query_pairs_mut().append_pair("key", &self.api_key);
        Ok(url)
    }

    async fn call<B, R>(&self, method: &str, body: &B) -> Result<R, AuthError>
    where
        B: Serialize + ?Sized,
        R: for<'de> Deserialize<'de>,
    {
        let url = self.endpoint(&self.base_url, &format!("v1/accounts:{}", method))?;
        debug!("identity: POST accounts:{}", method);
        self.send(self.client.post(url).json(body)).await
    }

    async fn send<R>(&self, request: reqwest::RequestBuilder) -> Result<R, AuthError>
    where
        R: for<'de> Deserialize<'de>,
    {
        let response = tokio::time::timeout(self.timeout, request.send())
            .await
            .map_err(|_| AuthError::Transport("request timed out".to_string()))?
            .map_err(|e| AuthError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(match serde_json::from_str::<ErrorEnvelope>(&body) {
                Ok(envelope) => AuthError::Provider {
                    code: envelope.error.code.unwrap_or(status.as_u16()),
                    message: envelope.error.message.unwrap_or_default(),
                },
                Err(_) => AuthError::Provider {
                    code: status.as_u16(),
                    message: body,
                },
            });
        }

        response
            .json::<R>()
            .await
            .map_err(|e| AuthError::Malformed(e.to_string()))
    }

    async fn password_call(
        &self,
        method: &str,
        email: &str,
        password: &str,
    ) -> Result<AuthUser, AuthError> {
        let body = PasswordRequest {
            email,
            password,
            return_secure_token: true,
        };
        let resp: TokenResponse = self.call(method, &body).await?;
        Ok(AuthUser {
            uid: resp.local_id,
            email: resp.email,
            id_token: resp.id_token,
            refresh_token: resp.refresh_token,
            expires_in: resp.expires_in.and_then(|s| s.parse().ok()),
        })
    }
}

#[async_trait::async_trait]
impl IdentityProvider for FirebaseIdentity {
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthUser, AuthError> {
        self.password_call("signInWithPassword", email, password).await
    }

    async fn sign_up_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthUser, AuthError> {
        self.password_call("signUp", email, password).await
    }

    async fn lookup(&self, id_token: &str) -> Result<Option<AuthUser>, AuthError> {
        let body = LookupRequest { id_token };
        let resp: LookupResponse = match self.call("lookup", &body).await {
            Ok(resp) => resp,
            // Expired, revoked or foreign tokens come back as 400; the session is simply gone
            Err(AuthError::Provider { code: 400, message }) => {
                debug!("identity: lookup rejected token: {}", message);
                return Ok(None);
            }
            Err(e) => return Err(e),
        };

        Ok(resp.users.into_iter().next().map(|u| AuthUser {
            uid: u.local_id,
            email: u.email,
            id_token: id_token.to_string(),
            refresh_token: None,
            expires_in: None,
        }))
    }

    async fn refresh(&self, refresh_token: &str) -> Result<Option<AuthUser>, AuthError> {
        let url = self.endpoint(&self.token_url, "v1/token")?;
        debug!("identity: POST token (refresh)");
        let form = [("grant_type", "refresh_token"), ("refresh_token", refresh_token)];

        let resp: RefreshResponse = match self.send(self.client.post(url).form(&form)).await {
            Ok(resp) => resp,
            // TOKEN_EXPIRED, USER_DISABLED, INVALID_REFRESH_TOKEN and friends
            Err(AuthError::Provider { code: 400, message }) => {
                debug!("identity: refresh rejected: {}", message);
                return Ok(None);
            }
            Err(e) => return Err(e),
        };

        Ok(Some(AuthUser {
            uid: resp.user_id,
            email: None,
            id_token: resp.id_token,
            refresh_token: Some(resp.refresh_token),
            expires_in: resp.expires_in.and_then(|s| s.parse().ok()),
        }))
    }
}

// Identity Toolkit request/response structures
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PasswordRequest<'a> {
    email: &'a str,
    password: &'a str,
    return_secure_token: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenResponse {
    local_id: String,
    email: Option<String>,
    id_token: String,
    refresh_token: Option<String>,
    expires_in: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct LookupRequest<'a> {
    id_token: &'a str,
}

#[derive(Debug, Deserialize)]
struct LookupResponse {
    #[serde(default)]
    users: Vec<LookupUser>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LookupUser {
    local_id: String,
    email: Option<String>,
}

// Secure Token responses are snake_case, unlike the Identity Toolkit ones
#[derive(Debug, Deserialize)]
struct RefreshResponse {
    user_id: String,
    id_token: String,
    refresh_token: String,
    expires_in: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    code: Option<u16>,
    message: Option<String>,
}
