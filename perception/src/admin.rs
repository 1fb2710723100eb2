use anyhow::{Context, Result};
use serde_json::json;
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

/// Identity Toolkit admin API client (project-level auth configuration)
pub struct AdminClient {
    base_url: Url,
    access_token: String,
    timeout: Duration,
    client: reqwest::Client,
}

impl AdminClient {
    pub fn new(base_url: Url, access_token: impl Into<String>) -> Self {
        Self {
            base_url,
            access_token: access_token.into(),
            timeout: Duration::from_secs(30),
            client: reqwest::Client::new(),
        }
    }

    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout = Duration::from_secs(timeout_secs);
        self
    }

    fn config_url(&self, project_id: &str) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| anyhow::anyhow!("admin base URL cannot carry a path"))?
            .pop_if_empty()
            .extend(["admin", "v2", "projects", project_id, "config"]);
        url.query_pairs_mut()
            .append_pair("updateMask", "signIn.email.enabled");
        Ok(url)
    }

    /// Turn on email/password sign-in for the project. One call, no retries.
    pub async fn enable_email_sign_in(&self, project_id: &str) -> Result<()> {
        let url = self.config_url(project_id)?;
        let body = json!({ "signIn": { "email": { "enabled": true } } });
        debug!("admin: PATCH {}", url);

        let response = tokio::time::timeout(
            self.timeout,
            self.client
                .patch(url)
                .bearer_auth(&self.access_token)
                .json(&body)
                .send(),
        )
        .await
        .context("admin request timed out")?
        .context("admin HTTP request failed")?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            // Prefer the provider's own message when the body carries one
            let message = serde_json::from_str::<serde_json::Value>(&text)
                .ok()
                .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
                .unwrap_or(text);
            anyhow::bail!("admin API error {}: {}", status, message);
        }

        info!(project = %project_id, "email/password sign-in enabled");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_url_carries_update_mask() {
        let client = AdminClient::new(
            Url::parse("https://identitytoolkit.googleapis.com/").unwrap(),
            "token",
        );
        let url = client.config_url("perception-with-intent").unwrap();
        assert_eq!(
            url.as_str(),
            "https://identitytoolkit.googleapis.com/admin/v2/projects/perception-with-intent/config?updateMask=signIn.email.enabled"
        );
    }
}
