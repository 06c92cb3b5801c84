use super::auth::OAuth1Signer;
use super::Publisher;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::Client;
use std::time::Duration;

pub struct TwitterRest {
    client: Client,
    signer: OAuth1Signer,
    base_url: String,
}

impl TwitterRest {
    pub fn new(signer: OAuth1Signer, base_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build Twitter HTTP client")?;
        Ok(Self {
            client,
            signer,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl Publisher for TwitterRest {
    async fn publish(&self, text: &str) -> Result<()> {
        let url = format!("{}/statuses/update.json", self.base_url);
        let params = [("status", text)];
        let auth = self.signer.authorization("POST", &url, &params);
        // Body encoded the same way it was signed.
        let body = format!("status={}", urlencoding::encode(text));

        let resp = self
            .client
            .post(&url)
            .header(AUTHORIZATION, auth)
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(body)
            .send()
            .await
            .context("status update request failed")?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("status update failed ({}): {}", status, body);
        }
        Ok(())
    }
}
