use super::LinkShortener;
use crate::error::ShortenError;
use anyhow::Context;
use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::time::Duration;

/// Bitly v3 reports failures in the body, usually alongside HTTP 200.
/// `data` is an object on success and an empty array on failure.
#[derive(Debug, Deserialize)]
pub struct BitlyShortenResponse {
    #[serde(default)]
    pub status_code: u16,
    #[serde(default)]
    pub status_txt: String,
    #[serde(default)]
    pub data: serde_json::Value,
}

impl BitlyShortenResponse {
    fn short_url(&self) -> Option<&str> {
        self.data.get("url").and_then(|u| u.as_str())
    }
}

pub struct Bitly {
    client: Client,
    access_token: SecretString,
    base_url: String,
}

impl Bitly {
    pub fn new(access_token: SecretString, base_url: &str, timeout: Duration) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build Bitly HTTP client")?;
        Ok(Self {
            client,
            access_token,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl LinkShortener for Bitly {
    async fn shorten(&self, long_url: &str) -> Result<String, ShortenError> {
        let url = format!("{}/v3/shorten", self.base_url);
        let resp = self
            .client
            .get(&url)
            .query(&[
                ("access_token", self.access_token.expose_secret()),
                ("longUrl", long_url),
            ])
            .send()
            .await?;

        let status = resp.status();
        let body = resp.text().await?;
        let rejected = |status: u16| ShortenError::Rejected {
            url: long_url.to_string(),
            status,
            body: body.clone(),
        };

        if !status.is_success() {
            return Err(rejected(status.as_u16()));
        }

        let parsed: BitlyShortenResponse =
            serde_json::from_str(&body).map_err(|_| rejected(status.as_u16()))?;
        if parsed.status_code != 200 {
            tracing::debug!(status_txt = %parsed.status_txt, "bitly refused to shorten");
            return Err(rejected(parsed.status_code));
        }
        match parsed.short_url() {
            Some(short) if !short.is_empty() => Ok(short.to_string()),
            _ => Err(rejected(parsed.status_code)),
        }
    }
}
