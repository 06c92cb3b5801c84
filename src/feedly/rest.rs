use super::types::*;
use super::{unread_feeds, FeedSource};
use crate::credentials::{AccessToken, TokenStore};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use secrecy::{ExposeSecret, SecretString};
use std::sync::Arc;
use std::time::Duration;

pub struct FeedlyRest {
    client: Client,
    tokens: Arc<dyn TokenStore>,
    client_id: String,
    client_secret: SecretString,
    base_url: String,
}

impl FeedlyRest {
    pub fn new(
        tokens: Arc<dyn TokenStore>,
        client_id: String,
        client_secret: SecretString,
        base_url: &str,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build Feedly HTTP client")?;
        Ok(Self {
            client,
            tokens,
            client_id,
            client_secret,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Attach the current bearer token. Read from the store on every call
    /// since a refresh may replace it mid-run.
    fn authed(&self, req: RequestBuilder) -> Result<RequestBuilder> {
        let token = self.tokens.read()?;
        Ok(req.header(reqwest::header::AUTHORIZATION, token.bearer_header()))
    }

    async fn send(&self, req: RequestBuilder, what: &str) -> Result<reqwest::Response> {
        let resp = req
            .send()
            .await
            .with_context(|| format!("{} request failed", what))?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("{} failed ({}): {}", what, status, body);
        }
        Ok(resp)
    }
}

#[async_trait]
impl FeedSource for FeedlyRest {
    async fn list_unread_feeds(&self) -> Result<Vec<UnreadFeedSummary>> {
        let url = format!("{}/v3/markers/counts", self.base_url);
        let req = self.authed(self.client.get(&url))?;
        let resp = self.send(req, "GET unread counts").await?;
        let counts: UnreadCountsResponse = resp
            .json()
            .await
            .context("failed to parse unread counts response")?;
        Ok(unread_feeds(counts))
    }

    async fn fetch_page(&self, feed_id: &str, continuation: Option<&str>) -> Result<FeedPage> {
        let url = format!("{}/v3/streams/contents", self.base_url);
        let mut query = vec![("streamId", feed_id), ("unreadOnly", "true")];
        if let Some(c) = continuation {
            query.push(("continuation", c));
        }

        let req = self.authed(self.client.get(&url).query(&query))?;
        let resp = self.send(req, "GET stream contents").await?;
        let parsed: StreamContentsResponse = resp
            .json()
            .await
            .with_context(|| format!("failed to parse stream contents for {}", feed_id))?;
        Ok(FeedPage::from(parsed))
    }

    async fn mark_read(&self, entry_id: &str) -> Result<()> {
        let url = format!("{}/v3/markers", self.base_url);
        let body = MarkersRequest::mark_entries_read(vec![entry_id.to_string()]);
        let req = self.authed(self.client.post(&url).json(&body))?;
        self.send(req, "POST markers").await?;
        Ok(())
    }

    async fn refresh_access_token(&self, refresh_token: &SecretString) -> Result<AccessToken> {
        let url = format!("{}/v3/auth/token", self.base_url);
        let body = TokenRefreshRequest {
            refresh_token: refresh_token.expose_secret(),
            client_id: &self.client_id,
            client_secret: self.client_secret.expose_secret(),
            grant_type: "refresh_token",
        };
        let req = self.authed(self.client.post(&url).json(&body))?;
        let resp = self.send(req, "POST token refresh").await?;
        let parsed: TokenRefreshResponse = resp
            .json()
            .await
            .context("failed to parse token refresh response")?;
        if parsed.access_token.trim().is_empty() {
            anyhow::bail!("token refresh returned an empty access token");
        }
        tracing::debug!(expires_in = ?parsed.expires_in, "access token refreshed");
        Ok(AccessToken::new(parsed.access_token))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::MemoryTokenStore;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer, tokens: Arc<dyn TokenStore>) -> FeedlyRest {
        FeedlyRest::new(
            tokens,
            "cid".to_string(),
            SecretString::from("csecret".to_string()),
            &server.uri(),
            Duration::from_secs(5),
        )
        .unwrap()
    }

    fn memory_tokens(token: &str) -> Arc<dyn TokenStore> {
        Arc::new(MemoryTokenStore::new(AccessToken::new(token)))
    }

    #[tokio::test]
    async fn test_list_unread_feeds() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v3/markers/counts"))
            .and(header("authorization", "Bearer tok"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "unreadcounts": [
                    {"id": "feed/a", "count": 3, "updated": 1},
                    {"id": "user/b", "count": 0},
                    {"id": "feed/c", "count": 5}
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let feeds = client(&server, memory_tokens("tok"))
            .list_unread_feeds()
            .await
            .unwrap();
        let ids: Vec<_> = feeds.iter().map(|f| f.feed_id.as_str()).collect();
        assert_eq!(ids, vec!["feed/a", "feed/c"]);
    }

    #[tokio::test]
    async fn test_list_unread_entries_follows_continuation() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v3/streams/contents"))
            .and(query_param("streamId", "feed/a"))
            .and(query_param("unreadOnly", "true"))
            .and(query_param("continuation", "next-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "title": "Blog",
                "items": [{"id": "e3", "title": "Three", "unread": true,
                           "alternate": [{"href": "http://b/3"}]}]
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v3/streams/contents"))
            .and(query_param("streamId", "feed/a"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "title": "Blog",
                "items": [
                    {"id": "e1", "title": "One", "unread": true, "alternate": [{"href": "http://b/1"}]},
                    {"id": "e2", "title": "Two", "unread": false, "alternate": [{"href": "http://b/2"}]}
                ],
                "continuation": "next-1"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let stream = client(&server, memory_tokens("tok"))
            .list_unread_entries("feed/a")
            .await
            .unwrap();
        let ids: Vec<_> = stream.entries.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["e1", "e3"]);
        assert_eq!(stream.feed_title.as_deref(), Some("Blog"));
    }

    #[tokio::test]
    async fn test_mark_read_posts_marker_batch() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v3/markers"))
            .and(body_json(serde_json::json!({
                "action": "markAsRead", "type": "entries", "entryIds": ["e1"]
            })))
            .respond_with(ResponseTemplate::new(200))
            .expect(2)
            .mount(&server)
            .await;

        let feedly = client(&server, memory_tokens("tok"));
        feedly.mark_read("e1").await.unwrap();
        // Marking twice is harmless
        feedly.mark_read("e1").await.unwrap();
    }

    #[tokio::test]
    async fn test_refresh_access_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v3/auth/token"))
            .and(body_json(serde_json::json!({
                "refresh_token": "rt",
                "client_id": "cid",
                "client_secret": "csecret",
                "grant_type": "refresh_token"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "fresh", "expires_in": 604800, "token_type": "Bearer"
            })))
            .mount(&server)
            .await;

        let token = client(&server, memory_tokens("stale"))
            .refresh_access_token(&SecretString::from("rt".to_string()))
            .await
            .unwrap();
        assert_eq!(token.expose_secret(), "fresh");
    }

    #[tokio::test]
    async fn test_token_read_per_call() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v3/markers"))
            .and(header("authorization", "Bearer second"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let store = Arc::new(MemoryTokenStore::new(AccessToken::new("first")));
        let feedly = client(&server, store.clone());
        store.write(&AccessToken::new("second")).unwrap();
        feedly.mark_read("e1").await.unwrap();
    }

    #[tokio::test]
    async fn test_non_success_status_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v3/markers/counts"))
            .respond_with(ResponseTemplate::new(401).set_body_string("token expired"))
            .mount(&server)
            .await;

        let err = client(&server, memory_tokens("tok"))
            .list_unread_feeds()
            .await
            .unwrap_err();
        let msg = format!("{:#}", err);
        assert!(msg.contains("401"), "{}", msg);
        assert!(msg.contains("token expired"), "{}", msg);
    }
}
