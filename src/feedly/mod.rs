pub mod rest;
pub mod types;

use crate::credentials::AccessToken;
use anyhow::Result;
use async_trait::async_trait;
use secrecy::SecretString;
use std::collections::HashSet;
use types::{FeedPage, UnreadCountsResponse, UnreadFeedSummary, UnreadStream};

#[async_trait]
pub trait FeedSource: Send + Sync {
    /// Feeds with at least one unread entry. Categories and tags are excluded.
    async fn list_unread_feeds(&self) -> Result<Vec<UnreadFeedSummary>>;

    /// One page of unread entries, starting after `continuation` if given.
    async fn fetch_page(&self, feed_id: &str, continuation: Option<&str>) -> Result<FeedPage>;

    /// Best effort; callers should not retry.
    async fn mark_read(&self, entry_id: &str) -> Result<()>;

    async fn refresh_access_token(&self, refresh_token: &SecretString) -> Result<AccessToken>;

    /// All unread entries of a feed. Paginates automatically.
    async fn list_unread_entries(&self, feed_id: &str) -> Result<UnreadStream> {
        let mut stream = UnreadStream::default();
        let mut continuation: Option<String> = None;
        let mut seen: HashSet<String> = HashSet::new();

        loop {
            let page = self.fetch_page(feed_id, continuation.as_deref()).await?;
            if stream.feed_title.is_none() {
                stream.feed_title = page.feed_title;
            }
            stream.entries.extend(page.entries);

            match page.continuation {
                None => break,
                Some(next) if !seen.insert(next.clone()) => {
                    anyhow::bail!("stream {} repeated continuation {}", feed_id, next);
                }
                Some(next) => continuation = Some(next),
            }
        }

        Ok(stream)
    }
}

/// Keep feeds (not categories or tags) with a non-zero unread count.
pub fn unread_feeds(counts: UnreadCountsResponse) -> Vec<UnreadFeedSummary> {
    counts
        .unreadcounts
        .into_iter()
        .filter(|c| c.count != 0 && c.id.starts_with("feed/"))
        .map(|c| UnreadFeedSummary {
            feed_id: c.id,
            unread_count: c.count,
        })
        .collect()
}
