use crate::compose::compose;
use crate::credentials::TokenStore;
use crate::feedly::types::{Entry, UnreadFeedSummary};
use crate::feedly::FeedSource;
use crate::shortener::LinkShortener;
use crate::twitter::Publisher;
use anyhow::{Context, Result};
use secrecy::SecretString;
use std::sync::Arc;

/// Outcome of one pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    pub feeds: usize,
    pub posted: usize,
    /// Composed but only logged, because `dry_run` is set.
    pub dry_run: usize,
    /// Entries with nothing to post (no link or no title).
    pub skipped: usize,
    /// Isolated failures: a feed that could not be listed, or an entry that
    /// could not be composed or published.
    pub failed: usize,
    pub token_refreshed: bool,
}

impl RunReport {
    /// 0 clean, 2 some entries failed, 3 token not refreshed.
    pub fn exit_status(&self) -> u8 {
        if !self.token_refreshed {
            3
        } else if self.failed > 0 {
            2
        } else {
            0
        }
    }
}

enum EntryOutcome {
    Posted,
    DryRun,
    Skipped,
    Failed,
}

/// One fetch → compose → mark read → publish pass, then a token refresh.
pub struct Relay {
    feeds: Arc<dyn FeedSource>,
    shortener: Arc<dyn LinkShortener>,
    publisher: Arc<dyn Publisher>,
    tokens: Arc<dyn TokenStore>,
    refresh_token: SecretString,
    dry_run: bool,
}

impl Relay {
    pub fn new(
        feeds: Arc<dyn FeedSource>,
        shortener: Arc<dyn LinkShortener>,
        publisher: Arc<dyn Publisher>,
        tokens: Arc<dyn TokenStore>,
        refresh_token: SecretString,
        dry_run: bool,
    ) -> Self {
        Self {
            feeds,
            shortener,
            publisher,
            tokens,
            refresh_token,
            dry_run,
        }
    }

    /// Errors only when the unread feeds cannot be listed. The token is
    /// refreshed before returning in every case.
    pub async fn run(&self) -> Result<RunReport> {
        let mut report = RunReport::default();

        let listed = self.feeds.list_unread_feeds().await;
        if let Ok(feeds) = &listed {
            report.feeds = feeds.len();
            tracing::info!(feeds = feeds.len(), dry_run = self.dry_run, "unread feeds");
            for feed in feeds {
                self.relay_feed(feed, &mut report).await;
            }
        }

        report.token_refreshed = match self.refresh_and_persist().await {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(error = %format!("{:#}", e), "access token refresh failed");
                false
            }
        };

        listed.context("failed to list unread feeds")?;
        tracing::info!(
            posted = report.posted,
            dry_run = report.dry_run,
            skipped = report.skipped,
            failed = report.failed,
            token_refreshed = report.token_refreshed,
            "run complete"
        );
        Ok(report)
    }

    async fn relay_feed(&self, feed: &UnreadFeedSummary, report: &mut RunReport) {
        let stream = match self.feeds.list_unread_entries(&feed.feed_id).await {
            Ok(s) => s,
            Err(e) => {
                tracing::error!(
                    feed_id = %feed.feed_id,
                    error = %format!("{:#}", e),
                    "failed to list unread entries"
                );
                report.failed += 1;
                return;
            }
        };
        tracing::debug!(
            feed_id = %feed.feed_id,
            unread = feed.unread_count,
            fetched = stream.entries.len(),
            "feed entries"
        );

        for entry in &stream.entries {
            match self
                .relay_entry(&feed.feed_id, stream.feed_title.as_deref(), entry)
                .await
            {
                EntryOutcome::Posted => report.posted += 1,
                EntryOutcome::DryRun => report.dry_run += 1,
                EntryOutcome::Skipped => report.skipped += 1,
                EntryOutcome::Failed => report.failed += 1,
            }
        }
    }

    async fn relay_entry(
        &self,
        feed_id: &str,
        feed_title: Option<&str>,
        entry: &Entry,
    ) -> EntryOutcome {
        let (Some(url), Some(title)) = (entry.url(), entry.title.as_deref()) else {
            tracing::warn!(feed_id = %feed_id, entry_id = %entry.id, "entry has no link or title, skipping");
            // Nothing postable; retrying next run would not change that.
            if !self.dry_run {
                self.mark_read(entry).await;
            }
            return EntryOutcome::Skipped;
        };

        let post = match compose(feed_title, title, url, self.shortener.as_ref()).await {
            Ok(p) => p,
            Err(e) => {
                // Left unread so the next run tries again.
                tracing::error!(feed_id = %feed_id, entry_id = %entry.id, error = %e, "failed to compose post");
                return EntryOutcome::Failed;
            }
        };

        if self.dry_run {
            tracing::info!(feed_id = %feed_id, entry_id = %entry.id, text = %post.text, "DRY RUN: would publish");
            return EntryOutcome::DryRun;
        }

        self.mark_read(entry).await;

        match self.publisher.publish(&post.text).await {
            Ok(()) => {
                tracing::info!(feed_id = %feed_id, entry_id = %entry.id, text = %post.text, "posted");
                EntryOutcome::Posted
            }
            Err(e) => {
                tracing::error!(
                    feed_id = %feed_id,
                    entry_id = %entry.id,
                    error = %format!("{:#}", e),
                    "failed to publish"
                );
                EntryOutcome::Failed
            }
        }
    }

    async fn mark_read(&self, entry: &Entry) {
        if let Err(e) = self.feeds.mark_read(&entry.id).await {
            tracing::warn!(entry_id = %entry.id, error = %format!("{:#}", e), "failed to mark entry read");
        }
    }

    async fn refresh_and_persist(&self) -> Result<()> {
        let token = self
            .feeds
            .refresh_access_token(&self.refresh_token)
            .await
            .context("token refresh request failed")?;
        self.tokens
            .write(&token)
            .context("failed to persist refreshed token")?;
        tracing::info!("access token refreshed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_code_precedence() {
        let clean = RunReport {
            token_refreshed: true,
            ..Default::default()
        };
        assert_eq!(clean.exit_status(), 0);

        let partial = RunReport {
            failed: 1,
            token_refreshed: true,
            ..Default::default()
        };
        assert_eq!(partial.exit_status(), 2);

        let stale = RunReport {
            failed: 4,
            token_refreshed: false,
            ..Default::default()
        };
        assert_eq!(stale.exit_status(), 3);
    }
}
