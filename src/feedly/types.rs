use serde::{Deserialize, Serialize};

/// Normalized types used by the relay (wire-format agnostic).

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnreadFeedSummary {
    pub feed_id: String,
    pub unread_count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    pub href: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub id: String,
    pub title: Option<String>,
    pub links: Vec<Link>,
}

impl Entry {
    /// Only the first alternate link is ever posted.
    pub fn url(&self) -> Option<&str> {
        self.links.first().map(|l| l.href.as_str())
    }
}

/// One page of a feed's unread stream.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedPage {
    pub feed_title: Option<String>,
    pub entries: Vec<Entry>,
    pub continuation: Option<String>,
}

/// Every unread entry of a feed, pages concatenated in fetch order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnreadStream {
    pub feed_title: Option<String>,
    pub entries: Vec<Entry>,
}

/// GET /v3/markers/counts
#[derive(Debug, Clone, Deserialize)]
pub struct UnreadCountsResponse {
    #[serde(default)]
    pub unreadcounts: Vec<UnreadCount>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UnreadCount {
    pub id: String,
    #[serde(default)]
    pub count: u64,
}

/// GET /v3/streams/contents
#[derive(Debug, Clone, Deserialize)]
pub struct StreamContentsResponse {
    pub title: Option<String>,
    #[serde(default)]
    pub items: Vec<StreamItem>,
    pub continuation: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StreamItem {
    pub id: String,
    pub title: Option<String>,
    // Absent flag means the item was never marked read.
    #[serde(default = "default_unread")]
    pub unread: bool,
    #[serde(default)]
    pub alternate: Vec<AlternateLink>,
}

fn default_unread() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
pub struct AlternateLink {
    pub href: String,
}

/// POST /v3/markers
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkersRequest {
    pub action: String,
    #[serde(rename = "type")]
    pub marker_type: String,
    pub entry_ids: Vec<String>,
}

impl MarkersRequest {
    pub fn mark_entries_read(entry_ids: Vec<String>) -> Self {
        Self {
            action: "markAsRead".to_string(),
            marker_type: "entries".to_string(),
            entry_ids,
        }
    }
}

/// POST /v3/auth/token. Borrows the secrets for the length of one request.
#[derive(Serialize)]
pub struct TokenRefreshRequest<'a> {
    pub refresh_token: &'a str,
    pub client_id: &'a str,
    pub client_secret: &'a str,
    pub grant_type: &'a str,
}

/// Not `Debug`: the token goes straight into an [`AccessToken`](crate::credentials::AccessToken).
#[derive(Deserialize)]
pub struct TokenRefreshResponse {
    pub access_token: String,
    #[serde(default)]
    pub expires_in: Option<u64>,
}

impl From<StreamContentsResponse> for FeedPage {
    /// Drops items already read: unreadOnly is requested, but the remote
    /// cache can lag behind a mark-read.
    fn from(resp: StreamContentsResponse) -> Self {
        let entries = resp
            .items
            .into_iter()
            .filter(|item| item.unread)
            .map(|item| Entry {
                id: item.id,
                title: item.title,
                links: item
                    .alternate
                    .into_iter()
                    .map(|a| Link { href: a.href })
                    .collect(),
            })
            .collect();
        FeedPage {
            feed_title: resp.title,
            entries,
            continuation: resp.continuation.filter(|c| !c.is_empty()),
        }
    }
}
