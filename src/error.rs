use thiserror::Error;

/// Failure from the link-shortening service.
#[derive(Debug, Error)]
pub enum ShortenError {
    /// Non-success status, either HTTP or the service's own `status_code`.
    /// `body` is the raw response as received.
    #[error("shortener rejected {url} ({status}): {body}")]
    Rejected {
        url: String,
        status: u16,
        body: String,
    },

    #[error("shortener request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

#[derive(Debug, Error)]
pub enum ComposeError {
    #[error(transparent)]
    Shorten(#[from] ShortenError),

    /// Still over the limit after shortening and truncation. Only reachable
    /// when the shortened URL is longer than the reserved width.
    #[error("post text is {length} chars, limit is {limit}")]
    TooLong { length: usize, limit: usize },
}
