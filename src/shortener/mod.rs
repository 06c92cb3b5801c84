pub mod bitly;

use crate::error::ShortenError;
use async_trait::async_trait;

#[async_trait]
pub trait LinkShortener: Send + Sync {
    async fn shorten(&self, url: &str) -> Result<String, ShortenError>;
}
