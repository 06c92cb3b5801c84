pub mod auth;
pub mod rest;

use anyhow::Result;
use async_trait::async_trait;

#[async_trait]
pub trait Publisher: Send + Sync {
    /// Post `text` verbatim as a new status.
    async fn publish(&self, text: &str) -> Result<()>;
}
