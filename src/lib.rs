pub mod compose;
pub mod config;
pub mod credentials;
pub mod error;
pub mod feedly;
pub mod pipeline;
pub mod shortener;
pub mod twitter;
