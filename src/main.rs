use anyhow::{Context, Result};
use feed2tweet::config::{Config, FeedlyCredentials};
use feed2tweet::credentials::{FileTokenStore, TokenStore};
use feed2tweet::feedly::rest::FeedlyRest;
use feed2tweet::pipeline::Relay;
use feed2tweet::shortener::bitly::Bitly;
use feed2tweet::twitter::auth::OAuth1Signer;
use feed2tweet::twitter::rest::TwitterRest;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

fn init_tracing(config: &Config) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("feed2tweet=info"));
    match &config.log_file {
        Some(path) => {
            let log_file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file: {}", path.display()))?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(log_file)
                .init();
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Load saved keys from .env (real env vars take precedence)
    Config::load_env_file();
    let config = Config::load_default()?;
    init_tracing(&config)?;

    let FeedlyCredentials {
        client_id,
        client_secret,
        refresh_token,
    } = Config::feedly_credentials()?;
    let bitly_token = Config::bitly_access_token()?;
    let twitter_creds = Config::twitter_credentials()?;

    let tokens: Arc<dyn TokenStore> = Arc::new(FileTokenStore::new(&config.token_file));
    let feeds = FeedlyRest::new(
        tokens.clone(),
        client_id,
        client_secret,
        &config.feedly.api_base,
        Duration::from_millis(config.feedly.request_timeout_ms),
    )?;
    let shortener = Bitly::new(
        bitly_token,
        &config.bitly.api_base,
        Duration::from_millis(config.bitly.request_timeout_ms),
    )?;
    let publisher = TwitterRest::new(
        OAuth1Signer::new(twitter_creds),
        &config.twitter.api_base,
        Duration::from_millis(config.twitter.request_timeout_ms),
    )?;

    let relay = Relay::new(
        Arc::new(feeds),
        Arc::new(shortener),
        Arc::new(publisher),
        tokens,
        refresh_token,
        config.dry_run,
    );

    let report = relay.run().await?;
    Ok(ExitCode::from(report.exit_status()))
}
