use anyhow::{Context, Result};
use secrecy::SecretString;
use serde::Deserialize;
use std::path::{Path, PathBuf};

const ENV_FILE: &str = ".env";
const CONFIG_ENV: &str = "FEED2TWEET_CONFIG";
const DEFAULT_CONFIG: &str = "config.toml";

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default = "default_token_file")]
    pub token_file: PathBuf,
    /// Compose posts but leave Feedly and Twitter untouched.
    #[serde(default)]
    pub dry_run: bool,
    #[serde(default)]
    pub log_file: Option<PathBuf>,
    #[serde(default)]
    pub feedly: FeedlyConfig,
    #[serde(default)]
    pub bitly: BitlyConfig,
    #[serde(default)]
    pub twitter: TwitterConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct FeedlyConfig {
    #[serde(default = "default_feedly_base")]
    pub api_base: String,
    #[serde(default = "default_timeout")]
    pub request_timeout_ms: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BitlyConfig {
    #[serde(default = "default_bitly_base")]
    pub api_base: String,
    #[serde(default = "default_timeout")]
    pub request_timeout_ms: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TwitterConfig {
    #[serde(default = "default_twitter_base")]
    pub api_base: String,
    #[serde(default = "default_timeout")]
    pub request_timeout_ms: u64,
}

fn default_token_file() -> PathBuf {
    PathBuf::from(".feedly_access_token")
}
fn default_feedly_base() -> String {
    "https://cloud.feedly.com".to_string()
}
fn default_bitly_base() -> String {
    "https://api-ssl.bitly.com".to_string()
}
fn default_twitter_base() -> String {
    "https://api.twitter.com/1.1".to_string()
}
fn default_timeout() -> u64 {
    10_000
}

impl Default for Config {
    fn default() -> Self {
        Self {
            token_file: default_token_file(),
            dry_run: false,
            log_file: None,
            feedly: FeedlyConfig::default(),
            bitly: BitlyConfig::default(),
            twitter: TwitterConfig::default(),
        }
    }
}

impl Default for FeedlyConfig {
    fn default() -> Self {
        Self {
            api_base: default_feedly_base(),
            request_timeout_ms: default_timeout(),
        }
    }
}

impl Default for BitlyConfig {
    fn default() -> Self {
        Self {
            api_base: default_bitly_base(),
            request_timeout_ms: default_timeout(),
        }
    }
}

impl Default for TwitterConfig {
    fn default() -> Self {
        Self {
            api_base: default_twitter_base(),
            request_timeout_ms: default_timeout(),
        }
    }
}

/// Feedly OAuth client plus the long-lived refresh token.
#[derive(Debug)]
pub struct FeedlyCredentials {
    pub client_id: String,
    pub client_secret: SecretString,
    pub refresh_token: SecretString,
}

/// The four OAuth 1.0a values: two for the app, two for the user. The key
/// halves travel in every request header; only the secrets are wrapped.
#[derive(Debug)]
pub struct TwitterCredentials {
    pub consumer_key: String,
    pub consumer_secret: SecretString,
    pub access_token: String,
    pub access_token_secret: SecretString,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config TOML: {}", path.display()))?;
        Ok(config)
    }

    /// Load from `$FEED2TWEET_CONFIG` or `config.toml`.
    pub fn load_default() -> Result<Self> {
        let explicit = std::env::var(CONFIG_ENV)
            .ok()
            .filter(|p| !p.is_empty())
            .map(PathBuf::from);
        Self::load_or_default(explicit.as_deref(), Path::new(DEFAULT_CONFIG))
    }

    /// An explicitly named file must exist. Only a missing `fallback` means
    /// built-in defaults.
    fn load_or_default(explicit: Option<&Path>, fallback: &Path) -> Result<Self> {
        match explicit {
            Some(path) => Self::load(path)
                .with_context(|| format!("{} names an unusable config", CONFIG_ENV)),
            None if fallback.exists() => Self::load(fallback),
            None => Ok(Self::default()),
        }
    }

    /// Load .env file into process environment. Real env vars take precedence.
    pub fn load_env_file() {
        let content = match std::fs::read_to_string(ENV_FILE) {
            Ok(c) => c,
            Err(_) => return,
        };
        for (key, value) in parse_env_lines(&content) {
            if std::env::var(&key).is_err() {
                std::env::set_var(key, value);
            }
        }
    }

    pub fn feedly_credentials() -> Result<FeedlyCredentials> {
        Ok(FeedlyCredentials {
            client_id: require_env("FEEDLY_CLIENT_ID")?,
            client_secret: require_env("FEEDLY_CLIENT_SECRET")?.into(),
            refresh_token: require_env("FEEDLY_REFRESH_TOKEN")?.into(),
        })
    }

    pub fn bitly_access_token() -> Result<SecretString> {
        Ok(require_env("BITLY_ACCESS_TOKEN")?.into())
    }

    pub fn twitter_credentials() -> Result<TwitterCredentials> {
        Ok(TwitterCredentials {
            consumer_key: require_env("TWITTER_CONSUMER_KEY")?,
            consumer_secret: require_env("TWITTER_CONSUMER_SECRET")?.into(),
            access_token: require_env("TWITTER_ACCESS_TOKEN_KEY")?,
            access_token_secret: require_env("TWITTER_ACCESS_TOKEN_SECRET")?.into(),
        })
    }
}

/// Runs unattended, so a missing secret is an error rather than a prompt.
fn require_env(name: &str) -> Result<String> {
    match std::env::var(name) {
        Ok(value) if !sanitize_key(&value).is_empty() => Ok(sanitize_key(&value)),
        _ => anyhow::bail!("environment variable {} is not set", name),
    }
}

/// KEY=VALUE pairs from a .env file body, skipping blanks and comments.
fn parse_env_lines(content: &str) -> Vec<(String, String)> {
    // Strip BOM if present (common on Windows-created files)
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);
    content
        .lines()
        .map(|line| line.trim().trim_matches('\r'))
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| line.split_once('='))
        .map(|(key, value)| {
            let value = value.trim().trim_matches('"').trim_matches('\'');
            (key.trim().to_string(), value.to_string())
        })
        .collect()
}

/// Strip carriage returns, BOM, and other invisible chars from a key value.
fn sanitize_key(raw: &str) -> String {
    raw.replace(['\r', '\u{feff}', '\u{200b}'], "")
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_parses() {
        let config = Config::load(Path::new("config.toml")).unwrap();
        assert_eq!(config.feedly.api_base, "https://cloud.feedly.com");
        assert_eq!(config.token_file, PathBuf::from(".feedly_access_token"));
        assert!(!config.dry_run);
        assert!(config.twitter.api_base.ends_with("/1.1"));
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: Config = toml::from_str(
            r#"
            dry_run = true
            [bitly]
            api_base = "http://localhost:9000"
            "#,
        )
        .unwrap();
        assert!(config.dry_run);
        assert_eq!(config.bitly.api_base, "http://localhost:9000");
        assert_eq!(config.bitly.request_timeout_ms, 10_000);
        assert_eq!(config.feedly.api_base, "https://cloud.feedly.com");
    }

    #[test]
    fn test_explicit_missing_config_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("dry-run.toml");
        let fallback = dir.path().join("config.toml");

        let err = Config::load_or_default(Some(&missing), &fallback).unwrap_err();
        let msg = format!("{:#}", err);
        assert!(msg.contains("FEED2TWEET_CONFIG"), "{}", msg);
        assert!(msg.contains("dry-run.toml"), "{}", msg);
    }

    #[test]
    fn test_unset_config_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let fallback = dir.path().join("config.toml");

        // No file at all: built-in defaults
        let config = Config::load_or_default(None, &fallback).unwrap();
        assert!(!config.dry_run);
        assert_eq!(config.feedly.api_base, "https://cloud.feedly.com");

        std::fs::write(&fallback, "dry_run = true\n").unwrap();
        assert!(Config::load_or_default(None, &fallback).unwrap().dry_run);

        let explicit = dir.path().join("other.toml");
        std::fs::write(&explicit, "token_file = \"/var/lib/feed2tweet/token\"\n").unwrap();
        let config = Config::load_or_default(Some(&explicit), &fallback).unwrap();
        assert!(!config.dry_run);
        assert_eq!(config.token_file, PathBuf::from("/var/lib/feed2tweet/token"));
    }

    #[test]
    fn test_secrets_are_redacted_in_debug() {
        let creds = FeedlyCredentials {
            client_id: "cid".to_string(),
            client_secret: SecretString::from("hunter2".to_string()),
            refresh_token: SecretString::from("refresh-value".to_string()),
        };
        let debug = format!("{:?}", creds);
        assert!(debug.contains("cid"));
        assert!(!debug.contains("hunter2"), "{}", debug);
        assert!(!debug.contains("refresh-value"), "{}", debug);
    }

    #[test]
    fn test_parse_env_lines() {
        let parsed = parse_env_lines(
            "\u{feff}# comment\nFEEDLY_CLIENT_ID=\"abc\"\r\n\nBITLY_ACCESS_TOKEN = 'xyz'\nnot a pair\n",
        );
        assert_eq!(
            parsed,
            vec![
                ("FEEDLY_CLIENT_ID".to_string(), "abc".to_string()),
                ("BITLY_ACCESS_TOKEN".to_string(), "xyz".to_string()),
            ]
        );
    }

    #[test]
    fn test_sanitize_key() {
        assert_eq!(sanitize_key("\u{feff}key\r\n"), "key");
        assert_eq!(sanitize_key("  \u{200b} "), "");
    }
}
