use anyhow::{Context, Result};
use secrecy::{ExposeSecret, SecretString};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Feedly bearer token. Only one is live at a time; a refresh replaces it.
#[derive(Debug)]
pub struct AccessToken(SecretString);

impl AccessToken {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(SecretString::from(raw.into().trim().to_string()))
    }

    pub fn expose_secret(&self) -> &str {
        self.0.expose_secret()
    }

    pub fn bearer_header(&self) -> String {
        format!("Bearer {}", self.0.expose_secret())
    }
}

impl Clone for AccessToken {
    fn clone(&self) -> Self {
        Self::new(self.expose_secret())
    }
}

/// Where the live access token is kept between runs.
pub trait TokenStore: Send + Sync {
    fn read(&self) -> Result<AccessToken>;
    fn write(&self, token: &AccessToken) -> Result<()>;
}

/// Token persisted as the sole content of a file.
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl TokenStore for FileTokenStore {
    fn read(&self) -> Result<AccessToken> {
        let raw = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read token file: {}", self.path.display()))?;
        let token = AccessToken::new(raw);
        if token.expose_secret().is_empty() {
            anyhow::bail!("token file {} is empty", self.path.display());
        }
        Ok(token)
    }

    /// Write to a sibling temp file, then rename over the token file so a
    /// crash never leaves a half-written token behind.
    fn write(&self, token: &AccessToken) -> Result<()> {
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        write_private(&tmp, format!("{}\n", token.expose_secret()).as_bytes())
            .with_context(|| format!("Failed to write {}", tmp.display()))?;
        std::fs::rename(&tmp, &self.path).with_context(|| {
            format!("Failed to replace token file: {}", self.path.display())
        })?;
        Ok(())
    }
}

/// Create or truncate `path` readable by the owner only, then write `contents`.
fn write_private(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    let mut options = std::fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options.open(path)?;
    // mode() only applies on create; a stale temp file keeps its old bits
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(std::fs::Permissions::from_mode(0o600))?;
    }
    file.write_all(contents)?;
    file.sync_all()
}

/// In-process store, for wiring tests and one-off runs.
#[derive(Default)]
pub struct MemoryTokenStore {
    token: Mutex<Option<AccessToken>>,
}

impl MemoryTokenStore {
    pub fn new(token: AccessToken) -> Self {
        Self {
            token: Mutex::new(Some(token)),
        }
    }
}

impl TokenStore for MemoryTokenStore {
    fn read(&self) -> Result<AccessToken> {
        let guard = self
            .token
            .lock()
            .map_err(|_| anyhow::anyhow!("token store lock poisoned"))?;
        guard.clone().context("no access token stored")
    }

    fn write(&self, token: &AccessToken) -> Result<()> {
        let mut guard = self
            .token
            .lock()
            .map_err(|_| anyhow::anyhow!("token store lock poisoned"))?;
        *guard = Some(token.clone());
        Ok(())
    }
}
