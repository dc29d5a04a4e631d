use anyhow::{Context, Result};
use qobuz_rpc_auth::{OAuthSettings, DEFAULT_LOGIN_TIMEOUT};
use qobuz_rpc_core::Branding;
use qobuz_rpc_delivery::DEFAULT_REQUEST_TIMEOUT;
use qobuz_rpc_sync::{SyncSettings, DEFAULT_POLL_INTERVAL, STATUS_RESET_DELAY};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable holding the OAuth client secret
pub const CLIENT_SECRET_ENV: &str = "QOBUZ_RPC_CLIENT_SECRET";
/// Environment variable holding a previously obtained access token
pub const TOKEN_ENV: &str = "QOBUZ_RPC_TOKEN";

/// Application configuration, loaded from `config.toml`
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api: ApiConfig,
    pub sync: SyncConfig,
    pub discord: DiscordConfig,
    pub branding: Branding,
    pub artwork: ArtworkConfig,
    pub source: SourceConfig,
    pub push: PushConfig,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL of the presence API; `/v1/status/update` is appended
    pub base_url: String,
    pub request_timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8080".to_string(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT.as_secs(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    pub status_reset_ms: u64,
    pub poll_interval_ms: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            status_reset_ms: STATUS_RESET_DELAY.as_millis() as u64,
            poll_interval_ms: DEFAULT_POLL_INTERVAL.as_millis() as u64,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscordConfig {
    #[serde(flatten)]
    pub oauth: OAuthSettings,
    /// Address the login redirect listener binds to
    pub callback_bind: SocketAddr,
    pub login_timeout_secs: u64,
}

impl Default for DiscordConfig {
    fn default() -> Self {
        Self {
            oauth: OAuthSettings::default(),
            callback_bind: SocketAddr::from(([127, 0, 0, 1], 8765)),
            login_timeout_secs: DEFAULT_LOGIN_TIMEOUT.as_secs(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ArtworkConfig {
    pub enabled: bool,
}

impl Default for ArtworkConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Shell command printing the current track (JSON or "Title - Artist")
    pub command: Option<String>,
}

/// Local endpoint accepting pushed track updates (`serve`)
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct PushConfig {
    pub bind: SocketAddr,
    /// Clear the presence after this long without updates
    pub idle_timeout_secs: u64,
}

impl Default for PushConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([127, 0, 0, 1], 5000)),
            idle_timeout_secs: crate::push::DEFAULT_IDLE_TIMEOUT.as_secs(),
        }
    }
}

impl Config {
    /// Default config location (platform-specific)
    pub fn default_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Failed to get config directory"))?;
        Ok(config_dir.join("qobuz-rpc").join("config.toml"))
    }

    /// Load the config from `path`, or from the default location.
    ///
    /// A missing file at the default location yields defaults; an explicitly
    /// given path has to exist.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let (path, explicit) = match path {
            Some(path) => (path.to_path_buf(), true),
            None => (Self::default_path()?, false),
        };

        if !explicit && !path.exists() {
            tracing::debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let data = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config = Self::parse(&data)
            .with_context(|| format!("Failed to parse config: {}", path.display()))?;

        tracing::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn parse(data: &str) -> Result<Self> {
        Ok(toml::from_str(data)?)
    }

    /// Apply overrides from the process environment
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(secret) = lookup(CLIENT_SECRET_ENV).filter(|s| !s.is_empty()) {
            self.discord.oauth.client_secret = secret;
        }
    }

    /// Render as TOML with secrets masked
    pub fn to_redacted_toml(&self) -> Result<String> {
        let mut shown = self.clone();
        if !shown.discord.oauth.client_secret.is_empty() {
            shown.discord.oauth.client_secret = "<redacted>".to_string();
        }
        toml::to_string_pretty(&shown).context("Failed to render config")
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.api.request_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.sync.poll_interval_ms)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.push.idle_timeout_secs)
    }

    pub fn login_timeout(&self) -> Duration {
        Duration::from_secs(self.discord.login_timeout_secs)
    }

    pub fn sync_settings(&self) -> SyncSettings {
        SyncSettings {
            status_reset: Duration::from_millis(self.sync.status_reset_ms),
            branding: self.branding.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.request_timeout(), Duration::from_secs(10));
        assert_eq!(config.poll_interval(), Duration::from_secs(2));
        assert_eq!(config.login_timeout(), Duration::from_secs(300));
        assert_eq!(config.sync_settings().status_reset, Duration::from_millis(2000));
        assert_eq!(config.discord.callback_bind.to_string(), "127.0.0.1:8765");
        assert_eq!(config.discord.oauth.scope, "identify");
        assert_eq!(config.branding.service, "Qobuz");
        assert!(config.artwork.enabled);
        assert!(config.source.command.is_none());
        assert_eq!(config.push.bind.to_string(), "127.0.0.1:5000");
        assert_eq!(config.idle_timeout(), Duration::from_secs(300));
    }

    #[test]
    fn test_empty_file_is_default() {
        let config = Config::parse("").unwrap();
        assert_eq!(config.api.base_url, ApiConfig::default().base_url);
        assert_eq!(config.sync.poll_interval_ms, 2000);
    }

    #[test]
    fn test_partial_overrides() {
        let config = Config::parse(
            r#"
            [api]
            base_url = "https://rpc.example.com"

            [sync]
            status_reset_ms = 500

            [discord]
            client_id = "928957672907227147"
            callback_bind = "127.0.0.1:9000"

            [branding]
            service = "Qobuz Hi-Fi"

            [artwork]
            enabled = false

            [source]
            command = "playerctl metadata --format '{{title}} - {{artist}}'"

            [push]
            idle_timeout_secs = 60
            "#,
        )
        .unwrap();

        assert_eq!(config.api.base_url, "https://rpc.example.com");
        assert_eq!(config.api.request_timeout_secs, 10);
        assert_eq!(config.sync.status_reset_ms, 500);
        assert_eq!(config.sync.poll_interval_ms, 2000);
        assert_eq!(config.discord.oauth.client_id, "928957672907227147");
        assert_eq!(config.discord.oauth.token_url, qobuz_rpc_auth::DISCORD_TOKEN_URL);
        assert_eq!(config.discord.callback_bind.port(), 9000);
        assert_eq!(config.branding.service, "Qobuz Hi-Fi");
        assert_eq!(config.branding.idle_text, "Qobuz RPC Client");
        assert!(!config.artwork.enabled);
        assert!(config.source.command.as_ref().unwrap().starts_with("playerctl"));
        assert_eq!(config.idle_timeout(), Duration::from_secs(60));
        assert_eq!(config.push.bind.port(), 5000);
    }

    #[test]
    fn test_invalid_toml_is_an_error() {
        assert!(Config::parse("[sync]\nstatus_reset_ms = \"soon\"").is_err());
    }

    #[test]
    fn test_env_overrides_secret() {
        let env: HashMap<&str, &str> = [(CLIENT_SECRET_ENV, "from-env")].into();
        let mut config = Config::parse("[discord]\nclient_secret = \"from-file\"").unwrap();
        config.apply_overrides(|key| env.get(key).map(|v| v.to_string()));
        assert_eq!(config.discord.oauth.client_secret, "from-env");

        let mut untouched = Config::parse("[discord]\nclient_secret = \"from-file\"").unwrap();
        untouched.apply_overrides(|_| Some(String::new()));
        assert_eq!(untouched.discord.oauth.client_secret, "from-file");
    }

    #[test]
    fn test_redacted_toml() {
        let mut config = Config::default();
        config.discord.oauth.client_secret = "hunter2".to_string();

        let rendered = config.to_redacted_toml().unwrap();
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("<redacted>"));

        // Rendered output parses back
        let parsed = Config::parse(&rendered).unwrap();
        assert_eq!(parsed.api.base_url, config.api.base_url);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[sync]\npoll_interval_ms = 750\n").unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.poll_interval(), Duration::from_millis(750));
    }

    #[test]
    fn test_load_missing_explicit_path_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Config::load(Some(&dir.path().join("nope.toml"))).is_err());
    }
}
