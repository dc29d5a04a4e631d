use anyhow::{Context, Result};
use qobuz_rpc_core::{AuthError, Credential};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DISCORD_TOKEN_URL: &str = "https://discord.com/api/v10/oauth2/token";
pub const DISCORD_AUTHORIZE_URL: &str = "https://discord.com/oauth2/authorize";

/// OAuth application settings
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OAuthSettings {
    pub client_id: String,
    pub client_secret: String,
    /// Must match the redirect registered with the Discord application
    pub redirect_uri: String,
    pub token_url: String,
    pub authorize_url: String,
    pub scope: String,
}

impl Default for OAuthSettings {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: String::new(),
            redirect_uri: "http://127.0.0.1:8765/callback".to_string(),
            token_url: DISCORD_TOKEN_URL.to_string(),
            authorize_url: DISCORD_AUTHORIZE_URL.to_string(),
            scope: "identify".to_string(),
        }
    }
}

impl std::fmt::Debug for OAuthSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthSettings")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("redirect_uri", &self.redirect_uri)
            .field("token_url", &self.token_url)
            .field("authorize_url", &self.authorize_url)
            .field("scope", &self.scope)
            .finish()
    }
}

/// Data received from Discord after a successful token exchange
#[derive(Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: u64,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub scope: String,
}

impl TokenResponse {
    pub fn credential(&self) -> Credential {
        Credential::new(self.access_token.clone())
    }
}

/// Client for the Discord OAuth2 authorization-code flow
pub struct DiscordAuthClient {
    settings: OAuthSettings,
    client: Client,
}

impl DiscordAuthClient {
    pub fn new(settings: OAuthSettings) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .context("Failed to build HTTP client for token exchange")?;

        Ok(Self { settings, client })
    }

    pub fn settings(&self) -> &OAuthSettings {
        &self.settings
    }

    /// URL the user opens in a browser to grant access
    pub fn authorize_url(&self) -> String {
        format!(
            "{}?client_id={}&response_type=code&redirect_uri={}&scope={}",
            self.settings.authorize_url,
            urlencoding::encode(&self.settings.client_id),
            urlencoding::encode(&self.settings.redirect_uri),
            urlencoding::encode(&self.settings.scope),
        )
    }

    /// Exchange an authorization code for an access token
    pub async fn exchange_code(&self, code: &str) -> Result<TokenResponse, AuthError> {
        let form = [
            ("client_id", self.settings.client_id.as_str()),
            ("client_secret", self.settings.client_secret.as_str()),
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", self.settings.redirect_uri.as_str()),
        ];

        let response = self
            .client
            .post(&self.settings.token_url)
            .form(&form)
            .send()
            .await
            .map_err(|e| AuthError::Transport(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AuthError::Transport(e.to_string()))?;

        if !status.is_success() {
            return Err(AuthError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        serde_json::from_str(&body).map_err(|e| AuthError::InvalidResponse(e.to_string()))
    }

    /// Exchange a code, absorbing failures into "no credential"
    pub async fn exchange_code_for_token(&self, code: &str) -> Option<Credential> {
        match self.exchange_code(code).await {
            Ok(token) => {
                tracing::info!(
                    "Token exchange successful ({} token, expires in {}s, scope '{}')",
                    token.token_type,
                    token.expires_in,
                    token.scope
                );
                Some(token.credential())
            }
            Err(e) => {
                tracing::error!("Token exchange failed: {}", e);
                None
            }
        }
    }
}
