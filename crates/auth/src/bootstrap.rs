use crate::callback::CallbackServer;
use crate::client::{DiscordAuthClient, OAuthSettings};
use anyhow::Result;
use qobuz_rpc_core::Credential;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Default time the user gets to finish the browser login
pub const DEFAULT_LOGIN_TIMEOUT: Duration = Duration::from_secs(300);

/// Resolves the access token out-of-band
///
/// Any failure (listener, provider refusal, exchange) ends as "not logged in";
/// the caller keeps running without a credential and the user retries manually.
pub struct AuthBootstrap {
    client: DiscordAuthClient,
    callback_addr: SocketAddr,
    login_timeout: Duration,
    logged_in: AtomicBool,
}

impl AuthBootstrap {
    pub fn new(settings: OAuthSettings, callback_addr: SocketAddr, login_timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: DiscordAuthClient::new(settings)?,
            callback_addr,
            login_timeout,
            logged_in: AtomicBool::new(false),
        })
    }

    /// URL the user has to open to log in
    pub fn authorize_url(&self) -> String {
        self.client.authorize_url()
    }

    pub fn is_logged_in(&self) -> bool {
        self.logged_in.load(Ordering::SeqCst)
    }

    /// Run the full login: listen for the redirect, then exchange the code
    pub async fn login(&self) -> Option<Credential> {
        let mut server = CallbackServer::new(self.callback_addr);
        if let Err(e) = server.start().await {
            tracing::error!("Cannot receive the login redirect: {}", e);
            return None;
        }

        tracing::info!(
            "Waiting up to {}s for the login redirect to {}",
            self.login_timeout.as_secs(),
            self.client.settings().redirect_uri
        );
        let code = server.wait_for_code(self.login_timeout).await;
        server.stop().await;

        let credential = match code {
            Ok(code) => self.exchange_code_for_token(&code).await,
            Err(e) => {
                tracing::warn!("Login did not complete: {}", e);
                None
            }
        };

        self.logged_in.store(credential.is_some(), Ordering::SeqCst);
        credential
    }

    /// Exchange a code obtained elsewhere (e.g. pasted by the user)
    pub async fn exchange_code_for_token(&self, code: &str) -> Option<Credential> {
        let credential = self.client.exchange_code_for_token(code).await;
        if credential.is_some() {
            self.logged_in.store(true, Ordering::SeqCst);
        }
        credential
    }
}
