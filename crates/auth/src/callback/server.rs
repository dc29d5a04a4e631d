/// OAuth callback server implementation
use super::routes::{create_router, CallbackOutcome, CallbackState};
use qobuz_rpc_core::AuthError;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{error, info};

/// Local HTTP listener for the OAuth redirect
pub struct CallbackServer {
    addr: SocketAddr,
    server_handle: Option<JoinHandle<()>>,
    receiver: Option<oneshot::Receiver<CallbackOutcome>>,
}

impl CallbackServer {
    /// Create a new callback server
    ///
    /// # Arguments
    /// * `addr` - Address to bind to (e.g., "127.0.0.1:8765"); port 0 picks a free port
    pub fn new(addr: SocketAddr) -> Self {
        Self {
            addr,
            server_handle: None,
            receiver: None,
        }
    }

    /// Bind and start serving
    pub async fn start(&mut self) -> Result<(), AuthError> {
        info!("Starting OAuth callback listener on {}", self.addr);

        let (sender, receiver) = oneshot::channel();
        let app = create_router(CallbackState::new(sender));

        let listener = tokio::net::TcpListener::bind(self.addr)
            .await
            .map_err(|e| AuthError::Callback(format!("bind {}: {}", self.addr, e)))?;
        self.addr = listener
            .local_addr()
            .map_err(|e| AuthError::Callback(e.to_string()))?;
        info!("OAuth callback listening on {}", self.addr);

        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                error!("OAuth callback server error: {}", e);
            }
        });

        self.server_handle = Some(handle);
        self.receiver = Some(receiver);

        Ok(())
    }

    /// Wait for the redirect carrying the authorization code
    pub async fn wait_for_code(&mut self, timeout: Duration) -> Result<String, AuthError> {
        let receiver = self
            .receiver
            .take()
            .ok_or_else(|| AuthError::Callback("listener not started or already used".to_string()))?;

        match tokio::time::timeout(timeout, receiver).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(_)) => Err(AuthError::Callback("listener stopped".to_string())),
            Err(_) => Err(AuthError::Timeout),
        }
    }

    /// Stop the callback server
    pub async fn stop(&mut self) {
        if let Some(handle) = self.server_handle.take() {
            info!("Stopping OAuth callback listener");
            handle.abort();
        }
    }

    /// Bound address (the real port once started)
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }
}

impl Drop for CallbackServer {
    fn drop(&mut self) {
        if let Some(handle) = self.server_handle.take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_callback_server_creation() {
        let addr: SocketAddr = "127.0.0.1:0".parse().unwrap();
        let server = CallbackServer::new(addr);

        assert_eq!(server.addr(), addr);
    }

    #[tokio::test]
    async fn test_wait_before_start_fails() {
        let mut server = CallbackServer::new("127.0.0.1:0".parse().unwrap());
        let err = server.wait_for_code(Duration::from_millis(10)).await.unwrap_err();
        assert!(matches!(err, AuthError::Callback(_)));
    }
}
