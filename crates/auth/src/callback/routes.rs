/// Route handlers for the OAuth callback listener

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Json, Response},
    routing::get,
    Router,
};
use qobuz_rpc_core::AuthError;
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::{oneshot, Mutex};
use tracing::{debug, info, warn};

/// Path Discord redirects to
pub const CALLBACK_PATH: &str = "/callback";

/// Authorization code, or the reason the provider gave for refusing
pub type CallbackOutcome = Result<String, AuthError>;

/// Shared listener state; the sender is consumed by the first valid callback
#[derive(Clone)]
pub struct CallbackState {
    pub sender: Arc<Mutex<Option<oneshot::Sender<CallbackOutcome>>>>,
}

impl CallbackState {
    pub fn new(sender: oneshot::Sender<CallbackOutcome>) -> Self {
        Self {
            sender: Arc::new(Mutex::new(Some(sender))),
        }
    }
}

/// Query parameters of the redirect
#[derive(Debug, Default, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

/// Create the callback router
pub fn create_router(state: CallbackState) -> Router {
    Router::new()
        .route(CALLBACK_PATH, get(handle_callback))
        .route("/health", get(health_check))
        .with_state(state)
}

/// GET /callback - Receive the authorization code (consumed once)
async fn handle_callback(
    State(state): State<CallbackState>,
    Query(params): Query<CallbackParams>,
) -> Response {
    let outcome = match (params.code, params.error) {
        (Some(code), _) if !code.is_empty() => Ok(code),
        (_, Some(error)) => {
            let reason = match params.error_description {
                Some(description) => format!("{}: {}", error, description),
                None => error,
            };
            Err(AuthError::Denied(reason))
        }
        _ => {
            debug!("GET {} without code or error", CALLBACK_PATH);
            return (StatusCode::BAD_REQUEST, "Missing authorization code").into_response();
        }
    };

    let Some(sender) = state.sender.lock().await.take() else {
        warn!("Ignoring repeated OAuth callback");
        return (
            StatusCode::GONE,
            Html(page("Login already handled", "You can close this window.")),
        )
            .into_response();
    };

    let (status, body) = match &outcome {
        Ok(_) => {
            info!("Received OAuth authorization code");
            (
                StatusCode::OK,
                page("Logged in", "Return to the terminal; you can close this window."),
            )
        }
        Err(e) => {
            warn!("OAuth authorization refused: {}", e);
            (StatusCode::OK, page("Login cancelled", "Run the login again to retry."))
        }
    };

    if sender.send(outcome).is_err() {
        warn!("Nobody is waiting for the OAuth callback anymore");
    }

    (status, Html(body)).into_response()
}

/// GET /health - Health check endpoint
async fn health_check() -> Response {
    Json(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
    }))
    .into_response()
}

fn page(title: &str, message: &str) -> String {
    format!(
        "<!doctype html><html><head><title>{title}</title></head>\
         <body><h1>{title}</h1><p>{message}</p></body></html>"
    )
}
