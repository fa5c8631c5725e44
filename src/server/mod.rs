//! HTTP surface: router, shared state, session-id cookie plumbing.

pub mod error;
pub mod routes;
pub mod upload;

use std::sync::Arc;

use axum::extract::{DefaultBodyLimit, Request};
use axum::http::{header, HeaderValue};
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use uuid::Uuid;

use crate::api::ChatModel;
use crate::config::AppConfig;
use crate::session::SessionStore;
use crate::storage::TranscriptStore;

const SESSION_COOKIE: &str = "sid";
const SESSION_MAX_AGE_SECS: u64 = 2 * 60 * 60;

/// Everything a request handler collaborates with, injected explicitly.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub model: Arc<dyn ChatModel>,
    pub sessions: Arc<SessionStore>,
    pub transcripts: Option<Arc<TranscriptStore>>,
}

/// Opaque per-conversation identifier, set by the session cookie layer.
#[derive(Debug, Clone)]
pub struct SessionId(pub String);

/// Builds the application router. Body limits are enforced per-file while
/// streaming uploads, so the framework-level default limit is disabled.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(routes::health))
        .route("/api/chat", post(routes::chat))
        .route("/api/analyze/zip", post(routes::analyze_zip))
        .route("/api/analyze/folder", post(routes::analyze_folder))
        .route("/api/analyze/multifile", post(routes::analyze_multifile))
        .layer(middleware::from_fn(session_cookie))
        .layer(DefaultBodyLimit::disable())
        .with_state(state)
}

/// Reads the `sid` cookie, minting a fresh id (and a `Set-Cookie` on the
/// way out) for first-contact requests. Deliberately minimal: session
/// storage and expiry live with the history store, not the cookie.
async fn session_cookie(mut request: Request, next: Next) -> Response {
    let existing = request
        .headers()
        .get(header::COOKIE)
        .and_then(|value| value.to_str().ok())
        .and_then(sid_from_cookie_header);

    let (session_id, fresh) = match existing {
        Some(sid) => (sid, false),
        None => (Uuid::new_v4().to_string(), true),
    };
    request
        .extensions_mut()
        .insert(SessionId(session_id.clone()));

    let mut response = next.run(request).await;
    if fresh {
        let cookie = format!(
            "{SESSION_COOKIE}={session_id}; Path=/; HttpOnly; SameSite=Lax; Max-Age={SESSION_MAX_AGE_SECS}"
        );
        if let Ok(value) = HeaderValue::from_str(&cookie) {
            response.headers_mut().append(header::SET_COOKIE, value);
        }
    }
    response
}

fn sid_from_cookie_header(header: &str) -> Option<String> {
    header
        .split(';')
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Binds and serves until Ctrl+C / SIGTERM; in-flight requests complete
/// before exit.
pub async fn run(state: AppState) -> anyhow::Result<()> {
    let bind_addr = state.config.bind_addr.clone();
    let app = router(state);
    let listener = TcpListener::bind(&bind_addr).await?;
    tracing::info!("listening on {} (Ctrl+C/SIGTERM to stop)", bind_addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let ctrl_c = tokio::signal::ctrl_c();
        let mut sigterm = signal(SignalKind::terminate()).expect("failed to listen for SIGTERM");
        tokio::select! {
            _ = ctrl_c => {}
            _ = sigterm.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to listen for Ctrl+C");
    }
}
