// ABOUTME: Main entry point for the cession de créance signing service
// ABOUTME: Sets up the web server, routes, and shared application state

use axum::{
    extract::{DefaultBodyLimit, Path, State},
    http::header,
    response::{Html, IntoResponse, Json},
    routing::{delete, get, post, put},
    Router,
};
use axum_extra::extract::CookieJar;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use uuid::Uuid;

mod blobstore;
mod cessions;
mod directory;
mod document;
mod entities;
mod error;
mod middleware;
mod migration;
mod session;
mod signature;
mod signing;
mod storage;
mod types;
mod workflow;

#[cfg(test)]
mod storage_tests;

use blobstore::BlobStore;
use directory::{Directory, Notifier};
use error::{AppError, Result};
use session::SessionStore;
use storage::Storage;
use types::{LoginRequest, LoginResponse};

#[derive(Clone)]
pub struct AppState {
    pub storage: Arc<Storage>,
    pub sessions: SessionStore,
    pub blobs: Arc<BlobStore>,
    pub directory: Directory,
    pub notifier: Notifier,
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/session", post(login))
        .route("/session", delete(logout))
        .route("/cessions", post(cessions::create_cession))
        .route("/cessions", get(cessions::list_cessions))
        .route("/cessions/:id", get(cessions::get_cession))
        .route("/cessions/:id", delete(cessions::delete_cession))
        .route("/cessions/:id/status", put(cessions::update_status))
        .route("/cessions/:id/document", get(cessions::get_document))
        .route("/sign/:token", get(signing::signing_page))
        .route("/sign/:token", post(signing::submit_signature))
        .route("/artifacts/*path", get(serve_artifact))
        .layer(axum::middleware::from_fn(middleware::security_headers))
        .layer(CorsLayer::permissive())
        // Signature uploads may legitimately approach the 5 MiB artifact
        // ceiling; the capture unit enforces the exact boundary itself.
        .layer(DefaultBodyLimit::max(16 * 1024 * 1024))
        .with_state(state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cessionflow=info,tower_http=info".into()),
        )
        .init();

    let storage = Arc::new(Storage::new().await.map_err(|e| anyhow::anyhow!("{}", e))?);
    let blobs = Arc::new(BlobStore::new("artifacts"));

    let state = AppState {
        storage,
        sessions: SessionStore::new(),
        blobs,
        directory: Directory::new(),
        notifier: Notifier::new(),
    };

    let app = build_router(state);

    let listener = TcpListener::bind("0.0.0.0:3000").await?;
    println!("🚀 Server running on http://localhost:3000");

    axum::serve(listener, app).await?;
    Ok(())
}

async fn index() -> Html<&'static str> {
    Html(include_str!("../static/index.html"))
}

/// Stand-in for the external identity provider: exchange an email for a
/// session cookie. The signing page never goes through this.
async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(req): Json<LoginRequest>,
) -> Result<(CookieJar, Json<LoginResponse>)> {
    if !req.email.contains('@') {
        return Err(AppError::BadRequest("invalid email".to_string()));
    }

    let user_id = Uuid::new_v4();
    let session_id = state.sessions.create_session(user_id, req.email.clone());
    let jar = jar.add(session::create_session_cookie(session_id, false));

    Ok((
        jar,
        Json(LoginResponse {
            user_id,
            email: req.email,
        }),
    ))
}

async fn logout(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<(CookieJar, Json<serde_json::Value>)> {
    if let Some(session_id) = session::session_cookie_from_jar(&jar) {
        state.sessions.remove_session(&session_id);
    }
    Ok((
        jar.add(session::create_logout_cookie()),
        Json(serde_json::json!({"success": true})),
    ))
}

/// Serve stored artifacts (signature images, assembled documents).
async fn serve_artifact(
    State(state): State<AppState>,
    Path(path): Path<String>,
) -> Result<impl IntoResponse> {
    let bytes = state.blobs.read(&path).await?;
    let content_type = if path.ends_with(".pdf") {
        "application/pdf"
    } else if path.ends_with(".jpg") || path.ends_with(".jpeg") {
        "image/jpeg"
    } else {
        "application/octet-stream"
    };
    Ok(([(header::CONTENT_TYPE, content_type)], bytes))
}
