//! HTTP Server for the shared membership store
//!
//! Exposes a [`MembershipStore`] over HTTP using axum so that bidder
//! processes and coordinators on different hosts share one pool.
//!
//! # Routes
//!
//! - `POST /sets/:set/members` with `{"member", "score"}`: upsert
//! - `GET /sets/:set/range?min=&max=`: members in the score range
//! - `DELETE /sets/:set/range?min=&max=`: remove the score range
//! - `DELETE /sets/:set/members/:member`: remove one member
//! - `GET /__health`: liveness probe

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post},
    Json, Router,
};
use rtbedge_common::{Result, RtbError};
use serde::Deserialize;
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

use crate::remote_store::{MembersBody, RemovedCount, RemovedFlag, UpsertBody};
use crate::store::MembershipStore;

type SharedStore = Arc<dyn MembershipStore>;
type HandlerError = (StatusCode, String);

#[derive(Debug, Deserialize)]
struct ScoreRange {
    min: i64,
    max: i64,
}

/// HTTP front for a membership store.
pub struct StoreServer {
    store: SharedStore,
}

impl StoreServer {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    /// The axum router serving the store protocol.
    pub fn router(&self) -> Router {
        Router::new()
            .route("/sets/:set/members", post(upsert_member))
            .route("/sets/:set/members/:member", delete(remove_member))
            .route("/sets/:set/range", get(range_by_score).delete(remove_range))
            .route("/__health", get(health_check))
            .with_state(self.store.clone())
    }

    /// Binds `addr` and serves until the process exits.
    pub async fn run(self, addr: SocketAddr) -> Result<()> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| RtbError::Transport(format!("Failed to bind to {}: {}", addr, e)))?;
        self.serve(listener).await
    }

    /// Serves on an already bound listener.
    pub async fn serve(self, listener: TcpListener) -> Result<()> {
        info!(
            "Membership store listening on {}",
            listener
                .local_addr()
                .map_err(|e| RtbError::Transport(format!("Failed to get local addr: {}", e)))?
        );

        axum::serve(listener, self.router())
            .await
            .map_err(|e| RtbError::Transport(format!("Server error: {}", e)))
    }
}

fn internal(e: RtbError) -> HandlerError {
    (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
}

async fn upsert_member(
    State(store): State<SharedStore>,
    Path(set): Path<String>,
    Json(body): Json<UpsertBody>,
) -> std::result::Result<Json<serde_json::Value>, HandlerError> {
    store
        .upsert_score(&set, &body.member, body.score)
        .await
        .map_err(internal)?;
    Ok(Json(json!({ "ok": true })))
}

async fn range_by_score(
    State(store): State<SharedStore>,
    Path(set): Path<String>,
    Query(range): Query<ScoreRange>,
) -> std::result::Result<Json<MembersBody>, HandlerError> {
    let members = store
        .range_by_score(&set, range.min, range.max)
        .await
        .map_err(internal)?;
    Ok(Json(MembersBody { members }))
}

async fn remove_range(
    State(store): State<SharedStore>,
    Path(set): Path<String>,
    Query(range): Query<ScoreRange>,
) -> std::result::Result<Json<RemovedCount>, HandlerError> {
    let removed = store
        .remove_range_by_score(&set, range.min, range.max)
        .await
        .map_err(internal)?;
    Ok(Json(RemovedCount { removed }))
}

async fn remove_member(
    State(store): State<SharedStore>,
    Path((set, member)): Path<(String, String)>,
) -> std::result::Result<Json<RemovedFlag>, HandlerError> {
    let removed = store.remove_member(&set, &member).await.map_err(internal)?;
    Ok(Json(RemovedFlag { removed }))
}

async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
