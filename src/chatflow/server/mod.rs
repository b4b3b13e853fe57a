// SPDX-License-Identifier: MIT

//! HTTP chat front end
//!
//! Sessions live in memory. Turns of one session are serialised by a
//! per-session async mutex; different sessions run independently.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tokio_util::sync::CancellationToken;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use uuid::Uuid;

use crate::adk::error::{ChatError, WorkflowError};
use crate::chatflow::workflow::{Session, WorkflowCatalog};

struct SessionHandle {
    session: Mutex<Session>,
    /// Cancels the turn currently running, if any
    inflight: std::sync::Mutex<Option<CancellationToken>>,
}

impl SessionHandle {
    fn cancel_inflight(&self) -> bool {
        match self.inflight.lock() {
            Ok(mut guard) => guard.take().map(|token| token.cancel()).is_some(),
            Err(_) => false,
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    catalog: Arc<WorkflowCatalog>,
    sessions: Arc<RwLock<HashMap<Uuid, Arc<SessionHandle>>>>,
}

impl AppState {
    pub fn new(catalog: Arc<WorkflowCatalog>) -> Self {
        Self {
            catalog,
            sessions: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    async fn handle(&self, id: &str) -> Result<Arc<SessionHandle>, ApiError> {
        let uuid = Uuid::parse_str(id).map_err(|_| ChatError::SessionNotFound(id.to_string()))?;
        self.sessions
            .read()
            .await
            .get(&uuid)
            .cloned()
            .ok_or_else(|| ChatError::SessionNotFound(id.to_string()).into())
    }
}

/// Error body returned by every route
pub struct ApiError(ChatError);

impl From<ChatError> for ApiError {
    fn from(e: ChatError) -> Self {
        Self(e)
    }
}

impl From<WorkflowError> for ApiError {
    fn from(e: WorkflowError) -> Self {
        Self(ChatError::Workflow(e))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, kind) = match &self.0 {
            ChatError::SessionNotFound(_) => (StatusCode::NOT_FOUND, "session_not_found"),
            ChatError::UnknownWorkflow(_) => (StatusCode::NOT_FOUND, "unknown_workflow"),
            ChatError::Config(_) => (StatusCode::BAD_REQUEST, "config"),
            ChatError::Workflow(WorkflowError::Cancelled { .. }) => {
                (StatusCode::CONFLICT, "cancelled")
            }
            // A failed turn is reported, the session stays usable
            ChatError::Workflow(e) => (StatusCode::UNPROCESSABLE_ENTITY, e.kind()),
            _ => (StatusCode::INTERNAL_SERVER_ERROR, "internal"),
        };
        (status, Json(json!({ "error": self.0.to_string(), "kind": kind }))).into_response()
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health_check))
        .route("/api/workflows", get(list_workflows))
        .route("/api/sessions", post(create_session))
        .route("/api/sessions/{id}", get(get_session).delete(delete_session))
        .route("/api/sessions/{id}/messages", post(send_message))
        .route("/api/sessions/{id}/model", post(set_model))
        .route("/api/sessions/{id}/cancel", post(cancel_turn))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn serve(catalog: Arc<WorkflowCatalog>, port: u16) -> crate::adk::error::Result<()> {
    let app = router(AppState::new(catalog));

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    log::info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn health_check() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn list_workflows(State(state): State<AppState>) -> Json<Value> {
    let workflows: Vec<Value> = state
        .catalog
        .profiles()
        .into_iter()
        .map(|(profile, settings)| json!({ "profile": profile, "settings": settings }))
        .collect();
    Json(json!(workflows))
}

#[derive(Deserialize)]
struct CreateSessionRequest {
    /// Defaults to the catalog's default workflow
    workflow: Option<String>,
    model: Option<String>,
}

async fn create_session(
    State(state): State<AppState>,
    Json(payload): Json<CreateSessionRequest>,
) -> Result<Json<Value>, ApiError> {
    let workflow = match payload.workflow {
        Some(name) => name,
        None => state
            .catalog
            .default_workflow()
            .map(|e| e.workflow.name().to_string())
            .ok_or_else(|| ChatError::config("No workflows registered"))?,
    };

    let session = state
        .catalog
        .start_session(&workflow, payload.model.as_deref())?;
    let id = session.id();
    let body = json!({ "id": id, "state": session.state() });

    state.sessions.write().await.insert(
        id,
        Arc::new(SessionHandle {
            session: Mutex::new(session),
            inflight: std::sync::Mutex::new(None),
        }),
    );
    log::info!("Created session {} for workflow '{}'", id, workflow);
    Ok(Json(body))
}

async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let handle = state.handle(&id).await?;
    let session = handle.session.lock().await;
    Ok(Json(json!({
        "id": session.id(),
        "turns": session.turns(),
        "state": session.state(),
    })))
}

#[derive(Deserialize)]
struct MessageRequest {
    content: String,
}

async fn send_message(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<MessageRequest>,
) -> Result<Json<Value>, ApiError> {
    let handle = state.handle(&id).await?;
    let mut session = handle.session.lock().await;

    let cancel = CancellationToken::new();
    if let Ok(mut inflight) = handle.inflight.lock() {
        *inflight = Some(cancel.clone());
    }
    let result = session.send(payload.content, cancel).await;
    if let Ok(mut inflight) = handle.inflight.lock() {
        *inflight = None;
    }

    let messages = result?;
    Ok(Json(json!({ "turn": session.turns(), "messages": messages })))
}

#[derive(Deserialize)]
struct ModelRequest {
    model: String,
}

async fn set_model(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<ModelRequest>,
) -> Result<Json<Value>, ApiError> {
    let handle = state.handle(&id).await?;
    let mut session = handle.session.lock().await;
    state.catalog.check_model(session.workflow(), &payload.model)?;
    session.set_model(payload.model);
    Ok(Json(json!({ "model": session.state().model_selector })))
}

async fn cancel_turn(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let handle = state.handle(&id).await?;
    Ok(Json(json!({ "cancelled": handle.cancel_inflight() })))
}

async fn delete_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let handle = state.handle(&id).await?;
    handle.cancel_inflight();
    if let Ok(uuid) = Uuid::parse_str(&id) {
        state.sessions.write().await.remove(&uuid);
    }
    log::info!("Deleted session {}", id);
    Ok(StatusCode::NO_CONTENT)
}
