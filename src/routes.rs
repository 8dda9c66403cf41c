//! REST endpoints for the compose wizard and saved messages.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use tracing::{info, warn};

use crate::compose::{ComposeSession, SessionRegistry, run_generation};
use crate::error::{Error, GenerationError, PersistenceError, WizardError};
use crate::generation::GenerationGateway;
use crate::store::{MessageFilter, MessageStore, PersistedMessageId};
use crate::wizard::{StepData, StepId};

/// Shared state for compose routes.
#[derive(Clone)]
pub struct ComposeRouteState {
    pub sessions: Arc<SessionRegistry>,
    pub gateway: Arc<GenerationGateway>,
    pub store: Arc<dyn MessageStore>,
}

/// Build the compose REST routes.
pub fn compose_routes(state: ComposeRouteState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/compose/{user}", get(get_session))
        .route("/api/compose/{user}/steps", post(submit_step))
        .route("/api/compose/{user}/skip", post(skip_step))
        .route("/api/compose/{user}/back", post(go_back))
        .route("/api/compose/{user}/reset", post(reset_session))
        .route("/api/compose/{user}/generate", post(generate))
        .route("/api/compose/{user}/save", post(save))
        .route("/api/messages/{user}", get(list_messages))
        .route("/api/messages/{user}/{id}", get(get_message))
        .route("/api/messages/{user}/{id}/edit", post(edit_message))
        .with_state(state)
}

/// HTTP status for a domain error.
fn status_for(err: &Error) -> StatusCode {
    match err {
        Error::Wizard(WizardError::IncompleteStepData { .. }) => StatusCode::UNPROCESSABLE_ENTITY,
        Error::Wizard(_) => StatusCode::CONFLICT,
        Error::Assembly(_) => StatusCode::BAD_REQUEST,
        Error::Generation(GenerationError::InFlight) => StatusCode::CONFLICT,
        Error::Generation(GenerationError::Unavailable { .. }) => StatusCode::SERVICE_UNAVAILABLE,
        Error::Generation(GenerationError::TaskFailed(_)) => StatusCode::INTERNAL_SERVER_ERROR,
        Error::Persistence(PersistenceError::NotFound { .. }) => StatusCode::NOT_FOUND,
        Error::Persistence(PersistenceError::NothingToSave) => StatusCode::CONFLICT,
        Error::Persistence(_) | Error::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_response(err: impl Into<Error>) -> Response {
    let err = err.into();
    let status = status_for(&err);
    if status.is_server_error() {
        warn!(error = %err, "Compose request failed");
    }
    (status, Json(serde_json::json!({"error": err.to_string()}))).into_response()
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({"status": "ok", "service": "message-composer"}))
}

// ── Compose session ─────────────────────────────────────────────────

/// GET /api/compose/{user}
///
/// Users without a session see a fresh wizard; none is created.
async fn get_session(
    State(state): State<ComposeRouteState>,
    Path(user): Path<String>,
) -> Response {
    let status = match state.sessions.get(&user).await {
        Some(session) => session.lock().await.status(),
        None => ComposeSession::new(&user).status(),
    };
    Json(status).into_response()
}

/// POST /api/compose/{user}/steps
///
/// Body is one step's data, tagged by step. It must belong to the current
/// step.
async fn submit_step(
    State(state): State<ComposeRouteState>,
    Path(user): Path<String>,
    Json(data): Json<StepData>,
) -> Response {
    let session = state.sessions.get_or_create(&user).await;
    let mut session = session.lock().await;
    match session.advance(data.step_id(), data) {
        Ok(_) => Json(session.status()).into_response(),
        Err(e) => error_response(e),
    }
}

/// POST /api/compose/{user}/skip
async fn skip_step(
    State(state): State<ComposeRouteState>,
    Path(user): Path<String>,
) -> Response {
    let session = state.sessions.get_or_create(&user).await;
    let mut session = session.lock().await;
    match session.skip() {
        Ok(_) => Json(session.status()).into_response(),
        Err(e) => error_response(e),
    }
}

/// POST /api/compose/{user}/back
async fn go_back(
    State(state): State<ComposeRouteState>,
    Path(user): Path<String>,
) -> Response {
    let session = state.sessions.get_or_create(&user).await;
    let mut session = session.lock().await;
    match session.retreat() {
        Ok(_) => Json(session.status()).into_response(),
        Err(e) => error_response(e),
    }
}

/// POST /api/compose/{user}/reset
///
/// The session is dropped unless a generation is still running for it.
async fn reset_session(
    State(state): State<ComposeRouteState>,
    Path(user): Path<String>,
) -> Response {
    let Some(session) = state.sessions.get(&user).await else {
        return Json(ComposeSession::new(&user).status()).into_response();
    };
    let status = {
        let mut session = session.lock().await;
        session.reset();
        session.status()
    };
    state.sessions.remove_if_idle(&user).await;
    Json(status).into_response()
}

/// POST /api/compose/{user}/generate
///
/// Returns the generated message. 503 when both transports failed, 409 when
/// a generation is already running for this user.
async fn generate(
    State(state): State<ComposeRouteState>,
    Path(user): Path<String>,
) -> Response {
    let Some(session) = state.sessions.get(&user).await else {
        return error_response(WizardError::NotComplete {
            current: StepId::Recipient,
        });
    };
    match run_generation(session, state.gateway.clone()).await {
        Ok(result) => Json(result).into_response(),
        Err(e) => error_response(e),
    }
}

/// POST /api/compose/{user}/save
///
/// A successful save finishes the session and drops it.
async fn save(State(state): State<ComposeRouteState>, Path(user): Path<String>) -> Response {
    let Some(session) = state.sessions.get(&user).await else {
        return error_response(PersistenceError::NothingToSave);
    };
    let saved = session.lock().await.save(state.store.as_ref()).await;
    match saved {
        Ok(id) => {
            state.sessions.remove_if_idle(&user).await;
            (StatusCode::CREATED, Json(serde_json::json!({"id": id}))).into_response()
        }
        Err(e) => error_response(e),
    }
}

// ── Saved messages ──────────────────────────────────────────────────

/// GET /api/messages/{user}?category=&format=&intention=&limit=
async fn list_messages(
    State(state): State<ComposeRouteState>,
    Path(user): Path<String>,
    Query(filter): Query<MessageFilter>,
) -> Response {
    match state.store.list_messages(&user, &filter).await {
        Ok(messages) => Json(messages).into_response(),
        Err(e) => error_response(e),
    }
}

/// GET /api/messages/{user}/{id}
async fn get_message(
    State(state): State<ComposeRouteState>,
    Path((user, id)): Path<(String, String)>,
) -> Response {
    match state.store.get_message(&user, &PersistedMessageId(id.clone())).await {
        Ok(Some(message)) => Json(message).into_response(),
        Ok(None) => error_response(PersistenceError::NotFound { id }),
        Err(e) => error_response(e),
    }
}

/// POST /api/messages/{user}/{id}/edit
///
/// Loads a saved message's steps into the user's session so it can be
/// edited and generated again.
async fn edit_message(
    State(state): State<ComposeRouteState>,
    Path((user, id)): Path<(String, String)>,
) -> Response {
    let message = match state.store.get_message(&user, &PersistedMessageId(id.clone())).await {
        Ok(Some(message)) => message,
        Ok(None) => return error_response(PersistenceError::NotFound { id }),
        Err(e) => return error_response(e),
    };

    let session = state.sessions.get_or_create(&user).await;
    let mut session = session.lock().await;
    match session.restore(message.step_snapshot()) {
        Ok(_) => {
            info!(user_id = %user, id = %id, "Saved message loaded for editing");
            Json(session.status()).into_response()
        }
        Err(e) => error_response(e),
    }
}
