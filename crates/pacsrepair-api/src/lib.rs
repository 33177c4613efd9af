//! HTTP surface for pacsrepair
//!
//! Every response body is tagged: `{"status": "ok", "data": ...}` or
//! `{"status": "err", "error": "..."}`.

#![forbid(unsafe_code)]

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use pacsrepair::envelope::{REPAIRED_FILE_NAME, XML_CONTENT_TYPE};
use pacsrepair::repair::find_missing_fields;
use pacsrepair::xml::to_pretty_string;
use pacsrepair::{
    AddressServiceClient, ConsistencyChecker, ConsistencyConfig, CorrelationError, EditError,
    Envelope, EnvelopeConfig, RepairConfig, RepairOptions, ServiceError, Session,
};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use uuid::Uuid;

/// Shared server state. Sessions live only as long as the process.
pub struct AppState {
    sessions: Mutex<HashMap<Uuid, Session>>,
    checker: ConsistencyChecker,
    repair_config: RepairConfig,
    envelope_config: EnvelopeConfig,
    address_service: Option<AddressServiceClient>,
}

impl AppState {
    pub fn new(address_service: Option<AddressServiceClient>) -> Result<Self, String> {
        let checker = ConsistencyChecker::new(ConsistencyConfig::default())
            .map_err(|err| err.to_string())?;
        Ok(Self {
            sessions: Mutex::new(HashMap::new()),
            checker,
            repair_config: RepairConfig::default(),
            envelope_config: EnvelopeConfig::default(),
            address_service,
        })
    }

    pub fn with_repair_config(mut self, config: RepairConfig) -> Self {
        self.repair_config = config;
        self
    }

    pub fn session_count(&self) -> usize {
        self.sessions.lock().len()
    }
}

#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ApiResponse {
    Ok { data: Value },
    Err { error: String },
}

type ApiResult = (StatusCode, Json<ApiResponse>);

fn ok(data: Value) -> ApiResult {
    (StatusCode::OK, Json(ApiResponse::Ok { data }))
}

fn err(status: StatusCode, error: impl ToString) -> ApiResult {
    let error = error.to_string();
    warn!(%status, %error, "request failed");
    (status, Json(ApiResponse::Err { error }))
}

fn to_value<T: Serialize>(value: &T) -> Result<Value, ApiResult> {
    serde_json::to_value(value).map_err(|e| err(StatusCode::INTERNAL_SERVER_ERROR, e))
}

#[derive(Debug, Deserialize)]
struct DocumentRequest {
    content: String,
}

#[derive(Debug, Deserialize)]
struct RepairRequest {
    content: String,
    #[serde(default)]
    options: RepairOptions,
    /// Overrides the server's placeholder values
    #[serde(default)]
    config: Option<RepairConfig>,
    #[serde(default)]
    envelope: bool,
}

#[derive(Debug, Deserialize)]
struct EnvelopeRequest {
    header: String,
    body: String,
}

#[derive(Debug, Deserialize)]
struct CheckRequest {
    mt103: String,
    pacs008: String,
}

#[derive(Debug, Deserialize)]
struct SessionRequest {
    content: String,
    actor: String,
    #[serde(default = "default_role")]
    role: String,
}

fn default_role() -> String {
    "Analyst".to_string()
}

#[derive(Debug, Deserialize)]
struct EditRequest {
    field: String,
    value: String,
    #[serde(default)]
    justification: String,
}

#[derive(Debug, Deserialize)]
struct RevertRequest {
    field: String,
}

#[derive(Debug, Deserialize)]
struct AddressRequest {
    fragment: String,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/detect", post(detect))
        .route("/api/repair", post(repair))
        .route("/api/envelope", post(envelope))
        .route("/api/check", post(check))
        .route("/api/sessions", post(create_session))
        .route("/api/sessions/{id}", get(get_session).delete(close_session))
        .route("/api/sessions/{id}/edits", post(edit_session))
        .route("/api/sessions/{id}/revert", post(revert_session))
        .route("/api/sessions/{id}/audit", get(session_audit))
        .route("/api/address/structure", post(structure_address))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({"status": "ok"}))
}

async fn detect(Json(payload): Json<DocumentRequest>) -> ApiResult {
    let doc = match pacsrepair::parse(&payload.content) {
        Ok(doc) => doc,
        Err(e) => return err(StatusCode::BAD_REQUEST, e),
    };
    let issues: Vec<&str> = find_missing_fields(&doc)
        .into_iter()
        .map(|issue| issue.message())
        .collect();
    ok(json!({ "issues": issues }))
}

async fn repair(State(state): State<Arc<AppState>>, Json(payload): Json<RepairRequest>) -> ApiResult {
    let mut doc = match pacsrepair::parse(&payload.content) {
        Ok(doc) => doc,
        Err(e) => return err(StatusCode::BAD_REQUEST, e),
    };
    let config = payload.config.as_ref().unwrap_or(&state.repair_config);
    let outcome = pacsrepair::repair(&mut doc, &payload.options, config);

    let content = if payload.envelope {
        match Envelope::from_document(&doc, &state.envelope_config) {
            Ok(envelope) => envelope.to_xml(),
            Err(e) => return err(StatusCode::UNPROCESSABLE_ENTITY, e),
        }
    } else {
        to_pretty_string(&doc)
    };
    info!(applied = outcome.report.applied.len(), "message repaired");

    let outcome = match to_value(&outcome) {
        Ok(value) => value,
        Err(response) => return response,
    };
    ok(json!({
        "content": content,
        "file_name": REPAIRED_FILE_NAME,
        "content_type": XML_CONTENT_TYPE,
        "outcome": outcome,
    }))
}

async fn envelope(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<EnvelopeRequest>,
) -> ApiResult {
    match pacsrepair::build_envelope(&payload.header, &payload.body, &state.envelope_config) {
        Ok(content) => ok(json!({
            "content": content,
            "content_type": XML_CONTENT_TYPE,
        })),
        Err(e) => err(StatusCode::BAD_REQUEST, e),
    }
}

async fn check(State(state): State<Arc<AppState>>, Json(payload): Json<CheckRequest>) -> ApiResult {
    match state.checker.check(&payload.mt103, &payload.pacs008) {
        Ok(report) => {
            let compliant = report.travel_rule_compliant();
            match to_value(&report) {
                Ok(mut value) => {
                    if let Some(object) = value.as_object_mut() {
                        object.insert("travel_rule_compliant".to_string(), json!(compliant));
                    }
                    ok(value)
                }
                Err(response) => response,
            }
        }
        Err(e @ CorrelationError::Parse(_)) => err(StatusCode::BAD_REQUEST, e),
        Err(e) => err(StatusCode::UNPROCESSABLE_ENTITY, e),
    }
}

fn session_view(session: &Session) -> Value {
    json!({
        "id": session.id(),
        "actor": session.actor(),
        "role": session.role(),
        "editable_fields": session.editable_fields(),
        "content": to_pretty_string(session.document()),
        "audit_entries": session.audit().len(),
    })
}

async fn create_session(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<SessionRequest>,
) -> ApiResult {
    let doc = match pacsrepair::parse(&payload.content) {
        Ok(doc) => doc,
        Err(e) => return err(StatusCode::BAD_REQUEST, e),
    };
    let session = Session::new(doc, payload.actor, payload.role);
    let view = session_view(&session);
    info!(session = %session.id(), "session opened");
    state.sessions.lock().insert(session.id(), session);
    (StatusCode::CREATED, Json(ApiResponse::Ok { data: view }))
}

fn session_not_found(id: Uuid) -> ApiResult {
    err(StatusCode::NOT_FOUND, format!("no session {id}"))
}

fn edit_status(error: &EditError) -> StatusCode {
    match error {
        EditError::NotEditable { .. } => StatusCode::FORBIDDEN,
        EditError::MissingAncestor { .. } | EditError::NothingToRevert { .. } => {
            StatusCode::CONFLICT
        }
    }
}

async fn get_session(State(state): State<Arc<AppState>>, Path(id): Path<Uuid>) -> ApiResult {
    match state.sessions.lock().get(&id) {
        Some(session) => ok(session_view(session)),
        None => session_not_found(id),
    }
}

/// Drop the session and hand back its final audit log
async fn close_session(State(state): State<Arc<AppState>>, Path(id): Path<Uuid>) -> ApiResult {
    let Some(session) = state.sessions.lock().remove(&id) else {
        return session_not_found(id);
    };
    info!(session = %id, entries = session.audit().len(), "session closed");
    match to_value(session.audit()) {
        Ok(audit) => ok(audit),
        Err(response) => response,
    }
}

async fn edit_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<EditRequest>,
) -> ApiResult {
    let mut sessions = state.sessions.lock();
    let Some(session) = sessions.get_mut(&id) else {
        return session_not_found(id);
    };
    let entry = match session.edit_field(&payload.field, &payload.value, &payload.justification) {
        Ok(entry) => entry,
        Err(e) => return err(edit_status(&e), e),
    };
    match to_value(&entry) {
        Ok(entry) => ok(json!({ "entry": entry, "session": session_view(session) })),
        Err(response) => response,
    }
}

async fn revert_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<RevertRequest>,
) -> ApiResult {
    let mut sessions = state.sessions.lock();
    let Some(session) = sessions.get_mut(&id) else {
        return session_not_found(id);
    };
    let entry = match session.revert_last(&payload.field) {
        Ok(entry) => entry,
        Err(e) => return err(edit_status(&e), e),
    };
    match to_value(&entry) {
        Ok(entry) => ok(json!({ "entry": entry, "session": session_view(session) })),
        Err(response) => response,
    }
}

async fn session_audit(State(state): State<Arc<AppState>>, Path(id): Path<Uuid>) -> ApiResult {
    let sessions = state.sessions.lock();
    let Some(session) = sessions.get(&id) else {
        return session_not_found(id);
    };
    match to_value(session.audit()) {
        Ok(audit) => ok(audit),
        Err(response) => response,
    }
}

async fn structure_address(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<AddressRequest>,
) -> ApiResult {
    let Some(client) = state.address_service.as_ref() else {
        return err(
            StatusCode::SERVICE_UNAVAILABLE,
            "address service not configured",
        );
    };
    match client.structure(&payload.fragment).await {
        Ok(suggestion) => match to_value(&suggestion) {
            Ok(value) => ok(value),
            Err(response) => response,
        },
        Err(e @ ServiceError::Status { .. }) => err(StatusCode::BAD_GATEWAY, e),
        Err(e @ ServiceError::InvalidResponse(_)) => err(StatusCode::BAD_GATEWAY, e),
        Err(e @ ServiceError::Transport(_)) => err(StatusCode::GATEWAY_TIMEOUT, e),
    }
}
