//! HTTP handlers of the host API.

use std::collections::HashMap;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use uuid::Uuid;

use hookgate_core::error::AppError;
use hookgate_plugin::{EventType, HookPayload, HookResult, LifecycleState, hook_payload};

use crate::error::ApiError;
use crate::state::AppState;

/// Signup request body.
#[derive(Debug, Clone, Deserialize)]
pub struct SignupRequest {
    /// Email address of the new account.
    pub email: String,
    /// Optional display name.
    #[serde(default)]
    pub username: Option<String>,
}

/// Signup response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignupResponse {
    /// Accepted email address.
    pub email: String,
    /// Account ID assigned by the host.
    pub user_id: Uuid,
}

/// Event request body.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventRequest {
    /// Actor raising the event.
    #[serde(default)]
    pub actor_id: Option<Uuid>,
    /// Event data handed to handlers as-is.
    #[serde(default)]
    pub data: HashMap<String, Value>,
}

/// Aggregate outcome of a raised event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventResponse {
    /// Event name.
    pub event: EventType,
    /// Numeric event code.
    pub code: u16,
    /// Aggregate hook result.
    pub result: HookResult,
}

/// Health response body.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Always "ok" when the process serves requests.
    pub status: String,
    /// Host version.
    pub version: String,
    /// Hook context state.
    pub hooks: LifecycleState,
    /// Web-application context state.
    pub webapps: LifecycleState,
}

/// POST /api/signup
///
/// Hook plugins may veto the signup; a veto is a 403 naming the event only.
pub async fn signup(
    State(state): State<AppState>,
    Json(req): Json<SignupRequest>,
) -> Result<(StatusCode, Json<SignupResponse>), ApiError> {
    let email = req.email.trim();
    if email.is_empty() || !email.contains('@') {
        return Err(AppError::validation("A valid email address is required").into());
    }

    let payload = hook_payload!({
        "email" => json!(email),
        "username" => json!(req.username),
    });
    state
        .hooks
        .ensure_allowed(EventType::UserSignup, &payload)
        .await?;

    let user_id = Uuid::new_v4();
    tracing::info!(user_id = %user_id, "Signup accepted");

    Ok((
        StatusCode::CREATED,
        Json(SignupResponse {
            email: email.to_string(),
            user_id,
        }),
    ))
}

/// POST /api/events/{event}
///
/// Raises any event type and reports the aggregate result without acting on it.
pub async fn raise_event(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(req): Json<EventRequest>,
) -> Result<Json<EventResponse>, ApiError> {
    let event: EventType = name.parse().map_err(AppError::not_found)?;

    let mut payload = HookPayload::new();
    payload.data = req.data;
    payload.actor_id = req.actor_id;

    let result = state.hooks.dispatch(event, &payload).await?;
    tracing::debug!(event = %event, result = %result, "Event raised");

    Ok(Json(EventResponse {
        event,
        code: event.code(),
        result,
    }))
}

/// GET /api/plugins
pub async fn list_plugins(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let prefixes: Vec<String> = state
        .webapps
        .enumerate()?
        .map(|mount| mount.prefix.clone())
        .collect();

    let handlers: HashMap<EventType, usize> = EventType::ALL
        .into_iter()
        .map(|event| (event, state.hooks.handler_count(event)))
        .filter(|(_, count)| *count > 0)
        .collect();

    Ok(Json(json!({
        "hooks": state.hooks.plugin_names(),
        "handlers": handlers,
        "webapps": prefixes,
    })))
}

/// GET /api/health
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        hooks: state.hooks.state(),
        webapps: state.webapps.state(),
    })
}
