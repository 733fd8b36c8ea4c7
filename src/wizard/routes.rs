//! REST + WebSocket endpoints for the wizard.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{
        Path, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use secrecy::SecretString;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info, warn};

use crate::error::{Error, ServiceError, WizardError};
use crate::simulator::QUICK_TESTS;

use super::catalog;
use super::manager::{WizardEvent, WizardManager};
use super::model::{ProviderKind, StepOutput};
use super::steps::AgentType;

/// Shared state for wizard routes.
#[derive(Clone)]
pub struct WizardRouteState {
    pub manager: Arc<WizardManager>,
}

/// Build the wizard router.
pub fn wizard_routes(manager: Arc<WizardManager>) -> Router {
    let state = WizardRouteState { manager };

    Router::new()
        .route("/ws", get(ws_handler))
        .route("/health", get(health))
        .route("/api/catalog", get(get_catalog))
        .route("/api/wizard/status", get(get_status))
        .route("/api/wizard/agent-type", post(select_agent_type))
        .route("/api/wizard/quick-voice", post(quick_voice))
        .route("/api/wizard/advance", post(advance))
        .route("/api/wizard/retreat", post(retreat))
        .route("/api/wizard/jump/{index}", post(jump))
        .route("/api/wizard/reset", post(reset))
        .route("/api/wizard/steps/{index}/draft", get(get_draft))
        .route("/api/wizard/summary", get(get_summary))
        .route("/api/wizard/example-questions", get(example_questions))
        .route("/api/wizard/credentials/validate", post(validate_credential))
        .route("/api/wizard/sponsor/redeem", post(redeem_sponsor))
        .route("/api/wizard/deploy", post(deploy))
        .route("/api/wizard/simulator", get(get_transcript))
        .route("/api/wizard/simulator/messages", post(send_message))
        .route("/api/wizard/simulator/quick/{id}", post(run_quick_test))
        .route("/api/wizard/simulator/reset", post(reset_simulator))
        .with_state(state)
}

/// Map a wizard error onto an HTTP response.
fn error_response(error: Error) -> Response {
    let status = match &error {
        Error::Wizard(WizardError::Incomplete { step, errors }) => {
            return (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(json!({
                    "error": error.to_string(),
                    "step": step,
                    "fields": errors,
                })),
            )
                .into_response();
        }
        Error::Wizard(WizardError::AgentTypeNotSelected) => StatusCode::BAD_REQUEST,
        Error::Wizard(WizardError::NotReadyToDeploy { step, missing }) => {
            return (
                StatusCode::CONFLICT,
                Json(json!({
                    "error": error.to_string(),
                    "step": step,
                    "missing": missing,
                })),
            )
                .into_response();
        }
        Error::Wizard(WizardError::StepMismatch { .. } | WizardError::ActivationRequired) => {
            StatusCode::CONFLICT
        }
        Error::Service(ServiceError::InvalidInput(_)) => StatusCode::BAD_REQUEST,
        Error::Service(ServiceError::ValidationUnavailable { .. }) => StatusCode::SERVICE_UNAVAILABLE,
        Error::Service(_) => StatusCode::BAD_GATEWAY,
        Error::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(json!({"error": error.to_string()}))).into_response()
}

// ── Health ──────────────────────────────────────────────────────────────

async fn health() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": "vet-agent-wizard"
    }))
}

async fn get_catalog() -> impl IntoResponse {
    Json(catalog::catalog())
}

// ── WebSocket ───────────────────────────────────────────────────────────

/// Actions a WS client can send.
#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
enum WizardAction {
    Submit { output: StepOutput },
    Retreat,
    Jump { index: usize },
    Reset,
    Simulate { text: String },
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<WizardRouteState>) -> impl IntoResponse {
    info!("WebSocket client connecting");
    ws.on_upgrade(|socket| handle_socket(socket, state.manager))
}

async fn send_event(socket: &mut WebSocket, event: &WizardEvent) -> bool {
    match serde_json::to_string(event) {
        Ok(json) => socket.send(Message::Text(json.into())).await.is_ok(),
        Err(e) => {
            warn!(error = %e, "Failed to serialize wizard event");
            true
        }
    }
}

async fn handle_socket(mut socket: WebSocket, manager: Arc<WizardManager>) {
    info!("WebSocket client connected");

    // Subscribe first so nothing between sync and loop is missed
    let mut rx = manager.subscribe();

    let sync = WizardEvent::Status {
        status: manager.status().await,
    };
    if !send_event(&mut socket, &sync).await {
        warn!("Failed to send initial sync, client disconnected");
        return;
    }

    loop {
        tokio::select! {
            result = rx.recv() => {
                match result {
                    Ok(event) => {
                        if !send_event(&mut socket, &event).await {
                            debug!("Client disconnected during send");
                            break;
                        }
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                        warn!(missed = n, "WS client lagged behind broadcast");
                        let sync = WizardEvent::Status { status: manager.status().await };
                        if !send_event(&mut socket, &sync).await {
                            break;
                        }
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => {
                        debug!("Broadcast channel closed");
                        break;
                    }
                }
            }

            result = socket.recv() => {
                match result {
                    Some(Ok(Message::Text(text))) => {
                        if let Some(rejection) = handle_client_message(&text, &manager).await {
                            if !send_event(&mut socket, &rejection).await {
                                break;
                            }
                        }
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if socket.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        info!("WebSocket client disconnected");
                        break;
                    }
                    Some(Err(e)) => {
                        warn!(error = %e, "WebSocket error");
                        break;
                    }
                    _ => {}
                }
            }
        }
    }

    info!("WebSocket connection closed");
}

impl WizardAction {
    fn name(&self) -> &'static str {
        match self {
            Self::Submit { .. } => "submit",
            Self::Retreat => "retreat",
            Self::Jump { .. } => "jump",
            Self::Reset => "reset",
            Self::Simulate { .. } => "simulate",
        }
    }
}

/// Run a client action. Results reach every client through the broadcast;
/// a refusal is returned for the sender alone.
async fn handle_client_message(text: &str, manager: &WizardManager) -> Option<WizardEvent> {
    let action = match serde_json::from_str::<WizardAction>(text) {
        Ok(action) => action,
        Err(e) => {
            debug!(error = %e, text = text, "Unrecognized WS message from client");
            return Some(WizardEvent::Rejected {
                action: "unknown".to_string(),
                step: None,
                error: format!("Unrecognized action: {e}"),
                fields: None,
            });
        }
    };
    let name = action.name();

    let result = match action {
        WizardAction::Submit { output } => {
            let step = output.step();
            manager.submit(output).await.map(|_| ()).inspect_err(|e| {
                warn!(step = %step, error = %e, "Submit via WS rejected");
            })
        }
        WizardAction::Retreat => {
            manager.retreat().await;
            Ok(())
        }
        WizardAction::Jump { index } => {
            manager.jump_to(index).await;
            Ok(())
        }
        WizardAction::Reset => {
            manager.reset().await;
            Ok(())
        }
        WizardAction::Simulate { text } => manager
            .simulate(&text)
            .await
            .map(|_| ())
            .inspect_err(|e| debug!(error = %e, "Simulator message via WS rejected")),
    };

    result.err().map(|e| WizardEvent::rejected(name, &e))
}

// ── Wizard navigation ───────────────────────────────────────────────────

async fn get_status(State(state): State<WizardRouteState>) -> impl IntoResponse {
    Json(state.manager.status().await)
}

#[derive(Deserialize)]
struct AgentTypeRequest {
    agent_type: AgentType,
}

async fn select_agent_type(
    State(state): State<WizardRouteState>,
    Json(body): Json<AgentTypeRequest>,
) -> impl IntoResponse {
    Json(state.manager.select_agent_type(body.agent_type).await)
}

#[derive(Deserialize)]
struct QuickVoiceRequest {
    description: String,
}

async fn quick_voice(
    State(state): State<WizardRouteState>,
    Json(body): Json<QuickVoiceRequest>,
) -> Response {
    match state.manager.quick_voice_agent(&body.description).await {
        Ok(status) => (StatusCode::OK, Json(json!(status))).into_response(),
        Err(e) => error_response(e),
    }
}

async fn advance(State(state): State<WizardRouteState>, Json(output): Json<StepOutput>) -> Response {
    match state.manager.submit(output).await {
        Ok(status) => (StatusCode::OK, Json(json!(status))).into_response(),
        Err(e) => error_response(e),
    }
}

async fn retreat(State(state): State<WizardRouteState>) -> impl IntoResponse {
    Json(state.manager.retreat().await)
}

async fn jump(State(state): State<WizardRouteState>, Path(index): Path<usize>) -> impl IntoResponse {
    Json(state.manager.jump_to(index).await)
}

async fn reset(State(state): State<WizardRouteState>) -> impl IntoResponse {
    Json(state.manager.reset().await)
}

async fn get_draft(State(state): State<WizardRouteState>, Path(index): Path<usize>) -> Response {
    match state.manager.draft(index).await {
        Some(draft) => (StatusCode::OK, Json(json!({"index": index, "draft": draft}))).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({"error": "No draft for this step"})),
        )
            .into_response(),
    }
}

async fn get_summary(State(state): State<WizardRouteState>) -> Response {
    match state.manager.summary().await {
        Some(summary) => {
            let markdown = summary.to_markdown();
            (
                StatusCode::OK,
                Json(json!({"summary": summary, "markdown": markdown})),
            )
                .into_response()
        }
        None => error_response(WizardError::AgentTypeNotSelected.into()),
    }
}

async fn example_questions(State(state): State<WizardRouteState>) -> impl IntoResponse {
    Json(json!({"questions": state.manager.example_questions().await}))
}

// ── Service checks ──────────────────────────────────────────────────────

#[derive(Deserialize)]
struct CredentialRequest {
    provider: ProviderKind,
    api_key: String,
}

async fn validate_credential(
    State(state): State<WizardRouteState>,
    Json(body): Json<CredentialRequest>,
) -> Response {
    let key = SecretString::from(body.api_key);
    match state.manager.validate_credential(body.provider, &key).await {
        Ok(valid) => (
            StatusCode::OK,
            Json(json!({"provider": body.provider, "valid": valid})),
        )
            .into_response(),
        Err(e) => error_response(e),
    }
}

#[derive(Deserialize)]
struct SponsorRequest {
    code: String,
}

async fn redeem_sponsor(
    State(state): State<WizardRouteState>,
    Json(body): Json<SponsorRequest>,
) -> Response {
    match state.manager.redeem_sponsor_code(&body.code).await {
        Ok(redemption) => (StatusCode::OK, Json(json!(redemption))).into_response(),
        Err(e) => error_response(e),
    }
}

async fn deploy(State(state): State<WizardRouteState>) -> Response {
    match state.manager.deploy().await {
        Ok(receipt) => (StatusCode::CREATED, Json(json!(receipt))).into_response(),
        Err(e) => error_response(e),
    }
}

// ── Simulator ───────────────────────────────────────────────────────────

async fn get_transcript(State(state): State<WizardRouteState>) -> impl IntoResponse {
    Json(json!({
        "messages": state.manager.transcript().await,
        "quick_tests": QUICK_TESTS,
    }))
}

#[derive(Deserialize)]
struct MessageRequest {
    text: String,
}

async fn send_message(
    State(state): State<WizardRouteState>,
    Json(body): Json<MessageRequest>,
) -> Response {
    match state.manager.simulate(&body.text).await {
        Ok(reply) => (StatusCode::OK, Json(json!({"reply": reply}))).into_response(),
        Err(e) => error_response(e),
    }
}

async fn run_quick_test(State(state): State<WizardRouteState>, Path(id): Path<String>) -> Response {
    match state.manager.quick_test(&id).await {
        Ok(reply) => (StatusCode::OK, Json(json!({"reply": reply}))).into_response(),
        Err(e) => error_response(e),
    }
}

async fn reset_simulator(State(state): State<WizardRouteState>) -> impl IntoResponse {
    Json(json!({"messages": state.manager.reset_simulator().await}))
}
