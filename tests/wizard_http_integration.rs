//! Integration tests for the wizard REST + WebSocket API.
//!
//! Each test spins up an Axum server on a random port and drives it with
//! reqwest and tokio-tungstenite, the way a front-end would.

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use reqwest::StatusCode;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::time::timeout;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

use vet_agent_wizard::config::WizardConfig;
use vet_agent_wizard::wizard::{WizardManager, WizardServices, wizard_routes};

/// Maximum time any test is allowed to run before we consider it hung.
const TEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Start an Axum server on a random port, return (base url, manager).
async fn start_server() -> (String, Arc<WizardManager>) {
    let config = WizardConfig::without_delays();
    let manager = Arc::new(WizardManager::new(&config, WizardServices::stubs(&config)));
    let app = wizard_routes(Arc::clone(&manager));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    // Give the server a moment to start accepting connections.
    tokio::time::sleep(Duration::from_millis(50)).await;

    (format!("127.0.0.1:{port}"), manager)
}

async fn post(client: &reqwest::Client, addr: &str, path: &str, body: Value) -> (StatusCode, Value) {
    let resp = client
        .post(format!("http://{addr}{path}"))
        .json(&body)
        .send()
        .await
        .unwrap();
    let status = resp.status();
    (status, resp.json().await.unwrap())
}

async fn get(client: &reqwest::Client, addr: &str, path: &str) -> (StatusCode, Value) {
    let resp = client.get(format!("http://{addr}{path}")).send().await.unwrap();
    let status = resp.status();
    (status, resp.json().await.unwrap())
}

/// Parse a WS text frame into a serde_json::Value.
fn parse_ws_json(msg: &Message) -> Value {
    match msg {
        Message::Text(txt) => serde_json::from_str(txt).expect("invalid JSON from server"),
        other => panic!("expected Text frame, got {:?}", other),
    }
}

/// Read frames until one of the given event type arrives.
async fn next_event<S>(ws: &mut S, event_type: &str) -> Value
where
    S: futures_util::Stream<Item = Result<Message, tokio_tungstenite::tungstenite::Error>> + Unpin,
{
    loop {
        let msg = ws.next().await.unwrap().unwrap();
        let json = parse_ws_json(&msg);
        if json["type"] == event_type {
            return json;
        }
    }
}

// ── REST Tests ───────────────────────────────────────────────────────

#[tokio::test]
async fn health_endpoint() {
    timeout(TEST_TIMEOUT, async {
        let (addr, _manager) = start_server().await;
        let client = reqwest::Client::new();

        let (status, body) = get(&client, &addr, "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn whatsapp_flow_to_deploy() {
    timeout(TEST_TIMEOUT, async {
        let (addr, _manager) = start_server().await;
        let client = reqwest::Client::new();

        let (status, body) = post(&client, &addr, "/api/wizard/agent-type", json!({"agent_type": "whatsapp"})).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["step"], "objective");
        assert_eq!(body["total_steps"], 6);

        let outputs = [
            json!({"step": "objective", "objective": "appointment", "clinic_type": "emergency"}),
            json!({"step": "knowledge", "input": {"type": "text", "content": "Abrimos de lunes a sábado de 9 a 19 h."}}),
            json!({"step": "brands", "brands": ["hills", "royal-canin"]}),
            json!({"step": "behavior", "greeting": "¡Hola! Bienvenido a Clínica Patitas", "tone": "friendly"}),
            json!({"step": "simulator"}),
        ];
        for output in outputs {
            let (status, body) = post(&client, &addr, "/api/wizard/advance", output.clone()).await;
            assert_eq!(status, StatusCode::OK, "{output} rejected: {body}");
        }

        let (_, body) = get(&client, &addr, "/api/wizard/status").await;
        assert_eq!(body["step"], "deploy");
        assert_eq!(body["is_terminal"], true);
        assert!(body["missing_steps"].as_array().unwrap().is_empty());
        assert!(body["config"]["knowledge"]["descriptor"]["id"].is_string());

        let (status, body) = get(&client, &addr, "/api/wizard/summary").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["summary"]["agent_type"], "whatsapp");
        assert!(body["markdown"].as_str().unwrap().contains("2 marcas seleccionadas"));

        let (status, body) = post(&client, &addr, "/api/wizard/deploy", json!({})).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["agent_type"], "whatsapp");
        assert!(body["message"].as_str().unwrap().contains("WhatsApp"));
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn advance_errors_map_to_status_codes() {
    timeout(TEST_TIMEOUT, async {
        let (addr, _manager) = start_server().await;
        let client = reqwest::Client::new();

        // No agent type yet
        let (status, _) = post(&client, &addr, "/api/wizard/advance", json!({"step": "brands", "brands": []})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        post(&client, &addr, "/api/wizard/agent-type", json!({"agent_type": "whatsapp"})).await;

        // Output for the wrong step
        let (status, _) = post(&client, &addr, "/api/wizard/advance", json!({"step": "brands", "brands": []})).await;
        assert_eq!(status, StatusCode::CONFLICT);

        post(&client, &addr, "/api/wizard/advance", json!({"step": "objective", "objective": "sales"})).await;

        // Blank knowledge
        let (status, body) = post(
            &client,
            &addr,
            "/api/wizard/advance",
            json!({"step": "knowledge", "input": {"type": "text", "content": "  "}}),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["step"], "knowledge");
        assert_eq!(body["fields"][0]["field"], "content");

        // Deploy too early
        let (status, body) = post(&client, &addr, "/api/wizard/deploy", json!({})).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["step"], "knowledge");
        assert!(!body["missing"].as_array().unwrap().is_empty());

        let (_, body) = get(&client, &addr, "/api/wizard/status").await;
        assert_eq!(body["current_step"], 1);
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn jump_retreat_and_reset() {
    timeout(TEST_TIMEOUT, async {
        let (addr, _manager) = start_server().await;
        let client = reqwest::Client::new();

        post(&client, &addr, "/api/wizard/agent-type", json!({"agent_type": "whatsapp"})).await;

        let (_, body) = post(&client, &addr, "/api/wizard/jump/99", json!({})).await;
        assert_eq!(body["current_step"], 5, "jump clamps to the last step");

        let (_, body) = post(&client, &addr, "/api/wizard/retreat", json!({})).await;
        assert_eq!(body["current_step"], 4);
        assert_eq!(body["indicator"][4]["status"], "current");

        let (_, body) = post(&client, &addr, "/api/wizard/reset", json!({})).await;
        assert!(body["agent_type"].is_null());
        assert_eq!(body["current_step"], 0);
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn voice_flow_with_sponsor_code() {
    timeout(TEST_TIMEOUT, async {
        let (addr, _manager) = start_server().await;
        let client = reqwest::Client::new();

        let (status, body) = post(
            &client,
            &addr,
            "/api/wizard/quick-voice",
            json!({"description": "Quiero que agende citas y resuelva dudas sobre horarios"}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["step"], "voice_knowledge");

        // Pre-filled knowledge step
        let (status, body) = get(&client, &addr, "/api/wizard/steps/1/draft").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["draft"]["step"], "voice_knowledge");
        post(&client, &addr, "/api/wizard/advance", body["draft"].clone()).await;

        let (status, body) = post(
            &client,
            &addr,
            "/api/wizard/credentials/validate",
            json!({"provider": "llm", "api_key": "sk-1234567890abcdef"}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["valid"], true);

        let (status, body) = post(
            &client,
            &addr,
            "/api/wizard/advance",
            json!({
                "step": "voice_providers",
                "llm": {"api_key": "sk-1234567890abcdef", "validated": true},
                "tts": {"api_key": "el-1234567890abcdef"},
                "stt": {"api_key": "dg-1234567890abcdef"},
            }),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(body["config"]["voice_providers"]["llm"]["api_key"], "********");
        assert_eq!(body["config"]["voice_providers"]["tts"]["validated"], true);

        let (status, body) = post(
            &client,
            &addr,
            "/api/wizard/advance",
            json!({
                "step": "voice_settings",
                "agent_name": "Luna",
                "tts_provider": "elevenlabs",
                "voice_type": "empathetic",
                "stt_provider": "deepgram",
            }),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{body}");

        let (_, body) = get(&client, &addr, "/api/wizard/steps/4/draft").await;
        assert_eq!(body["draft"]["mode"], "generated");
        let (status, body) = post(&client, &addr, "/api/wizard/advance", body["draft"].clone()).await;
        assert_eq!(status, StatusCode::OK, "{body}");

        let (status, body) = post(
            &client,
            &addr,
            "/api/wizard/advance",
            json!({"step": "voice_phone", "number": {"option": "later"}}),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(body["step"], "voice_activation");

        let (status, body) = post(&client, &addr, "/api/wizard/sponsor/redeem", json!({"code": "HILLS2024"})).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["valid"], true);

        let (status, _) = post(
            &client,
            &addr,
            "/api/wizard/advance",
            json!({"step": "voice_activation", "method": {"type": "sponsor", "code": "nope"}}),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

        let (status, body) = post(
            &client,
            &addr,
            "/api/wizard/advance",
            json!({"step": "voice_activation", "method": {"type": "sponsor", "code": "hills2024"}}),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(body["config"]["voice_activation"]["grant"]["duration_months"], 6);

        let (status, body) = post(&client, &addr, "/api/wizard/deploy", json!({})).await;
        assert_eq!(status, StatusCode::CREATED);
        assert!(body["message"].as_str().unwrap().contains("Hill's"));
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn simulator_quick_test_and_reset() {
    timeout(TEST_TIMEOUT, async {
        let (addr, _manager) = start_server().await;
        let client = reqwest::Client::new();

        post(&client, &addr, "/api/wizard/agent-type", json!({"agent_type": "whatsapp"})).await;

        let (status, body) = get(&client, &addr, "/api/wizard/simulator").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["quick_tests"].as_array().unwrap().len(), 3);

        let (status, body) = post(&client, &addr, "/api/wizard/simulator/quick/appointment", json!({})).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["reply"]["sender"], "agent");

        let (status, _) = post(&client, &addr, "/api/wizard/simulator/quick/unknown", json!({})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (_, body) = get(&client, &addr, "/api/wizard/simulator").await;
        assert_eq!(body["messages"].as_array().unwrap().len(), 2);

        let (_, body) = post(&client, &addr, "/api/wizard/simulator/reset", json!({})).await;
        assert!(body["messages"].as_array().unwrap().is_empty());
    })
    .await
    .expect("test timed out");
}

// ── WebSocket Tests ──────────────────────────────────────────────────

#[tokio::test]
async fn ws_connect_receives_status_sync() {
    timeout(TEST_TIMEOUT, async {
        let (addr, _manager) = start_server().await;

        let (mut ws, _resp) = connect_async(format!("ws://{addr}/ws"))
            .await
            .expect("WS connect failed");

        let msg = ws.next().await.unwrap().unwrap();
        let json = parse_ws_json(&msg);

        assert_eq!(json["type"], "status");
        assert!(json["status"]["agent_type"].is_null());
        assert_eq!(json["status"]["current_step"], 0);
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn ws_receives_broadcast_after_rest_change() {
    timeout(TEST_TIMEOUT, async {
        let (addr, manager) = start_server().await;

        let (mut ws, _) = connect_async(format!("ws://{addr}/ws")).await.unwrap();

        // Consume the initial sync.
        let _ = ws.next().await.unwrap().unwrap();

        manager
            .select_agent_type(vet_agent_wizard::wizard::AgentType::Voice)
            .await;

        let json = next_event(&mut ws, "status").await;
        assert_eq!(json["status"]["agent_type"], "voice");
        assert_eq!(json["status"]["step"], "voice_objectives");
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn ws_submit_action_advances() {
    timeout(TEST_TIMEOUT, async {
        let (addr, manager) = start_server().await;
        manager
            .select_agent_type(vet_agent_wizard::wizard::AgentType::Whatsapp)
            .await;

        let (mut ws, _) = connect_async(format!("ws://{addr}/ws")).await.unwrap();
        let _ = ws.next().await.unwrap().unwrap();

        let action = json!({
            "action": "submit",
            "output": {"step": "objective", "objective": "comprehensive"},
        });
        ws.send(Message::Text(action.to_string().into())).await.unwrap();

        let json = next_event(&mut ws, "step_completed").await;
        assert_eq!(json["step"], "objective");

        let json = next_event(&mut ws, "status").await;
        assert_eq!(json["status"]["current_step"], 1);
        assert_eq!(manager.status().await.current_step, 1);
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn ws_simulate_action_streams_typing_and_reply() {
    timeout(TEST_TIMEOUT, async {
        let (addr, _manager) = start_server().await;

        let (mut ws, _) = connect_async(format!("ws://{addr}/ws")).await.unwrap();
        let _ = ws.next().await.unwrap().unwrap();

        let action = json!({"action": "simulate", "text": "¿Tienen alimento para cachorros?"});
        ws.send(Message::Text(action.to_string().into())).await.unwrap();

        let json = next_event(&mut ws, "simulator_message").await;
        assert_eq!(json["message"]["sender"], "user");

        let json = next_event(&mut ws, "simulator_typing").await;
        assert_eq!(json["typing"], true);

        let json = next_event(&mut ws, "simulator_message").await;
        assert_eq!(json["message"]["sender"], "agent");
        assert!(json["message"]["text"].as_str().unwrap().contains("alimento"));
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn ws_incomplete_submit_returns_field_errors() {
    timeout(TEST_TIMEOUT, async {
        let (addr, manager) = start_server().await;
        manager
            .select_agent_type(vet_agent_wizard::wizard::AgentType::Voice)
            .await;

        let (mut ws, _) = connect_async(format!("ws://{addr}/ws")).await.unwrap();
        let _ = ws.next().await.unwrap().unwrap();

        let action = json!({
            "action": "submit",
            "output": {"step": "voice_objectives", "selected": []},
        });
        ws.send(Message::Text(action.to_string().into())).await.unwrap();

        let json = next_event(&mut ws, "rejected").await;
        assert_eq!(json["action"], "submit");
        assert_eq!(json["step"], "voice_objectives");
        assert_eq!(json["fields"][0]["field"], "selected");
        assert!(json["fields"][0]["message"].is_string());
        assert_eq!(manager.status().await.current_step, 0);

        // Malformed actions are answered too.
        ws.send(Message::Text("{\"action\": \"teleport\"}".into())).await.unwrap();
        let json = next_event(&mut ws, "rejected").await;
        assert_eq!(json["action"], "unknown");
    })
    .await
    .expect("test timed out");
}
