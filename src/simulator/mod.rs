//! Chat simulator: a scripted stand-in for the WhatsApp agent so the
//! clinic can try the configuration before deploying it.
//!
//! Replies are keyword driven and shaped by the behavior and brand steps.
//! The simulator itself is synchronous; the manager applies the typing
//! delay between the user's message and the agent's reply.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::wizard::model::{AggregateConfig, Brand, FallbackAction};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sender {
    User,
    Agent,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: Uuid,
    pub text: String,
    pub sender: Sender,
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    fn new(sender: Sender, text: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            text: text.to_string(),
            sender,
            timestamp: Utc::now(),
        }
    }
}

/// Canned customer message for one-click testing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct QuickTest {
    pub id: &'static str,
    pub title: &'static str,
    pub description: &'static str,
    pub message: &'static str,
}

pub const QUICK_TESTS: [QuickTest; 3] = [
    QuickTest {
        id: "product",
        title: "Producto",
        description: "Pregunta sobre un alimento para perros",
        message: "Hola, ¿qué alimento me recomiendan para un perro adulto?",
    },
    QuickTest {
        id: "appointment",
        title: "Cita",
        description: "Solicita agendar una consulta",
        message: "Necesito agendar una cita para mi gato, ¿tienen disponibilidad mañana?",
    },
    QuickTest {
        id: "hospitalization",
        title: "Hospitalización",
        description: "Pregunta sobre una mascota hospitalizada",
        message: "Quiero saber cómo está mi perro que dejé hospitalizado ayer",
    },
];

pub fn quick_test(id: &str) -> Option<&'static QuickTest> {
    QUICK_TESTS.iter().find(|t| t.id == id)
}

const FOOD_REPLY: &str =
    "Tenemos varias opciones excelentes de alimento. ¿Para qué tipo de mascota y qué edad tiene?";
const APPOINTMENT_REPLY: &str = "Claro, puedo ayudarte a agendar una cita. ¿Qué tipo de consulta necesitas y cuál es tu preferencia de horario?";
const HOSPITAL_REPLY: &str = "Entiendo tu preocupación. Para consultar el estado de tu mascota hospitalizada, necesito verificar algunos datos. ¿Podrías darme el nombre de la mascota y la fecha de ingreso?";
pub const DEFAULT_REPLY: &str =
    "Gracias por tu mensaje. ¿Podrías darme más detalles para poder ayudarte mejor?";
const RETRY_REPLY: &str =
    "No estoy seguro de haber entendido. ¿Podrías contarme de otra forma qué necesitas?";

/// The parts of the wizard config that shape simulated replies.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SimulatorProfile {
    pub greeting: Option<String>,
    pub brands: Vec<Brand>,
    pub fallback: FallbackAction,
    pub contact_info: Option<String>,
}

impl SimulatorProfile {
    pub fn from_config(config: &AggregateConfig) -> Self {
        let behavior = config.behavior();
        Self {
            greeting: behavior.and_then(|b| b.greeting()).map(str::to_string),
            brands: config.brands().map(|b| b.brands.clone()).unwrap_or_default(),
            fallback: behavior.map(|b| b.fallback_action).unwrap_or_default(),
            contact_info: behavior.and_then(|b| b.contact_info()).map(str::to_string),
        }
    }
}

/// Oldest messages are dropped past this many.
pub const MAX_TRANSCRIPT: usize = 200;

/// Transcript of one simulated conversation.
#[derive(Debug, Default)]
pub struct ChatSimulator {
    transcript: Vec<ChatMessage>,
}

impl ChatSimulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn transcript(&self) -> &[ChatMessage] {
        &self.transcript
    }

    /// Number of messages the user has sent.
    pub fn user_messages(&self) -> usize {
        self.transcript
            .iter()
            .filter(|m| m.sender == Sender::User)
            .count()
    }

    /// Clear the conversation, opening with the custom greeting if any.
    pub fn reset(&mut self, profile: &SimulatorProfile) -> Option<ChatMessage> {
        self.transcript.clear();
        let greeting = profile.greeting.as_deref()?;
        Some(self.push(Sender::Agent, greeting))
    }

    /// Record the user's message and work out the agent's answer. The
    /// answer is not recorded until [`push_reply`](Self::push_reply).
    pub fn send(&mut self, text: &str, profile: &SimulatorProfile) -> Option<(ChatMessage, String)> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        let first = self.transcript.is_empty();
        let user = self.push(Sender::User, text);
        Some((user, reply_for(text, profile, first)))
    }

    pub fn push_reply(&mut self, reply: &str) -> ChatMessage {
        self.push(Sender::Agent, reply)
    }

    fn push(&mut self, sender: Sender, text: &str) -> ChatMessage {
        let message = ChatMessage::new(sender, text);
        self.transcript.push(message.clone());
        if self.transcript.len() > MAX_TRANSCRIPT {
            let excess = self.transcript.len() - MAX_TRANSCRIPT;
            self.transcript.drain(..excess);
        }
        message
    }
}

/// Scripted answer to one customer message.
pub fn reply_for(text: &str, profile: &SimulatorProfile, first_message: bool) -> String {
    if first_message {
        if let Some(greeting) = &profile.greeting {
            return greeting.clone();
        }
    }

    let lower = text.to_lowercase();
    let mentions = |words: &[&str]| words.iter().any(|w| lower.contains(w));

    if mentions(&["alimento", "comida"]) {
        return FOOD_REPLY.to_string();
    }
    if mentions(&["cita", "agendar"]) {
        return APPOINTMENT_REPLY.to_string();
    }
    if mentions(&["hospitalizado", "hospital"]) {
        return HOSPITAL_REPLY.to_string();
    }

    if let Some(brand) = Brand::ALL
        .into_iter()
        .find(|b| brand_keywords(*b).iter().any(|k| lower.contains(k)))
    {
        return if profile.brands.contains(&brand) {
            format!(
                "Sí, manejamos productos {}. ¿Qué producto te interesa o para qué mascota lo buscas?",
                brand.name()
            )
        } else {
            format!(
                "Por ahora no manejamos {}, pero puedo recomendarte alternativas de las marcas que tenemos disponibles.",
                brand.name()
            )
        };
    }

    match profile.fallback {
        FallbackAction::Retry => RETRY_REPLY.to_string(),
        FallbackAction::Human => match &profile.contact_info {
            Some(contact) => format!(
                "Para ayudarte mejor, te comunico con nuestro equipo. Puedes contactarnos en {contact}."
            ),
            None => "Para ayudarte mejor, te comunico con una persona de nuestro equipo.".to_string(),
        },
        FallbackAction::Polite => DEFAULT_REPLY.to_string(),
    }
}

fn brand_keywords(brand: Brand) -> &'static [&'static str] {
    match brand {
        Brand::RoyalCanin => &["royal canin", "royal"],
        Brand::Hills => &["hill's", "hills"],
        Brand::PurinaPro => &["pro plan", "purina"],
        Brand::Eukanuba => &["eukanuba"],
        Brand::Advance => &["advance"],
        Brand::Nupec => &["nupec"],
        Brand::Bayer => &["bayer"],
        Brand::Zoetis => &["zoetis"],
    }
}
