//! Required-field checks that gate the "continue" button of each step.

use std::sync::LazyLock;

use regex::Regex;
use secrecy::ExposeSecret;
use serde::Serialize;

use super::model::{
    ActivationMethod, ApiCredential, BehaviorSettings, ConversationFlow, DataChannel,
    KnowledgeInput, PhoneNumberChoice, ProviderSetup, StepOutput, VoiceObjectives, VoiceSettings,
};

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email regex is valid")
});

/// Digits with optional leading `+` and common separators, 7–15 digits.
static PHONE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\+?[0-9][0-9 ()\-]{5,20}[0-9]$").expect("phone regex is valid")
});

static URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^https?://[^\s/$.?#][^\s]*$").expect("url regex is valid")
});

/// A single field that blocks the step from completing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

/// All field errors for one submitted step.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(Vec<FieldError>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(field: &str, message: &str) -> Self {
        let mut errors = Self::new();
        errors.push(field, message);
        errors
    }

    pub fn push(&mut self, field: &str, message: &str) {
        self.0.push(FieldError {
            field: field.to_string(),
            message: message.to_string(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|e| e.field.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldError> {
        self.0.iter()
    }

    fn into_result(self) -> Result<(), Self> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

impl std::fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let parts: Vec<String> = self
            .0
            .iter()
            .map(|e| format!("{}: {}", e.field, e.message))
            .collect();
        write!(f, "{}", parts.join("; "))
    }
}

pub fn is_valid_email(value: &str) -> bool {
    EMAIL_RE.is_match(value.trim())
}

pub fn is_valid_phone(value: &str) -> bool {
    let value = value.trim();
    let digits = value.chars().filter(char::is_ascii_digit).count();
    PHONE_RE.is_match(value) && (7..=15).contains(&digits)
}

pub fn is_valid_url(value: &str) -> bool {
    URL_RE.is_match(value.trim())
}

fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

impl StepOutput {
    /// Check the required fields for this step's form.
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        match self {
            Self::Knowledge(submission) => check_knowledge(&submission.input, &mut errors),
            Self::Behavior(settings) => check_behavior(settings, &mut errors),
            Self::VoiceObjectives(objectives) => check_voice_objectives(objectives, &mut errors),
            Self::VoiceProviders(setup) => check_providers(setup, &mut errors),
            Self::VoiceSettings(settings) => check_voice_settings(settings, &mut errors),
            Self::VoiceFlow(flow) => check_flow(flow, &mut errors),
            Self::VoicePhone(phone) => match &phone.number {
                PhoneNumberChoice::Existing { number } | PhoneNumberChoice::New { number, .. } => {
                    if is_blank(number) {
                        errors.push("number", "Selecciona o ingresa un número telefónico");
                    } else if !is_valid_phone(number) {
                        errors.push("number", "Número telefónico no válido");
                    }
                }
                PhoneNumberChoice::Later => {}
            },
            Self::VoiceActivation(choice) => {
                if let ActivationMethod::Sponsor { code } = &choice.method {
                    if is_blank(code) {
                        errors.push("code", "Ingresa tu código de patrocinio");
                    }
                }
            }
            // Voice knowledge is optional; the rest are enum-only.
            Self::Objective(_) | Self::Brands(_) | Self::Simulator(_) | Self::VoiceKnowledge(_) => {}
        }
        errors.into_result()
    }
}

fn check_knowledge(input: &KnowledgeInput, errors: &mut ValidationErrors) {
    match input {
        KnowledgeInput::Text { content } => {
            if is_blank(content) {
                errors.push("content", "Escribe la información de tu clínica");
            }
        }
        KnowledgeInput::Website { url } => {
            if is_blank(url) {
                errors.push("url", "Ingresa la URL de tu sitio web");
            } else if !is_valid_url(url) {
                errors.push("url", "La URL debe comenzar con http:// o https://");
            }
        }
        KnowledgeInput::File { file_name, .. } => {
            if is_blank(file_name) {
                errors.push("file_name", "Selecciona un archivo");
            }
        }
    }
}

fn check_behavior(settings: &BehaviorSettings, errors: &mut ValidationErrors) {
    match settings.data_channel {
        DataChannel::Email => match settings.contact_info() {
            None => errors.push("contact_info", "Ingresa el correo donde recibirás los datos"),
            Some(email) if !is_valid_email(email) => {
                errors.push("contact_info", "Correo electrónico no válido")
            }
            Some(_) => {}
        },
        DataChannel::Whatsapp => match settings.contact_info() {
            None => errors.push("contact_info", "Ingresa el número donde recibirás los datos"),
            Some(phone) if !is_valid_phone(phone) => {
                errors.push("contact_info", "Número de WhatsApp no válido")
            }
            Some(_) => {}
        },
        DataChannel::Sheets => {}
    }
}

fn check_voice_objectives(objectives: &VoiceObjectives, errors: &mut ValidationErrors) {
    if objectives.selected.is_empty() && objectives.custom().is_none() {
        errors.push("selected", "Selecciona al menos un objetivo o describe uno propio");
    }
}

fn check_providers(setup: &ProviderSetup, errors: &mut ValidationErrors) {
    let required: [(&str, &ApiCredential); 3] =
        [("llm", &setup.llm), ("tts", &setup.tts), ("stt", &setup.stt)];
    for (field, credential) in required {
        if credential.is_blank() {
            errors.push(field, "La API key es obligatoria");
        }
    }
    if let Some(telephony) = &setup.telephony {
        // Optional slot, but whitespace-only keys are a typo.
        if !telephony.api_key.expose_secret().is_empty() && telephony.is_blank() {
            errors.push("telephony", "API key no válida");
        }
    }

    let model = &setup.model;
    if !(0.0..=2.0).contains(&model.temperature) {
        errors.push("model.temperature", "La temperatura debe estar entre 0 y 2");
    }
    if !(0.0..=1.0).contains(&model.top_p) {
        errors.push("model.top_p", "Top P debe estar entre 0 y 1");
    }
    if !(50..=500).contains(&model.max_tokens) {
        errors.push("model.max_tokens", "Max tokens debe estar entre 50 y 500");
    }
}

fn check_voice_settings(settings: &VoiceSettings, errors: &mut ValidationErrors) {
    if is_blank(&settings.agent_name) {
        errors.push("agent_name", "El nombre del agente es obligatorio");
    }
    if !(0.5..=2.0).contains(&settings.voice_speed) {
        errors.push("voice_speed", "La velocidad debe estar entre 0.5x y 2.0x");
    }
}

fn check_flow(flow: &ConversationFlow, errors: &mut ValidationErrors) {
    for (i, area) in flow.areas.iter().enumerate() {
        if is_blank(&area.name) {
            errors.push(&format!("areas[{i}].name"), "El nombre del área es obligatorio");
        }
        if is_blank(&area.responsible) {
            errors.push(&format!("areas[{i}].responsible"), "Indica el responsable del área");
        }
        if is_blank(&area.whatsapp) {
            errors.push(&format!("areas[{i}].whatsapp"), "Indica el WhatsApp del área");
        }
        if let Some(email) = area.email.as_deref().filter(|e| !is_blank(e)) {
            if !is_valid_email(email) {
                errors.push(&format!("areas[{i}].email"), "Correo electrónico no válido");
            }
        }
    }
    for (i, route) in flow.routes.iter().enumerate() {
        if !flow.areas.iter().any(|area| area.id == route.area_id) {
            errors.push(&format!("routes[{i}].area_id"), "La ruta apunta a un área inexistente");
        }
    }
}
