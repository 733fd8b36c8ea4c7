//! Final review screens: what the agent will be deployed with, where to
//! edit each part, and what it costs.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;

use super::catalog::{self, CatalogOption};
use super::model::{
    ActivationChoice, ActivationMethod, AggregateConfig, BillingCycle, KnowledgeInput,
    PhoneNumberChoice, SttProvider, TtsProvider,
};
use super::state::WizardState;
use super::steps::{AgentType, StepId};

pub const DEFAULT_VOICE_AGENT_NAME: &str = "Mi Agente de Voz";
const NOT_DEFINED: &str = "No definido";

/// One reviewable block with the index of the step that edits it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SummarySection {
    pub title: &'static str,
    pub value: String,
    pub edit_step: usize,
}

impl SummarySection {
    fn new(title: &'static str, value: impl Into<String>, edit_step: usize) -> Self {
        Self {
            title,
            value: value.into(),
            edit_step,
        }
    }
}

/// Per-minute running cost of a voice agent, in USD.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CostEstimate {
    pub llm: Decimal,
    pub tts: Decimal,
    pub stt: Decimal,
}

impl Default for CostEstimate {
    fn default() -> Self {
        Self {
            llm: dec!(0.03),
            tts: dec!(0.18),
            stt: dec!(0.0043),
        }
    }
}

impl CostEstimate {
    pub fn per_minute(&self) -> Decimal {
        self.llm + self.tts + self.stt
    }

    pub fn for_minutes(&self, minutes: u32) -> Decimal {
        (self.per_minute() * Decimal::from(minutes)).round_dp(2)
    }
}

/// Subscription prices in COP.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubscriptionPlan {
    pub monthly: Decimal,
    pub annual: Decimal,
}

impl Default for SubscriptionPlan {
    fn default() -> Self {
        Self {
            monthly: dec!(49000),
            annual: dec!(490000),
        }
    }
}

impl SubscriptionPlan {
    pub fn price(&self, billing: BillingCycle) -> Decimal {
        match billing {
            BillingCycle::Monthly => self.monthly,
            BillingCycle::Annual => self.annual,
        }
    }

    /// Months the annual plan saves over paying monthly.
    pub fn annual_months_free(&self) -> Decimal {
        if self.monthly.is_zero() {
            return Decimal::ZERO;
        }
        ((self.monthly * dec!(12) - self.annual) / self.monthly).round_dp(1)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct WhatsAppSummary {
    pub sections: Vec<SummarySection>,
    pub features: Vec<&'static str>,
    pub missing_steps: Vec<StepId>,
}

#[derive(Debug, Clone, Serialize)]
pub struct VoiceSummary {
    pub agent_name: String,
    pub is_active: bool,
    pub sections: Vec<SummarySection>,
    pub activation: Option<String>,
    pub cost: CostEstimate,
    pub plan: SubscriptionPlan,
    pub missing_steps: Vec<StepId>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "agent_type", rename_all = "snake_case")]
pub enum Summary {
    Whatsapp(WhatsAppSummary),
    Voice(VoiceSummary),
}

impl Summary {
    /// Build the review for the selected flow; `None` while unset.
    pub fn build(state: &WizardState) -> Option<Self> {
        let missing_steps = state.missing_steps();
        match state.agent_type? {
            AgentType::Whatsapp => Some(Self::Whatsapp(whatsapp(&state.config, missing_steps))),
            AgentType::Voice => Some(Self::Voice(voice(&state.config, missing_steps))),
        }
    }

    pub fn missing_steps(&self) -> &[StepId] {
        match self {
            Self::Whatsapp(s) => &s.missing_steps,
            Self::Voice(s) => &s.missing_steps,
        }
    }

    pub fn sections(&self) -> &[SummarySection] {
        match self {
            Self::Whatsapp(s) => &s.sections,
            Self::Voice(s) => &s.sections,
        }
    }

    pub fn to_markdown(&self) -> String {
        let mut out = String::new();
        match self {
            Self::Whatsapp(_) => out.push_str("## Agente de WhatsApp\n\n"),
            Self::Voice(s) => {
                out.push_str(&format!("## {}\n\n", s.agent_name));
                let status = if s.is_active { "Activo" } else { "Inactivo" };
                out.push_str(&format!("Estado: {status}\n\n"));
            }
        }

        for section in self.sections() {
            out.push_str(&format!(
                "- **{}**: {} _(editar en paso {})_\n",
                section.title,
                section.value,
                section.edit_step + 1
            ));
        }

        match self {
            Self::Whatsapp(s) => {
                out.push_str("\nTu agente incluye:\n");
                for feature in &s.features {
                    out.push_str(&format!("- {feature}\n"));
                }
            }
            Self::Voice(s) => {
                if let Some(activation) = &s.activation {
                    out.push_str(&format!("\nActivación: {activation}\n"));
                }
                out.push_str(&format!(
                    "\nCosto estimado: ~${} USD por minuto\n",
                    s.cost.per_minute()
                ));
            }
        }

        let missing = self.missing_steps();
        if !missing.is_empty() {
            let labels: Vec<&str> = missing.iter().map(|s| s.label()).collect();
            out.push_str(&format!("\nPendiente: {}\n", labels.join(", ")));
        }
        out
    }
}

fn whatsapp(config: &AggregateConfig, missing_steps: Vec<StepId>) -> WhatsAppSummary {
    let objective = config
        .objective()
        .and_then(|sel| title_for(&catalog::OBJECTIVES, &sel.objective))
        .unwrap_or(NOT_DEFINED);

    let knowledge = config
        .knowledge()
        .map(|k| match &k.input {
            KnowledgeInput::Text { .. } => "Texto".to_string(),
            KnowledgeInput::Website { url } => format!("Sitio web ({url})"),
            KnowledgeInput::File { file_name, .. } => format!("Archivo ({file_name})"),
        })
        .unwrap_or_else(|| NOT_DEFINED.to_string());

    let brands = match config.brands().map(|b| b.brands.len()).unwrap_or(0) {
        0 => "Ninguna marca específica".to_string(),
        n => format!("{n} marcas seleccionadas"),
    };

    let behavior = config.behavior().cloned().unwrap_or_default();
    let tone = title_for(&catalog::TONES, &behavior.tone.unwrap_or_default()).unwrap_or("Amigable");
    let channel = title_for(&catalog::DATA_CHANNELS, &behavior.data_channel).unwrap_or("Google Sheets");

    WhatsAppSummary {
        sections: vec![
            SummarySection::new("Objetivo principal", objective, 0),
            SummarySection::new("Fuente de conocimiento", knowledge, 1),
            SummarySection::new("Marcas seleccionadas", brands, 2),
            SummarySection::new("Tono y comportamiento", format!("Tono: {tone} • Datos: {channel}"), 3),
        ],
        features: vec![
            "Respuestas inteligentes 24/7",
            "Recolección automática de datos",
            "Integración con WhatsApp",
            "Actualizaciones en tiempo real",
        ],
        missing_steps,
    }
}

fn voice(config: &AggregateConfig, missing_steps: Vec<StepId>) -> VoiceSummary {
    let settings = config.voice_settings();
    let agent_name = settings
        .map(|s| s.agent_name.trim())
        .filter(|name| !name.is_empty())
        .unwrap_or(DEFAULT_VOICE_AGENT_NAME)
        .to_string();

    let objectives = config
        .voice_objectives()
        .map(|o| {
            let mut labels = catalog::objectives_description(o);
            if let Some(custom) = o.custom() {
                if !labels.is_empty() {
                    labels.push_str(", ");
                }
                labels.push_str(custom);
            }
            labels
        })
        .filter(|labels| !labels.is_empty())
        .unwrap_or_else(|| NOT_DEFINED.to_string());
    let actions = config
        .voice_objectives()
        .map(catalog::actions_description)
        .unwrap_or_else(|| NOT_DEFINED.to_string());

    let knowledge = config
        .voice_knowledge()
        .map(|k| {
            let brands = k.effective_brands().len();
            let sponsored = k.enabled_sponsors().len();
            format!("{brands} marcas heredadas • {sponsored} bloques patrocinados")
        })
        .unwrap_or_else(|| NOT_DEFINED.to_string());

    let providers = match config.providers() {
        Some(setup) => {
            let validated = [&setup.llm, &setup.tts, &setup.stt]
                .iter()
                .filter(|c| c.validated == Some(true))
                .count();
            format!("{validated}/3 API keys validadas")
        }
        None => NOT_DEFINED.to_string(),
    };

    let engines = settings
        .map(|s| {
            format!(
                "Voz: {} • Reconocimiento: {} • Idioma: {}",
                tts_name(s.tts_provider),
                stt_name(s.stt_provider),
                s.language.name()
            )
        })
        .unwrap_or_else(|| NOT_DEFINED.to_string());

    let flow = config
        .voice_flow()
        .map(|f| format!("{} áreas • {} rutas", f.areas.len(), f.routes.len()))
        .unwrap_or_else(|| NOT_DEFINED.to_string());

    let phone = config
        .phone()
        .map(|p| match &p.number {
            PhoneNumberChoice::Existing { number } | PhoneNumberChoice::New { number, .. } => {
                number.clone()
            }
            PhoneNumberChoice::Later => "Configurar más tarde".to_string(),
        })
        .unwrap_or_else(|| NOT_DEFINED.to_string());

    let plan = SubscriptionPlan::default();
    VoiceSummary {
        agent_name,
        is_active: settings.map(|s| s.is_active).unwrap_or(true),
        sections: vec![
            SummarySection::new("Objetivos", objectives, 0),
            SummarySection::new("Acciones disponibles", actions, 0),
            SummarySection::new("Conocimiento", knowledge, 1),
            SummarySection::new("Proveedores", providers, 2),
            SummarySection::new("Voz y reconocimiento", engines, 3),
            SummarySection::new("Flujo conversacional", flow, 4),
            SummarySection::new("Número telefónico", phone, 5),
        ],
        activation: config.activation().and_then(|a| activation_text(a, &plan)),
        cost: CostEstimate::default(),
        plan,
        missing_steps,
    }
}

fn activation_text(choice: &ActivationChoice, plan: &SubscriptionPlan) -> Option<String> {
    match &choice.method {
        ActivationMethod::Sponsor { .. } => choice.grant.as_ref().map(|grant| {
            format!(
                "Patrocinado por {} por {} meses",
                grant.brand.name(),
                grant.duration_months
            )
        }),
        ActivationMethod::Payment { billing } => {
            let period = match billing {
                BillingCycle::Monthly => "mes",
                BillingCycle::Annual => "año",
            };
            Some(format!("${} COP / {period}", format_cop(plan.price(*billing))))
        }
    }
}

/// `49000` → `49.000`
pub fn format_cop(amount: Decimal) -> String {
    let digits = amount.trunc().abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push('.');
        }
        out.push(ch);
    }
    if amount.is_sign_negative() && !amount.is_zero() {
        out.insert(0, '-');
    }
    out
}

/// Catalog title for a unit enum, matched on its serde id.
fn title_for<T: Serialize>(options: &[CatalogOption], value: &T) -> Option<&'static str> {
    let id = serde_json::to_value(value).ok()?;
    catalog::title_of(options, id.as_str()?)
}

fn tts_name(provider: TtsProvider) -> &'static str {
    match provider {
        TtsProvider::Elevenlabs => "ElevenLabs",
        TtsProvider::Openai => "OpenAI",
        TtsProvider::Google => "Google",
        TtsProvider::Azure => "Azure",
    }
}

fn stt_name(provider: SttProvider) -> &'static str {
    match provider {
        SttProvider::Deepgram => "Deepgram",
        SttProvider::Whisper => "Whisper",
        SttProvider::Google => "Google",
        SttProvider::Azure => "Azure",
    }
}
