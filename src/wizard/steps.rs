//! Step identifiers and the per-agent-type step sequences.

use serde::{Deserialize, Serialize};

/// The two product variants; each selects its own step sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentType {
    Whatsapp,
    Voice,
}

impl std::fmt::Display for AgentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Whatsapp => write!(f, "whatsapp"),
            Self::Voice => write!(f, "voice"),
        }
    }
}

impl std::str::FromStr for AgentType {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "whatsapp" => Ok(Self::Whatsapp),
            "voice" => Ok(Self::Voice),
            _ => Err(format!("Unknown agent type: {}", s)),
        }
    }
}

/// One screen of the wizard.
///
/// WhatsApp: Objective → Knowledge → Brands → Behavior → Simulator → Deploy.
/// Voice: VoiceObjectives → VoiceKnowledge → VoiceProviders → VoiceSettings →
/// VoiceFlow → VoicePhone → VoiceActivation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepId {
    Objective,
    Knowledge,
    Brands,
    Behavior,
    Simulator,
    Deploy,
    VoiceObjectives,
    VoiceKnowledge,
    VoiceProviders,
    VoiceSettings,
    VoiceFlow,
    VoicePhone,
    VoiceActivation,
}

const WHATSAPP_STEPS: [StepId; 6] = [
    StepId::Objective,
    StepId::Knowledge,
    StepId::Brands,
    StepId::Behavior,
    StepId::Simulator,
    StepId::Deploy,
];

const VOICE_STEPS: [StepId; 7] = [
    StepId::VoiceObjectives,
    StepId::VoiceKnowledge,
    StepId::VoiceProviders,
    StepId::VoiceSettings,
    StepId::VoiceFlow,
    StepId::VoicePhone,
    StepId::VoiceActivation,
];

/// The ordered step list for an agent type.
pub fn steps_for(agent_type: AgentType) -> &'static [StepId] {
    match agent_type {
        AgentType::Whatsapp => &WHATSAPP_STEPS,
        AgentType::Voice => &VOICE_STEPS,
    }
}

impl StepId {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Objective => "objective",
            Self::Knowledge => "knowledge",
            Self::Brands => "brands",
            Self::Behavior => "behavior",
            Self::Simulator => "simulator",
            Self::Deploy => "deploy",
            Self::VoiceObjectives => "voice_objectives",
            Self::VoiceKnowledge => "voice_knowledge",
            Self::VoiceProviders => "voice_providers",
            Self::VoiceSettings => "voice_settings",
            Self::VoiceFlow => "voice_flow",
            Self::VoicePhone => "voice_phone",
            Self::VoiceActivation => "voice_activation",
        }
    }

    /// Which flow this step belongs to.
    pub fn agent_type(&self) -> AgentType {
        match self {
            Self::Objective
            | Self::Knowledge
            | Self::Brands
            | Self::Behavior
            | Self::Simulator
            | Self::Deploy => AgentType::Whatsapp,
            _ => AgentType::Voice,
        }
    }

    /// Whether the user submits a form on this step. The WhatsApp deploy
    /// screen only reviews and launches.
    pub fn accepts_output(&self) -> bool {
        !matches!(self, Self::Deploy)
    }

    /// Short label shown in the progress indicator.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Objective => "Objetivo",
            Self::Knowledge => "Conocimiento",
            Self::Brands => "Marcas",
            Self::Behavior => "Configuración",
            Self::Simulator => "Simulador",
            Self::Deploy => "Despliegue",
            Self::VoiceObjectives => "Objetivos",
            Self::VoiceKnowledge => "Conocimiento",
            Self::VoiceProviders => "Proveedores",
            Self::VoiceSettings => "Voz",
            Self::VoiceFlow => "Flujo",
            Self::VoicePhone => "Teléfono",
            Self::VoiceActivation => "Activación",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Self::Objective => "Define el objetivo",
            Self::Knowledge => "Agrega conocimiento",
            Self::Brands => "Selecciona marcas",
            Self::Behavior => "Configura el comportamiento",
            Self::Simulator => "Prueba tu agente",
            Self::Deploy => "¡Listo para desplegar!",
            Self::VoiceObjectives => "¿Qué quieres que haga tu agente de voz?",
            Self::VoiceKnowledge => "Conecta el conocimiento",
            Self::VoiceProviders => "Configura los proveedores",
            Self::VoiceSettings => "Configura la voz de tu agente",
            Self::VoiceFlow => "Diseña el flujo conversacional",
            Self::VoicePhone => "Configura el número telefónico",
            Self::VoiceActivation => "Activación",
        }
    }

    pub fn subtitle(&self) -> &'static str {
        match self {
            Self::Objective => "¿Qué quieres que logre tu agente conversacional?",
            Self::Knowledge => "Enseña a tu agente sobre tu clínica veterinaria",
            Self::Brands => "¿Qué marcas veterinarias manejas en tu clínica?",
            Self::Behavior => "Define cómo interactuará con tus clientes",
            Self::Simulator => "Simula conversaciones para verificar el funcionamiento",
            Self::Deploy => "Revisa la configuración y lanza tu agente",
            Self::VoiceObjectives => {
                "Selecciona uno o varios objetivos y configuraremos todo por ti"
            }
            Self::VoiceKnowledge => {
                "Tu agente heredará el conocimiento ya configurado y podrás agregar más"
            }
            Self::VoiceProviders => "Conecta los servicios de IA necesarios para tu agente de voz",
            Self::VoiceSettings => "Personaliza cómo suena y entiende tu asistente virtual",
            Self::VoiceFlow => "Define cómo interactuará tu agente durante las llamadas",
            Self::VoicePhone => "Define qué número utilizará tu agente de voz",
            Self::VoiceActivation => "Revisa la configuración final y activa tu asistente telefónico",
        }
    }
}

impl std::fmt::Display for StepId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Progress state of one entry in the step indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Completed,
    Current,
    Upcoming,
}

/// One dot of the progress indicator.
#[derive(Debug, Clone, Serialize)]
pub struct IndicatorEntry {
    /// 1-based position shown to the user.
    pub position: usize,
    pub step: StepId,
    pub label: &'static str,
    pub status: StepStatus,
}

/// Build the progress indicator for a step list and the current index.
pub fn indicator(steps: &[StepId], current: usize) -> Vec<IndicatorEntry> {
    steps
        .iter()
        .enumerate()
        .map(|(index, step)| IndicatorEntry {
            position: index + 1,
            step: *step,
            label: step.label(),
            status: match index.cmp(&current) {
                std::cmp::Ordering::Less => StepStatus::Completed,
                std::cmp::Ordering::Equal => StepStatus::Current,
                std::cmp::Ordering::Greater => StepStatus::Upcoming,
            },
        })
        .collect()
}
