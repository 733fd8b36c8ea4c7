//! Static option catalogs and the generators that pre-fill voice steps.

use serde::Serialize;

use super::model::{
    AreaRoute, Brand, ClinicArea, ConversationFlow, FlowMode, VoiceObjective, VoiceObjectives,
};

/// One selectable card in a step form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CatalogOption {
    pub id: &'static str,
    pub title: &'static str,
    pub description: &'static str,
}

const fn option(id: &'static str, title: &'static str, description: &'static str) -> CatalogOption {
    CatalogOption {
        id,
        title,
        description,
    }
}

pub const OBJECTIVES: [CatalogOption; 4] = [
    option("appointment", "Agendamiento de citas", "Ayuda a los clientes a agendar consultas y servicios"),
    option("sales", "Ventas de productos", "Recomienda y vende productos veterinarios"),
    option("support", "Soporte general", "Responde dudas y brinda información"),
    option("comprehensive", "Servicio integral", "Combina agendamiento, ventas y soporte"),
];

pub const CLINIC_TYPES: [CatalogOption; 4] = [
    option("general", "Clínica general", "Consultas, vacunas y medicina preventiva"),
    option("specialty", "Especialidades", "Dermatología, cardiología, oftalmología y más"),
    option("emergency", "Urgencias 24 h", "Atención inmediata a cualquier hora"),
    option("hospital", "Hospital veterinario", "Cirugía, hospitalización y cuidados intensivos"),
];

pub const BRANDS: [CatalogOption; 8] = [
    option("royal-canin", "Royal Canin", "Alimento especializado para mascotas"),
    option("hills", "Hill's", "Nutrición terapéutica veterinaria"),
    option("purina-pro", "Purina Pro Plan", "Nutrición avanzada para mascotas"),
    option("eukanuba", "Eukanuba", "Nutrición premium para perros y gatos"),
    option("advance", "Advance", "Alimento natural para mascotas"),
    option("nupec", "Nupec", "Alimento mexicano para mascotas"),
    option("bayer", "Bayer", "Medicamentos y tratamientos"),
    option("zoetis", "Zoetis", "Vacunas y medicamentos veterinarios"),
];

pub const TONES: [CatalogOption; 3] = [
    option("formal", "Formal", "Trato de usted, lenguaje profesional"),
    option("friendly", "Amigable", "Cercano y cálido"),
    option("casual", "Casual", "Relajado y conversacional"),
];

pub const DATA_CHANNELS: [CatalogOption; 3] = [
    option("email", "Correo electrónico", "Recibe resúmenes diarios por email"),
    option("whatsapp", "WhatsApp", "Notificaciones instantáneas por WhatsApp"),
    option("sheets", "Google Sheets", "Todo se guarda automáticamente en una hoja de cálculo"),
];

pub const FALLBACK_ACTIONS: [CatalogOption; 3] = [
    option("retry", "Reintentar con pregunta diferente", "El agente reformula la pregunta para entender mejor"),
    option("human", "Ofrecer contacto humano", "Proporciona número de teléfono o info de contacto"),
    option("polite", "Finalizar amablemente", "Se despide de forma cordial y profesional"),
];

pub const VOICE_OBJECTIVES: [CatalogOption; 6] = [
    option(
        "general_info",
        "Atender llamadas y responder dudas generales",
        "Tu agente responderá preguntas sobre servicios, horarios, ubicación y consultas básicas",
    ),
    option(
        "appointments",
        "Agendar o confirmar citas automáticamente",
        "Gestión completa de citas: verificar disponibilidad, agendar, confirmar y reprogramar",
    ),
    option(
        "products",
        "Recomendar productos veterinarios",
        "Sugerir productos apropiados basado en las necesidades del cliente y su mascota",
    ),
    option(
        "post_surgery",
        "Dar indicaciones postquirúrgicas",
        "Proporcionar cuidados e instrucciones después de procedimientos veterinarios",
    ),
    option(
        "emergencies",
        "Filtrar urgencias",
        "Evaluar la gravedad de situaciones y priorizar casos que requieren atención inmediata",
    ),
    option(
        "transfer",
        "Redirigir al personal adecuado",
        "Transferir llamadas al veterinario, asistente o departamento correcto según la consulta",
    ),
];

pub const PROVIDERS: [CatalogOption; 4] = [
    option("llm", "OpenAI API Key", "Necesaria para generar respuestas inteligentes"),
    option("tts", "ElevenLabs API Key", "Para convertir texto en voz natural"),
    option("stt", "Deepgram API Key", "Para entender lo que dicen los clientes"),
    option("telephony", "Twilio API Key", "Para gestionar llamadas telefónicas (opcional por ahora)"),
];

pub const VOICE_TYPES: [CatalogOption; 4] = [
    option("natural", "Voz Natural", "Sonido humano y cálido"),
    option("professional", "Voz Profesional", "Formal y clara"),
    option("empathetic", "Voz Empática", "Comprensiva y suave"),
    option("technical", "Voz Técnica", "Precisa y directa"),
];

pub const CALL_FALLBACKS: [CatalogOption; 4] = [
    option("retry", "Reintentar llamada", "Vuelve a intentar la conexión"),
    option("whatsapp", "Continuar por WhatsApp", "Envía un mensaje al cliente"),
    option("voicemail", "Buzón de voz", "El cliente deja un mensaje grabado"),
    option("human", "Transferir a una persona", "Conecta con el personal de la clínica"),
];

pub const SUGGESTED_AREAS: [&str; 8] = [
    "Urgencias",
    "Cirugía",
    "Consulta General",
    "Peluquería",
    "Vacunación",
    "Laboratorio",
    "Radiología",
    "Hospitalización",
];

pub const QUICK_VOICE_EXAMPLES: [&str; 3] = [
    "Atender llamadas y agendar citas para mi veterinaria",
    "Responder dudas sobre vacunas y dar precios de servicios",
    "Filtrar urgencias y redirigir al veterinario cuando sea necesario",
];

/// A number the clinic already has on the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ExistingNumber {
    pub number: &'static str,
    pub status: &'static str,
    pub assigned_to: Option<&'static str>,
}

pub const EXISTING_NUMBERS: [ExistingNumber; 2] = [
    ExistingNumber {
        number: "+52 55 1234 5678",
        status: "Activo",
        assigned_to: Some("Agente WhatsApp"),
    },
    ExistingNumber {
        number: "+52 55 8765 4321",
        status: "Disponible",
        assigned_to: None,
    },
];

/// Every option list the front-end needs, served as one document.
#[derive(Debug, Clone, Serialize)]
pub struct Catalog {
    pub objectives: &'static [CatalogOption],
    pub clinic_types: &'static [CatalogOption],
    pub brands: &'static [CatalogOption],
    pub tones: &'static [CatalogOption],
    pub data_channels: &'static [CatalogOption],
    pub fallback_actions: &'static [CatalogOption],
    pub voice_objectives: &'static [CatalogOption],
    pub providers: &'static [CatalogOption],
    pub voice_types: &'static [CatalogOption],
    pub call_fallbacks: &'static [CatalogOption],
    pub suggested_areas: &'static [&'static str],
    pub quick_voice_examples: &'static [&'static str],
    pub existing_numbers: &'static [ExistingNumber],
}

pub fn catalog() -> Catalog {
    Catalog {
        objectives: &OBJECTIVES,
        clinic_types: &CLINIC_TYPES,
        brands: &BRANDS,
        tones: &TONES,
        data_channels: &DATA_CHANNELS,
        fallback_actions: &FALLBACK_ACTIONS,
        voice_objectives: &VOICE_OBJECTIVES,
        providers: &PROVIDERS,
        voice_types: &VOICE_TYPES,
        call_fallbacks: &CALL_FALLBACKS,
        suggested_areas: &SUGGESTED_AREAS,
        quick_voice_examples: &QUICK_VOICE_EXAMPLES,
        existing_numbers: &EXISTING_NUMBERS,
    }
}

/// Look up a catalog title by id.
pub fn title_of(options: &[CatalogOption], id: &str) -> Option<&'static str> {
    options.iter().find(|o| o.id == id).map(|o| o.title)
}

// ── Brand example questions ─────────────────────────────────────────────

const DEFAULT_QUESTIONS: [&str; 3] = [
    "¿Qué alimento me recomiendan para mi mascota?",
    "¿Tienen productos para desparasitar?",
    "¿Cuál es la diferencia entre estas marcas?",
];

/// Up to three questions customers could ask about the selected brands.
pub fn example_questions(brands: &[Brand]) -> Vec<&'static str> {
    let has = |b: Brand| brands.contains(&b);
    let mut questions = Vec::new();

    if has(Brand::Hills) {
        questions.push("¿Para qué sirve la dieta Hill's i/d?");
    }
    if has(Brand::RoyalCanin) {
        questions.push("¿Qué diferencia hay entre Royal Canin Gastro y Satiety?");
    }
    if has(Brand::Bayer) || has(Brand::Zoetis) {
        questions.push("¿Qué recomiendan contra las pulgas para un perro de 20 kg?");
    }
    if has(Brand::PurinaPro) {
        questions.push("¿Cuál es el mejor Pro Plan para un gato senior?");
    }
    if has(Brand::Eukanuba) {
        questions.push("¿Eukanuba tiene opciones para perros con alergias?");
    }

    if questions.is_empty() {
        return DEFAULT_QUESTIONS.to_vec();
    }
    questions.truncate(3);
    questions
}

// ── Voice flow generation ───────────────────────────────────────────────

const GREETING_PREFIX: &str = "¡Hola! Hablas con el asistente virtual de tu clínica veterinaria. ";
pub const DEFAULT_CLOSING: &str =
    "Gracias por contactarnos. ¡Que tengas un excelente día y cuida mucho a tu mascota!";

/// Build the conversation flow suggested for the chosen objectives.
pub fn generate_flow(objectives: &VoiceObjectives) -> ConversationFlow {
    let suffix = if objectives.contains(VoiceObjective::Appointments) {
        "Estoy aquí para ayudarte a agendar tu cita y resolver cualquier duda sobre nuestros servicios."
    } else if objectives.contains(VoiceObjective::GeneralInfo) {
        "¿En qué puedo ayudarte hoy?"
    } else if objectives.contains(VoiceObjective::Products) {
        "Puedo ayudarte con información sobre nuestros productos y servicios veterinarios."
    } else {
        "¿Cómo puedo asistirte hoy?"
    };

    ConversationFlow {
        mode: FlowMode::Generated,
        greeting: format!("{GREETING_PREFIX}{suffix}"),
        closing_message: DEFAULT_CLOSING.to_string(),
        faq_enabled: true,
        memory_enabled: true,
        areas: Vec::new(),
        routes: Vec::new(),
    }
}

/// Empty flow for the manual editor (custom objectives).
pub fn manual_flow() -> ConversationFlow {
    ConversationFlow {
        mode: FlowMode::Manual,
        greeting: String::new(),
        closing_message: String::new(),
        faq_enabled: true,
        memory_enabled: true,
        areas: Vec::new(),
        routes: Vec::new(),
    }
}

pub fn objective_label(objective: VoiceObjective) -> &'static str {
    match objective {
        VoiceObjective::Appointments => "Agendar y confirmar citas",
        VoiceObjective::GeneralInfo => "Responder dudas generales",
        VoiceObjective::Products => "Recomendar productos veterinarios",
        VoiceObjective::PostSurgery => "Dar indicaciones postquirúrgicas",
        VoiceObjective::Emergencies => "Filtrar urgencias",
        VoiceObjective::Transfer => "Redirigir al personal adecuado",
    }
}

/// Comma-separated list of what the agent will do.
pub fn objectives_description(objectives: &VoiceObjectives) -> String {
    objectives
        .selected
        .iter()
        .map(|o| objective_label(*o))
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn actions_description(objectives: &VoiceObjectives) -> String {
    let actions: Vec<&str> = [
        (VoiceObjective::Appointments, "Programar citas"),
        (VoiceObjective::Products, "Consultar productos"),
        (VoiceObjective::Emergencies, "Evaluar urgencias"),
        (VoiceObjective::Transfer, "Transferir llamadas"),
    ]
    .into_iter()
    .filter(|(objective, _)| objectives.contains(*objective))
    .map(|(_, action)| action)
    .collect();

    if actions.is_empty() {
        "Responder consultas y orientar al cliente".to_string()
    } else {
        actions.join(", ")
    }
}

/// Keywords that map a free-text description onto voice objectives.
const INFERENCE_KEYWORDS: [(VoiceObjective, &[&str]); 6] = [
    (VoiceObjective::Appointments, &["cita", "agend", "reserv", "confirm"]),
    (VoiceObjective::GeneralInfo, &["duda", "pregunta", "informa", "horario", "precio", "atender"]),
    (VoiceObjective::Products, &["producto", "aliment", "recomend", "vend"]),
    (VoiceObjective::PostSurgery, &["cirug", "quirúrg", "quirurg", "operaci"]),
    (VoiceObjective::Emergencies, &["urgenc", "emergenc"]),
    (VoiceObjective::Transfer, &["redirig", "transfer", "veterinario", "personal"]),
];

/// Quick creation: guess the objectives from a one-line description.
///
/// Nothing recognised falls back to general information, so the result
/// always passes validation.
pub fn infer_voice_objectives(description: &str) -> VoiceObjectives {
    let text = description.to_lowercase();
    let mut selected: Vec<VoiceObjective> = INFERENCE_KEYWORDS
        .iter()
        .filter(|(_, words)| words.iter().any(|w| text.contains(w)))
        .map(|(objective, _)| *objective)
        .collect();
    if selected.is_empty() {
        selected.push(VoiceObjective::GeneralInfo);
    }
    VoiceObjectives {
        selected,
        custom: None,
    }
}

/// Reception routes to every area, one rule each.
pub fn default_routes(areas: &[ClinicArea]) -> Vec<AreaRoute> {
    areas
        .iter()
        .map(|area| AreaRoute {
            area_id: area.id.clone(),
            condition: format!("Consultas sobre {}", area.name.to_lowercase()),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_ids_match_serde() {
        for (option, brand) in BRANDS.iter().zip(Brand::ALL) {
            let json = serde_json::to_string(&brand).unwrap();
            assert_eq!(json, format!("\"{}\"", option.id));
            assert_eq!(option.title, brand.name());
        }
        for (option, objective) in VOICE_OBJECTIVES.iter().zip(VoiceObjective::ALL) {
            let json = serde_json::to_string(&objective).unwrap();
            assert_eq!(json, format!("\"{}\"", option.id));
        }
    }

    #[test]
    fn example_questions_default_when_no_match() {
        assert_eq!(example_questions(&[]), DEFAULT_QUESTIONS.to_vec());
        assert_eq!(example_questions(&[Brand::Nupec]), DEFAULT_QUESTIONS.to_vec());
    }

    #[test]
    fn example_questions_capped_at_three() {
        let questions = example_questions(&[
            Brand::Eukanuba,
            Brand::PurinaPro,
            Brand::Zoetis,
            Brand::RoyalCanin,
            Brand::Hills,
        ]);
        assert_eq!(questions.len(), 3);
        assert_eq!(questions[0], "¿Para qué sirve la dieta Hill's i/d?");
    }

    #[test]
    fn bayer_and_zoetis_share_one_question() {
        let questions = example_questions(&[Brand::Bayer, Brand::Zoetis]);
        assert_eq!(questions.len(), 1);
    }

    #[test]
    fn generated_greeting_prefers_appointments() {
        let objectives = VoiceObjectives {
            selected: vec![VoiceObjective::Products, VoiceObjective::Appointments],
            custom: None,
        };
        let flow = generate_flow(&objectives);
        assert!(flow.greeting.starts_with(GREETING_PREFIX));
        assert!(flow.greeting.ends_with("sobre nuestros servicios."));
        assert_eq!(flow.closing_message, DEFAULT_CLOSING);
        assert_eq!(flow.mode, FlowMode::Generated);

        let other = generate_flow(&VoiceObjectives {
            selected: vec![VoiceObjective::Transfer],
            custom: None,
        });
        assert!(other.greeting.ends_with("¿Cómo puedo asistirte hoy?"));
    }

    #[test]
    fn descriptions() {
        let objectives = VoiceObjectives {
            selected: vec![VoiceObjective::Appointments, VoiceObjective::Emergencies],
            custom: None,
        };
        assert_eq!(
            objectives_description(&objectives),
            "Agendar y confirmar citas, Filtrar urgencias"
        );
        assert_eq!(actions_description(&objectives), "Programar citas, Evaluar urgencias");
        assert_eq!(
            actions_description(&VoiceObjectives::default()),
            "Responder consultas y orientar al cliente"
        );
    }

    #[test]
    fn inference_from_examples() {
        let first = infer_voice_objectives(QUICK_VOICE_EXAMPLES[0]);
        assert!(first.contains(VoiceObjective::Appointments));
        assert!(first.contains(VoiceObjective::GeneralInfo));

        let third = infer_voice_objectives(QUICK_VOICE_EXAMPLES[2]);
        assert!(third.contains(VoiceObjective::Emergencies));
        assert!(third.contains(VoiceObjective::Transfer));

        let nothing = infer_voice_objectives("hola");
        assert_eq!(nothing.selected, vec![VoiceObjective::GeneralInfo]);
    }

    #[test]
    fn routes_per_area() {
        let areas = vec![
            ClinicArea::new("Urgencias", "Dra. Ruiz", "+52 55 1111 2222"),
            ClinicArea::new("Consulta General", "Dr. Soto", "+52 55 3333 4444"),
        ];
        let routes = default_routes(&areas);
        assert_eq!(routes.len(), 2);
        assert_eq!(routes[1].condition, "Consultas sobre consulta general");
        assert_eq!(routes[0].area_id, areas[0].id);
    }

    #[test]
    fn title_lookup() {
        assert_eq!(title_of(&DATA_CHANNELS, "sheets"), Some("Google Sheets"));
        assert_eq!(title_of(&TONES, "friendly"), Some("Amigable"));
        assert_eq!(title_of(&TONES, "loud"), None);
    }
}
