//! Step output data models and the aggregate configuration.
//!
//! Every submittable step produces one strongly typed [`StepOutput`]
//! variant. The controller stores them in [`AggregateConfig`] keyed by
//! [`StepId`]; step forms only ever see copies.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::steps::StepId;

// ── Objective (WhatsApp) ────────────────────────────────────────────────

/// Primary purpose of a WhatsApp agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Objective {
    Appointment,
    Sales,
    Support,
    Comprehensive,
}

/// Kind of clinic the agent serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClinicType {
    #[default]
    General,
    Specialty,
    Emergency,
    Hospital,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectiveSelection {
    pub objective: Objective,
    #[serde(default)]
    pub clinic_type: ClinicType,
}

// ── Knowledge (WhatsApp) ────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KnowledgeKind {
    Text,
    Website,
    File,
}

impl std::fmt::Display for KnowledgeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Website => write!(f, "website"),
            Self::File => write!(f, "file"),
        }
    }
}

/// Raw knowledge the clinic hands to the agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum KnowledgeInput {
    Text {
        content: String,
    },
    Website {
        url: String,
    },
    File {
        file_name: String,
        #[serde(default)]
        size_bytes: u64,
    },
}

impl KnowledgeInput {
    pub fn kind(&self) -> KnowledgeKind {
        match self {
            Self::Text { .. } => KnowledgeKind::Text,
            Self::Website { .. } => KnowledgeKind::Website,
            Self::File { .. } => KnowledgeKind::File,
        }
    }
}

/// Opaque handle returned by the knowledge ingestion service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnowledgeDescriptor {
    pub id: Uuid,
    pub kind: KnowledgeKind,
    /// Human-readable label (text excerpt, URL or file name).
    pub label: String,
    /// Characters for text, bytes for files, 0 for websites.
    pub size: u64,
    pub ingested_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnowledgeSubmission {
    pub input: KnowledgeInput,
    /// Filled in by the manager once ingestion succeeds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub descriptor: Option<KnowledgeDescriptor>,
}

impl KnowledgeSubmission {
    pub fn new(input: KnowledgeInput) -> Self {
        Self {
            input,
            descriptor: None,
        }
    }
}

// ── Brands ──────────────────────────────────────────────────────────────

/// Veterinary brands the agent can recommend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Brand {
    RoyalCanin,
    Hills,
    PurinaPro,
    Eukanuba,
    Advance,
    Nupec,
    Bayer,
    Zoetis,
}

impl Brand {
    pub const ALL: [Brand; 8] = [
        Brand::RoyalCanin,
        Brand::Hills,
        Brand::PurinaPro,
        Brand::Eukanuba,
        Brand::Advance,
        Brand::Nupec,
        Brand::Bayer,
        Brand::Zoetis,
    ];

    /// Display name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::RoyalCanin => "Royal Canin",
            Self::Hills => "Hill's",
            Self::PurinaPro => "Purina Pro Plan",
            Self::Eukanuba => "Eukanuba",
            Self::Advance => "Advance",
            Self::Nupec => "Nupec",
            Self::Bayer => "Bayer",
            Self::Zoetis => "Zoetis",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrandSelection {
    #[serde(default)]
    pub brands: Vec<Brand>,
}

impl BrandSelection {
    /// Add the brand if absent, remove it otherwise. Keeps pick order.
    pub fn toggle(&mut self, brand: Brand) {
        if let Some(pos) = self.brands.iter().position(|b| *b == brand) {
            self.brands.remove(pos);
        } else {
            self.brands.push(brand);
        }
    }

    pub fn contains(&self, brand: Brand) -> bool {
        self.brands.contains(&brand)
    }
}

// ── Behavior (WhatsApp) ─────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tone {
    Formal,
    #[default]
    Friendly,
    Casual,
}

/// Where captured lead data is delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataChannel {
    Email,
    Whatsapp,
    #[default]
    Sheets,
}

/// What the agent does when it does not understand the customer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackAction {
    Retry,
    Human,
    #[default]
    Polite,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BehaviorSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub greeting: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tone: Option<Tone>,
    #[serde(default)]
    pub data_channel: DataChannel,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_info: Option<String>,
    #[serde(default)]
    pub fallback_action: FallbackAction,
}

impl BehaviorSettings {
    /// The custom greeting, if one was actually written.
    pub fn greeting(&self) -> Option<&str> {
        non_blank(self.greeting.as_deref())
    }

    pub fn contact_info(&self) -> Option<&str> {
        non_blank(self.contact_info.as_deref())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulatorReview {
    #[serde(default)]
    pub messages_exchanged: usize,
}

// ── Voice objectives ────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoiceObjective {
    GeneralInfo,
    Appointments,
    Products,
    PostSurgery,
    Emergencies,
    Transfer,
}

impl VoiceObjective {
    pub const ALL: [VoiceObjective; 6] = [
        VoiceObjective::GeneralInfo,
        VoiceObjective::Appointments,
        VoiceObjective::Products,
        VoiceObjective::PostSurgery,
        VoiceObjective::Emergencies,
        VoiceObjective::Transfer,
    ];
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoiceObjectives {
    #[serde(default)]
    pub selected: Vec<VoiceObjective>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom: Option<String>,
}

impl VoiceObjectives {
    pub fn custom(&self) -> Option<&str> {
        non_blank(self.custom.as_deref())
    }

    /// A free-text objective skips flow generation and goes to the
    /// manual flow editor.
    pub fn wants_manual_flow(&self) -> bool {
        self.custom().is_some()
    }

    pub fn contains(&self, objective: VoiceObjective) -> bool {
        self.selected.contains(&objective)
    }
}

// ── Voice knowledge ─────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoiceKnowledge {
    #[serde(default = "default_true")]
    pub use_existing_brands: bool,
    #[serde(default)]
    pub existing_brands: Vec<Brand>,
    #[serde(default)]
    pub additional_knowledge: String,
    /// Sponsored knowledge blocks, on or off per brand.
    #[serde(default = "default_sponsored")]
    pub sponsored: BTreeMap<Brand, bool>,
}

impl Default for VoiceKnowledge {
    fn default() -> Self {
        Self {
            use_existing_brands: true,
            existing_brands: Vec::new(),
            additional_knowledge: String::new(),
            sponsored: default_sponsored(),
        }
    }
}

impl VoiceKnowledge {
    /// Pre-fill from brands already chosen in another flow.
    pub fn from_brands(brands: &[Brand]) -> Self {
        Self {
            existing_brands: brands.to_vec(),
            ..Self::default()
        }
    }

    pub fn toggle_sponsored(&mut self, brand: Brand) {
        let enabled = self.sponsored.entry(brand).or_insert(false);
        *enabled = !*enabled;
    }

    pub fn enabled_sponsors(&self) -> Vec<Brand> {
        self.sponsored
            .iter()
            .filter(|(_, enabled)| **enabled)
            .map(|(brand, _)| *brand)
            .collect()
    }

    /// Brands the agent will actually know about.
    pub fn effective_brands(&self) -> &[Brand] {
        if self.use_existing_brands {
            &self.existing_brands
        } else {
            &[]
        }
    }
}

fn default_sponsored() -> BTreeMap<Brand, bool> {
    BTreeMap::from([
        (Brand::Hills, true),
        (Brand::RoyalCanin, false),
        (Brand::PurinaPro, true),
        (Brand::Bayer, false),
    ])
}

// ── Voice providers ─────────────────────────────────────────────────────

/// External AI/telephony service a voice agent depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    Llm,
    Tts,
    Stt,
    Telephony,
}

impl ProviderKind {
    /// Vendor whose key is requested for this slot.
    pub fn vendor(&self) -> &'static str {
        match self {
            Self::Llm => "OpenAI",
            Self::Tts => "ElevenLabs",
            Self::Stt => "Deepgram",
            Self::Telephony => "Twilio",
        }
    }

    pub fn is_required(&self) -> bool {
        !matches!(self, Self::Telephony)
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Llm => write!(f, "llm"),
            Self::Tts => write!(f, "tts"),
            Self::Stt => write!(f, "stt"),
            Self::Telephony => write!(f, "telephony"),
        }
    }
}

/// An API key plus the outcome of its last validation (`None` = never
/// checked). The key is never serialized in clear, and `validated` is only
/// ever set server side.
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiCredential {
    #[serde(with = "redacted_secret")]
    pub api_key: SecretString,
    #[serde(default, skip_deserializing)]
    pub validated: Option<bool>,
}

impl ApiCredential {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: SecretString::from(api_key.into()),
            validated: None,
        }
    }

    pub fn with_validated(mut self, validated: bool) -> Self {
        self.validated = Some(validated);
        self
    }

    pub fn is_blank(&self) -> bool {
        self.api_key.expose_secret().trim().is_empty()
    }

    /// The key is the placeholder sent back in drafts, not a real key.
    pub fn is_redacted(&self) -> bool {
        self.api_key.expose_secret() == REDACTED
    }
}

impl Clone for ApiCredential {
    fn clone(&self) -> Self {
        Self {
            api_key: SecretString::from(self.api_key.expose_secret().to_string()),
            validated: self.validated,
        }
    }
}

impl PartialEq for ApiCredential {
    fn eq(&self, other: &Self) -> bool {
        self.api_key.expose_secret() == other.api_key.expose_secret()
            && self.validated == other.validated
    }
}

/// Placeholder written wherever an API key would be serialized.
pub const REDACTED: &str = "********";

mod redacted_secret {
    use secrecy::SecretString;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(_key: &SecretString, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(super::REDACTED)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<SecretString, D::Error> {
        String::deserialize(deserializer).map(SecretString::from)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LanguageModel {
    #[default]
    #[serde(rename = "gpt-4")]
    Gpt4,
    #[serde(rename = "gpt-3.5-turbo")]
    Gpt35Turbo,
    #[serde(rename = "claude-3")]
    Claude3,
}

/// Generation parameters for the agent's language model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelParameters {
    #[serde(default)]
    pub model: LanguageModel,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_top_p")]
    pub top_p: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

impl Default for ModelParameters {
    fn default() -> Self {
        Self {
            model: LanguageModel::default(),
            temperature: default_temperature(),
            top_p: default_top_p(),
            max_tokens: default_max_tokens(),
        }
    }
}

fn default_temperature() -> f32 {
    0.7
}

fn default_top_p() -> f32 {
    0.9
}

fn default_max_tokens() -> u32 {
    150
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderSetup {
    pub llm: ApiCredential,
    pub tts: ApiCredential,
    pub stt: ApiCredential,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub telephony: Option<ApiCredential>,
    #[serde(default)]
    pub model: ModelParameters,
}

impl ProviderSetup {
    pub fn credential(&self, kind: ProviderKind) -> Option<&ApiCredential> {
        match kind {
            ProviderKind::Llm => Some(&self.llm),
            ProviderKind::Tts => Some(&self.tts),
            ProviderKind::Stt => Some(&self.stt),
            ProviderKind::Telephony => self.telephony.as_ref(),
        }
    }
}

// ── Voice settings ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Language {
    #[default]
    Es,
    En,
    Pt,
    Fr,
}

impl Language {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Es => "Español",
            Self::En => "Inglés",
            Self::Pt => "Portugués",
            Self::Fr => "Francés",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TtsProvider {
    Elevenlabs,
    Openai,
    Google,
    Azure,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SttProvider {
    Deepgram,
    Whisper,
    Google,
    Azure,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoiceType {
    Natural,
    Professional,
    Empathetic,
    Technical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum VoiceLocale {
    #[serde(rename = "es-ES")]
    EsEs,
    #[default]
    #[serde(rename = "es-MX")]
    EsMx,
    #[serde(rename = "es-AR")]
    EsAr,
    #[serde(rename = "en-US")]
    EnUs,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoiceSettings {
    pub agent_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub language: Language,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    pub tts_provider: TtsProvider,
    pub voice_type: VoiceType,
    #[serde(default)]
    pub voice_locale: VoiceLocale,
    #[serde(default = "default_voice_speed")]
    pub voice_speed: f32,
    pub stt_provider: SttProvider,
    /// Read a canned text when speech recognition fails.
    #[serde(default = "default_true")]
    pub fallback_enabled: bool,
}

fn default_voice_speed() -> f32 {
    1.0
}

// ── Conversation flow ───────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowMode {
    #[default]
    Generated,
    Manual,
}

/// A clinic department calls can be routed to from reception.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClinicArea {
    pub id: String,
    pub name: String,
    pub responsible: String,
    pub whatsapp: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl ClinicArea {
    pub fn new(name: &str, responsible: &str, whatsapp: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            responsible: responsible.to_string(),
            whatsapp: whatsapp.to_string(),
            email: None,
        }
    }

    /// Name, responsible and WhatsApp are all filled in.
    pub fn is_complete(&self) -> bool {
        !self.name.trim().is_empty()
            && !self.responsible.trim().is_empty()
            && !self.whatsapp.trim().is_empty()
    }
}

/// Reception → area routing rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AreaRoute {
    pub area_id: String,
    pub condition: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationFlow {
    #[serde(default)]
    pub mode: FlowMode,
    pub greeting: String,
    pub closing_message: String,
    #[serde(default = "default_true")]
    pub faq_enabled: bool,
    #[serde(default = "default_true")]
    pub memory_enabled: bool,
    #[serde(default)]
    pub areas: Vec<ClinicArea>,
    #[serde(default)]
    pub routes: Vec<AreaRoute>,
}

impl ConversationFlow {
    /// Drop half-filled areas and any route pointing at them.
    pub fn retain_complete_areas(&mut self) {
        self.areas.retain(ClinicArea::is_complete);
        let areas = &self.areas;
        self.routes
            .retain(|route| areas.iter().any(|area| area.id == route.area_id));
    }
}

// ── Phone ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Country {
    #[default]
    Mexico,
    Usa,
    Spain,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "option", rename_all = "snake_case")]
pub enum PhoneNumberChoice {
    /// Reuse a number the clinic already has on the platform.
    Existing { number: String },
    /// Request a new number.
    New {
        number: String,
        #[serde(default)]
        country: Country,
    },
    /// Configure telephony later.
    Later,
}

/// What happens when the agent cannot take a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallFallback {
    #[default]
    Retry,
    Whatsapp,
    Voicemail,
    Human,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhoneSetup {
    pub number: PhoneNumberChoice,
    #[serde(default)]
    pub fallback: CallFallback,
}

impl PhoneSetup {
    pub fn number(&self) -> Option<&str> {
        match &self.number {
            PhoneNumberChoice::Existing { number } | PhoneNumberChoice::New { number, .. } => {
                Some(number.as_str())
            }
            PhoneNumberChoice::Later => None,
        }
    }
}

// ── Activation ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BillingCycle {
    Monthly,
    Annual,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ActivationMethod {
    Sponsor { code: String },
    Payment { billing: BillingCycle },
}

/// A brand sponsorship unlocked by a sponsor code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SponsorGrant {
    pub brand: Brand,
    pub sponsor: String,
    pub duration_months: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivationChoice {
    pub method: ActivationMethod,
    /// Set once a sponsor code has been redeemed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grant: Option<SponsorGrant>,
}

impl ActivationChoice {
    pub fn sponsor(code: &str) -> Self {
        Self {
            method: ActivationMethod::Sponsor {
                code: code.to_string(),
            },
            grant: None,
        }
    }

    pub fn payment(billing: BillingCycle) -> Self {
        Self {
            method: ActivationMethod::Payment { billing },
            grant: None,
        }
    }

    /// Payment is always ready; a sponsor code only once redeemed.
    pub fn is_ready(&self) -> bool {
        match self.method {
            ActivationMethod::Payment { .. } => true,
            ActivationMethod::Sponsor { .. } => self.grant.is_some(),
        }
    }
}

// ── Step output union ───────────────────────────────────────────────────

/// The output of one wizard step, tagged by the step it belongs to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum StepOutput {
    Objective(ObjectiveSelection),
    Knowledge(KnowledgeSubmission),
    Brands(BrandSelection),
    Behavior(BehaviorSettings),
    Simulator(SimulatorReview),
    VoiceObjectives(VoiceObjectives),
    VoiceKnowledge(VoiceKnowledge),
    VoiceProviders(ProviderSetup),
    VoiceSettings(VoiceSettings),
    VoiceFlow(ConversationFlow),
    VoicePhone(PhoneSetup),
    VoiceActivation(ActivationChoice),
}

impl StepOutput {
    /// The step this output is stored under.
    pub fn step(&self) -> StepId {
        match self {
            Self::Objective(_) => StepId::Objective,
            Self::Knowledge(_) => StepId::Knowledge,
            Self::Brands(_) => StepId::Brands,
            Self::Behavior(_) => StepId::Behavior,
            Self::Simulator(_) => StepId::Simulator,
            Self::VoiceObjectives(_) => StepId::VoiceObjectives,
            Self::VoiceKnowledge(_) => StepId::VoiceKnowledge,
            Self::VoiceProviders(_) => StepId::VoiceProviders,
            Self::VoiceSettings(_) => StepId::VoiceSettings,
            Self::VoiceFlow(_) => StepId::VoiceFlow,
            Self::VoicePhone(_) => StepId::VoicePhone,
            Self::VoiceActivation(_) => StepId::VoiceActivation,
        }
    }
}

/// Accumulated step outputs, keyed by step.
///
/// Entries are only inserted or overwritten; the whole map is cleared on
/// reset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AggregateConfig {
    entries: BTreeMap<StepId, StepOutput>,
}

impl AggregateConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store an output under its step, returning what it replaced.
    pub fn insert(&mut self, output: StepOutput) -> Option<StepOutput> {
        self.entries.insert(output.step(), output)
    }

    pub fn get(&self, step: StepId) -> Option<&StepOutput> {
        self.entries.get(&step)
    }

    pub fn contains(&self, step: StepId) -> bool {
        self.entries.contains_key(&step)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn steps(&self) -> impl Iterator<Item = StepId> + '_ {
        self.entries.keys().copied()
    }

    pub fn objective(&self) -> Option<&ObjectiveSelection> {
        match self.get(StepId::Objective) {
            Some(StepOutput::Objective(v)) => Some(v),
            _ => None,
        }
    }

    pub fn knowledge(&self) -> Option<&KnowledgeSubmission> {
        match self.get(StepId::Knowledge) {
            Some(StepOutput::Knowledge(v)) => Some(v),
            _ => None,
        }
    }

    pub fn brands(&self) -> Option<&BrandSelection> {
        match self.get(StepId::Brands) {
            Some(StepOutput::Brands(v)) => Some(v),
            _ => None,
        }
    }

    pub fn behavior(&self) -> Option<&BehaviorSettings> {
        match self.get(StepId::Behavior) {
            Some(StepOutput::Behavior(v)) => Some(v),
            _ => None,
        }
    }

    pub fn voice_objectives(&self) -> Option<&VoiceObjectives> {
        match self.get(StepId::VoiceObjectives) {
            Some(StepOutput::VoiceObjectives(v)) => Some(v),
            _ => None,
        }
    }

    pub fn voice_knowledge(&self) -> Option<&VoiceKnowledge> {
        match self.get(StepId::VoiceKnowledge) {
            Some(StepOutput::VoiceKnowledge(v)) => Some(v),
            _ => None,
        }
    }

    pub fn providers(&self) -> Option<&ProviderSetup> {
        match self.get(StepId::VoiceProviders) {
            Some(StepOutput::VoiceProviders(v)) => Some(v),
            _ => None,
        }
    }

    pub fn voice_settings(&self) -> Option<&VoiceSettings> {
        match self.get(StepId::VoiceSettings) {
            Some(StepOutput::VoiceSettings(v)) => Some(v),
            _ => None,
        }
    }

    pub fn voice_flow(&self) -> Option<&ConversationFlow> {
        match self.get(StepId::VoiceFlow) {
            Some(StepOutput::VoiceFlow(v)) => Some(v),
            _ => None,
        }
    }

    pub fn phone(&self) -> Option<&PhoneSetup> {
        match self.get(StepId::VoicePhone) {
            Some(StepOutput::VoicePhone(v)) => Some(v),
            _ => None,
        }
    }

    pub fn activation(&self) -> Option<&ActivationChoice> {
        match self.get(StepId::VoiceActivation) {
            Some(StepOutput::VoiceActivation(v)) => Some(v),
            _ => None,
        }
    }
}

fn default_true() -> bool {
    true
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_output_tagged_by_step() {
        let output = StepOutput::Objective(ObjectiveSelection {
            objective: Objective::Appointment,
            clinic_type: ClinicType::General,
        });
        let json = serde_json::to_value(&output).unwrap();
        assert_eq!(json["step"], "objective");
        assert_eq!(json["objective"], "appointment");
        assert_eq!(json["clinic_type"], "general");
    }

    #[test]
    fn step_output_parses_from_form_json() {
        let output: StepOutput = serde_json::from_value(serde_json::json!({
            "step": "knowledge",
            "input": {"type": "website", "url": "https://clinica.example"}
        }))
        .unwrap();
        assert_eq!(output.step(), StepId::Knowledge);
        match output {
            StepOutput::Knowledge(k) => {
                assert_eq!(k.input.kind(), KnowledgeKind::Website);
                assert!(k.descriptor.is_none());
            }
            other => panic!("Expected knowledge output, got {other:?}"),
        }
    }

    #[test]
    fn clinic_type_defaults_to_general() {
        let output: StepOutput = serde_json::from_value(serde_json::json!({
            "step": "objective",
            "objective": "sales"
        }))
        .unwrap();
        match output {
            StepOutput::Objective(sel) => assert_eq!(sel.clinic_type, ClinicType::General),
            other => panic!("Expected objective output, got {other:?}"),
        }
    }

    #[test]
    fn aggregate_overwrites_same_step() {
        let mut config = AggregateConfig::new();
        assert!(config.insert(StepOutput::Brands(BrandSelection {
            brands: vec![Brand::Hills],
        }))
        .is_none());
        let previous = config.insert(StepOutput::Brands(BrandSelection {
            brands: vec![Brand::Bayer, Brand::Zoetis],
        }));
        assert!(previous.is_some());
        assert_eq!(config.len(), 1);
        assert_eq!(config.brands().unwrap().brands, vec![Brand::Bayer, Brand::Zoetis]);
    }

    #[test]
    fn aggregate_serializes_as_map_keyed_by_step() {
        let mut config = AggregateConfig::new();
        config.insert(StepOutput::Simulator(SimulatorReview {
            messages_exchanged: 4,
        }));
        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(json["simulator"]["messages_exchanged"], 4);
    }

    #[test]
    fn credentials_never_serialize_in_clear() {
        let setup = ProviderSetup {
            llm: ApiCredential::new("sk-live-very-secret"),
            tts: ApiCredential::new("sk_tts_secret_value"),
            stt: ApiCredential::new("deepgram-secret-key"),
            telephony: None,
            model: ModelParameters::default(),
        };
        let json = serde_json::to_string(&StepOutput::VoiceProviders(setup)).unwrap();
        assert!(!json.contains("very-secret"));
        assert!(!json.contains("deepgram-secret"));
        assert!(json.contains(REDACTED));
    }

    #[test]
    fn credential_deserializes_secret() {
        let cred: ApiCredential =
            serde_json::from_str(r#"{"api_key": "sk-abcdefghijk"}"#).unwrap();
        assert_eq!(cred.api_key.expose_secret(), "sk-abcdefghijk");
        assert_eq!(cred.validated, None);
        assert!(!cred.is_blank());
        assert!(!cred.is_redacted());
        assert!(ApiCredential::new("   ").is_blank());
        assert!(ApiCredential::new(REDACTED).is_redacted());
    }

    #[test]
    fn client_cannot_mark_key_validated() {
        let cred: ApiCredential =
            serde_json::from_str(r#"{"api_key": "abc", "validated": true}"#).unwrap();
        assert_eq!(cred.validated, None);
    }

    #[test]
    fn brand_ids_match_catalog_slugs() {
        assert_eq!(serde_json::to_string(&Brand::RoyalCanin).unwrap(), "\"royal-canin\"");
        assert_eq!(serde_json::to_string(&Brand::PurinaPro).unwrap(), "\"purina-pro\"");
        assert_eq!(Brand::Hills.name(), "Hill's");
    }

    #[test]
    fn brand_toggle_adds_and_removes() {
        let mut selection = BrandSelection::default();
        selection.toggle(Brand::Hills);
        selection.toggle(Brand::Nupec);
        assert!(selection.contains(Brand::Hills));
        selection.toggle(Brand::Hills);
        assert!(!selection.contains(Brand::Hills));
        assert_eq!(selection.brands, vec![Brand::Nupec]);
    }

    #[test]
    fn voice_knowledge_defaults() {
        let knowledge = VoiceKnowledge::from_brands(&[Brand::RoyalCanin, Brand::Eukanuba]);
        assert!(knowledge.use_existing_brands);
        assert_eq!(knowledge.effective_brands().len(), 2);
        assert_eq!(knowledge.enabled_sponsors(), vec![Brand::Hills, Brand::PurinaPro]);
    }

    #[test]
    fn voice_knowledge_toggle_and_opt_out() {
        let mut knowledge = VoiceKnowledge::from_brands(&[Brand::Advance]);
        knowledge.toggle_sponsored(Brand::Bayer);
        knowledge.toggle_sponsored(Brand::Hills);
        assert_eq!(knowledge.enabled_sponsors(), vec![Brand::PurinaPro, Brand::Bayer]);
        knowledge.use_existing_brands = false;
        assert!(knowledge.effective_brands().is_empty());
    }

    #[test]
    fn flow_drops_incomplete_areas_and_their_routes() {
        let complete = ClinicArea::new("Urgencias", "Dra. Ruiz", "+52 55 1111 2222");
        let partial = ClinicArea::new("Cirugía", "", "");
        let mut flow = ConversationFlow {
            mode: FlowMode::Manual,
            greeting: "Hola".into(),
            closing_message: "Adiós".into(),
            faq_enabled: true,
            memory_enabled: true,
            routes: vec![
                AreaRoute {
                    area_id: complete.id.clone(),
                    condition: "urgencias".into(),
                },
                AreaRoute {
                    area_id: partial.id.clone(),
                    condition: "cirugía".into(),
                },
            ],
            areas: vec![complete.clone(), partial],
        };
        flow.retain_complete_areas();
        assert_eq!(flow.areas, vec![complete.clone()]);
        assert_eq!(flow.routes.len(), 1);
        assert_eq!(flow.routes[0].area_id, complete.id);
    }

    #[test]
    fn activation_readiness() {
        assert!(ActivationChoice::payment(BillingCycle::Monthly).is_ready());
        let mut sponsor = ActivationChoice::sponsor("HILLS2024");
        assert!(!sponsor.is_ready());
        sponsor.grant = Some(SponsorGrant {
            brand: Brand::Hills,
            sponsor: "Hill's Pet Nutrition".into(),
            duration_months: 6,
        });
        assert!(sponsor.is_ready());
    }

    #[test]
    fn phone_number_choice() {
        let setup: PhoneSetup = serde_json::from_value(serde_json::json!({
            "number": {"option": "new", "number": "+52 55 9999 0000"}
        }))
        .unwrap();
        assert_eq!(setup.number(), Some("+52 55 9999 0000"));
        assert_eq!(setup.fallback, CallFallback::Retry);

        let later = PhoneSetup {
            number: PhoneNumberChoice::Later,
            fallback: CallFallback::Human,
        };
        assert_eq!(later.number(), None);
    }
}
