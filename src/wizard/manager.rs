//! WizardManager: owns the wizard state and coordinates the external
//! services, the chat simulator and event fan-out to WebSocket clients.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::future::join_all;
use secrecy::SecretString;
use serde::Serialize;
use tokio::sync::{Mutex, RwLock, broadcast};
use tracing::{debug, info, warn};

use crate::config::WizardConfig;
use crate::error::{Error, Result, ServiceError, WizardError};
use crate::services::{
    CredentialValidator, Deployer, DeploymentReceipt, DeploymentRequest, InlineIngestor,
    KnowledgeIngestor, LengthHeuristicValidator, SponsorRegistry, StaticSponsorRegistry,
    StubDeployer,
};
use crate::simulator::{self, ChatMessage, ChatSimulator, SimulatorProfile};

use super::catalog;
use super::model::{
    ActivationMethod, AggregateConfig, ApiCredential, ProviderKind, ProviderSetup, SponsorGrant,
    StepOutput, VoiceKnowledge,
};
use super::state::WizardState;
use super::steps::{AgentType, IndicatorEntry, StepId, indicator};
use super::summary::Summary;
use super::validation::ValidationErrors;

pub const INVALID_SPONSOR_CODE: &str = "Código no válido. Verifica e intenta nuevamente.";
pub const MASKED_KEY_WITHOUT_SECRET: &str = "Ingresa la API key nuevamente";

/// The external collaborators, behind trait objects.
#[derive(Clone)]
pub struct WizardServices {
    pub deployer: Arc<dyn Deployer>,
    pub credentials: Arc<dyn CredentialValidator>,
    pub ingestor: Arc<dyn KnowledgeIngestor>,
    pub sponsors: Arc<dyn SponsorRegistry>,
}

impl WizardServices {
    /// In-process stand-ins, with the delays from `config`.
    pub fn stubs(config: &WizardConfig) -> Self {
        Self {
            deployer: Arc::new(StubDeployer),
            credentials: Arc::new(LengthHeuristicValidator::new(
                config.min_api_key_len,
                config.credential_check_delay,
            )),
            ingestor: Arc::new(InlineIngestor),
            sponsors: Arc::new(StaticSponsorRegistry::new(config.sponsor_check_delay)),
        }
    }
}

/// Snapshot of the wizard for the front-end.
#[derive(Debug, Clone, Serialize)]
pub struct WizardStatus {
    pub agent_type: Option<AgentType>,
    pub current_step: usize,
    pub step: Option<StepId>,
    pub title: Option<&'static str>,
    pub subtitle: Option<&'static str>,
    pub total_steps: usize,
    pub is_terminal: bool,
    pub indicator: Vec<IndicatorEntry>,
    pub missing_steps: Vec<StepId>,
    pub config: AggregateConfig,
}

impl WizardStatus {
    fn from_state(state: &WizardState) -> Self {
        let step = state.current_step_id();
        Self {
            agent_type: state.agent_type,
            current_step: state.current_step,
            step,
            title: step.map(|s| s.title()),
            subtitle: step.map(|s| s.subtitle()),
            total_steps: state.steps().len(),
            is_terminal: state.is_terminal(),
            indicator: indicator(state.steps(), state.current_step),
            missing_steps: state.missing_steps(),
            config: state.config.clone(),
        }
    }
}

/// Outcome of a sponsor-code check, shown inline under the code field.
#[derive(Debug, Clone, Serialize)]
pub struct SponsorRedemption {
    pub valid: bool,
    pub grant: Option<SponsorGrant>,
    pub message: String,
}

/// Events pushed to WebSocket clients.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WizardEvent {
    /// Full state (sent on connect and after every transition).
    Status { status: WizardStatus },
    /// A step's output was accepted.
    StepCompleted { step: StepId },
    /// The wizard went back to its initial state.
    Reset,
    /// A simulator message (user or agent).
    SimulatorMessage { message: ChatMessage },
    /// The simulated agent started or stopped "typing".
    SimulatorTyping { typing: bool },
    CredentialChecked { provider: ProviderKind, valid: bool },
    SponsorChecked { redemption: SponsorRedemption },
    Deployed { receipt: DeploymentReceipt },
    /// A client action was refused. Sent only to the client that asked.
    Rejected {
        action: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        step: Option<StepId>,
        error: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        fields: Option<ValidationErrors>,
    },
}

impl WizardEvent {
    pub fn rejected(action: &str, error: &Error) -> Self {
        let (step, fields) = match error {
            Error::Wizard(WizardError::Incomplete { step, errors }) => {
                (Some(*step), Some(errors.clone()))
            }
            Error::Wizard(WizardError::StepMismatch { expected, .. }) => (Some(*expected), None),
            Error::Wizard(WizardError::NotReadyToDeploy { step, .. }) => (Some(*step), None),
            _ => (None, None),
        };
        Self::Rejected {
            action: action.to_string(),
            step,
            error: error.to_string(),
            fields,
        }
    }
}

/// Coordinates the wizard: transitions, service calls and the simulator.
pub struct WizardManager {
    state: RwLock<WizardState>,
    services: WizardServices,
    simulator: Mutex<ChatSimulator>,
    typing_delay: Duration,
    tx: broadcast::Sender<WizardEvent>,
}

impl WizardManager {
    pub fn new(config: &WizardConfig, services: WizardServices) -> Self {
        let (tx, _rx) = broadcast::channel(config.event_capacity.max(1));
        Self {
            state: RwLock::new(WizardState::new()),
            services,
            simulator: Mutex::new(ChatSimulator::new()),
            typing_delay: config.typing_delay,
            tx,
        }
    }

    /// Subscribe to wizard events. Each WS client calls this.
    pub fn subscribe(&self) -> broadcast::Receiver<WizardEvent> {
        self.tx.subscribe()
    }

    fn emit(&self, event: WizardEvent) {
        // ok if no receivers are listening
        let _ = self.tx.send(event);
    }

    fn emit_status(&self, status: &WizardStatus) {
        self.emit(WizardEvent::Status {
            status: status.clone(),
        });
    }

    pub async fn status(&self) -> WizardStatus {
        WizardStatus::from_state(&*self.state.read().await)
    }

    pub async fn summary(&self) -> Option<Summary> {
        Summary::build(&*self.state.read().await)
    }

    /// Questions customers could ask about the brands picked so far.
    pub async fn example_questions(&self) -> Vec<&'static str> {
        let state = self.state.read().await;
        let brands = state
            .config
            .brands()
            .map(|b| b.brands.clone())
            .unwrap_or_default();
        catalog::example_questions(&brands)
    }

    // ── Transitions ─────────────────────────────────────────────────

    /// Pick the flow. Switching to the other flow also clears the
    /// simulator conversation.
    pub async fn select_agent_type(&self, agent_type: AgentType) -> WizardStatus {
        let (status, switched) = {
            let mut state = self.state.write().await;
            let switched = state.agent_type != Some(agent_type);
            state.select_agent_type(agent_type);
            (WizardStatus::from_state(&state), switched)
        };
        if switched {
            self.simulator.lock().await.reset(&SimulatorProfile::default());
        }
        info!(agent_type = %agent_type, switched, "Agent type selected");
        self.emit_status(&status);
        status
    }

    /// Submit the current step's form.
    ///
    /// Knowledge is ingested and sponsor codes redeemed before the output
    /// is stored; either failing leaves the wizard where it was.
    pub async fn submit(&self, output: StepOutput) -> Result<WizardStatus> {
        let step = output.step();
        {
            let state = self.state.read().await;
            let expected = state
                .current_step_id()
                .ok_or(WizardError::AgentTypeNotSelected)?;
            if expected != step {
                return Err(WizardError::StepMismatch {
                    expected,
                    got: step,
                }
                .into());
            }
        }

        let output = self.prepare(output).await?;

        let status = {
            let mut state = self.state.write().await;
            match state.advance(output) {
                Ok(index) => {
                    info!(step = %step, index, "Step completed");
                    WizardStatus::from_state(&state)
                }
                Err(e) => {
                    warn!(step = %step, error = %e, "Step rejected");
                    return Err(e.into());
                }
            }
        };

        self.emit(WizardEvent::StepCompleted { step });
        self.emit_status(&status);
        Ok(status)
    }

    /// Normalize an output and run the service calls it depends on.
    async fn prepare(&self, output: StepOutput) -> Result<StepOutput> {
        match output {
            StepOutput::Knowledge(mut submission) => {
                output_is_valid(&StepOutput::Knowledge(submission.clone()))?;
                let descriptor = self.services.ingestor.ingest(&submission.input).await?;
                submission.descriptor = Some(descriptor);
                Ok(StepOutput::Knowledge(submission))
            }
            StepOutput::VoiceProviders(mut setup) => {
                self.restore_redacted_keys(&mut setup).await?;
                output_is_valid(&StepOutput::VoiceProviders(setup.clone()))?;
                self.check_unverified_keys(&mut setup).await;
                Ok(StepOutput::VoiceProviders(setup))
            }
            StepOutput::VoiceFlow(mut flow) => {
                flow.retain_complete_areas();
                Ok(StepOutput::VoiceFlow(flow))
            }
            StepOutput::Simulator(mut review) => {
                if review.messages_exchanged == 0 {
                    review.messages_exchanged = self.simulator.lock().await.user_messages();
                }
                Ok(StepOutput::Simulator(review))
            }
            StepOutput::VoiceActivation(mut choice) => {
                choice.grant = None;
                if let ActivationMethod::Sponsor { code } = &choice.method {
                    output_is_valid(&StepOutput::VoiceActivation(choice.clone()))?;
                    match self.services.sponsors.redeem(code).await? {
                        Some(grant) => choice.grant = Some(grant),
                        None => {
                            return Err(WizardError::Incomplete {
                                step: StepId::VoiceActivation,
                                errors: ValidationErrors::single("code", INVALID_SPONSOR_CODE),
                            }
                            .into());
                        }
                    }
                }
                Ok(StepOutput::VoiceActivation(choice))
            }
            other => Ok(other),
        }
    }

    /// Drafts send keys back masked. Put the stored secret (and its check
    /// result) behind every mask; a mask with nothing stored is rejected.
    async fn restore_redacted_keys(&self, setup: &mut ProviderSetup) -> Result<()> {
        let state = self.state.read().await;
        let stored = state.config.providers();
        let mut errors = ValidationErrors::new();
        for (kind, credential) in credential_slots(setup) {
            if !credential.is_redacted() {
                continue;
            }
            match stored
                .and_then(|s| s.credential(kind))
                .filter(|previous| !previous.is_redacted())
            {
                Some(previous) => *credential = previous.clone(),
                None => errors.push(&kind.to_string(), MASKED_KEY_WITHOUT_SECRET),
            }
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(WizardError::Incomplete {
                step: StepId::VoiceProviders,
                errors,
            }
            .into())
        }
    }

    /// Validate every key the server has not checked yet, all at once. A
    /// check that cannot run leaves the key unchecked.
    async fn check_unverified_keys(&self, setup: &mut ProviderSetup) {
        let validator = &self.services.credentials;
        let mut slots = credential_slots(setup);
        slots.retain(|(_, credential)| credential.validated.is_none() && !credential.is_blank());

        let checks = slots
            .iter()
            .map(|(kind, credential)| validator.validate(*kind, &credential.api_key));
        let results = join_all(checks).await;

        for ((kind, credential), result) in slots.into_iter().zip(results) {
            match result {
                Ok(valid) => credential.validated = Some(valid),
                Err(e) => warn!(provider = %kind, error = %e, "Credential check unavailable"),
            }
        }
    }

    pub async fn retreat(&self) -> WizardStatus {
        let status = {
            let mut state = self.state.write().await;
            let index = state.retreat();
            debug!(index, "Wizard retreated");
            WizardStatus::from_state(&state)
        };
        self.emit_status(&status);
        status
    }

    pub async fn jump_to(&self, index: usize) -> WizardStatus {
        let status = {
            let mut state = self.state.write().await;
            let landed = state.jump_to(index);
            info!(requested = index, index = landed, "Wizard jumped");
            WizardStatus::from_state(&state)
        };
        self.emit_status(&status);
        status
    }

    /// Back to the agent-type picker with nothing saved.
    pub async fn reset(&self) -> WizardStatus {
        let status = {
            let mut state = self.state.write().await;
            state.reset();
            WizardStatus::from_state(&state)
        };
        self.simulator.lock().await.reset(&SimulatorProfile::default());
        info!("Wizard reset");
        self.emit(WizardEvent::Reset);
        self.emit_status(&status);
        status
    }

    /// Form contents for a step: what was saved, otherwise a suggestion
    /// for steps that can be pre-filled.
    pub async fn draft(&self, index: usize) -> Option<StepOutput> {
        let state = self.state.read().await;
        let step = *state.steps().get(index)?;
        if let Some(saved) = state.config.get(step) {
            return Some(saved.clone());
        }
        suggestion(step, &state.config)
    }

    /// One-click voice agent: pick voice and submit objectives inferred
    /// from a free-text description.
    pub async fn quick_voice_agent(&self, description: &str) -> Result<WizardStatus> {
        let description = description.trim();
        if description.is_empty() {
            return Err(ServiceError::InvalidInput("empty agent description".into()).into());
        }
        let objectives = catalog::infer_voice_objectives(description);
        info!(objectives = ?objectives.selected, "Quick voice agent requested");
        self.select_agent_type(AgentType::Voice).await;
        self.submit(StepOutput::VoiceObjectives(objectives)).await
    }

    // ── Service checks ──────────────────────────────────────────────

    pub async fn validate_credential(&self, kind: ProviderKind, key: &SecretString) -> Result<bool> {
        let valid = self.services.credentials.validate(kind, key).await?;
        info!(provider = %kind, valid, "Credential validated");
        self.emit(WizardEvent::CredentialChecked {
            provider: kind,
            valid,
        });
        Ok(valid)
    }

    /// Check a sponsor code without submitting the activation step.
    /// Unknown codes are a normal outcome, not an error.
    pub async fn redeem_sponsor_code(&self, code: &str) -> Result<SponsorRedemption> {
        let code = code.trim();
        if code.is_empty() {
            return Err(ServiceError::InvalidInput("empty sponsor code".into()).into());
        }
        let grant = self.services.sponsors.redeem(code).await?;
        let redemption = match grant {
            Some(grant) => SponsorRedemption {
                valid: true,
                message: format!(
                    "Código válido. Patrocinado por {} por {} meses",
                    grant.brand.name(),
                    grant.duration_months
                ),
                grant: Some(grant),
            },
            None => SponsorRedemption {
                valid: false,
                grant: None,
                message: INVALID_SPONSOR_CODE.to_string(),
            },
        };
        info!(valid = redemption.valid, "Sponsor code checked");
        self.emit(WizardEvent::SponsorChecked {
            redemption: redemption.clone(),
        });
        Ok(redemption)
    }

    /// Hand the finished configuration to the deployer.
    pub async fn deploy(&self) -> Result<DeploymentReceipt> {
        let request = {
            let state = self.state.read().await;
            let agent_type = state.agent_type.ok_or(WizardError::AgentTypeNotSelected)?;
            let missing = state.missing_steps();
            let current = state.current_step_id().ok_or(WizardError::AgentTypeNotSelected)?;
            if !state.is_terminal() || !missing.is_empty() {
                return Err(WizardError::NotReadyToDeploy {
                    step: current,
                    missing,
                }
                .into());
            }
            if agent_type == AgentType::Voice
                && !state.config.activation().is_some_and(|a| a.is_ready())
            {
                return Err(WizardError::ActivationRequired.into());
            }
            DeploymentRequest {
                agent_type,
                config: state.config.clone(),
                requested_at: Utc::now(),
            }
        };

        let receipt = match self.services.deployer.deploy(&request).await {
            Ok(receipt) => receipt,
            Err(e) => {
                warn!(agent_type = %request.agent_type, error = %e, "Deployment failed");
                return Err(e.into());
            }
        };
        info!(
            deployment_id = %receipt.deployment_id,
            agent_type = %receipt.agent_type,
            "Deployment accepted"
        );
        self.emit(WizardEvent::Deployed {
            receipt: receipt.clone(),
        });
        Ok(receipt)
    }

    // ── Simulator ───────────────────────────────────────────────────

    /// Send a customer message and wait for the simulated reply.
    pub async fn simulate(&self, text: &str) -> Result<ChatMessage> {
        let profile = SimulatorProfile::from_config(&self.state.read().await.config);
        let (user, reply) = self
            .simulator
            .lock()
            .await
            .send(text, &profile)
            .ok_or_else(|| ServiceError::InvalidInput("empty message".into()))?;
        debug!(message_id = %user.id, "Simulator message received");
        self.emit(WizardEvent::SimulatorMessage { message: user });

        self.emit(WizardEvent::SimulatorTyping { typing: true });
        if !self.typing_delay.is_zero() {
            tokio::time::sleep(self.typing_delay).await;
        }
        let agent = self.simulator.lock().await.push_reply(&reply);
        self.emit(WizardEvent::SimulatorTyping { typing: false });
        self.emit(WizardEvent::SimulatorMessage {
            message: agent.clone(),
        });
        Ok(agent)
    }

    pub async fn quick_test(&self, id: &str) -> Result<ChatMessage> {
        let test = simulator::quick_test(id)
            .ok_or_else(|| ServiceError::InvalidInput(format!("unknown quick test: {id}")))?;
        self.simulate(test.message).await
    }

    /// Clear the conversation; returns the new transcript (the greeting,
    /// when one is configured).
    pub async fn reset_simulator(&self) -> Vec<ChatMessage> {
        let profile = SimulatorProfile::from_config(&self.state.read().await.config);
        let mut sim = self.simulator.lock().await;
        if let Some(greeting) = sim.reset(&profile) {
            self.emit(WizardEvent::SimulatorMessage { message: greeting });
        }
        sim.transcript().to_vec()
    }

    pub async fn transcript(&self) -> Vec<ChatMessage> {
        self.simulator.lock().await.transcript().to_vec()
    }
}

fn credential_slots(setup: &mut ProviderSetup) -> Vec<(ProviderKind, &mut ApiCredential)> {
    let mut slots: Vec<(ProviderKind, &mut ApiCredential)> = vec![
        (ProviderKind::Llm, &mut setup.llm),
        (ProviderKind::Tts, &mut setup.tts),
        (ProviderKind::Stt, &mut setup.stt),
    ];
    if let Some(telephony) = setup.telephony.as_mut() {
        slots.push((ProviderKind::Telephony, telephony));
    }
    slots
}

fn output_is_valid(output: &StepOutput) -> Result<()> {
    output.validate().map_err(|errors| {
        Error::from(WizardError::Incomplete {
            step: output.step(),
            errors,
        })
    })
}

/// Pre-filled form content for steps derived from earlier answers.
fn suggestion(step: StepId, config: &AggregateConfig) -> Option<StepOutput> {
    match step {
        StepId::VoiceKnowledge => {
            let brands = config
                .brands()
                .map(|b| b.brands.as_slice())
                .unwrap_or_default();
            Some(StepOutput::VoiceKnowledge(VoiceKnowledge::from_brands(brands)))
        }
        StepId::VoiceFlow => {
            let objectives = config.voice_objectives()?;
            let flow = if objectives.wants_manual_flow() {
                catalog::manual_flow()
            } else {
                catalog::generate_flow(objectives)
            };
            Some(StepOutput::VoiceFlow(flow))
        }
        _ => None,
    }
}
