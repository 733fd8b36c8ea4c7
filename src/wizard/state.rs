//! Wizard state machine: the active step list, the current index and the
//! aggregate configuration.
//!
//! States are the indices `0..N` of the step list for the selected agent
//! type. Transitions are [`advance`](WizardState::advance),
//! [`retreat`](WizardState::retreat) and [`jump_to`](WizardState::jump_to);
//! the index is clamped into range by every one of them.

use serde::Serialize;

use crate::error::WizardError;

use super::model::{AggregateConfig, StepOutput};
use super::steps::{AgentType, StepId, steps_for};

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct WizardState {
    /// `None` until the user picks WhatsApp or voice.
    pub agent_type: Option<AgentType>,
    pub current_step: usize,
    pub config: AggregateConfig,
}

impl WizardState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pick the flow and go back to its first step. Previously submitted
    /// outputs stay in the config.
    pub fn select_agent_type(&mut self, agent_type: AgentType) {
        self.agent_type = Some(agent_type);
        self.current_step = 0;
    }

    /// Submit the current step's output and move forward.
    ///
    /// The output is merged under the current step's key before the index
    /// moves; on the terminal step the index stays put.
    pub fn advance(&mut self, output: StepOutput) -> Result<usize, WizardError> {
        let expected = self
            .current_step_id()
            .ok_or(WizardError::AgentTypeNotSelected)?;
        let got = output.step();
        if got != expected {
            return Err(WizardError::StepMismatch { expected, got });
        }
        output
            .validate()
            .map_err(|errors| WizardError::Incomplete { step: got, errors })?;

        self.config.insert(output);
        self.current_step = (self.current_step + 1).min(self.last_index());
        Ok(self.current_step)
    }

    /// Step back, stopping at the first step.
    pub fn retreat(&mut self) -> usize {
        self.current_step = self.current_step.saturating_sub(1);
        self.current_step
    }

    /// Move directly to a step (summary edit links). Out-of-range indices
    /// land on the nearest valid one.
    pub fn jump_to(&mut self, index: usize) -> usize {
        self.current_step = index.min(self.last_index());
        self.current_step
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// The ordered steps of the selected flow; empty while unset.
    pub fn steps(&self) -> &'static [StepId] {
        self.agent_type.map(steps_for).unwrap_or(&[])
    }

    pub fn current_step_id(&self) -> Option<StepId> {
        self.steps().get(self.current_step).copied()
    }

    pub fn last_index(&self) -> usize {
        self.steps().len().saturating_sub(1)
    }

    /// Whether the wizard is on the summary/activation screen.
    pub fn is_terminal(&self) -> bool {
        self.agent_type.is_some() && self.current_step == self.last_index()
    }

    /// The output saved earlier for the current step, if any.
    pub fn current_draft(&self) -> Option<&StepOutput> {
        self.current_step_id().and_then(|step| self.config.get(step))
    }

    /// Submittable steps of the active flow that have no output yet.
    pub fn missing_steps(&self) -> Vec<StepId> {
        self.steps()
            .iter()
            .filter(|step| step.accepts_output() && !self.config.contains(**step))
            .copied()
            .collect()
    }
}
