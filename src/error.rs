//! Error types for the onboarding wizard.

use crate::wizard::steps::StepId;
use crate::wizard::validation::ValidationErrors;

/// Top-level error type for the wizard service.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Wizard error: {0}")]
    Wizard(#[from] WizardError),

    #[error("Service error: {0}")]
    Service(#[from] ServiceError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Errors raised by wizard transitions.
#[derive(Debug, thiserror::Error)]
pub enum WizardError {
    #[error("No agent type selected")]
    AgentTypeNotSelected,

    #[error("Submitted output for step {got} while the wizard is on step {expected}")]
    StepMismatch { expected: StepId, got: StepId },

    #[error("Step {step} is incomplete: {errors}")]
    Incomplete {
        step: StepId,
        errors: ValidationErrors,
    },

    #[error("Cannot deploy from step {step}; missing steps: {missing:?}")]
    NotReadyToDeploy { step: StepId, missing: Vec<StepId> },

    #[error("Voice agents need a validated sponsor code or a payment plan before deploying")]
    ActivationRequired,
}

/// Errors returned by external collaborators (deployment, ingestion,
/// credential and sponsor checks).
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Deployment failed: {reason}")]
    DeploymentFailed { reason: String },

    #[error("Knowledge ingestion failed: {reason}")]
    IngestionFailed { reason: String },

    #[error("Validation service {service} unavailable: {reason}")]
    ValidationUnavailable { service: String, reason: String },

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type alias for the wizard service.
pub type Result<T> = std::result::Result<T, Error>;
