//! Onboarding wizard for veterinary clinic agents.
//!
//! The user picks an agent type (WhatsApp or voice) and walks an ordered
//! list of steps. Each step yields a typed [`StepOutput`] that is merged
//! into the [`AggregateConfig`]; the last step reviews everything and
//! hands it to the deployer.

pub mod catalog;
pub mod manager;
pub mod model;
pub mod routes;
pub mod state;
pub mod steps;
pub mod summary;
pub mod validation;

pub use manager::{SponsorRedemption, WizardEvent, WizardManager, WizardServices, WizardStatus};
pub use model::{AggregateConfig, StepOutput};
pub use routes::{WizardRouteState, wizard_routes};
pub use state::WizardState;
pub use steps::{AgentType, StepId, steps_for};
pub use summary::Summary;
pub use validation::{FieldError, ValidationErrors};
