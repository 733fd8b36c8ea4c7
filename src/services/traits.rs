//! Abstract collaborators the wizard hands work to.
//!
//! The wizard only decides *when* to call these; what a deployment, an
//! ingestion or a key check actually does lives behind the trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use secrecy::SecretString;
use serde::Serialize;
use uuid::Uuid;

use crate::error::ServiceError;
use crate::wizard::model::{AggregateConfig, KnowledgeDescriptor, KnowledgeInput, ProviderKind, SponsorGrant};
use crate::wizard::steps::AgentType;

/// Everything needed to provision an agent.
#[derive(Debug, Clone, Serialize)]
pub struct DeploymentRequest {
    pub agent_type: AgentType,
    pub config: AggregateConfig,
    pub requested_at: DateTime<Utc>,
}

/// Acknowledgement returned by a deployer.
#[derive(Debug, Clone, Serialize)]
pub struct DeploymentReceipt {
    pub deployment_id: Uuid,
    pub agent_type: AgentType,
    /// User-facing confirmation text.
    pub message: String,
    pub deployed_at: DateTime<Utc>,
}

/// Provisions the configured agent.
#[async_trait]
pub trait Deployer: Send + Sync {
    async fn deploy(&self, request: &DeploymentRequest) -> Result<DeploymentReceipt, ServiceError>;
}

/// Checks an API key against its provider.
#[async_trait]
pub trait CredentialValidator: Send + Sync {
    /// `Ok(false)` means the provider rejected the key; `Err` means the
    /// check itself could not run.
    async fn validate(&self, kind: ProviderKind, key: &SecretString) -> Result<bool, ServiceError>;
}

/// Turns raw clinic knowledge into something the agent can search.
#[async_trait]
pub trait KnowledgeIngestor: Send + Sync {
    async fn ingest(&self, input: &KnowledgeInput) -> Result<KnowledgeDescriptor, ServiceError>;
}

/// Redeems brand sponsorship codes.
#[async_trait]
pub trait SponsorRegistry: Send + Sync {
    /// `Ok(None)` for an unknown code.
    async fn redeem(&self, code: &str) -> Result<Option<SponsorGrant>, ServiceError>;
}
