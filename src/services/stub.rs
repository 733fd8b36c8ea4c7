//! In-process service implementations used by the server and tests.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::ServiceError;
use crate::wizard::model::{
    ActivationMethod, BillingCycle, Brand, KnowledgeDescriptor, KnowledgeInput, ProviderKind,
    SponsorGrant,
};
use crate::wizard::steps::AgentType;

use super::traits::{
    CredentialValidator, Deployer, DeploymentReceipt, DeploymentRequest, KnowledgeIngestor,
    SponsorRegistry,
};

const LABEL_EXCERPT_CHARS: usize = 60;

/// Acknowledges every deployment and logs it.
#[derive(Debug, Default)]
pub struct StubDeployer;

#[async_trait]
impl Deployer for StubDeployer {
    async fn deploy(&self, request: &DeploymentRequest) -> Result<DeploymentReceipt, ServiceError> {
        let message = match request.agent_type {
            AgentType::Whatsapp => {
                "¡Agente desplegado exitosamente! En unos minutos estará activo en WhatsApp."
                    .to_string()
            }
            AgentType::Voice => voice_message(request),
        };
        let receipt = DeploymentReceipt {
            deployment_id: Uuid::new_v4(),
            agent_type: request.agent_type,
            message,
            deployed_at: Utc::now(),
        };
        info!(
            deployment_id = %receipt.deployment_id,
            agent_type = %request.agent_type,
            steps = request.config.len(),
            "Agent deployed"
        );
        Ok(receipt)
    }
}

fn voice_message(request: &DeploymentRequest) -> String {
    let Some(activation) = request.config.activation() else {
        return "¡Agente activado exitosamente!".to_string();
    };
    match (&activation.method, &activation.grant) {
        (ActivationMethod::Sponsor { .. }, Some(grant)) => format!(
            "¡Agente activado exitosamente! Patrocinado por {} por {} meses.",
            grant.brand.name(),
            grant.duration_months
        ),
        (ActivationMethod::Payment { billing }, _) => {
            let period = match billing {
                BillingCycle::Monthly => "cada mes",
                BillingCycle::Annual => "cada año",
            };
            format!("¡Agente activado exitosamente! El pago se procesará automáticamente {period}.")
        }
        (ActivationMethod::Sponsor { .. }, None) => "¡Agente activado exitosamente!".to_string(),
    }
}

/// Accepts any key at least `min_len` characters long after an
/// artificial delay. Length is counted on the key as typed, padding
/// included.
#[derive(Debug, Clone)]
pub struct LengthHeuristicValidator {
    min_len: usize,
    delay: Duration,
}

impl LengthHeuristicValidator {
    pub fn new(min_len: usize, delay: Duration) -> Self {
        Self { min_len, delay }
    }
}

#[async_trait]
impl CredentialValidator for LengthHeuristicValidator {
    async fn validate(&self, kind: ProviderKind, key: &SecretString) -> Result<bool, ServiceError> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let valid = key.expose_secret().chars().count() >= self.min_len;
        debug!(provider = %kind, vendor = kind.vendor(), valid, "API key checked");
        Ok(valid)
    }
}

/// Builds descriptors directly from the input without storing anything.
#[derive(Debug, Default)]
pub struct InlineIngestor;

#[async_trait]
impl KnowledgeIngestor for InlineIngestor {
    async fn ingest(&self, input: &KnowledgeInput) -> Result<KnowledgeDescriptor, ServiceError> {
        let (label, size) = match input {
            KnowledgeInput::Text { content } => {
                let content = content.trim();
                if content.is_empty() {
                    return Err(ServiceError::InvalidInput("empty knowledge text".into()));
                }
                (excerpt(content), content.chars().count() as u64)
            }
            KnowledgeInput::Website { url } => (url.trim().to_string(), 0),
            KnowledgeInput::File {
                file_name,
                size_bytes,
            } => (file_name.trim().to_string(), *size_bytes),
        };
        if label.is_empty() {
            return Err(ServiceError::IngestionFailed {
                reason: format!("{} source has no label", input.kind()),
            });
        }

        let descriptor = KnowledgeDescriptor {
            id: Uuid::new_v4(),
            kind: input.kind(),
            label,
            size,
            ingested_at: Utc::now(),
        };
        info!(id = %descriptor.id, kind = %descriptor.kind, size, "Knowledge ingested");
        Ok(descriptor)
    }
}

fn excerpt(text: &str) -> String {
    if text.chars().count() <= LABEL_EXCERPT_CHARS {
        return text.to_string();
    }
    let cut: String = text.chars().take(LABEL_EXCERPT_CHARS).collect();
    format!("{}…", cut.trim_end())
}

/// Fixed set of case-insensitive sponsor codes.
#[derive(Debug, Clone)]
pub struct StaticSponsorRegistry {
    codes: HashMap<String, SponsorGrant>,
    delay: Duration,
}

impl StaticSponsorRegistry {
    pub fn new(delay: Duration) -> Self {
        let codes = HashMap::from([
            (
                "hills2024".to_string(),
                SponsorGrant {
                    brand: Brand::Hills,
                    sponsor: "Hill's Pet Nutrition".to_string(),
                    duration_months: 6,
                },
            ),
            (
                "royal2024".to_string(),
                SponsorGrant {
                    brand: Brand::RoyalCanin,
                    sponsor: "Royal Canin".to_string(),
                    duration_months: 6,
                },
            ),
        ]);
        Self { codes, delay }
    }
}

#[async_trait]
impl SponsorRegistry for StaticSponsorRegistry {
    async fn redeem(&self, code: &str) -> Result<Option<SponsorGrant>, ServiceError> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let grant = self.codes.get(&code.trim().to_lowercase()).cloned();
        debug!(found = grant.is_some(), "Sponsor code checked");
        Ok(grant)
    }
}
