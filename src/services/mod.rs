//! External services used by the wizard, and their in-process stand-ins.

pub mod stub;
pub mod traits;

pub use stub::{InlineIngestor, LengthHeuristicValidator, StaticSponsorRegistry, StubDeployer};
pub use traits::{
    CredentialValidator, Deployer, DeploymentReceipt, DeploymentRequest, KnowledgeIngestor,
    SponsorRegistry,
};
