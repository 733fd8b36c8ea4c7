use std::sync::Arc;

use tower_http::cors::CorsLayer;

use vet_agent_wizard::config::WizardConfig;
use vet_agent_wizard::wizard::{WizardManager, WizardServices, wizard_routes};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = WizardConfig::from_env()?;

    eprintln!("🐾 Vet Agent Wizard v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Wizard WS: ws://0.0.0.0:{}/ws", config.port);
    eprintln!("   Wizard API: http://0.0.0.0:{}/api/wizard/status", config.port);
    eprintln!("   Catalog: http://0.0.0.0:{}/api/catalog\n", config.port);

    let services = WizardServices::stubs(&config);
    let manager = Arc::new(WizardManager::new(&config, services));

    let app = wizard_routes(manager).layer(CorsLayer::permissive());

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port)).await?;
    tracing::info!(port = config.port, "Wizard server started");
    axum::serve(listener, app).await?;

    Ok(())
}
