use std::sync::Arc;

use anyhow::Context;

use scopekit_api::Application;
use scopekit_auth::StaticProvider;
use scopekit_infra::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::from_env()?;
    scopekit_observability::init(config.log.level.default_directive());
    if config.uses_dev_secret() {
        tracing::warn!("SCOPEKIT_JWT_SECRET not set; using insecure dev default");
    }

    let provider = match std::env::var("SCOPEKIT_CREDENTIALS") {
        Ok(json) => StaticProvider::from_json(&json).context("SCOPEKIT_CREDENTIALS")?,
        Err(_) => {
            tracing::warn!("SCOPEKIT_CREDENTIALS not set; every exchange code will be rejected");
            StaticProvider::default()
        }
    };
    tracing::info!(codes = provider.len(), "credential provider loaded");

    Application::new(config)?
        .with_credential_routes(Arc::new(provider))
        .serve()
        .await?;

    Ok(())
}
