mod problem;
mod resolve;
mod router;
mod telemetry;

use std::net::SocketAddr;

use tenant_edge_core::{ClassifierConfig, DomainClassifier};
use tenant_edge_lookup::DomainLookupClient;
use tenant_edge_util::{load_env_file, AppConfig};
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    load_env_file();
    let config = AppConfig::from_env()?;

    telemetry::init_tracing(&config)?;
    let metrics = telemetry::init_metrics()?;

    let classifier_config = if config.marketing_hosts.is_empty() {
        ClassifierConfig::for_canonical_origin(
            &config.canonical_origin,
            &config.preview_host_suffixes,
        )
    } else {
        ClassifierConfig::new(&config.marketing_hosts, &config.preview_host_suffixes)
    };

    let http = reqwest::Client::builder()
        .user_agent(concat!("tenant-edge/", env!("CARGO_PKG_VERSION")))
        .build()?;
    let lookup = DomainLookupClient::new(config.api_base_url.clone(), http);
    let resolver = resolve::DomainResolver::new(
        DomainClassifier::new(classifier_config),
        config.canonical_origin.clone(),
        lookup,
    );

    let state = router::AppState::new(metrics, resolver, config.public_scheme.clone());

    let addr: SocketAddr = config.bind_addr;
    info!(
        stage = "app",
        %addr,
        env = %config.environment.as_str(),
        api_base = %config.api_base_url,
        canonical_origin = %config.canonical_origin,
        "starting HTTP server"
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router::app_router(state))
        .await
        .map_err(|err| err.into())
}
