//! OpenSASE Storefront - order lifecycle, refunds and discounts

use anyhow::{Context, Result};
use opensase_storefront::{
    api,
    config::Config,
    repository::{MemoryStore, PgStore},
    services::{EventPublisher, LogPublisher, NatsPublisher},
    Services,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    let publisher: Arc<dyn EventPublisher> = match &config.nats_url {
        Some(url) => match async_nats::connect(url.as_str()).await {
            Ok(client) => Arc::new(NatsPublisher::new(client, config.event_subject_prefix.clone())),
            Err(e) => {
                tracing::warn!(error = %e, "NATS unavailable, logging events instead");
                Arc::new(LogPublisher)
            }
        },
        None => Arc::new(LogPublisher),
    };

    let services = match &config.database_url {
        Some(url) => {
            let store = PgStore::connect(url, config.database_max_connections).await.context("connecting to Postgres")?;
            store.migrate().await.context("running migrations")?;
            Services::from_store(Arc::new(store), publisher)
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using in-memory store");
            Services::from_store(Arc::new(MemoryStore::new()), publisher)
        }
    };

    let app = api::router(services);
    let addr = config.listen_addr();
    tracing::info!("🚀 OpenSASE Storefront listening on {}", addr);
    axum::serve(tokio::net::TcpListener::bind(&addr).await?, app).await?;
    Ok(())
}
