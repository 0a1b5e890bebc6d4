use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use todos_service::cache::CacheLayer;
use todos_service::config::Config;
use todos_service::database::MemoryStore;
use todos_service::dispatch::RequestDispatcher;
use todos_service::server::Server;
use todos_service::todos;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::parse();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level)))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(
        addr = %config.addr,
        expose_errors = config.expose_errors,
        "configuration loaded"
    );

    let cache = Arc::new(CacheLayer::new(MemoryStore::new()));
    let dispatcher = RequestDispatcher::new(todos::routes(cache)?)
        .expose_diagnostics(config.expose_errors);

    Server::bind(&config.addr)
        .await?
        .serve(Arc::new(dispatcher))
        .await?;

    Ok(())
}
