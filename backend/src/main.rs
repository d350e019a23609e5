use std::sync::Arc;

use befs_backend::{
    cache::QueryCache,
    config::Config,
    dashboard::Dashboard,
    oracle::{HttpPriceSource, PriceFeed, PriceSource},
    refresh::RefreshCoordinator,
    routes,
    sui::{LedgerRpc, SuiRpcClient},
    AppState,
};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Arc::new(Config::from_env()?);
    let service = &config.service;

    let rpc: Arc<dyn LedgerRpc> = Arc::new(SuiRpcClient::new(service.rpc_url.clone()));
    let cache = Arc::new(QueryCache::with_limits(
        rpc.clone(),
        service.cache_max_entries,
        service.cache_idle_ttl,
    ));
    tracing::info!(rpc = %service.rpc_url, "🔗 Ledger client ready");

    let price = Arc::new(PriceFeed::new(config.params.price_floor));
    let source: Arc<dyn PriceSource> = Arc::new(HttpPriceSource::new(
        service.oracle_url.clone(),
        service.oracle_price_pointer.clone(),
    ));
    price
        .clone()
        .spawn_poller(source, service.oracle_poll_interval);

    let refresh = RefreshCoordinator::new(
        cache.clone(),
        &config.deployment.lending_pool_id,
        service.pool_poll_interval,
        service.settle_delay,
    )
    .spawn();
    tracing::info!(
        poll = ?service.pool_poll_interval,
        settle = ?service.settle_delay,
        "🔄 Refresh coordinator started"
    );

    let dashboard = Dashboard::new(config.clone(), rpc, cache, price, refresh);
    let app = routes::router(AppState {
        dashboard: Arc::new(dashboard),
    });

    let listener = TcpListener::bind(service.bind_addr.as_str()).await?;
    tracing::info!("🚀 Backend running on http://{}", service.bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
