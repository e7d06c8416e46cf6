use anyhow::{bail, Result};
use eve_contract_monitor::api::{EsiClient, RevalidationCache};
use eve_contract_monitor::core::logging::init_logging;
use eve_contract_monitor::core::{Config, HealthChecker};
use eve_contract_monitor::monitoring::{AlertDispatcher, ContractMonitor, SeenStore};
use eve_contract_monitor::notify;
use eve_contract_monitor::registry::{ItemCatalog, WatchList};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = Config::from_env()?;

    // Initialize logging
    init_logging(&config);

    tracing::info!("🚀 EVE contract monitor starting...");
    tracing::info!("Version: {}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Region: {}", config.esi.region_id);

    let watchlist = Arc::new(WatchList::load(&config.registry.watchlist_path)?);
    if watchlist.is_empty() {
        bail!(
            "no item types to watch, fill in {}",
            config.registry.watchlist_path
        );
    }
    tracing::info!("📋 Watching {} item types", watchlist.len());

    let catalog = match &config.registry.item_catalog {
        Some(source) => match ItemCatalog::load(source).await {
            Ok(catalog) => catalog,
            Err(e) => {
                tracing::warn!("⚠️  Item catalog unavailable, using bare ids: {}", e);
                ItemCatalog::default()
            }
        },
        None => ItemCatalog::default(),
    };
    for entry in watchlist.iter() {
        tracing::debug!(
            "watching {} at {:.2} M",
            catalog.describe(entry.type_id),
            entry.price
        );
    }
    let catalog = Arc::new(catalog);

    let client = Arc::new(EsiClient::from_config(&config.esi, RevalidationCache::new())?);
    let store = SeenStore::new(&config.monitor.dedup_database_url).await?;
    let notifier = notify::from_config(config.alert.command.as_deref());

    // Initialize health checker
    let health_checker = HealthChecker::new();

    // Start health check endpoint
    if config.monitoring.health_port != 0 {
        let health_clone = health_checker.clone();
        let health_port = config.monitoring.health_port;
        tokio::spawn(async move { start_health_server(health_clone, health_port).await });

        tracing::info!("✅ Health endpoint running on port {}", health_port);
    }

    let (signal_tx, signal_rx) = mpsc::channel(config.monitor.channel_capacity);
    let dispatcher = AlertDispatcher::new(
        std::io::stdout(),
        notifier.clone(),
        watchlist.clone(),
        catalog,
        Duration::from_secs(config.monitor.alert_cooldown_secs),
    )
    .spawn(signal_rx);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("❌ Failed to listen for shutdown signal: {}", e);
            return;
        }
        tracing::info!("🛑 Shutdown requested");
        let _ = shutdown_tx.send(true);
    });

    let monitor = ContractMonitor::new(
        client,
        store,
        watchlist,
        notifier,
        health_checker,
        config.esi.region_id.clone(),
        config.monitor.clone(),
    );
    monitor.run(signal_tx, shutdown_rx).await?;

    dispatcher.await?;
    tracing::info!("👋 Bye");
    Ok(())
}

async fn start_health_server(health_checker: HealthChecker, port: u16) {
    use warp::Filter;

    let health = warp::path("health")
        .and(warp::any().map(move || health_checker.clone()))
        .and_then(|checker: HealthChecker| async move {
            let status = checker.get_status().await;
            Ok::<_, warp::Rejection>(warp::reply::json(&status))
        });

    warp::serve(health).run(([0, 0, 0, 0], port)).await;
}
