use anyhow::{bail, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};

use super::alerter::ALERT_SOUND_TIMEOUT;
use super::database::SeenStore;
use super::evaluator::SuitabilityEvaluator;
use super::producer::ListingProducer;
use crate::api::{ApiError, EsiClient, MatchSignal};
use crate::core::config::MonitorConfig;
use crate::core::HealthChecker;
use crate::notify::Notifier;
use crate::registry::WatchList;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleStats {
    pub pages: u32,
    pub received: u64,
    pub new: u64,
    pub evaluated: u64,
    pub matched: u64,
}

/// Polls the region's public contracts and feeds new, qualifying ones through
/// the suitability check.
pub struct ContractMonitor {
    client: Arc<EsiClient>,
    store: SeenStore,
    watchlist: Arc<WatchList>,
    evaluator: SuitabilityEvaluator,
    notifier: Arc<dyn Notifier>,
    health: HealthChecker,
    region_id: String,
    config: MonitorConfig,
}

impl ContractMonitor {
    pub fn new(
        client: Arc<EsiClient>,
        store: SeenStore,
        watchlist: Arc<WatchList>,
        notifier: Arc<dyn Notifier>,
        health: HealthChecker,
        region_id: impl Into<String>,
        config: MonitorConfig,
    ) -> Self {
        Self {
            evaluator: SuitabilityEvaluator::new(client.clone()),
            client,
            store,
            watchlist,
            notifier,
            health,
            region_id: region_id.into(),
            config,
        }
    }

    pub fn store(&self) -> &SeenStore {
        &self.store
    }

    pub fn health(&self) -> &HealthChecker {
        &self.health
    }

    /// One pass over every listing page.
    ///
    /// Every listing is recorded as seen; only listings that are new, qualify
    /// and arrive while `evaluate` is set get their line items checked. The
    /// evaluation happens inline, so at most one listing is in flight.
    pub async fn run_cycle(
        &self,
        evaluate: bool,
        signal_tx: &mpsc::Sender<MatchSignal>,
        shutdown: &watch::Receiver<bool>,
    ) -> Result<CycleStats> {
        let (listing_tx, mut listing_rx) = mpsc::channel(self.config.channel_capacity);
        let (error_tx, mut error_rx) = mpsc::channel::<ApiError>(self.config.channel_capacity);

        let producer = ListingProducer::new(
            self.client.clone(),
            self.region_id.clone(),
            Duration::from_secs(self.config.retry_delay_secs),
        )
        .spawn(listing_tx, error_tx, shutdown.clone());

        let health = self.health.clone();
        let error_sink = tokio::spawn(async move {
            tracing::debug!("started error reader thread");
            while let Some(e) = error_rx.recv().await {
                tracing::warn!("⚠️  Contract page fetch failed, retrying: {}", e);
                health.record_error(&e.to_string()).await;
            }
            tracing::debug!("closed error reader thread");
        });

        tracing::debug!("started contract reader thread");
        let mut stats = CycleStats::default();

        while let Some(listing) = listing_rx.recv().await {
            stats.received += 1;

            if !self.store.insert_if_absent(&listing).await? {
                continue;
            }
            stats.new += 1;

            if !evaluate || !listing.is_qualifying() {
                continue;
            }

            tracing::debug!("got newly created: {}", listing.id);
            if !listing.title.is_empty() {
                tracing::debug!("{}", listing.title);
            }

            stats.evaluated += 1;
            let listing_id = listing.id;
            match self.evaluator.evaluate(&listing, &self.watchlist).await {
                Ok(evaluation) => {
                    if let Some(signal) = evaluation.into_signal(listing) {
                        tracing::info!(
                            "🎯 FOUND contract {} at {:.3} M",
                            listing_id,
                            signal.listing.price_millions()
                        );
                        stats.matched += 1;
                        if signal_tx.send(signal).await.is_err() {
                            tracing::warn!("Alert dispatcher is gone, match {} dropped", listing_id);
                        }
                    }
                }
                Err(e) => {
                    tracing::error!("❌ Failed to evaluate contract {}: {}", listing_id, e);
                    self.health.record_error(&e.to_string()).await;
                }
            }
        }
        tracing::debug!("closed contract reader thread");

        stats.pages = producer.await?;
        error_sink.await?;
        self.health.record_cycle(stats.new, stats.matched).await;

        Ok(stats)
    }

    /// Polls until `shutdown` flips to `true`.
    ///
    /// The first cycle only primes the seen set (unless priming is disabled),
    /// after which the monitor is armed and the alert sound plays once.
    /// Dropping `signal_tx` on return lets the dispatcher drain and stop.
    pub async fn run(
        &self,
        signal_tx: mpsc::Sender<MatchSignal>,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<()> {
        if self.watchlist.is_empty() {
            bail!("watch-list is empty, nothing to monitor");
        }

        let mut armed = !self.config.prime_on_start;
        if armed {
            self.health.set_armed().await;
        }
        let interval = Duration::from_secs(self.config.poll_interval_secs);

        tracing::info!(
            "🔍 Monitoring region {} for {} watched item types",
            self.region_id,
            self.watchlist.len()
        );

        loop {
            tokio::select! {
                _ = tokio::time::sleep(interval) => {}
                Ok(()) = shutdown.changed() => {}
            }
            if *shutdown.borrow() {
                break;
            }

            let stats = self.run_cycle(armed, &signal_tx, &shutdown).await?;
            tracing::debug!(
                "cycle done: {} pages, {} contracts, {} new, {} evaluated, {} matched",
                stats.pages,
                stats.received,
                stats.new,
                stats.evaluated,
                stats.matched
            );

            if !armed && !*shutdown.borrow() {
                armed = true;
                self.health.set_armed().await;
                tracing::info!(
                    "✅ now we can start monitoring ({} contracts already known)",
                    self.store.count().await?
                );
                match tokio::time::timeout(ALERT_SOUND_TIMEOUT, self.notifier.play_alert()).await {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => tracing::warn!("⚠️  Alert sound failed: {:#}", e),
                    Err(_) => tracing::warn!("⚠️  Arming sound abandoned after {:?}", ALERT_SOUND_TIMEOUT),
                }
            }
        }

        tracing::info!("🛑 Contract monitor stopped");
        Ok(())
    }
}
