use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::api::MatchSignal;
use crate::notify::Notifier;
use crate::registry::{ItemCatalog, WatchList};

const HEAVY_RULE: &str = "*********************************";
const LIGHT_RULE: &str = "---------------------------------";

/// Longest the dispatcher waits for the alert sound before moving on.
pub const ALERT_SOUND_TIMEOUT: Duration = Duration::from_secs(10);

/// Watch-list name first, then the catalog, then the bare id.
pub fn item_name(type_id: i64, watchlist: &WatchList, catalog: &ItemCatalog) -> String {
    if let Some(entry) = watchlist.get(type_id) {
        return entry.type_name.clone();
    }
    match catalog.name(type_id) {
        Some(name) => name.to_string(),
        None => format!("unknown ID {}", type_id),
    }
}

pub fn render_report(signal: &MatchSignal, watchlist: &WatchList, catalog: &ItemCatalog) -> String {
    let mut report = String::new();
    let listing = &signal.listing;

    report.push_str(&format!("{}\n", HEAVY_RULE));
    report.push_str(&format!("{}\n", listing.title));
    report.push_str(&format!("Contract: {}\n", listing.id));
    report.push_str(&format!("Price: {:.3} M\n", listing.price_millions()));

    for item in &signal.items {
        report.push_str(&format!("{}\n", LIGHT_RULE));
        report.push_str(&format!(
            "Item: {}\n",
            item_name(item.type_id, watchlist, catalog)
        ));
        report.push_str(&format!("Quantity: {}\n", item.quantity));
        if item.is_original() {
            report.push_str("ORIGINAL\n");
        } else if item.runs > 0 {
            report.push_str(&format!("Runs: {}\n", item.runs));
        }
    }

    report.push_str(&format!("{}\n\n", HEAVY_RULE));
    report
}

/// Prints every match and rings the alert sound at most once per cooldown.
pub struct AlertDispatcher<W> {
    out: W,
    notifier: Arc<dyn Notifier>,
    watchlist: Arc<WatchList>,
    catalog: Arc<ItemCatalog>,
    cooldown: Duration,
    sound_timeout: Duration,
    last_sound: Instant,
}

impl<W: Write + Send + 'static> AlertDispatcher<W> {
    pub fn new(
        out: W,
        notifier: Arc<dyn Notifier>,
        watchlist: Arc<WatchList>,
        catalog: Arc<ItemCatalog>,
        cooldown: Duration,
    ) -> Self {
        Self {
            out,
            notifier,
            watchlist,
            catalog,
            cooldown,
            sound_timeout: ALERT_SOUND_TIMEOUT,
            last_sound: Instant::now(),
        }
    }

    pub fn with_sound_timeout(mut self, sound_timeout: Duration) -> Self {
        self.sound_timeout = sound_timeout;
        self
    }

    pub fn spawn(self, signal_rx: mpsc::Receiver<MatchSignal>) -> JoinHandle<W> {
        tokio::spawn(self.run(signal_rx))
    }

    /// Runs until every sender is dropped, then hands the sink back.
    pub async fn run(mut self, mut signal_rx: mpsc::Receiver<MatchSignal>) -> W {
        tracing::debug!("started alert dispatcher");
        while let Some(signal) = signal_rx.recv().await {
            self.dispatch(&signal).await;
        }
        tracing::debug!("closed alert dispatcher");
        self.out
    }

    /// Returns whether the sound was played for this signal.
    pub async fn dispatch(&mut self, signal: &MatchSignal) -> bool {
        let report = render_report(signal, &self.watchlist, &self.catalog);
        if let Err(e) = self
            .out
            .write_all(report.as_bytes())
            .and_then(|_| self.out.flush())
        {
            tracing::error!("❌ Failed to write match report: {}", e);
        }

        if self.last_sound.elapsed() < self.cooldown {
            return false;
        }

        match tokio::time::timeout(self.sound_timeout, self.notifier.play_alert()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::warn!("⚠️  Alert sound failed: {:#}", e),
            Err(_) => tracing::warn!(
                "⚠️  Alert sound still playing after {:?}, abandoned",
                self.sound_timeout
            ),
        }
        self.last_sound = Instant::now();
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::types::fixtures::{item, listing};
    use crate::notify::MockNotifier;
    use crate::registry::WatchEntry;

    fn watchlist() -> Arc<WatchList> {
        Arc::new(
            WatchList::from_entries([WatchEntry {
                type_id: 123,
                price: 100.0,
                type_name: "TESTITEM".into(),
            }])
            .unwrap(),
        )
    }

    fn signal(id: i64) -> MatchSignal {
        let mut listing = listing(id, 99_000_000.0);
        listing.title = "Test".into();
        MatchSignal {
            listing,
            items: vec![item(1, 123, 1, 1, true), item(2, 555, -1, 1, true)],
        }
    }

    #[test]
    fn test_report_layout() {
        let catalog = ItemCatalog::parse("555 Catalog Thing\n");
        let report = render_report(&signal(42), &watchlist(), &catalog);

        let lines: Vec<&str> = report.lines().collect();
        assert_eq!(lines[0], HEAVY_RULE);
        assert_eq!(lines[1], "Test");
        assert_eq!(lines[2], "Contract: 42");
        assert_eq!(lines[3], "Price: 99.000 M");
        assert!(report.contains("Item: TESTITEM\nQuantity: 1\nRuns: 1\n"));
        assert!(report.contains("Item: Catalog Thing\nQuantity: 1\nORIGINAL\n"));
        assert!(report.ends_with(&format!("{}\n\n", HEAVY_RULE)));
    }

    #[test]
    fn test_item_name_fallbacks() {
        let catalog = ItemCatalog::parse("7 Seven\n");
        assert_eq!(item_name(123, &watchlist(), &catalog), "TESTITEM");
        assert_eq!(item_name(7, &watchlist(), &catalog), "Seven");
        assert_eq!(item_name(8, &watchlist(), &catalog), "unknown ID 8");
    }

    #[tokio::test]
    async fn test_cooldown_suppresses_sound() {
        let mut notifier = MockNotifier::new();
        notifier.expect_play_alert().never();

        let dispatcher = AlertDispatcher::new(
            Vec::new(),
            Arc::new(notifier),
            watchlist(),
            Arc::new(ItemCatalog::default()),
            Duration::from_secs(3600),
        );

        let (tx, rx) = mpsc::channel(10);
        let handle = dispatcher.spawn(rx);
        for id in 0..5 {
            tx.send(signal(id)).await.unwrap();
        }
        drop(tx);

        let out = String::from_utf8(handle.await.unwrap()).unwrap();
        assert_eq!(out.matches("Price: 99.000 M").count(), 5);
    }

    #[tokio::test]
    async fn test_sound_after_cooldown_and_reset() {
        let mut notifier = MockNotifier::new();
        notifier.expect_play_alert().times(1).returning(|| Ok(()));

        let mut dispatcher = AlertDispatcher::new(
            Vec::new(),
            Arc::new(notifier),
            watchlist(),
            Arc::new(ItemCatalog::default()),
            Duration::from_millis(50),
        );

        // Too early after start
        assert!(!dispatcher.dispatch(&signal(1)).await);
        tokio::time::sleep(Duration::from_millis(80)).await;
        assert!(dispatcher.dispatch(&signal(2)).await);
        // The timestamp was reset by the sound above
        assert!(!dispatcher.dispatch(&signal(3)).await);
    }

    struct StuckNotifier;

    #[async_trait::async_trait]
    impl Notifier for StuckNotifier {
        async fn play_alert(&self) -> anyhow::Result<()> {
            std::future::pending().await
        }
    }

    #[tokio::test]
    async fn test_hung_sound_does_not_block_dispatch() {
        let dispatcher = AlertDispatcher::new(
            Vec::new(),
            Arc::new(StuckNotifier),
            watchlist(),
            Arc::new(ItemCatalog::default()),
            Duration::ZERO,
        )
        .with_sound_timeout(Duration::from_millis(20));

        let (tx, rx) = mpsc::channel(2);
        let handle = dispatcher.spawn(rx);
        let out = tokio::time::timeout(Duration::from_secs(5), async move {
            for id in 0..4 {
                tx.send(signal(id)).await.unwrap();
            }
            drop(tx);
            handle.await.unwrap()
        })
        .await
        .expect("dispatcher stuck on the alert sound");

        let out = String::from_utf8(out).unwrap();
        assert_eq!(out.matches("Price: 99.000 M").count(), 4);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_hung_alert_command_is_abandoned() {
        let notifier = crate::notify::CommandNotifier::new("sleep", vec!["30".into()]);
        let mut dispatcher = AlertDispatcher::new(
            Vec::new(),
            Arc::new(notifier),
            watchlist(),
            Arc::new(ItemCatalog::default()),
            Duration::ZERO,
        )
        .with_sound_timeout(Duration::from_millis(50));

        let played = tokio::time::timeout(Duration::from_secs(5), dispatcher.dispatch(&signal(1)))
            .await
            .expect("dispatcher waited for the player");
        assert!(played);
    }

    #[tokio::test]
    async fn test_failed_sound_does_not_stop_dispatch() {
        let mut notifier = MockNotifier::new();
        notifier
            .expect_play_alert()
            .times(3)
            .returning(|| Err(anyhow::anyhow!("no audio device")));

        let dispatcher = AlertDispatcher::new(
            Vec::new(),
            Arc::new(notifier),
            watchlist(),
            Arc::new(ItemCatalog::default()),
            Duration::ZERO,
        );

        let (tx, rx) = mpsc::channel(10);
        let handle = dispatcher.spawn(rx);
        for id in 0..3 {
            tx.send(signal(id)).await.unwrap();
        }
        drop(tx);

        let out = String::from_utf8(handle.await.unwrap()).unwrap();
        assert_eq!(out.matches(HEAVY_RULE).count(), 6);
    }
}
