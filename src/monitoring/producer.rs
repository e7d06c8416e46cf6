use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::api::{ApiError, EsiClient, Listing};

/// Walks the public contracts of one region page by page.
///
/// Listings go out on one channel, failures on another. A failed page is
/// retried after `retry_delay` without advancing; only the end of the pages
/// or shutdown stops the walk. Both channels close when the task returns.
pub struct ListingProducer {
    client: Arc<EsiClient>,
    region_id: String,
    retry_delay: Duration,
}

impl ListingProducer {
    pub fn new(client: Arc<EsiClient>, region_id: impl Into<String>, retry_delay: Duration) -> Self {
        Self {
            client,
            region_id: region_id.into(),
            retry_delay,
        }
    }

    pub fn spawn(
        self,
        listing_tx: mpsc::Sender<Listing>,
        error_tx: mpsc::Sender<ApiError>,
        shutdown: watch::Receiver<bool>,
    ) -> JoinHandle<u32> {
        tokio::spawn(self.run(listing_tx, error_tx, shutdown))
    }

    /// Returns the number of pages walked.
    pub async fn run(
        self,
        listing_tx: mpsc::Sender<Listing>,
        error_tx: mpsc::Sender<ApiError>,
        mut shutdown: watch::Receiver<bool>,
    ) -> u32 {
        let mut page: u32 = 1;

        loop {
            if *shutdown.borrow() {
                tracing::debug!("Listing producer stopped at page {}", page);
                break;
            }

            tracing::debug!("processing page {}...", page);

            match self.client.get_listings(&self.region_id, page).await {
                Ok(listings) => {
                    let count = listings.len();
                    for listing in listings {
                        if listing_tx.send(listing).await.is_err() {
                            tracing::debug!("Listing receiver gone, producer exiting");
                            return page - 1;
                        }
                    }
                    tracing::debug!("got {} new contracts", count);
                    page += 1;
                }
                Err(ApiError::Exhausted) => break,
                Err(e) => {
                    if !e.is_retryable() {
                        tracing::error!("❌ Page {} will keep failing until fixed: {}", page, e);
                    }
                    // A closed error sink is not a reason to stop walking
                    let _ = error_tx.send(e).await;

                    tokio::select! {
                        _ = tokio::time::sleep(self.retry_delay) => {}
                        Ok(()) = shutdown.changed() => {}
                    }
                }
            }
        }

        page - 1
    }
}
