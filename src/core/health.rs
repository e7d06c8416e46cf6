use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub components: MonitorHealth,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MonitorHealth {
    pub cycles_completed: u64,
    pub listings_seen: u64,
    pub matches_signalled: u64,
    pub armed: bool,
    pub last_error: Option<String>,
}

#[derive(Clone)]
pub struct HealthChecker {
    start_time: std::time::Instant,
    status: Arc<RwLock<MonitorHealth>>,
}

impl Default for HealthChecker {
    fn default() -> Self {
        Self::new()
    }
}

impl HealthChecker {
    pub fn new() -> Self {
        Self {
            start_time: std::time::Instant::now(),
            status: Arc::new(RwLock::new(MonitorHealth::default())),
        }
    }

    pub async fn get_status(&self) -> HealthStatus {
        let components = self.status.read().await.clone();

        HealthStatus {
            status: if components.cycles_completed > 0 {
                "healthy".to_string()
            } else {
                "degraded".to_string()
            },
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime_seconds: self.start_time.elapsed().as_secs(),
            components,
        }
    }

    pub async fn record_cycle(&self, new_listings: u64, matches: u64) {
        let mut status = self.status.write().await;
        status.cycles_completed += 1;
        status.listings_seen += new_listings;
        status.matches_signalled += matches;
    }

    pub async fn set_armed(&self) {
        self.status.write().await.armed = true;
    }

    pub async fn record_error(&self, error: &str) {
        self.status.write().await.last_error = Some(error.to_string());
    }
}
