use anyhow::Result;
use serde::Deserialize;
use std::env;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub esi: EsiConfig,
    pub monitor: MonitorConfig,
    pub registry: RegistryConfig,
    pub alert: AlertConfig,
    pub monitoring: MonitoringConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EsiConfig {
    pub base_url: String,
    pub datasource: String,
    pub region_id: String,
    pub user_agent: String,
    pub timeout_secs: u64,
}

impl Default for EsiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://esi.evetech.net".to_string(),
            datasource: "tranquility".to_string(),
            // The Forge (Jita)
            region_id: "10000002".to_string(),
            user_agent: format!("eve-contract-monitor/{}", env!("CARGO_PKG_VERSION")),
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MonitorConfig {
    pub poll_interval_secs: u64,
    pub retry_delay_secs: u64,
    pub channel_capacity: usize,
    pub alert_cooldown_secs: u64,
    pub prime_on_start: bool,
    pub verbose: bool,
    pub dedup_database_url: String,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 5,
            retry_delay_secs: 5,
            channel_capacity: 10,
            alert_cooldown_secs: 20,
            prime_on_start: true,
            verbose: false,
            dedup_database_url: "sqlite::memory:".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegistryConfig {
    pub watchlist_path: String,
    /// File path or http(s) URL of the "<type id> <name>" item list.
    pub item_catalog: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AlertConfig {
    /// Program and arguments that play the alert sound; the terminal bell when unset.
    pub command: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MonitoringConfig {
    /// 0 disables the health endpoint.
    pub health_port: u16,
    pub log_level: String,
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();

        let esi_defaults = EsiConfig::default();
        let monitor_defaults = MonitorConfig::default();

        let verbose = env_parse("VERBOSE", monitor_defaults.verbose);

        Ok(Config {
            esi: EsiConfig {
                base_url: env_or("ESI_BASE_URL", &esi_defaults.base_url),
                datasource: env_or("ESI_DATASOURCE", &esi_defaults.datasource),
                region_id: env_or("ESI_REGION_ID", &esi_defaults.region_id),
                user_agent: env_or("ESI_USER_AGENT", &esi_defaults.user_agent),
                timeout_secs: env_parse("ESI_TIMEOUT_SECS", esi_defaults.timeout_secs),
            },
            monitor: MonitorConfig {
                poll_interval_secs: env_parse(
                    "POLL_INTERVAL_SECS",
                    monitor_defaults.poll_interval_secs,
                ),
                retry_delay_secs: env_parse("RETRY_DELAY_SECS", monitor_defaults.retry_delay_secs),
                channel_capacity: env_parse("CHANNEL_CAPACITY", monitor_defaults.channel_capacity)
                    .max(1),
                alert_cooldown_secs: env_parse(
                    "ALERT_COOLDOWN_SECS",
                    monitor_defaults.alert_cooldown_secs,
                ),
                prime_on_start: env_parse("PRIME_ON_START", monitor_defaults.prime_on_start),
                verbose,
                dedup_database_url: env_or(
                    "DEDUP_DATABASE_URL",
                    &monitor_defaults.dedup_database_url,
                ),
            },
            registry: RegistryConfig {
                watchlist_path: env_or("WATCHLIST_PATH", "./registry.json"),
                item_catalog: env_opt("ITEM_CATALOG"),
            },
            alert: AlertConfig {
                command: env_opt("ALERT_COMMAND"),
            },
            monitoring: MonitoringConfig {
                health_port: env_parse("HEALTH_PORT", 0),
                log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| {
                    if verbose {
                        "debug".to_string()
                    } else {
                        "info".to_string()
                    }
                }),
            },
        })
    }
}
