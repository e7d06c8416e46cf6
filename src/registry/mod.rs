pub mod catalog;
pub mod watchlist;

pub use catalog::{ItemCatalog, ItemType};
pub use watchlist::{WatchEntry, WatchList};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse watch-list: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("{0}")]
    Precondition(String),

    #[error("failed to fetch item catalog: {0}")]
    Fetch(#[from] reqwest::Error),
}
