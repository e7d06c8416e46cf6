use anyhow::{Context, Result};
use chrono::Utc;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use std::path::Path;

use crate::api::Listing;

/// Listing ids that have already been looked at during this run.
///
/// Backed by SQLite (in memory by default) and emptied on open. The primary
/// key on `listing_id` makes [`SeenStore::insert_if_absent`] a single atomic
/// check-then-insert, so at most one caller ever wins a given id.
#[derive(Clone)]
pub struct SeenStore {
    pool: SqlitePool,
}

impl SeenStore {
    pub async fn new(database_url: &str) -> Result<Self> {
        let connection_string = if database_url.starts_with("sqlite:") {
            database_url.to_string()
        } else {
            if let Some(parent) = Path::new(database_url).parent() {
                std::fs::create_dir_all(parent)?;
            }
            format!("sqlite://{}?mode=rwc", database_url)
        };

        // An in-memory database lives exactly as long as its connection
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect(&connection_string)
            .await
            .with_context(|| format!("failed to open dedup store at {}", connection_string))?;

        let store = Self { pool };
        store.initialize_schema().await?;

        Ok(store)
    }

    pub async fn in_memory() -> Result<Self> {
        Self::new("sqlite::memory:").await
    }

    async fn initialize_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS seen_listings (
                listing_id INTEGER PRIMARY KEY,
                kind TEXT NOT NULL,
                qualifying INTEGER NOT NULL,
                first_seen DATETIME NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        // Every run starts from an empty seen set, file-backed or not
        let cleared = sqlx::query("DELETE FROM seen_listings")
            .execute(&self.pool)
            .await?
            .rows_affected();
        if cleared > 0 {
            tracing::debug!("Cleared {} listings left over from a previous run", cleared);
        }

        tracing::debug!("✅ Dedup store schema initialized");

        Ok(())
    }

    pub async fn exists(&self, listing_id: i64) -> Result<bool> {
        let found: Option<i64> =
            sqlx::query_scalar("SELECT listing_id FROM seen_listings WHERE listing_id = ?")
                .bind(listing_id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(found.is_some())
    }

    /// Records `listing` as seen. Returns `true` only for the call that inserted it.
    pub async fn insert_if_absent(&self, listing: &Listing) -> Result<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO seen_listings (listing_id, kind, qualifying, first_seen)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(listing_id) DO NOTHING
            "#,
        )
        .bind(listing.id)
        .bind(listing.kind.as_str())
        .bind(listing.is_qualifying())
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    pub async fn count(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM seen_listings")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}
