use chrono::{DateTime, Utc};
use shared::models::Sighting;
use sqlx::SqlitePool;
use tokio::sync::Mutex;

use crate::error::{validation, EngineError, Result};

type SightingRow = (i64, f64, f64, f64, String, i64);

/// Append-only log of debris sightings.
pub struct SightingStore {
    pool: SqlitePool,
    write_lock: Mutex<()>,
}

impl SightingStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            write_lock: Mutex::new(()),
        }
    }

    /// Validate and append a sighting. The store assigns id and timestamp.
    pub async fn insert(
        &self,
        latitude: f64,
        longitude: f64,
        quantity: f64,
        category: &str,
    ) -> Result<Sighting> {
        validate(latitude, longitude, quantity)?;
        let category = category.trim();

        let _guard = self.write_lock.lock().await;
        // Never stamp a row earlier than the newest one, so the sighting
        // just written is always the one `latest()` returns.
        let (newest,): (Option<i64>,) = sqlx::query_as("SELECT MAX(observed_at) FROM sightings")
            .fetch_one(&self.pool)
            .await?;
        let observed_at = match newest.and_then(DateTime::from_timestamp_millis) {
            Some(newest) => now_millis().max(newest),
            None => now_millis(),
        };
        let result = sqlx::query(
            "INSERT INTO sightings (latitude, longitude, quantity, category, observed_at)
            VALUES (?, ?, ?, ?, ?)",
        )
        .bind(latitude)
        .bind(longitude)
        .bind(quantity)
        .bind(category)
        .bind(observed_at.timestamp_millis())
        .execute(&self.pool)
        .await?;

        let sighting = Sighting {
            id: result.last_insert_rowid(),
            latitude,
            longitude,
            quantity,
            category: category.to_string(),
            observed_at,
        };
        log::info!(
            "Recorded sighting {} at ({}, {}): {} x {:?}",
            sighting.id,
            latitude,
            longitude,
            quantity,
            sighting.category
        );
        Ok(sighting)
    }

    /// Most recent sighting by timestamp, ties broken by insertion order.
    pub async fn latest(&self) -> Result<Sighting> {
        let row: Option<SightingRow> = sqlx::query_as(
            "SELECT id, latitude, longitude, quantity, category, observed_at FROM sightings
             ORDER BY observed_at DESC, id DESC
             LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await?;

        row.map(from_row).ok_or(EngineError::NotFound)
    }

    pub async fn count(&self) -> Result<i64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM sightings")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

pub fn validate(latitude: f64, longitude: f64, quantity: f64) -> Result<()> {
    if !(-90.0..=90.0).contains(&latitude) {
        return Err(validation(format!("latitude {latitude} outside [-90, 90]")));
    }
    if !(-180.0..=180.0).contains(&longitude) {
        return Err(validation(format!(
            "longitude {longitude} outside [-180, 180]"
        )));
    }
    if !quantity.is_finite() || quantity < 0.0 {
        return Err(validation(format!(
            "quantity {quantity} must be a non-negative number"
        )));
    }
    Ok(())
}

fn now_millis() -> DateTime<Utc> {
    // Stored at millisecond precision, so returned values must match.
    let now = Utc::now();
    DateTime::from_timestamp_millis(now.timestamp_millis()).unwrap_or(now)
}

fn from_row(row: SightingRow) -> Sighting {
    let (id, latitude, longitude, quantity, category, observed_at) = row;
    Sighting {
        id,
        latitude,
        longitude,
        quantity,
        category,
        observed_at: DateTime::from_timestamp_millis(observed_at)
            .unwrap_or(DateTime::UNIX_EPOCH),
    }
}
