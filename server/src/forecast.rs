//! Wind forecasts for a point and a window of days.
//!
//! The provider is reached through [`ForecastSource`]. [`StormglassClient`]
//! is the HTTP implementation; [`Memoized`] wraps any source so repeated
//! requests for the same coordinate and window hit the network once.

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use serde::Deserialize;
use shared::models::{LatLng, WindSample};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::config::Config;
use crate::error::{validation, EngineError, Result};
use crate::retry::{with_retry, RetryConfig, RetryError};

/// Variables requested from the provider. Only wind is consumed.
pub const FORECAST_PARAMS: [&str; 4] = [
    "waveHeight",
    "airTemperature",
    "windSpeed",
    "windDirection",
];

/// Inclusive time range covered by a forecast request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ForecastWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl ForecastWindow {
    /// From the start of `now`'s day through the last second of the day
    /// `horizon_days` later.
    pub fn for_horizon(now: DateTime<Utc>, horizon_days: u32) -> Result<Self> {
        if horizon_days < 1 {
            return Err(validation("horizon must be at least 1 day"));
        }
        let start = now
            .date_naive()
            .and_hms_opt(0, 0, 0)
            .ok_or_else(|| validation("invalid forecast start"))?
            .and_utc();
        let end = start + TimeDelta::days(horizon_days as i64 + 1) - TimeDelta::seconds(1);
        Ok(ForecastWindow { start, end })
    }

    pub fn contains(&self, time: &DateTime<Utc>) -> bool {
        self.start <= *time && *time <= self.end
    }
}

#[async_trait]
pub trait ForecastSource: Send + Sync {
    /// Hourly wind samples for `position` within `window`.
    async fn fetch(&self, position: LatLng, window: &ForecastWindow) -> Result<Vec<WindSample>>;

    /// Wind samples from today through `horizon_days` days ahead.
    async fn get_forecast(&self, position: LatLng, horizon_days: u32) -> Result<Vec<WindSample>> {
        let window = ForecastWindow::for_horizon(Utc::now(), horizon_days)?;
        self.fetch(position, &window).await
    }
}

#[derive(Deserialize)]
struct PointResponse {
    hours: Vec<Hour>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Hour {
    time: DateTime<Utc>,
    wind_speed: SourceValue,
    wind_direction: SourceValue,
}

/// Provider-preferred ("sg") value of a variable.
#[derive(Deserialize)]
struct SourceValue {
    sg: f64,
}

/// Decode a point forecast body into wind samples, rejecting anything that
/// could not be used for a projection.
fn parse_point_response(body: &str, window: &ForecastWindow) -> anyhow::Result<Vec<WindSample>> {
    let response: PointResponse = serde_json::from_str(body)?;
    if response.hours.is_empty() {
        anyhow::bail!("forecast contains no hours");
    }

    response
        .hours
        .into_iter()
        .map(|hour| {
            let speed = hour.wind_speed.sg;
            let direction = hour.wind_direction.sg;
            if !speed.is_finite() || speed < 0.0 {
                anyhow::bail!("invalid wind speed {} at {}", speed, hour.time);
            }
            if !direction.is_finite() || !(0.0..=360.0).contains(&direction) {
                anyhow::bail!("invalid wind direction {} at {}", direction, hour.time);
            }
            if !window.contains(&hour.time) {
                anyhow::bail!("sample at {} outside requested window", hour.time);
            }
            Ok(WindSample {
                speed,
                direction: direction % 360.0,
                valid_at: hour.time,
            })
        })
        .collect()
}

/// Stormglass point forecast client.
pub struct StormglassClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    retry: RetryConfig,
}

impl StormglassClient {
    pub fn new(
        base_url: &str,
        api_key: &str,
        timeout: Duration,
        retry: RetryConfig,
    ) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.to_string(),
            api_key: api_key.to_string(),
            retry,
        })
    }

    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        Self::new(
            &config.forecast_url,
            &config.forecast_api_key,
            Duration::from_secs(config.forecast_timeout_secs),
            RetryConfig::new(config.retries(), 500),
        )
    }

    async fn fetch_once(
        &self,
        position: LatLng,
        window: &ForecastWindow,
    ) -> std::result::Result<Vec<WindSample>, RetryError> {
        if self.api_key.is_empty() {
            return Err(RetryError::NonRetryable(anyhow::anyhow!(
                "missing forecast credentials, set DRIFT_FORECAST_API_KEY"
            )));
        }
        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("lat", position.lat.to_string()),
                ("lng", position.lng.to_string()),
                ("params", FORECAST_PARAMS.join(",")),
                ("start", window.start.timestamp().to_string()),
                ("end", window.end.timestamp().to_string()),
            ])
            .header(reqwest::header::AUTHORIZATION, &self.api_key)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() || e.is_connect() {
                    RetryError::Retryable(e.into())
                } else {
                    RetryError::NonRetryable(e.into())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let err = anyhow::anyhow!("forecast request failed with status: {}", status);
            return if status == reqwest::StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
                Err(RetryError::Retryable(err))
            } else {
                Err(RetryError::NonRetryable(err))
            };
        }

        let body = response
            .text()
            .await
            .map_err(|e| RetryError::Retryable(e.into()))?;
        parse_point_response(&body, window).map_err(RetryError::NonRetryable)
    }
}

#[async_trait]
impl ForecastSource for StormglassClient {
    async fn fetch(&self, position: LatLng, window: &ForecastWindow) -> Result<Vec<WindSample>> {
        log::debug!(
            "Fetching forecast for ({}, {}) from {} to {}",
            position.lat,
            position.lng,
            window.start,
            window.end
        );
        with_retry(move || self.fetch_once(position, window), &self.retry)
            .await
            .map_err(|e| {
                let err = e.into_inner();
                log::error!("Forecast unavailable: {:#}", err);
                EngineError::ForecastUnavailable(format!("{:#}", err))
            })
    }
}

type CacheKey = (u64, u64, i64, i64);

/// Caches successful responses per (coordinate, window) for `ttl`.
pub struct Memoized<S> {
    inner: S,
    ttl: Duration,
    entries: Mutex<HashMap<CacheKey, (Instant, Vec<WindSample>)>>,
}

impl<S: ForecastSource> Memoized<S> {
    pub fn new(inner: S, ttl: Duration) -> Self {
        Self {
            inner,
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl<S: ForecastSource> ForecastSource for Memoized<S> {
    async fn fetch(&self, position: LatLng, window: &ForecastWindow) -> Result<Vec<WindSample>> {
        let key = (
            position.lat.to_bits(),
            position.lng.to_bits(),
            window.start.timestamp(),
            window.end.timestamp(),
        );

        {
            let mut entries = self.entries.lock().await;
            entries.retain(|_, (fetched_at, _)| fetched_at.elapsed() < self.ttl);
            if let Some((_, samples)) = entries.get(&key) {
                log::debug!("Forecast cache hit for {:?}", key);
                return Ok(samples.clone());
            }
        }

        let samples = self.inner.fetch(position, window).await?;
        self.entries
            .lock()
            .await
            .insert(key, (Instant::now(), samples.clone()));
        Ok(samples)
    }
}
