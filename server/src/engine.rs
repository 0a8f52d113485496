use shared::models::{DriftPrediction, Sighting};
use std::path::PathBuf;
use tokio::sync::Mutex;

use crate::calibration::CalibrationModel;
use crate::config::Config;
use crate::drift;
use crate::error::{validation, EngineError, Result};
use crate::forecast::ForecastSource;
use crate::repos::sightings::SightingStore;

#[derive(Clone, Debug)]
pub struct Settings {
    pub drift_coefficient: f64,
    pub max_horizon_days: u32,
    /// Where calibration weights are saved after each update, if anywhere.
    pub model_path: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            drift_coefficient: drift::DEFAULT_DRIFT_COEFFICIENT,
            max_horizon_days: 10,
            model_path: None,
        }
    }
}

impl From<&Config> for Settings {
    fn from(config: &Config) -> Self {
        Settings {
            drift_coefficient: config.coefficient,
            max_horizon_days: config.max_horizon_days,
            model_path: config.model_path.as_ref().map(PathBuf::from),
        }
    }
}

/// Ties the sighting log, the forecast provider, the drift math and the
/// calibration model together. All state is owned here and injected.
pub struct Engine<F> {
    store: SightingStore,
    forecast: F,
    model: Mutex<CalibrationModel>,
    settings: Settings,
}

impl<F: ForecastSource> Engine<F> {
    pub fn new(
        store: SightingStore,
        forecast: F,
        model: CalibrationModel,
        settings: Settings,
    ) -> Self {
        Self {
            store,
            forecast,
            model: Mutex::new(model),
            settings,
        }
    }

    /// Persist a sighting, then train the calibration model on it.
    ///
    /// Calibration is best effort: its failures are logged and never turn a
    /// stored sighting into an error.
    pub async fn record_sighting(
        &self,
        latitude: f64,
        longitude: f64,
        quantity: f64,
        category: &str,
    ) -> Result<Sighting> {
        let sighting = self
            .store
            .insert(latitude, longitude, quantity, category)
            .await?;
        self.calibrate(&sighting).await;
        Ok(sighting)
    }

    async fn calibrate(&self, sighting: &Sighting) {
        let mut model = self.model.lock().await;
        if let Err(e) = model.update(sighting.latitude, sighting.longitude, sighting.quantity) {
            log::warn!("Calibration step skipped for sighting {}: {}", sighting.id, e);
            return;
        }
        if let Some(path) = &self.settings.model_path {
            if let Err(e) = model.save(path).await {
                log::warn!("Failed to save calibration model to {}: {}", path.display(), e);
            }
        }
    }

    pub async fn latest_sighting(&self) -> Result<Sighting> {
        self.store.latest().await
    }

    pub async fn sighting_count(&self) -> Result<i64> {
        self.store.count().await
    }

    /// Where the latest sighting drifts within `horizon_days`.
    ///
    /// Only the first forecast sample is used; the wind is assumed constant
    /// over the whole horizon.
    pub async fn predict_drift(&self, horizon_days: u32) -> Result<DriftPrediction> {
        if horizon_days < 1 || horizon_days > self.settings.max_horizon_days {
            return Err(validation(format!(
                "horizon must be between 1 and {} days",
                self.settings.max_horizon_days
            )));
        }

        let sighting = self.store.latest().await?;
        let origin = sighting.position();
        let samples = self.forecast.get_forecast(origin, horizon_days).await?;
        let wind = samples
            .into_iter()
            .next()
            .ok_or_else(|| EngineError::ForecastUnavailable("empty forecast".to_string()))?;

        let projected = drift::project(
            origin,
            &wind,
            horizon_days,
            self.settings.drift_coefficient,
        )?;
        log::info!(
            "Sighting {} at ({}, {}) drifts to ({}, {}) in {} day(s), wind {} m/s from {}°",
            sighting.id,
            origin.lat,
            origin.lng,
            projected.lat,
            projected.lng,
            horizon_days,
            wind.speed,
            wind.direction
        );

        Ok(DriftPrediction {
            origin,
            horizon_days,
            projected,
            wind,
        })
    }

    pub async fn estimate_quantity(&self, latitude: f64, longitude: f64) -> f64 {
        self.model.lock().await.predict(latitude, longitude)
    }

    pub async fn model_snapshot(&self) -> CalibrationModel {
        self.model.lock().await.clone()
    }
}
