//! Online estimator of debris quantity from location.
//!
//! Independent of drift projection. Each observation performs exactly one
//! normalized least-mean-squares step on a linear model over a quadratic
//! expansion of the normalized coordinates.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{validation, EngineError};

const FEATURES: usize = 6;

/// Step size of the normalized update. Any value in (0, 2) shrinks the
/// error at the trained point.
pub const LEARNING_RATE: f64 = 0.5;

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct CalibrationModel {
    weights: [f64; FEATURES],
    samples_seen: u64,
}

fn features(latitude: f64, longitude: f64) -> [f64; FEATURES] {
    let x = latitude / 90.0;
    let y = longitude / 180.0;
    [1.0, x, y, x * x, y * y, x * y]
}

impl CalibrationModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn samples_seen(&self) -> u64 {
        self.samples_seen
    }

    /// Expected quantity at a coordinate under the current weights.
    pub fn predict(&self, latitude: f64, longitude: f64) -> f64 {
        features(latitude, longitude)
            .iter()
            .zip(self.weights.iter())
            .map(|(f, w)| f * w)
            .sum()
    }

    /// One training step toward `quantity` at the coordinate.
    pub fn update(
        &mut self,
        latitude: f64,
        longitude: f64,
        quantity: f64,
    ) -> Result<(), EngineError> {
        if !latitude.is_finite() || !longitude.is_finite() || !quantity.is_finite() {
            return Err(validation("calibration inputs must be finite"));
        }

        let phi = features(latitude, longitude);
        let norm: f64 = phi.iter().map(|f| f * f).sum();
        let error = quantity - self.predict(latitude, longitude);
        let step = LEARNING_RATE * error / norm;

        for (w, f) in self.weights.iter_mut().zip(phi.iter()) {
            *w += step * f;
        }
        self.samples_seen += 1;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        let model = serde_json::from_slice(&bytes)?;
        Ok(model)
    }

    pub async fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_vec_pretty(self)?;
        tokio::fs::write(path, json).await?;
        Ok(())
    }

    /// Load saved weights, falling back to an untrained model.
    pub fn load_or_default(path: &Path) -> Self {
        if !path.exists() {
            return Self::new();
        }
        match Self::load(path) {
            Ok(model) => {
                log::info!(
                    "Loaded calibration model from {} ({} samples)",
                    path.display(),
                    model.samples_seen
                );
                model
            }
            Err(e) => {
                log::warn!(
                    "Ignoring unreadable calibration model {}: {}",
                    path.display(),
                    e
                );
                Self::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_untrained_predicts_zero() {
        let model = CalibrationModel::new();
        assert_eq!(model.predict(-23.0, -43.0), 0.0);
        assert_eq!(model.samples_seen(), 0);
    }

    #[test]
    fn test_update_moves_estimate_closer() {
        let mut model = CalibrationModel::new();
        let cases = [
            (-22.97, -43.18, 12.0),
            (45.0, 170.0, 3.0),
            (0.0, 0.0, 100.0),
            (89.9, -179.9, 0.5),
        ];

        for (lat, lng, quantity) in cases {
            let before = (quantity - model.predict(lat, lng)).abs();
            model.update(lat, lng, quantity).unwrap();
            let after = (quantity - model.predict(lat, lng)).abs();
            assert!(after < before, "{after} !< {before} at ({lat}, {lng})");
        }
        assert_eq!(model.samples_seen(), 4);
    }

    #[test]
    fn test_repeated_updates_converge() {
        let mut model = CalibrationModel::new();
        for _ in 0..50 {
            model.update(10.0, 20.0, 8.0).unwrap();
        }
        assert!((model.predict(10.0, 20.0) - 8.0).abs() < 1e-6);
    }

    #[test]
    fn test_update_at_current_estimate_is_stable() {
        let mut model = CalibrationModel::new();
        model.update(5.0, 5.0, 0.0).unwrap();
        assert_eq!(model.predict(5.0, 5.0), 0.0);
    }

    #[test]
    fn test_non_finite_update_rejected() {
        let mut model = CalibrationModel::new();
        assert!(model.update(f64::NAN, 0.0, 1.0).is_err());
        assert!(model.update(0.0, 0.0, f64::INFINITY).is_err());
        assert_eq!(model, CalibrationModel::new());
    }

    #[tokio::test]
    async fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");

        let mut model = CalibrationModel::new();
        model.update(-3.0, 38.0, 7.0).unwrap();
        model.save(&path).await.unwrap();

        let loaded = CalibrationModel::load_or_default(&path);
        assert_eq!(loaded.samples_seen(), 1);
        assert!((loaded.predict(-3.0, 38.0) - model.predict(-3.0, 38.0)).abs() < 1e-9);
    }

    #[test]
    fn test_load_or_default_tolerates_missing_and_corrupt_files() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.json");
        assert_eq!(CalibrationModel::load_or_default(&missing), CalibrationModel::new());

        let corrupt = dir.path().join("corrupt.json");
        std::fs::write(&corrupt, b"{not json").unwrap();
        assert_eq!(CalibrationModel::load_or_default(&corrupt), CalibrationModel::new());
    }
}
