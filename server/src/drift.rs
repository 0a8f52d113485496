use shared::models::{LatLng, WindSample};

use crate::error::{validation, Result};

pub const DEFAULT_DRIFT_COEFFICIENT: f64 = 0.1;

/// Move `origin` downwind of `wind`.
///
/// The wind direction is read as a compass bearing: 0° pushes north and 90°
/// pushes east. The displacement in degrees is `speed * drift_coefficient`.
/// Degrees are treated as a constant distance, with no geodesic correction.
/// `horizon_days` does not scale the offset. The same sample stands for
/// the whole horizon.
pub fn project(
    origin: LatLng,
    wind: &WindSample,
    horizon_days: u32,
    drift_coefficient: f64,
) -> Result<LatLng> {
    if horizon_days < 1 {
        return Err(validation("horizon must be at least 1 day"));
    }
    if !wind.speed.is_finite() || wind.speed < 0.0 {
        return Err(validation(format!("invalid wind speed {}", wind.speed)));
    }
    if !wind.direction.is_finite() || !(0.0..=360.0).contains(&wind.direction) {
        return Err(validation(format!(
            "wind direction {} outside [0, 360]",
            wind.direction
        )));
    }
    if !drift_coefficient.is_finite() {
        return Err(validation("drift coefficient must be finite"));
    }

    let bearing = (wind.direction % 360.0).to_radians();
    let distance = wind.speed * drift_coefficient;

    Ok(LatLng {
        lat: origin.lat + bearing.cos() * distance,
        lng: origin.lng + bearing.sin() * distance,
    })
}
