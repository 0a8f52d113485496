use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Deserialize, Serialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

/// One reported observation of debris at a coordinate.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Sighting {
    pub id: i64,
    pub latitude: f64,
    pub longitude: f64,
    pub quantity: f64,
    pub category: String,
    pub observed_at: DateTime<Utc>,
}

impl Sighting {
    pub fn position(&self) -> LatLng {
        LatLng::new(self.latitude, self.longitude)
    }
}

/// Wind at a point in time. Direction is a compass bearing in degrees,
/// clockwise from geographic North.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WindSample {
    pub speed: f64,
    pub direction: f64,
    pub valid_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DriftPrediction {
    pub origin: LatLng,
    pub horizon_days: u32,
    pub projected: LatLng,
    pub wind: WindSample,
}
