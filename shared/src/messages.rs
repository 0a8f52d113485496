use serde::{Deserialize, Serialize};

/// Body of a sighting report sent by a map or form client.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ReportSighting {
    pub latitude: f64,
    pub longitude: f64,
    pub quantity: f64,
    #[serde(default)]
    pub category: String,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct PredictionQuery {
    pub days: u32,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct EstimateQuery {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Estimate {
    pub estimate: f64,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Health {
    pub sightings: i64,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ErrorMessage {
    pub code: u16,
    pub message: String,
}
