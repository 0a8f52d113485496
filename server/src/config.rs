use serde::Deserialize;

pub const STORMGLASS_POINT_URL: &str = "https://api.stormglass.io/v2/weather/point";

/// Forecast requests are retried at most once.
pub const MAX_FORECAST_RETRIES: u32 = 1;

#[derive(Clone, Debug, Deserialize)]
pub struct Config {
    #[serde(default = "default_forecast_url")]
    pub forecast_url: String,
    #[serde(default)]
    pub forecast_api_key: String,
    #[serde(default = "default_forecast_timeout_secs")]
    pub forecast_timeout_secs: u64,
    #[serde(default = "default_forecast_retries")]
    pub forecast_retries: u32,
    #[serde(default = "default_forecast_cache_ttl_secs")]
    pub forecast_cache_ttl_secs: u64,
    /// `DRIFT_COEFFICIENT`. envy strips every leading `DRIFT_`, so the
    /// field must not start with the prefix itself.
    #[serde(default = "default_coefficient")]
    pub coefficient: f64,
    #[serde(default = "default_max_horizon_days")]
    pub max_horizon_days: u32,
    pub model_path: Option<String>,
}

fn default_forecast_url() -> String {
    STORMGLASS_POINT_URL.to_string()
}

fn default_forecast_timeout_secs() -> u64 {
    10
}

fn default_forecast_retries() -> u32 {
    1
}

fn default_forecast_cache_ttl_secs() -> u64 {
    900
}

fn default_coefficient() -> f64 {
    0.1
}

fn default_max_horizon_days() -> u32 {
    10
}

impl Config {
    /// Read `DRIFT_*` variables from the environment.
    pub fn from_env() -> anyhow::Result<Self> {
        let config = envy::prefixed("DRIFT_").from_env::<Config>()?;
        Ok(config)
    }

    pub fn retries(&self) -> u32 {
        if self.forecast_retries > MAX_FORECAST_RETRIES {
            log::warn!(
                "DRIFT_FORECAST_RETRIES={} capped to {}",
                self.forecast_retries,
                MAX_FORECAST_RETRIES
            );
        }
        self.forecast_retries.min(MAX_FORECAST_RETRIES)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_env() {
        let config = envy::prefixed("DRIFT_")
            .from_iter::<_, Config>(Vec::<(String, String)>::new())
            .unwrap();
        assert_eq!(config.forecast_url, STORMGLASS_POINT_URL);
        assert_eq!(config.forecast_timeout_secs, 10);
        assert_eq!(config.retries(), 1);
        assert_eq!(config.coefficient, 0.1);
        assert_eq!(config.max_horizon_days, 10);
        assert!(config.model_path.is_none());
        assert!(config.forecast_api_key.is_empty());
    }

    #[test]
    fn test_overrides() {
        let vars = vec![
            ("DRIFT_FORECAST_API_KEY".to_string(), "secret".to_string()),
            ("DRIFT_COEFFICIENT".to_string(), "0.25".to_string()),
            ("DRIFT_MODEL_PATH".to_string(), "/tmp/model.json".to_string()),
        ];
        let config = envy::prefixed("DRIFT_").from_iter::<_, Config>(vars).unwrap();
        assert_eq!(config.forecast_api_key, "secret");
        assert_eq!(config.coefficient, 0.25);
        assert_eq!(config.model_path.as_deref(), Some("/tmp/model.json"));
    }

    #[test]
    fn test_retries_are_capped_at_one() {
        let vars = vec![("DRIFT_FORECAST_RETRIES".to_string(), "5".to_string())];
        let config = envy::prefixed("DRIFT_").from_iter::<_, Config>(vars).unwrap();
        assert_eq!(config.retries(), MAX_FORECAST_RETRIES);

        let vars = vec![("DRIFT_FORECAST_RETRIES".to_string(), "0".to_string())];
        let config = envy::prefixed("DRIFT_").from_iter::<_, Config>(vars).unwrap();
        assert_eq!(config.retries(), 0);
    }
}
