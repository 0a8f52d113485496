use clap::Parser;
use cli::{Cli, Command, DbSubCommand, SightingSubCommand};
use std::time::Duration;

use crate::calibration::CalibrationModel;
use crate::config::Config;
use crate::engine::{Engine, Settings};
use crate::forecast::{Memoized, StormglassClient};
use crate::repos::sightings::SightingStore;

mod calibration;
mod cli;
mod config;
mod db;
mod drift;
mod engine;
mod error;
mod forecast;
mod repos;
mod retry;
mod server;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    env_logger::init();

    let args = Cli::parse();
    let config = Config::from_env()?;

    match args.cmd {
        Command::Db(db_cmd) => match db_cmd.cmd {
            DbSubCommand::Migrate => {
                db::init(&args.database_url).await?;
                println!("Database ready: {}", args.database_url);
            }
        },
        Command::Http { address } => {
            let engine = build_engine(&args.database_url, &config).await?;
            server::run(address, engine).await;
        }
        Command::Sighting(sighting_cmd) => {
            let engine = build_engine(&args.database_url, &config).await?;
            let sighting = match sighting_cmd.cmd {
                SightingSubCommand::Add {
                    lat,
                    lng,
                    quantity,
                    category,
                } => engine.record_sighting(lat, lng, quantity, &category).await?,
                SightingSubCommand::Latest => engine.latest_sighting().await?,
            };
            println!("{}", serde_json::to_string_pretty(&sighting)?);
        }
        Command::Predict { days } => {
            let engine = build_engine(&args.database_url, &config).await?;
            let prediction = engine.predict_drift(days).await?;
            println!("{}", serde_json::to_string_pretty(&prediction)?);
        }
        Command::Estimate { lat, lng } => {
            let engine = build_engine(&args.database_url, &config).await?;
            let estimate = engine.estimate_quantity(lat, lng).await;
            let samples = engine.model_snapshot().await.samples_seen();
            println!("{estimate:.2} (trained on {samples} sightings)");
        }
    }
    Ok(())
}

async fn build_engine(
    database_url: &str,
    config: &Config,
) -> anyhow::Result<Engine<Memoized<StormglassClient>>> {
    let pool = db::init(database_url).await?;
    let settings = Settings::from(config);
    let model = match &settings.model_path {
        Some(path) => CalibrationModel::load_or_default(path),
        None => CalibrationModel::new(),
    };
    let forecast = Memoized::new(
        StormglassClient::from_config(config)?,
        Duration::from_secs(config.forecast_cache_ttl_secs),
    );
    Ok(Engine::new(SightingStore::new(pool), forecast, model, settings))
}
