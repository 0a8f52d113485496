use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(about = "Debris sighting log and wind drift projections.")]
pub struct Cli {
    #[arg(env = "DRIFT_DATABASE_URL", short, long, default_value = "sqlite://sightings.db")]
    pub database_url: String,
    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Serve the JSON API.
    Http {
        #[arg(env = "DRIFT_SERVER_ADDRESS", default_value = "127.0.0.1:8080")]
        address: std::net::SocketAddr,
    },
    Db(DbCommand),
    Sighting(SightingCommand),
    /// Project where the latest sighting drifts.
    Predict {
        /// Horizon in days.
        #[arg(long, default_value_t = 1)]
        days: u32,
    },
    /// Estimated debris quantity at a coordinate.
    Estimate {
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,
        #[arg(long, allow_hyphen_values = true)]
        lng: f64,
    },
}

#[derive(Debug, Parser)]
pub struct DbCommand {
    #[command(subcommand)]
    pub cmd: DbSubCommand,
}

#[derive(Debug, Subcommand)]
pub enum DbSubCommand {
    Migrate,
}

#[derive(Debug, Parser)]
pub struct SightingCommand {
    #[command(subcommand)]
    pub cmd: SightingSubCommand,
}

#[derive(Debug, Subcommand)]
pub enum SightingSubCommand {
    Add {
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,
        #[arg(long, allow_hyphen_values = true)]
        lng: f64,
        #[arg(long, allow_hyphen_values = true)]
        quantity: f64,
        #[arg(long, default_value = "")]
        category: String,
    },
    Latest,
}
