//! Seeder - Populates the rooms and weather tables with demo data.
//!
//! ```sh
//! seed rooms
//! seed weather --rng-seed 42
//! seed all
//! ```

mod catalogue;

use anyhow::Result;
use clap::{Parser, Subcommand};
use rand::rngs::StdRng;
use rand::SeedableRng;
use shared::{Config, DynamoStore};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use catalogue::{seed_rooms, seed_weather, SeedReport};

/// Populate the conference booking tables.
#[derive(Parser, Debug)]
#[command(name = "seed", version)]
struct Cli {
    #[command(subcommand)]
    target: Target,

    /// Seed for the temperature generator, for reproducible data.
    #[arg(long, global = true)]
    rng_seed: Option<u64>,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
enum Target {
    /// Write the room catalogue
    Rooms,
    /// Write one random temperature per city per day
    Weather,
    /// Rooms, then weather
    All,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .json()
        .init();

    let cli = Cli::parse();
    let config = Config::from_env()?;
    let store = DynamoStore::connect(&config).await;

    let mut total = SeedReport::default();

    if matches!(cli.target, Target::Rooms | Target::All) {
        let report = seed_rooms(&store).await;
        total.written += report.written;
        total.failed += report.failed;
    }

    if matches!(cli.target, Target::Weather | Target::All) {
        let mut rng = match cli.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let report = seed_weather(&store, &mut rng).await?;
        total.written += report.written;
        total.failed += report.failed;
    }

    if total.failed > 0 {
        warn!(failed = total.failed, "Some items could not be written");
    }
    info!(written = total.written, "Seeding complete");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_targets() {
        let cli = Cli::try_parse_from(["seed", "weather", "--rng-seed", "42"]).unwrap();
        assert_eq!(cli.target, Target::Weather);
        assert_eq!(cli.rng_seed, Some(42));

        let cli = Cli::try_parse_from(["seed", "all"]).unwrap();
        assert_eq!(cli.target, Target::All);

        assert!(Cli::try_parse_from(["seed", "bookings"]).is_err());
    }
}
