#![deny(clippy::all)]
#![deny(rust_2018_idioms)]

use std::{path::Path, sync::Arc};

use clap::{crate_version, Arg, Command};

use adspots::{
    application::Config as EnvConfig,
    db::{postgres_connection, setup_migrations, PostgresConfig},
    store::{MemoryStore, PostgresStore},
    Application,
};
use primitives::{config::configuration, util::logging::new_logger, Clock, SystemClock};
use slog::info;

/// The maximum number of Postgres connections in the pool
const POOL_MAX_SIZE: usize = 16;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Command::new("Ad Spots")
        .version(crate_version!())
        .arg(
            Arg::new("config")
                .help("the config file for the Ad Spots server")
                .takes_value(true),
        )
        .arg(
            Arg::new("inMemory")
                .long("in-memory")
                .help("keep the ad spots in memory instead of Postgres, they're lost on restart"),
        )
        .get_matches();

    let env_config = EnvConfig::from_env()?;
    let config_file = cli.value_of("config").map(Path::new);
    let config = configuration(env_config.env, config_file)?;

    let logger = new_logger("adspots");
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let socket_addr = env_config.socket_addr();

    info!(&logger, "Starting in {:?} environment", env_config.env; "main" => "main");

    if cli.is_present("inMemory") {
        info!(&logger, "Ad spots are kept in memory"; "main" => "main");

        Application::new(MemoryStore::default(), config, logger, clock)
            .run(socket_addr)
            .await;
    } else {
        let postgres = PostgresConfig::from_env()?;
        let pool = postgres_connection(POOL_MAX_SIZE, &postgres)?;

        setup_migrations(postgres).await?;
        info!(&logger, "Migrations applied"; "main" => "main");

        Application::new(PostgresStore::new(pool), config, logger, clock)
            .run(socket_addr)
            .await;
    }

    Ok(())
}
