use deadpool_postgres::{Manager, ManagerConfig, RecyclingMethod};
use serde::Deserialize;
use thiserror::Error;
use tokio_postgres::NoTls;

pub use self::ad_spot::*;

pub use deadpool_postgres::{BuildError, PoolError};
/// an error used when deserializing a [`PostgresConfig`] from environment variables
pub use envy::Error as EnvError;

pub type DbPool = deadpool_postgres::Pool;

mod ad_spot;

/// The connection settings, read from the `POSTGRES_*` environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct PostgresConfig {
    /// `POSTGRES_USER`, defaults to `postgres`
    #[serde(default = "default_user")]
    pub user: String,
    /// `POSTGRES_PASSWORD`, defaults to `postgres`
    #[serde(default = "default_password")]
    pub password: String,
    /// `POSTGRES_HOST`, defaults to `localhost`
    #[serde(default = "default_host")]
    pub host: String,
    /// `POSTGRES_PORT`, defaults to `5432`
    #[serde(default = "default_port")]
    pub port: u16,
    /// `POSTGRES_DB`, if not set the user's default database is used
    #[serde(default, rename = "db")]
    pub database: Option<String>,
}

impl PostgresConfig {
    pub fn from_env() -> Result<Self, EnvError> {
        envy::prefixed("POSTGRES_").from_env()
    }

    fn to_tokio_postgres(&self) -> tokio_postgres::Config {
        let mut config = tokio_postgres::Config::new();

        config
            .user(&self.user)
            .password(&self.password)
            .host(&self.host)
            .port(self.port);
        if let Some(database) = &self.database {
            config.dbname(database);
        }

        config
    }
}

fn default_user() -> String {
    "postgres".into()
}
fn default_password() -> String {
    "postgres".into()
}
fn default_host() -> String {
    "localhost".into()
}
fn default_port() -> u16 {
    5432
}

/// Builds the pool, connections are only opened on first use.
pub fn postgres_connection(
    max_size: usize,
    config: &PostgresConfig,
) -> Result<DbPool, BuildError> {
    let manager_config = ManagerConfig {
        recycling_method: RecyclingMethod::Fast,
    };
    let manager = Manager::from_config(config.to_tokio_postgres(), NoTls, manager_config);

    DbPool::builder(manager).max_size(max_size).build()
}

/// Runs all the embedded migrations which haven't been applied yet.
///
/// `migrant_lib` is blocking, so this runs on the blocking thread pool.
pub async fn setup_migrations(config: PostgresConfig) -> Result<(), MigrationError> {
    tokio::task::spawn_blocking(move || run_migrations(&config)).await??;

    Ok(())
}

#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("Migration failed: {0}")]
    Migrant(#[from] migrant_lib::Error),
    #[error("Migration task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

fn run_migrations(postgres: &PostgresConfig) -> Result<(), migrant_lib::Error> {
    use migrant_lib::{Config, Direction, Migrator, Settings};

    let mut settings = Settings::configure_postgres();
    settings
        .database_user(&postgres.user)
        .database_password(&postgres.password)
        .database_host(&postgres.host)
        .database_port(postgres.port);
    if let Some(database) = &postgres.database {
        settings.database_name(database);
    }
    let settings = settings.build()?;

    let mut config = Config::with_settings(&settings);
    // creates the migrations table if it doesn't exist
    config.setup()?;
    config.use_cli_compatible_tags(true);

    macro_rules! make_migration {
        ($tag:expr) => {
            migrant_lib::EmbeddedMigration::with_tag($tag)
                .up(include_str!(concat!("../migrations/", $tag, "/up.sql")))
                .down(include_str!(concat!("../migrations/", $tag, "/down.sql")))
                .boxed()
        };
    }

    // Define Migrations
    config.use_migrations(&[make_migration!("20240101000000_ad_spots")])?;
    // loads the already applied migrations
    let config = config.reload()?;

    Migrator::with_config(&config)
        .direction(Direction::Up)
        .all(true)
        // by default this will set the `swallow_completion` to `false`
        // so no error will be returned if all migrations have already been ran
        .apply()?;

    Ok(())
}
