use std::{
    net::{IpAddr, Ipv4Addr, SocketAddr},
    sync::Arc,
};

use primitives::config::Environment;
use serde::Deserialize;
use slog::{error, info, Logger};

/// an error used when deserializing a [`Config`] instance from environment variables
/// see [`Config::from_env()`]
pub use envy::Error as EnvError;

use crate::{routes::router, store::AdSpotStore, Application};

pub const DEFAULT_PORT: u16 = 8081;
pub const DEFAULT_IP_ADDR: IpAddr = IpAddr::V4(Ipv4Addr::LOCALHOST);

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Defaults to `Development`: [`Environment::default()`]
    #[serde(default)]
    pub env: Environment,
    /// The port on which the Ad Spots REST API will be accessible.
    #[serde(default = "default_port")]
    /// Defaults to `8081`: [`DEFAULT_PORT`]
    pub port: u16,
    /// The address on which the Ad Spots REST API will be accessible.
    /// `0.0.0.0` can be used for Docker.
    /// `127.0.0.1` can be used for locally running servers.
    #[serde(default = "default_ip_addr")]
    /// Defaults to `127.0.0.1`: [`DEFAULT_IP_ADDR`]
    pub ip_addr: IpAddr,
}

impl Config {
    /// Deserialize the application [`Config`] from Environment variables.
    pub fn from_env() -> Result<Self, EnvError> {
        envy::from_env()
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.ip_addr, self.port)
    }
}

fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_ip_addr() -> IpAddr {
    DEFAULT_IP_ADDR
}

impl<S: AdSpotStore> Application<S> {
    /// Starts the `axum` server together with the rate limiter's reclaimer.
    ///
    /// Returns after a graceful shutdown on `Ctrl+C` or `SIGTERM`.
    pub async fn run(self, socket_addr: SocketAddr) {
        let logger = self.logger.clone();
        let app = Arc::new(self);

        let builder = match axum::Server::try_bind(&socket_addr) {
            Ok(builder) => builder,
            Err(err) => {
                error!(&logger, "Binding to {} failed: {}", socket_addr, err; "main" => "run");
                return;
            }
        };

        let reclaimer = app.limiter.spawn_reclaimer(logger.clone());
        info!(&logger, "Listening on socket address: {}!", socket_addr; "main" => "run");

        let server = builder
            .serve(router(app).into_make_service_with_connect_info::<SocketAddr>())
            .with_graceful_shutdown(shutdown_signal(logger.clone()));

        if let Err(e) = server.await {
            error!(&logger, "server error: {}", e; "main" => "run");
        }

        reclaimer.stop().await;
        info!(&logger, "Server stopped"; "main" => "run");
    }
}

async fn shutdown_signal(logger: Logger) {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(&logger, "Failed to listen for Ctrl+C: {}", err; "main" => "shutdown_signal");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                terminate.recv().await;
            }
            Err(err) => {
                error!(&logger, "Failed to listen for SIGTERM: {}", err; "main" => "shutdown_signal");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!(&logger, "Shutting down"; "main" => "shutdown_signal");
}
