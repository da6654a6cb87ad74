//! Scorecast Binary Entry Point
//!
//! This binary runs the complete exporter: the collection scheduler and the
//! exposition server, sharing one metric registry. Core functionality is
//! provided by the `scorecast` library crate.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use scorecast::{
    collector::{Collector, RetryPolicy, Scheduler, StatsCollector, WeatherCollector},
    config::{self, AppConfig, DatabaseConfig, ServerConfig, WeatherConfig},
    metrics::MetricRegistry,
    server::create_router,
};
use tokio::sync::watch;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Scorecast - Esports Stats and Weather Exporter
#[derive(Parser, Debug)]
#[command(name = "scorecast", version, about, long_about = None)]
struct Cli {
    /// Stats database host
    #[arg(long, default_value = "localhost", env = "DB_HOST")]
    db_host: String,

    /// Stats database port
    #[arg(long, default_value_t = 5432, env = "DB_PORT")]
    db_port: u16,

    /// Stats database name
    #[arg(long, default_value = "esports", env = "DB_NAME")]
    db_name: String,

    /// Stats database user
    #[arg(long, default_value = "postgres", env = "DB_USER")]
    db_user: String,

    /// Stats database password
    #[arg(long, default_value = "", env = "DB_PASSWORD")]
    db_password: String,

    /// Weather API key (mandatory)
    #[arg(long, env = "WEATHER_API_KEY")]
    weather_api_key: Option<String>,

    /// City to poll weather for
    #[arg(long, default_value = "London", env = "WEATHER_CITY")]
    weather_city: String,

    /// Current-weather endpoint URL
    #[arg(
        long,
        default_value = "https://api.openweathermap.org/data/2.5/weather",
        env = "WEATHER_API_URL"
    )]
    weather_api_url: String,

    /// Poll interval in seconds
    #[arg(long, default_value_t = 20, env = "POLL_INTERVAL_SECONDS")]
    poll_interval_seconds: u64,

    /// Exposition server bind address
    #[arg(long, default_value = "0.0.0.0", env = "LISTEN_ADDR")]
    listen_addr: String,

    /// Exposition server port
    #[arg(long, default_value_t = config::DEFAULT_LISTEN_PORT, env = "LISTEN_PORT")]
    listen_port: u16,
}

impl Cli {
    fn into_config(self) -> AppConfig {
        AppConfig {
            database: DatabaseConfig {
                host: self.db_host,
                port: self.db_port,
                name: self.db_name,
                user: self.db_user,
                password: self.db_password,
            },
            weather: WeatherConfig {
                api_key: self.weather_api_key.unwrap_or_default(),
                city: self.weather_city,
                base_url: self.weather_api_url,
                ..WeatherConfig::default()
            },
            server: ServerConfig {
                bind: self.listen_addr,
                port: self.listen_port,
            },
            poll_interval: Duration::from_secs(self.poll_interval_seconds),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,scorecast=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Scorecast - Esports Stats and Weather Exporter");

    let cli = Cli::parse();
    let config = cli.into_config();

    // The only fatal error path: bad startup configuration.
    if let Err(e) = config.validate() {
        tracing::error!(error = %e, "Invalid configuration; exiting");
        return Err(e.into());
    }

    tracing::info!(
        db = %format!("{}:{}/{}", config.database.host, config.database.port, config.database.name),
        city = %config.weather.city,
        api_key = %config::mask_secret(&config.weather.api_key),
        interval = ?config.poll_interval,
        "Configuration loaded"
    );

    // Build the collectors and the registry from their declared metrics.
    let stats = StatsCollector::new(&config.database);
    let weather = WeatherCollector::new(config.weather.clone())?;

    let mut definitions = stats.definitions();
    definitions.extend(weather.definitions());
    let registry = Arc::new(MetricRegistry::new(definitions)?);

    let mut scheduler = Scheduler::new(
        Arc::clone(&registry),
        config.poll_interval,
        RetryPolicy::default(),
    );
    scheduler.register(Box::new(stats));
    scheduler.register(Box::new(weather));

    // The scheduler stops scheduling new cycles when the signal fires; an
    // in-flight cycle is not awaited.
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let scheduler_task = tokio::spawn(scheduler.run(shutdown_rx));

    let app = create_router(Arc::clone(&registry));
    let addr: SocketAddr = format!("{}:{}", config.server.bind, config.server.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!("Exposition server listening on: http://{}/metrics", addr);
    tracing::info!("Press Ctrl+C to shutdown");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown_tx))
        .await?;

    scheduler_task.abort();
    tracing::info!("Shutdown complete");
    Ok(())
}

/// Wait for a termination signal, then stop the scheduler.
///
/// Returning from this future makes axum stop accepting new connections
/// while letting in-flight scrape responses complete.
async fn shutdown_signal(shutdown_tx: watch::Sender<bool>) {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C signal");
        }
        _ = terminate => {
            tracing::info!("Received terminate signal");
        }
    }

    if shutdown_tx.send(true).is_err() {
        tracing::warn!("Scheduler already stopped");
    }
}
