//! Scorecast - Gauge Metrics Exporter
//!
//! This crate provides the core functionality for the scorecast exporter:
//! a long-running service that polls an esports statistics database and a
//! weather API on a fixed interval and publishes the latest gauge values
//! through a Prometheus text endpoint.
//!
//! # Architecture
//!
//! - **Collectors**: source adapters with a closed error taxonomy, wrapped
//!   by a retry policy and driven by a fixed-interval scheduler
//! - **Metrics**: the process-wide latest-sample registry and the text
//!   exposition renderer
//! - **Server**: the axum scrape endpoint, reading registry snapshots only
//! - **Config**: environment-sourced settings, validated once at startup
//!
//! The scheduler and the server are independent concurrent activities
//! synchronized only through the registry: a scrape never waits on a
//! source, and a failing source only ever shows up as staleness.

pub mod collector;
pub mod config;
pub mod metrics;
pub mod server;

pub use collector::{
    Collector, CollectorError, ErrorClass, FetchOutcome, RetryPolicy, Scheduler, StatsCollector,
    WeatherCollector,
};
pub use config::{AppConfig, ConfigError, DatabaseConfig, ServerConfig, WeatherConfig};
pub use metrics::{MetricDefinition, MetricKind, MetricRegistry, RegistrySnapshot, Sample};
pub use server::create_router;
