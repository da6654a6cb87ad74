//! Metric Registry Layer
//!
//! Process-wide store of the latest sample per declared metric/label
//! combination, plus the Prometheus text rendering of its snapshots.
//!
//! # Architecture
//!
//! - [`MetricDefinition`]: name, help text, kind, label names — declared
//!   once at startup, immutable afterward
//! - [`MetricRegistry`]: concurrency-safe `merge`/`snapshot` store shared
//!   by the scheduler (writer) and the exposition server (reader)
//! - [`render`]: snapshot → exposition text format

mod exposition;
mod registry;

pub use exposition::{render, CONTENT_TYPE};
pub use registry::{
    MetricDefinition, MetricKind, MetricRegistry, MetricSample, RegistryError, RegistrySnapshot,
    Sample,
};
