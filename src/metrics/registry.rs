//! Latest-sample registry shared between the scheduler and the server.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::sync::RwLock;

/// Errors raised while constructing the registry.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Two definitions share the same metric name.
    #[error("duplicate metric definition: {0}")]
    DuplicateName(String),
}

/// Metric kind. Everything this service exports is a gauge: the exposed
/// value is the latest observation, with no accumulation across updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MetricKind {
    #[default]
    Gauge,
}

impl MetricKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Gauge => "gauge",
        }
    }
}

/// A metric declared at startup.
///
/// Names are unique across the registry and the label name set is fixed
/// per metric; samples with a different label arity are rejected at merge.
#[derive(Debug, Clone)]
pub struct MetricDefinition {
    /// Exposition name, e.g. `weather_temperature_celsius`.
    pub name: String,
    /// Help text rendered on the `# HELP` line.
    pub help: String,
    /// Metric kind rendered on the `# TYPE` line.
    pub kind: MetricKind,
    /// Label names, in the order label values are reported.
    pub labels: Vec<String>,
}

impl MetricDefinition {
    /// Declare an unlabeled gauge.
    pub fn gauge(name: impl Into<String>, help: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            help: help.into(),
            kind: MetricKind::Gauge,
            labels: Vec::new(),
        }
    }

    /// Declare a gauge with a fixed set of label names.
    pub fn gauge_with_labels(
        name: impl Into<String>,
        help: impl Into<String>,
        labels: &[&str],
    ) -> Self {
        Self {
            name: name.into(),
            help: help.into(),
            kind: MetricKind::Gauge,
            labels: labels.iter().map(|l| l.to_string()).collect(),
        }
    }
}

/// One observation reported by a collector.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    /// Name of the declared metric this value belongs to.
    pub metric: String,
    /// Label values, matching the definition's label names in order.
    pub labels: Vec<String>,
    /// Observed value.
    pub value: f64,
}

impl Sample {
    /// Build an unlabeled sample.
    pub fn new(metric: impl Into<String>, value: f64) -> Self {
        Self {
            metric: metric.into(),
            labels: Vec::new(),
            value,
        }
    }

    /// Build a sample with label values.
    pub fn with_labels(metric: impl Into<String>, labels: &[&str], value: f64) -> Self {
        Self {
            metric: metric.into(),
            labels: labels.iter().map(|l| l.to_string()).collect(),
            value,
        }
    }
}

/// A stored sample: latest value plus the time it was last refreshed.
///
/// Entries are never deleted; a value that stops being refreshed stays
/// exposed with its old timestamp, which is the only staleness signal.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricSample {
    pub labels: Vec<String>,
    pub value: f64,
    pub updated_at: DateTime<Utc>,
}

/// Key identifying one series: (metric name, label value tuple).
type SampleKey = (String, Vec<String>);

/// Point-in-time copy of the registry, safe to render without locking.
#[derive(Debug, Clone)]
pub struct RegistrySnapshot {
    definitions: Arc<Vec<MetricDefinition>>,
    samples: BTreeMap<SampleKey, MetricSample>,
}

impl RegistrySnapshot {
    /// Declared definitions, in declaration order.
    pub fn definitions(&self) -> &[MetricDefinition] {
        &self.definitions
    }

    /// Stored samples for one metric, ordered by label values.
    pub fn samples_for<'a>(
        &'a self,
        metric: &'a str,
    ) -> impl Iterator<Item = &'a MetricSample> + 'a {
        self.samples
            .range((metric.to_string(), Vec::new())..)
            .take_while(move |((name, _), _)| name.as_str() == metric)
            .map(|(_, sample)| sample)
    }

    /// Look up a single series.
    pub fn get(&self, metric: &str, labels: &[&str]) -> Option<&MetricSample> {
        let key = (
            metric.to_string(),
            labels.iter().map(|l| l.to_string()).collect(),
        );
        self.samples.get(&key)
    }

    /// Total number of stored samples.
    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }
}

/// Process-wide latest-sample store.
///
/// Explicitly constructed at startup and shared by reference between the
/// scheduler and the server; definitions are immutable after construction.
/// `merge` and `snapshot` are each atomic with respect to the other: a
/// snapshot never observes a partially applied merge. The write lock is
/// held only for the in-memory updates, never across I/O.
#[derive(Debug)]
pub struct MetricRegistry {
    definitions: Arc<Vec<MetricDefinition>>,
    by_name: HashMap<String, usize>,
    samples: RwLock<BTreeMap<SampleKey, MetricSample>>,
}

impl MetricRegistry {
    /// Create a registry from the declared definitions.
    ///
    /// # Errors
    /// Returns [`RegistryError::DuplicateName`] if two definitions share a
    /// name.
    pub fn new(definitions: Vec<MetricDefinition>) -> Result<Self, RegistryError> {
        let mut by_name = HashMap::with_capacity(definitions.len());
        let mut seen = HashSet::new();
        for (idx, def) in definitions.iter().enumerate() {
            if !seen.insert(def.name.clone()) {
                return Err(RegistryError::DuplicateName(def.name.clone()));
            }
            by_name.insert(def.name.clone(), idx);
        }

        Ok(Self {
            definitions: Arc::new(definitions),
            by_name,
            samples: RwLock::new(BTreeMap::new()),
        })
    }

    /// Declared definitions, in declaration order.
    pub fn definitions(&self) -> &[MetricDefinition] {
        &self.definitions
    }

    /// Apply last-write-wins updates, one key at a time.
    ///
    /// Samples for undeclared metrics or with the wrong label arity are
    /// skipped with a warning; the rest of the batch still applies. Returns
    /// the number of samples actually stored.
    pub async fn merge(&self, samples: Vec<Sample>) -> usize {
        let now = Utc::now();
        let mut applied = 0;

        let mut store = self.samples.write().await;
        for sample in samples {
            let Some(&idx) = self.by_name.get(&sample.metric) else {
                tracing::warn!(metric = %sample.metric, "Dropping sample for undeclared metric");
                continue;
            };
            let expected = self.definitions[idx].labels.len();
            if sample.labels.len() != expected {
                tracing::warn!(
                    metric = %sample.metric,
                    expected,
                    got = sample.labels.len(),
                    "Dropping sample with mismatched label arity"
                );
                continue;
            }

            store.insert(
                (sample.metric, sample.labels.clone()),
                MetricSample {
                    labels: sample.labels,
                    value: sample.value,
                    updated_at: now,
                },
            );
            applied += 1;
        }

        applied
    }

    /// Return an immutable point-in-time copy of the registry state.
    pub async fn snapshot(&self) -> RegistrySnapshot {
        RegistrySnapshot {
            definitions: Arc::clone(&self.definitions),
            samples: self.samples.read().await.clone(),
        }
    }
}
