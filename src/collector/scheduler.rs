//! Fixed-interval collection scheduler.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::MissedTickBehavior;

use crate::collector::{Collector, RetryPolicy, MIN_INTERVAL};
use crate::metrics::MetricRegistry;

/// Drives collection cycles until shutdown.
///
/// Each cycle invokes every registered collector sequentially through the
/// retry policy and merges whatever samples come back into the registry.
/// A failing collector never aborts the cycle for the others and never
/// stops the loop. Cycles never overlap: when a cycle's work overruns the
/// interval, the next cycle starts immediately after completion instead of
/// waiting for the next wall-clock boundary.
pub struct Scheduler {
    registry: Arc<MetricRegistry>,
    collectors: Vec<Box<dyn Collector>>,
    interval: Duration,
    retry: RetryPolicy,
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("collectors", &self.collectors.len())
            .field("interval", &self.interval)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

impl Scheduler {
    /// Create a scheduler. The interval is clamped to a 1-second minimum.
    pub fn new(registry: Arc<MetricRegistry>, interval: Duration, retry: RetryPolicy) -> Self {
        let interval = if interval < MIN_INTERVAL {
            tracing::warn!(min_interval = ?MIN_INTERVAL,
                "Poll interval is less than minimum allowed. Using minimum interval."
            );
            MIN_INTERVAL
        } else {
            interval
        };

        Self {
            registry,
            collectors: Vec::new(),
            interval,
            retry,
        }
    }

    /// Register a collector. Collectors run in registration order.
    pub fn register(&mut self, collector: Box<dyn Collector>) {
        tracing::info!(collector = %collector.name(), "Collector registered");
        self.collectors.push(collector);
    }

    /// Number of registered collectors.
    pub fn collector_count(&self) -> usize {
        self.collectors.len()
    }

    /// Execute one collection cycle: every collector, sequentially.
    pub async fn run_cycle(&self) {
        let start = std::time::Instant::now();

        for collector in &self.collectors {
            let name = collector.name();
            let outcome = self.retry.fetch(collector.as_ref()).await;

            match outcome.samples {
                Some(samples) => {
                    let reported = samples.len();
                    let applied = self.registry.merge(samples).await;
                    tracing::info!(
                        collector = %name,
                        samples = applied,
                        reported,
                        attempts = outcome.attempts,
                        "Collection succeeded"
                    );
                }
                None => {
                    tracing::warn!(
                        collector = %name,
                        attempts = outcome.attempts,
                        "Collector contributed no samples this cycle"
                    );
                }
            }
        }

        tracing::debug!(
            duration_ms = start.elapsed().as_millis() as u64,
            "Collection cycle complete"
        );
    }

    /// Run cycles until the shutdown signal fires.
    ///
    /// The first cycle runs immediately. Missed ticks are delayed rather
    /// than burst: an overrunning cycle is followed by the next one right
    /// away, and subsequent ticks are respaced from there.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        tracing::info!(
            collectors = self.collectors.len(),
            interval = ?self.interval,
            "Scheduler started"
        );

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = shutdown.changed() => {
                    tracing::info!("Scheduler shutting down; no further cycles will be scheduled");
                    break;
                }
                _ = ticker.tick() => {}
            }
            self.run_cycle().await;
        }
    }
}
