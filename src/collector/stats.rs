//! Esports statistics collector.
//!
//! Runs a fixed battery of independent scalar aggregate queries against the
//! stats database. Each query's failure or NULL result is caught
//! individually: that one metric is omitted from the reported samples while
//! the rest of the batch proceeds. Only when every query fails does the
//! fetch itself fail, classified from the first error.

use std::time::Duration;

use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};

use crate::collector::{Collector, CollectorError};
use crate::config::DatabaseConfig;
use crate::metrics::{MetricDefinition, Sample};

/// Maximum pool size; one cycle runs its queries sequentially, the spare
/// connection covers pool recycling.
const MAX_CONNECTIONS: u32 = 2;

/// Per-query acquire timeout.
const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(10);

/// One scalar aggregate query and the gauge it feeds.
struct AggregateQuery {
    metric: &'static str,
    help: &'static str,
    sql: &'static str,
}

/// The full battery. Every query returns a single nullable scalar cast to
/// double precision.
const QUERIES: &[AggregateQuery] = &[
    AggregateQuery {
        metric: "esports_player_count_total",
        help: "Total number of players tracked in player_stats",
        sql: "SELECT COUNT(*)::double precision FROM player_stats",
    },
    AggregateQuery {
        metric: "esports_average_player_rating",
        help: "Average overall player rating",
        sql: "SELECT AVG(rating)::double precision FROM player_stats WHERE rating IS NOT NULL",
    },
    AggregateQuery {
        metric: "esports_top_player_rating",
        help: "Highest individual player rating",
        sql: "SELECT MAX(rating)::double precision FROM player_stats WHERE rating IS NOT NULL",
    },
    AggregateQuery {
        metric: "esports_total_kills",
        help: "Total kills accumulated by all players",
        sql: "SELECT SUM(kills)::double precision FROM player_stats",
    },
    AggregateQuery {
        metric: "esports_total_deaths",
        help: "Total deaths accumulated by all players",
        sql: "SELECT SUM(deaths)::double precision FROM player_stats",
    },
    AggregateQuery {
        metric: "esports_total_assists",
        help: "Total assists accumulated by all players",
        sql: "SELECT SUM(assists)::double precision FROM player_stats",
    },
    AggregateQuery {
        metric: "esports_matches_total",
        help: "Total number of matches recorded",
        sql: "SELECT COUNT(*)::double precision FROM matches",
    },
    AggregateQuery {
        metric: "esports_matches_completed_total",
        help: "Number of matches marked as completed",
        sql: "SELECT COUNT(*)::double precision FROM matches WHERE status = 'Completed'",
    },
    AggregateQuery {
        metric: "esports_average_attack_win_percent",
        help: "Average attack win percentage across all maps",
        sql: "SELECT AVG(attack_win_percent)::double precision FROM maps_stats",
    },
    AggregateQuery {
        metric: "esports_average_defense_win_percent",
        help: "Average defense win percentage across all maps",
        sql: "SELECT AVG(defense_win_percent)::double precision FROM maps_stats",
    },
    AggregateQuery {
        metric: "esports_agents_total",
        help: "Total number of agents tracked",
        sql: "SELECT COUNT(*)::double precision FROM agents_stats",
    },
    AggregateQuery {
        metric: "esports_average_agent_utilization",
        help: "Average total utilization score across all agents",
        sql: "SELECT AVG(total_utilization)::double precision FROM agents_stats",
    },
    AggregateQuery {
        metric: "esports_total_map_rounds_played",
        help: "Total times maps have been played",
        sql: "SELECT SUM(times_played)::double precision FROM maps_stats",
    },
];

/// Fold one query's result into the batch outcome.
///
/// NULL results are omitted silently (an empty table has no average);
/// errors are recorded so the caller can report a partial cycle.
fn fold_query_result(
    metric: &'static str,
    result: Result<Option<f64>, CollectorError>,
    samples: &mut Vec<Sample>,
    failures: &mut Vec<(&'static str, CollectorError)>,
) {
    match result {
        Ok(Some(value)) => samples.push(Sample::new(metric, value)),
        Ok(None) => {
            tracing::debug!(metric, "Aggregate returned NULL; omitting metric this cycle");
        }
        Err(e) => failures.push((metric, e)),
    }
}

/// Aggregate-query adapter for the esports stats database.
pub struct StatsCollector {
    pool: PgPool,
}

impl std::fmt::Debug for StatsCollector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatsCollector").finish_non_exhaustive()
    }
}

impl StatsCollector {
    /// Create a collector with a lazily connected pool.
    ///
    /// The pool does not touch the network here; an unreachable database
    /// surfaces as a per-cycle connection error, never a startup failure.
    pub fn new(config: &DatabaseConfig) -> Self {
        let options = PgConnectOptions::new()
            .host(&config.host)
            .port(config.port)
            .database(&config.name)
            .username(&config.user)
            .password(&config.password);

        let pool = PgPoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .acquire_timeout(ACQUIRE_TIMEOUT)
            .connect_lazy_with(options);

        Self { pool }
    }
}

#[async_trait::async_trait]
impl Collector for StatsCollector {
    fn name(&self) -> &str {
        "esports-stats"
    }

    fn definitions(&self) -> Vec<MetricDefinition> {
        QUERIES
            .iter()
            .map(|q| MetricDefinition::gauge(q.metric, q.help))
            .collect()
    }

    async fn fetch(&self) -> Result<Vec<Sample>, CollectorError> {
        let mut samples = Vec::with_capacity(QUERIES.len());
        let mut failures = Vec::new();

        for query in QUERIES {
            let result = sqlx::query_scalar::<_, Option<f64>>(query.sql)
                .fetch_one(&self.pool)
                .await
                .map_err(CollectorError::from);
            fold_query_result(query.metric, result, &mut samples, &mut failures);
        }

        if samples.is_empty() {
            if let Some((metric, error)) = failures.into_iter().next() {
                tracing::warn!(metric, "Every aggregate query failed this cycle");
                return Err(error);
            }
            return Ok(samples);
        }

        if !failures.is_empty() {
            let partial = CollectorError::PartialData {
                missing: failures.iter().map(|(m, _)| m.to_string()).collect(),
            };
            for (metric, error) in &failures {
                tracing::warn!(metric, class = %error.class(), error = %error, "Aggregate query failed");
            }
            tracing::warn!(error = %partial, reported = samples.len(), "Partial collection cycle");
        }

        Ok(samples)
    }
}
