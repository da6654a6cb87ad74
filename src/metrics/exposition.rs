//! Prometheus text exposition rendering.
//!
//! Renders a registry snapshot in the version 0.0.4 text format: one
//! `# HELP` and `# TYPE` line per declared metric, then one sample line per
//! stored series. Metrics that never received a value render header-only —
//! there is no implicit zero default.

use std::fmt::Write;

use super::{MetricSample, RegistrySnapshot};

/// Content type for scrape responses.
pub const CONTENT_TYPE: &str = "text/plain; version=0.0.4";

/// Escape a HELP text: backslash and newline.
fn escape_help(text: &str) -> String {
    text.replace('\\', "\\\\").replace('\n', "\\n")
}

/// Escape a label value: backslash, double quote, newline.
fn escape_label_value(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
}

/// Format one sample line: `name{label="value",...} value timestamp_ms`.
///
/// The millisecond timestamp is the sample's last refresh time; it is what
/// lets consumers detect staleness when a source keeps failing.
fn write_sample(out: &mut String, name: &str, labels: &[String], sample: &MetricSample) {
    out.push_str(name);

    if !labels.is_empty() {
        out.push('{');
        for (i, (label, value)) in labels.iter().zip(&sample.labels).enumerate() {
            if i > 0 {
                out.push(',');
            }
            let _ = write!(out, "{}=\"{}\"", label, escape_label_value(value));
        }
        out.push('}');
    }

    let _ = writeln!(out, " {} {}", sample.value, sample.updated_at.timestamp_millis());
}

/// Render a snapshot as exposition text.
pub fn render(snapshot: &RegistrySnapshot) -> String {
    let mut out = String::new();

    for def in snapshot.definitions() {
        let _ = writeln!(out, "# HELP {} {}", def.name, escape_help(&def.help));
        let _ = writeln!(out, "# TYPE {} {}", def.name, def.kind.as_str());

        for sample in snapshot.samples_for(&def.name) {
            write_sample(&mut out, &def.name, &def.labels, sample);
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::{MetricDefinition, MetricRegistry, Sample};

    async fn snapshot_of(defs: Vec<MetricDefinition>, samples: Vec<Sample>) -> RegistrySnapshot {
        let registry = MetricRegistry::new(defs).unwrap();
        registry.merge(samples).await;
        registry.snapshot().await
    }

    #[tokio::test]
    async fn test_render_headers_without_samples() {
        let snapshot = snapshot_of(
            vec![MetricDefinition::gauge("total_kills", "Total kills")],
            vec![],
        )
        .await;

        let body = render(&snapshot);
        assert_eq!(
            body,
            "# HELP total_kills Total kills\n# TYPE total_kills gauge\n"
        );
    }

    #[tokio::test]
    async fn test_render_unlabeled_sample() {
        let snapshot = snapshot_of(
            vec![MetricDefinition::gauge("total_kills", "Total kills")],
            vec![Sample::new("total_kills", 4500.0)],
        )
        .await;

        let body = render(&snapshot);
        let sample_line = body.lines().nth(2).unwrap();
        let mut parts = sample_line.split_whitespace();
        assert_eq!(parts.next(), Some("total_kills"));
        assert_eq!(parts.next(), Some("4500"));
        // Trailing timestamp in milliseconds.
        assert!(parts.next().unwrap().parse::<i64>().unwrap() > 0);
    }

    #[tokio::test]
    async fn test_render_labeled_sample() {
        let snapshot = snapshot_of(
            vec![MetricDefinition::gauge_with_labels(
                "weather_temperature_celsius",
                "Current temperature in Celsius",
                &["city"],
            )],
            vec![Sample::with_labels(
                "weather_temperature_celsius",
                &["London"],
                18.5,
            )],
        )
        .await;

        let body = render(&snapshot);
        assert!(body.contains("weather_temperature_celsius{city=\"London\"} 18.5"));
    }

    #[tokio::test]
    async fn test_render_declaration_order() {
        let snapshot = snapshot_of(
            vec![
                MetricDefinition::gauge("zeta", "last declared"),
                MetricDefinition::gauge("alpha", "first declared"),
            ],
            vec![],
        )
        .await;

        let body = render(&snapshot);
        let zeta = body.find("# HELP zeta").unwrap();
        let alpha = body.find("# HELP alpha").unwrap();
        assert!(zeta < alpha, "definitions must render in declaration order");
    }

    #[test]
    fn test_escape_help() {
        assert_eq!(escape_help("two\nlines"), "two\\nlines");
        assert_eq!(escape_help("back\\slash"), "back\\\\slash");
    }

    #[test]
    fn test_escape_label_value() {
        assert_eq!(escape_label_value("says \"hi\""), "says \\\"hi\\\"");
        assert_eq!(escape_label_value("a\\b"), "a\\\\b");
        assert_eq!(escape_label_value("a\nb"), "a\\nb");
    }
}
