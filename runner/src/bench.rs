use crate::database::{Database, DatabaseError, KeyKind};
use serde::Serialize;
use std::time::Instant;
use tracing::info;

#[cfg(test)]
mod summary_test;

/// One benchmarked query: a shape name tagged with the key kind and the
/// SQL text against that kind's table pair.
#[derive(Debug, Clone)]
pub struct QuerySpec {
    pub name: String,
    pub kind: KeyKind,
    pub sql: String,
}

type SqlBuilder = fn(KeyKind) -> String;

/// The three query shapes under test. Each is instantiated for both key
/// kinds by the same builder so the variants cannot drift apart.
const SHAPES: [(&str, SqlBuilder); 3] = [
    ("Simple Join", simple_join_sql),
    ("Aggregate Join", aggregate_join_sql),
    ("Multi-Stage Join", multi_stage_join_sql),
];

/// The six fixed queries: three shapes times two key kinds.
pub fn query_set() -> Vec<QuerySpec> {
    SHAPES
        .iter()
        .flat_map(|&(shape, builder)| {
            KeyKind::ALL.map(|kind| QuerySpec {
                name: format!("{shape} - {}", kind.label()),
                kind,
                sql: builder(kind),
            })
        })
        .collect()
}

fn simple_join_sql(kind: KeyKind) -> String {
    let s = kind.suffix();

    format!(
        "SELECT p.id, p.name, c.description \
         FROM parent_{s} p JOIN child_{s} c ON p.id = c.parent_id \
         WHERE p.value > 500 LIMIT 1000"
    )
}

fn aggregate_join_sql(kind: KeyKind) -> String {
    let s = kind.suffix();

    format!(
        "SELECT p.name, COUNT(c.id) as child_count, AVG(p.value) as avg_value \
         FROM parent_{s} p LEFT JOIN child_{s} c ON p.id = c.parent_id \
         WHERE p.value BETWEEN 200 AND 800 \
         GROUP BY p.name ORDER BY child_count DESC LIMIT 100"
    )
}

fn multi_stage_join_sql(kind: KeyKind) -> String {
    let s = kind.suffix();

    format!(
        "WITH active_children AS (\
            SELECT parent_id, COUNT(*) as active_count \
            FROM child_{s} WHERE active = true GROUP BY parent_id\
         ) \
         SELECT p.id, p.name, p.value, COUNT(c.id) as total_children, \
                COALESCE(ac.active_count, 0) as active_children \
         FROM parent_{s} p \
         LEFT JOIN child_{s} c ON p.id = c.parent_id \
         LEFT JOIN active_children ac ON p.id = ac.parent_id \
         WHERE p.value > 200 \
         GROUP BY p.id, p.name, p.value, ac.active_count \
         ORDER BY p.value DESC LIMIT 100"
    )
}

/// Descriptive statistics over the elapsed times of one query, in
/// milliseconds rounded to 2 decimal places.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TimingSummary {
    pub avg_ms: f64,
    pub min_ms: f64,
    pub max_ms: f64,
    pub std_dev_ms: f64,
}

impl TimingSummary {
    /// Population statistics; iteration 0 is a sample like any other.
    pub fn from_samples(samples: &[f64]) -> Self {
        if samples.is_empty() {
            return Self {
                avg_ms: 0.0,
                min_ms: 0.0,
                max_ms: 0.0,
                std_dev_ms: 0.0,
            };
        }

        let count = samples.len() as f64;
        let avg = samples.iter().sum::<f64>() / count;
        let min = samples.iter().copied().fold(f64::INFINITY, f64::min);
        let max = samples.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let variance = samples.iter().map(|t| (t - avg).powi(2)).sum::<f64>() / count;

        Self {
            avg_ms: round2(avg),
            min_ms: round2(min),
            max_ms: round2(max),
            std_dev_ms: round2(variance.sqrt()),
        }
    }
}

pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Result of benchmarking a single query over all iterations.
#[derive(Debug, Clone, Serialize)]
pub struct BenchmarkResult {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: KeyKind,
    pub query: String,
    pub avg_time_ms: f64,
    pub min_time_ms: f64,
    pub max_time_ms: f64,
    pub std_dev_ms: f64,
    /// structured plan with actual runtime and buffer statistics, captured
    /// from iteration 0 only to bound report size
    pub execution_plan: Option<serde_json::Value>,
}

/// Run every fixed query `iterations` times and summarize the timings.
/// Session caches are discarded before each iteration except the first, so
/// the cold run stays in the statistics next to the warm ones.
pub fn run(db: &mut Database, iterations: u32) -> Result<Vec<BenchmarkResult>, DatabaseError> {
    info!("Running performance tests");

    // level the playing field before the suite
    db.batch_execute("DISCARD ALL")?;

    let mut results = Vec::with_capacity(6);
    for spec in query_set() {
        info!(query = %spec.name, "Benchmarking");

        let mut samples = Vec::with_capacity(iterations as usize);
        let mut plan = None;

        for iteration in 0..iterations {
            if iteration > 0 {
                db.batch_execute("DISCARD ALL")?;
            }

            let explain = format!("EXPLAIN (ANALYZE, BUFFERS, FORMAT JSON) {}", spec.sql);
            let started = Instant::now();
            let rows = db.query(&explain, &[])?;
            let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;

            if iteration == 0 {
                plan = rows.first().map(|row| row.get::<_, serde_json::Value>(0));
            }

            info!(
                iteration = iteration + 1,
                elapsed_ms = round2(elapsed_ms),
                "Iteration finished"
            );
            samples.push(elapsed_ms);
        }

        let summary = TimingSummary::from_samples(&samples);
        info!(
            avg_ms = summary.avg_ms,
            min_ms = summary.min_ms,
            max_ms = summary.max_ms,
            std_dev_ms = summary.std_dev_ms,
            "Query summary"
        );

        results.push(BenchmarkResult {
            name: spec.name,
            kind: spec.kind,
            query: spec.sql,
            avg_time_ms: summary.avg_ms,
            min_time_ms: summary.min_ms,
            max_time_ms: summary.max_ms,
            std_dev_ms: summary.std_dev_ms,
            execution_plan: plan,
        });
    }

    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn six_queries_three_shapes_both_kinds() {
        let queries = query_set();

        assert_eq!(queries.len(), 6);
        assert_eq!(
            queries.iter().filter(|q| q.kind == KeyKind::Serial).count(),
            3
        );
        assert_eq!(
            queries.iter().filter(|q| q.kind == KeyKind::Uuid).count(),
            3
        );
    }

    #[test]
    fn variants_differ_only_in_table_suffix() {
        let queries = query_set();

        for pair in queries.chunks(2) {
            let serial = &pair[0];
            let uuid = &pair[1];

            assert_eq!(serial.kind, KeyKind::Serial);
            assert_eq!(uuid.kind, KeyKind::Uuid);
            // same shape name up to the kind tag
            assert_eq!(
                serial.name.split(" - ").next(),
                uuid.name.split(" - ").next()
            );
            // rewriting the suffix must yield the exact other text
            assert_eq!(serial.sql.replace("_serial", "_uuid"), uuid.sql);
        }
    }

    #[test]
    fn simple_join_filters_and_limits() {
        let sql = simple_join_sql(KeyKind::Serial);

        assert!(sql.contains("JOIN child_serial c ON p.id = c.parent_id"));
        assert!(sql.contains("WHERE p.value > 500"));
        assert!(sql.contains("LIMIT 1000"));
    }

    #[test]
    fn aggregate_join_groups_and_orders() {
        let sql = aggregate_join_sql(KeyKind::Uuid);

        assert!(sql.contains("COUNT(c.id) as child_count"));
        assert!(sql.contains("BETWEEN 200 AND 800"));
        assert!(sql.contains("GROUP BY p.name ORDER BY child_count DESC LIMIT 100"));
    }

    #[test]
    fn multi_stage_join_uses_a_derived_aggregate() {
        let sql = multi_stage_join_sql(KeyKind::Serial);

        assert!(sql.starts_with("WITH active_children AS"));
        assert!(sql.contains("LEFT JOIN active_children ac ON p.id = ac.parent_id"));
        assert!(sql.contains("ORDER BY p.value DESC LIMIT 100"));
    }
}
