use super::{schema::TABLES, Database, DatabaseError};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::info;

/// Row count and on-disk footprint of one benchmark table. Raw byte counts
/// are kept alongside the server-formatted strings so the report stays
/// machine-comparable.
#[derive(Debug, Clone, Serialize)]
pub struct TableStats {
    pub row_count: i64,
    pub table_bytes: i64,
    pub total_bytes: i64,
    pub table_size: String,
    pub total_size: String,
}

/// One index on a benchmark table. Collected in size-descending order,
/// which the report keeps, so the raw byte count rides along with the
/// pretty string like it does for tables.
#[derive(Debug, Clone, Serialize)]
pub struct IndexStats {
    pub index_name: String,
    pub index_bytes: i64,
    pub index_size: String,
    pub index_scans: i64,
}

/// VACUUM ANALYZE all four tables so sizes and planner statistics reflect
/// the populated state before anything is measured.
pub fn vacuum_analyze(db: &mut Database) -> Result<(), DatabaseError> {
    info!("Running VACUUM ANALYZE on benchmark tables");

    for table in TABLES {
        db.batch_execute(&format!("VACUUM ANALYZE {table}"))?;
    }

    Ok(())
}

pub fn collect_table_stats(
    db: &mut Database,
) -> Result<BTreeMap<String, TableStats>, DatabaseError> {
    let mut stats = BTreeMap::new();

    for table in TABLES {
        let row_count: i64 = db
            .query_one(&format!("SELECT COUNT(*) FROM {table}"), &[])?
            .get(0);

        let sizes = db.query_one(&table_size_sql(table), &[])?;

        let entry = TableStats {
            row_count,
            table_bytes: sizes.get(0),
            table_size: sizes.get(1),
            total_bytes: sizes.get(2),
            total_size: sizes.get(3),
        };
        info!(
            table,
            rows = entry.row_count,
            size = %entry.table_size,
            total = %entry.total_size,
            "Collected table stats"
        );

        stats.insert(table.to_owned(), entry);
    }

    Ok(stats)
}

/// Size queries with the relation name inlined, like the row count above.
/// The names come from the fixed table list, and passing them as a bound
/// parameter would make the server type `$1` as `regclass`, which the
/// driver refuses to serialize a string into.
fn table_size_sql(table: &str) -> String {
    format!(
        "SELECT pg_relation_size('{table}'),
                pg_size_pretty(pg_relation_size('{table}')),
                pg_total_relation_size('{table}'),
                pg_size_pretty(pg_total_relation_size('{table}'))"
    )
}

pub fn collect_index_stats(db: &mut Database) -> Result<Vec<IndexStats>, DatabaseError> {
    const INDEX_STATS: &str = "SELECT
            indexrelname,
            pg_relation_size(i.indexrelid),
            pg_size_pretty(pg_relation_size(i.indexrelid)),
            idx_scan
        FROM
            pg_stat_user_indexes ui
            JOIN pg_index i ON ui.indexrelid = i.indexrelid
        WHERE
            ui.schemaname = 'public' AND
            ui.relname IN ('parent_serial', 'child_serial', 'parent_uuid', 'child_uuid')
        ORDER BY
            pg_relation_size(i.indexrelid) DESC";

    let mut stats = Vec::new();
    for row in db.query(INDEX_STATS, &[])? {
        let entry = IndexStats {
            index_name: row.get(0),
            index_bytes: row.get(1),
            index_size: row.get(2),
            index_scans: row.get::<_, Option<i64>>(3).unwrap_or(0),
        };
        info!(
            index = %entry.index_name,
            size = %entry.index_size,
            scans = entry.index_scans,
            "Collected index stats"
        );

        stats.push(entry);
    }

    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn size_queries_inline_the_relation_name() {
        let sql = table_size_sql("parent_uuid");

        assert!(sql.contains("pg_relation_size('parent_uuid')"));
        assert!(sql.contains("pg_total_relation_size('parent_uuid')"));
        // no bound parameters, the server must not type the name as regclass
        assert!(!sql.contains('$'));
    }
}
