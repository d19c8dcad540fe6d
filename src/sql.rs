//! Statement text sent to the source database. Statements are built from
//! validated configuration values; identifiers are backquoted where a column
//! name appears, and timestamps are rendered through the run's layout.

use crate::config::TableSpec;
use crate::timeslot::{Granularity, TimeLayout, TimeRange};
use time::PrimitiveDateTime;

fn range_filter(column: &str, begin: &str, end: &str) -> String {
    format!("`{column}`>='{begin}' AND `{column}`<'{end}'")
}

/// Total row count over the table's full history.
pub fn count_all(table: &str) -> String {
    format!("SELECT count() FROM {table}")
}

/// Compressed on-disk bytes across the table's active parts.
pub fn sum_compressed_bytes(database: &str, table: &str) -> String {
    format!(
        "SELECT sum(data_compressed_bytes) AS compressed FROM system.parts \
         WHERE database='{database}' AND table='{table}' AND active=1"
    )
}

/// Row count restricted to the export range.
pub fn count_in_range(table: &TableSpec, range: &TimeRange, layout: &TimeLayout) -> String {
    format!(
        "SELECT count() FROM {} WHERE {}",
        table.name,
        range_filter(
            &table.time_column,
            &layout.render(range.begin),
            &layout.render(range.end)
        )
    )
}

/// Grouped aggregation counting rows per bucket at the given granularity,
/// ordered by bucket start. Truncating to a day or coarser yields a bare
/// date; the statement converts bucket starts back to date-times so one
/// layout parses every granularity.
pub fn slot_counts(
    table: &TableSpec,
    granularity: Granularity,
    range: &TimeRange,
    layout: &TimeLayout,
) -> String {
    format!(
        "SELECT toDateTime(toStartOfInterval(`{}`, INTERVAL {granularity})) AS slot, \
         count() FROM {} WHERE {} GROUP BY slot ORDER BY slot",
        table.time_column,
        table.name,
        range_filter(
            &table.time_column,
            &layout.render(range.begin),
            &layout.render(range.end)
        )
    )
}

/// Clears a staging table a failed earlier run may have left behind.
pub fn drop_staging_if_exists(staging: &str) -> String {
    format!("DROP TABLE IF EXISTS {staging}")
}

/// Staging table with the source table's schema, backed by the destination
/// file through the HDFS storage engine.
pub fn create_staging(staging: &str, table: &str, hdfs_url: &str) -> String {
    format!("CREATE TABLE {staging} AS {table} ENGINE=HDFS('{hdfs_url}', 'Parquet')")
}

/// The copy statement: every insert streams straight through to the
/// destination file.
pub fn insert_slot(
    staging: &str,
    table: &TableSpec,
    begin: PrimitiveDateTime,
    end: PrimitiveDateTime,
    layout: &TimeLayout,
) -> String {
    format!(
        "INSERT INTO {staging} SELECT * FROM {} WHERE {}",
        table.name,
        range_filter(&table.time_column, &layout.render(begin), &layout.render(end))
    )
}

/// Removes the staging table once the copy is complete.
pub fn drop_staging(staging: &str) -> String {
    format!("DROP TABLE {staging}")
}
