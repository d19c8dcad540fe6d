//! Destination layout: where a run's files live and how staging tables are
//! named. Every helper is a pure function of the run's configuration, so two
//! distinct export units can never collide on a path.

use crate::timeslot::{TimeLayout, TimeRange};
use std::sync::OnceLock;
use time::PrimitiveDateTime;

static COMPACT: OnceLock<TimeLayout> = OnceLock::new();

fn compact_layout() -> &'static TimeLayout {
    COMPACT.get_or_init(|| TimeLayout::new("[year][month][day][hour][minute][second]").unwrap())
}

/// `YYYYMMDDHHMMSS` rendering used in directory, file and staging-table names.
pub fn compact(ts: PrimitiveDateTime) -> String {
    compact_layout().render(ts)
}

fn join(base: &str, leaf: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), leaf)
}

/// Run-scoped directory under the configured root, named from the global
/// time range. The run claims this directory exclusively.
pub fn run_root(root_dir: &str, range: &TimeRange) -> String {
    join(
        root_dir,
        &format!("{}_{}", compact(range.begin), compact(range.end)),
    )
}

/// Destination file for one export unit, keyed by table, host and slot begin.
pub fn unit_file(run_root: &str, table: &str, host: &str, slot_begin: PrimitiveDateTime) -> String {
    join(
        run_root,
        &format!("{table}_{host}_{}.parquet", compact(slot_begin)),
    )
}

/// Transient staging-table name for one export unit. Deterministic, so a
/// rerun drops whatever a failed predecessor left behind.
pub fn staging_table(table: &str, slot_begin: PrimitiveDateTime) -> String {
    format!("hdfs_{table}_{}", compact(slot_begin))
}

/// Storage-engine URL the staging table writes through.
pub fn hdfs_url(addr: &str, path: &str) -> String {
    format!("hdfs://{addr}{path}")
}
