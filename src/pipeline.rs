//! The export unit: one (host, table, slot) copied through a transient
//! staging table into exactly one destination file.

use crate::client::SourceClient;
use crate::config::{RunOptions, TableSpec};
use crate::paths;
use crate::sql;
use crate::stats::RunStats;
use time::PrimitiveDateTime;

/// Everything one unit of work needs, resolved at submission time and moved
/// into the pool closure whole.
#[derive(Clone, Debug)]
pub struct ExportUnit {
    pub host: String,
    pub table: TableSpec,
    /// Position of this slot within its table's plan, for log correlation.
    pub seq: usize,
    pub begin: PrimitiveDateTime,
    pub end: PrimitiveDateTime,
}

impl ExportUnit {
    fn statements(&self, opts: &RunOptions, run_root: &str) -> [String; 4] {
        let staging = paths::staging_table(&self.table.name, self.begin);
        let file = paths::unit_file(run_root, &self.table.name, &self.host, self.begin);
        let url = paths::hdfs_url(&opts.hdfs_addr, &file);
        [
            sql::drop_staging_if_exists(&staging),
            sql::create_staging(&staging, &self.table.name, &url),
            sql::insert_slot(&staging, &self.table, self.begin, self.end, &opts.layout),
            sql::drop_staging(&staging),
        ]
    }
}

/// Runs one export unit inside a pool slot. Failure is recorded in `stats`
/// and logged, never returned; completion is observed through the pool's
/// wait barrier. Each statement is guarded by the stop flag, so a unit that
/// starts after another one failed touches nothing.
pub fn export_unit(
    unit: &ExportUnit,
    client: &dyn SourceClient,
    opts: &RunOptions,
    run_root: &str,
    stats: &RunStats,
) {
    for stmt in unit.statements(opts, run_root) {
        if stats.has_failures() {
            tracing::info!(
                "host {}, table {}, slot {}: skipped after earlier failure",
                unit.host,
                unit.table.name,
                unit.seq
            );
            return;
        }
        tracing::info!(
            "host {}, table {}, slot {}, query: {stmt}",
            unit.host,
            unit.table.name,
            unit.seq
        );
        if let Err(e) = client.execute(&stmt) {
            tracing::error!(
                "host {}, table {}, slot {}: {e:#}",
                unit.host,
                unit.table.name,
                unit.seq
            );
            stats.record_failure();
            return;
        }
    }
    tracing::info!(
        "host {}, table {}, slot {}, export done",
        unit.host,
        unit.table.name,
        unit.seq
    );
}
