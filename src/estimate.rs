//! Size estimation for one (host, table) pair. Three cheap aggregates give a
//! bytes-per-row figure and the in-range row count; everything downstream
//! (slot budgets, run totals) derives from those two numbers.

use crate::client::SourceClient;
use crate::config::TableSpec;
use crate::sql;
use crate::timeslot::{TimeLayout, TimeRange};
use anyhow::Result;

/// Compressed bytes-per-row over the table's full history, plus the row
/// count restricted to the export range.
#[derive(Clone, Copy, Debug)]
pub struct TableEstimate {
    pub bytes_per_row: f64,
    pub rows_in_range: u64,
}

impl TableEstimate {
    /// Bytes this table is expected to contribute to the run.
    pub fn projected_bytes(&self) -> u64 {
        (self.rows_in_range as f64 * self.bytes_per_row) as u64
    }

    /// Rows a slot may hold before its file is expected to outgrow
    /// `max_file_size`. Saturates when the table compresses to nothing.
    pub fn row_budget(&self, max_file_size: u64) -> u64 {
        (max_file_size as f64 / self.bytes_per_row) as u64
    }
}

/// Returns `None` for a table with no rows at all; the caller skips planning
/// and export for it entirely.
pub fn estimate_table(
    client: &dyn SourceClient,
    host: &str,
    database: &str,
    table: &TableSpec,
    range: &TimeRange,
    layout: &TimeLayout,
) -> Result<Option<TableEstimate>> {
    let stmt = sql::count_all(&table.name);
    tracing::info!("host {host}: query: {stmt}");
    let total_rows = client.fetch_scalar(&stmt)?;
    if total_rows == 0 {
        return Ok(None);
    }

    let stmt = sql::sum_compressed_bytes(database, &table.name);
    tracing::info!("host {host}: query: {stmt}");
    let compressed = client.fetch_scalar(&stmt)?;
    let bytes_per_row = compressed as f64 / total_rows as f64;

    let stmt = sql::count_in_range(table, range, layout);
    tracing::info!("host {host}: query: {stmt}");
    let rows_in_range = client.fetch_scalar(&stmt)?;

    Ok(Some(TableEstimate {
        bytes_per_row,
        rows_in_range,
    }))
}
