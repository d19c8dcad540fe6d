//! Slot planning for one (host, table) pair. Candidate granularities are
//! tried coarsest first; the first one whose every bucket fits the row
//! budget wins. The finest candidate is accepted no matter what, since a
//! single oversized file beats an unbounded descent.

use crate::client::SourceClient;
use crate::config::TableSpec;
use crate::sql;
use crate::timeslot::{Granularity, TimeLayout, TimeRange};
use anyhow::{bail, Result};
use time::PrimitiveDateTime;

/// Ascending slot begin timestamps covering the table's in-range data. Only
/// buckets that actually hold rows appear, so an empty range plans to
/// nothing. One grouped aggregation per candidate, at most `granularities.len()`
/// round trips.
pub fn plan_slots(
    client: &dyn SourceClient,
    host: &str,
    table: &TableSpec,
    range: &TimeRange,
    row_budget: u64,
    granularities: &[Granularity],
    layout: &TimeLayout,
) -> Result<Vec<PrimitiveDateTime>> {
    let finest = granularities.len().saturating_sub(1);
    for (i, granularity) in granularities.iter().enumerate() {
        let stmt = sql::slot_counts(table, *granularity, range, layout);
        tracing::info!("host {host}: query: {stmt}");
        let counts = client.fetch_slot_counts(&stmt)?;

        if let Some(bucket) = counts.iter().find(|c| c.rows > row_budget) {
            if i != finest {
                tracing::debug!(
                    "host {host}: table {}: {granularity} slot at {} holds {} rows, over the {row_budget} row budget",
                    table.name,
                    bucket.start,
                    bucket.rows
                );
                continue;
            }
            tracing::warn!(
                "host {host}: table {}: {granularity} slot at {} still holds {} rows, exporting oversized",
                table.name,
                bucket.start,
                bucket.rows
            );
        }

        tracing::info!(
            "host {host}: table {}: planned {} slots at {granularity}",
            table.name,
            counts.len()
        );
        let mut starts: Vec<PrimitiveDateTime> = counts.into_iter().map(|c| c.start).collect();
        // a bucket straddling the range begin truncates to before it; its
        // slot starts at the range begin instead of reaching back
        if let Some(first) = starts.first_mut() {
            if *first < range.begin {
                *first = range.begin;
            }
        }
        return Ok(starts);
    }
    bail!("no slot granularities configured")
}
