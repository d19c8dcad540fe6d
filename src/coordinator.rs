//! Run orchestration: claim the destination directory, fan out one task per
//! source host, and wait for every export unit to drain through the pool.

use crate::client::SourceHost;
use crate::config::RunOptions;
use crate::destfs::DestFs;
use crate::estimate;
use crate::paths;
use crate::pipeline::{self, ExportUnit};
use crate::planner;
use crate::pool::WorkerPool;
use crate::progress;
use crate::stats::RunStats;
use crate::util;
use anyhow::{anyhow, ensure, Context, Result};
use indicatif::ProgressBar;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// One export run over a set of connected hosts.
pub struct ExportRun {
    opts: RunOptions,
    hosts: Vec<SourceHost>,
    dest: Box<dyn DestFs>,
}

/// What the run amounted to. `estimated_bytes` comes from the size
/// estimator, not from the destination; the destination files are never
/// read back.
#[derive(Debug)]
pub struct RunReport {
    pub estimated_bytes: u64,
    pub failed_units: u32,
    pub elapsed: Duration,
}

impl RunReport {
    pub fn succeeded(&self) -> bool {
        self.failed_units == 0
    }

    /// Estimated bytes per second; `None` for a sub-second run.
    pub fn throughput(&self) -> Option<u64> {
        let secs = self.elapsed.as_secs();
        (secs != 0).then(|| self.estimated_bytes / secs)
    }
}

impl ExportRun {
    pub fn new(opts: RunOptions, hosts: Vec<SourceHost>, dest: Box<dyn DestFs>) -> Self {
        Self { opts, hosts, dest }
    }

    /// Executes the run to completion. Returns `Err` only for fatal setup,
    /// estimation or planning failures; per-unit copy failures are absorbed
    /// into the report, and the first fatal error is surfaced only after
    /// every in-flight unit has drained.
    pub fn run(self) -> Result<RunReport> {
        util::init_tracing_once();
        let ExportRun { opts, hosts, dest } = self;
        ensure!(!hosts.is_empty(), "no source hosts connected");

        let opts = Arc::new(opts);
        let stats = Arc::new(RunStats::new());
        let run_root = Arc::new(paths::run_root(&opts.hdfs_root, &opts.range));

        // the run owns this directory; whatever an earlier attempt left
        // there is discarded
        dest.remove_all(&run_root)
            .context("clear destination run directory")?;
        dest.create_dir_all(&run_root)
            .context("create destination run directory")?;
        tracing::info!(
            "exporting {} tables from {} hosts into {run_root}",
            opts.tables.len(),
            hosts.len()
        );

        let pool = WorkerPool::new(opts.parallel_per_host * hosts.len())?;
        let pb = opts.progress.then(progress::make_unit_progress);
        let started = Instant::now();

        let first_err = thread::scope(|s| {
            let handles: Vec<_> = hosts
                .iter()
                .map(|host| {
                    let opts = Arc::clone(&opts);
                    let stats = Arc::clone(&stats);
                    let run_root = Arc::clone(&run_root);
                    let pb = pb.clone();
                    let pool = &pool;
                    s.spawn(move || host_task(host, &opts, &run_root, &stats, pool, pb))
                })
                .collect();

            let mut first = None;
            for handle in handles {
                let result = match handle.join() {
                    Ok(result) => result,
                    Err(_) => Err(anyhow!("host task panicked")),
                };
                if let Err(e) = result {
                    if first.is_none() {
                        first = Some(e);
                    }
                }
            }
            first
        });
        pool.join();
        let elapsed = started.elapsed();
        if let Some(pb) = &pb {
            pb.finish_and_clear();
        }

        if let Some(e) = first_err {
            return Err(e);
        }

        let report = RunReport {
            estimated_bytes: stats.estimated_bytes(),
            failed_units: stats.failed_units(),
            elapsed,
        };
        let secs = elapsed.as_secs();
        if report.succeeded() {
            match report.throughput() {
                Some(rate) => tracing::info!(
                    "exported {} bytes in {secs} seconds, {rate} bytes/s",
                    report.estimated_bytes
                ),
                None => tracing::info!(
                    "exported {} bytes in {secs} seconds",
                    report.estimated_bytes
                ),
            }
        } else {
            tracing::error!(
                "export failed: {} units reported errors",
                report.failed_units
            );
        }
        Ok(report)
    }
}

/// Per-host driver: estimates, plans and submits every table's units in
/// order. Submission blocks on the shared pool, so a host with many small
/// slots cannot flood the destination.
fn host_task(
    host: &SourceHost,
    opts: &Arc<RunOptions>,
    run_root: &Arc<String>,
    stats: &Arc<RunStats>,
    pool: &WorkerPool,
    pb: Option<ProgressBar>,
) -> Result<()> {
    for table in &opts.tables {
        if stats.has_failures() {
            tracing::warn!(
                "host {}: stopping before table {} after earlier failure",
                host.addr,
                table.name
            );
            return Ok(());
        }

        let estimate = estimate::estimate_table(
            host.client.as_ref(),
            &host.addr,
            &opts.database,
            table,
            &opts.range,
            &opts.layout,
        )
        .map_err(|e| {
            stats.record_failure();
            e
        })
        .with_context(|| format!("host {}: estimate table {}", host.addr, table.name))?;
        let Some(estimate) = estimate else {
            tracing::info!("host {}: table {} is empty, skipping", host.addr, table.name);
            continue;
        };

        let projected = estimate.projected_bytes();
        stats.add_estimated_bytes(projected);
        tracing::info!(
            "host {}: table {}: {} rows to export, estimated {} bytes",
            host.addr,
            table.name,
            estimate.rows_in_range,
            projected
        );

        let slots = planner::plan_slots(
            host.client.as_ref(),
            &host.addr,
            table,
            &opts.range,
            estimate.row_budget(opts.max_file_size),
            &opts.granularities,
            &opts.layout,
        )
        .map_err(|e| {
            stats.record_failure();
            e
        })
        .with_context(|| format!("host {}: plan slots for table {}", host.addr, table.name))?;
        if slots.is_empty() {
            tracing::info!(
                "host {}: table {}: no rows in range, skipping",
                host.addr,
                table.name
            );
            continue;
        }
        if let Some(pb) = &pb {
            pb.inc_length(slots.len() as u64);
        }

        for (seq, begin) in slots.iter().copied().enumerate() {
            // the last slot runs out to the range end, everything else to
            // the next slot's begin
            let end = slots.get(seq + 1).copied().unwrap_or(opts.range.end);
            let unit = ExportUnit {
                host: host.addr.clone(),
                table: table.clone(),
                seq,
                begin,
                end,
            };
            let client = Arc::clone(&host.client);
            let opts = Arc::clone(opts);
            let run_root = Arc::clone(run_root);
            let stats = Arc::clone(stats);
            let pb = pb.clone();
            pool.submit(move || {
                pipeline::export_unit(&unit, client.as_ref(), &opts, &run_root, &stats);
                if let Some(pb) = &pb {
                    pb.inc(1);
                }
            });
        }
    }
    Ok(())
}
