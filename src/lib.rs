mod timeslot;
mod paths;
mod sql;
mod config;

mod client;
mod destfs;
mod stats;
mod pool;
mod util;

mod estimate;
mod planner;
mod pipeline;
mod progress;
mod coordinator;

pub use crate::config::{ExportConfig, HdfsConfig, RunOptions, TableSpec, DEFAULT_TS_LAYOUT};
pub use crate::coordinator::{ExportRun, RunReport};
pub use crate::timeslot::{Granularity, TimeLayout, TimeRange};

// Expose the host seam so callers can plug their own client implementation.
pub use crate::client::{connect_hosts, HttpClient, SlotCount, SourceClient, SourceHost};
pub use crate::destfs::{DestFs, LocalFs, WebHdfs};

// Expose the building blocks the coordinator is assembled from; useful on
// their own for dry runs and diagnostics.
pub use crate::estimate::{estimate_table, TableEstimate};
pub use crate::pipeline::{export_unit, ExportUnit};
pub use crate::planner::plan_slots;
pub use crate::pool::WorkerPool;
pub use crate::stats::RunStats;

// Expose the destination layout helpers so paths can be predicted.
pub use crate::paths::{compact, run_root, staging_table, unit_file};
