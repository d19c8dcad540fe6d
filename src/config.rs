use crate::timeslot::{Granularity, TimeLayout, TimeRange};
use anyhow::{ensure, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// Timestamp layout the source database speaks in statements and results.
pub const DEFAULT_TS_LAYOUT: &str = "[year]-[month]-[day] [hour]:[minute]:[second]";

/// One exported table: name plus the time column the export is sliced on.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct TableSpec {
    pub name: String,
    pub time_column: String,
}

/// Destination cluster coordinates.
#[derive(Clone, Debug, Deserialize)]
pub struct HdfsConfig {
    pub addr: String, // namenode host:port baked into storage-engine URLs
    pub web_addr: String, // WebHDFS host:port used for directory management
    #[serde(default = "default_hdfs_user")]
    pub user: String,
    pub root_dir: String, // absolute directory the run claims a subdirectory of
}

/// User-facing run options with sensible defaults and builder chaining.
/// Usually loaded from a JSON file, then checked with [`ExportConfig::validate`].
#[derive(Clone, Debug, Deserialize)]
pub struct ExportConfig {
    pub hosts: Vec<String>, // source hosts, one export task per host
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_database")]
    pub database: String,
    #[serde(default = "default_user")]
    pub user: String,
    #[serde(default)]
    pub password: String,
    pub tables: Vec<TableSpec>,
    #[serde(default = "default_begin")]
    pub begin: String, // inclusive, in `ts_layout`
    #[serde(default = "default_end")]
    pub end: String, // exclusive, in `ts_layout`
    #[serde(default = "default_layout")]
    pub ts_layout: String,
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64, // soft cap per destination file, in bytes
    #[serde(default = "default_granularities")]
    pub granularities: Vec<Granularity>, // slot candidates, coarsest first
    pub hdfs: HdfsConfig,
    #[serde(default = "default_parallel")]
    pub parallel_per_host: usize, // pool slots contributed by each host
    #[serde(default = "default_progress")]
    pub progress: bool, // show progress bar
}

fn default_port() -> u16 {
    8123
}
fn default_database() -> String {
    "default".to_string()
}
fn default_user() -> String {
    "default".to_string()
}
fn default_begin() -> String {
    "1970-01-01 00:00:00".to_string()
}
fn default_end() -> String {
    "2020-11-01 00:00:00".to_string()
}
fn default_layout() -> String {
    DEFAULT_TS_LAYOUT.to_string()
}
fn default_max_file_size() -> u64 {
    10_000_000_000
}
fn default_granularities() -> Vec<Granularity> {
    vec![
        Granularity::Year,
        Granularity::Month,
        Granularity::Week,
        Granularity::Day,
        Granularity::Hours(4),
        Granularity::Hours(1),
    ]
}
fn default_hdfs_user() -> String {
    "root".to_string()
}
fn default_parallel() -> usize {
    4
}
fn default_progress() -> bool {
    true
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            hosts: Vec::new(),
            port: default_port(),
            database: default_database(),
            user: default_user(),
            password: String::new(),
            tables: Vec::new(),
            begin: default_begin(),
            end: default_end(),
            ts_layout: default_layout(),
            max_file_size: default_max_file_size(),
            granularities: default_granularities(),
            hdfs: HdfsConfig {
                addr: String::new(),
                web_addr: String::new(),
                user: default_hdfs_user(),
                root_dir: String::new(),
            },
            parallel_per_host: default_parallel(),
            progress: default_progress(),
        }
    }
}

impl ExportConfig {
    /// Reads and parses a JSON run configuration.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("read config {}", path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("parse config {}", path.display()))
    }

    pub fn with_hosts<I, S>(mut self, hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.hosts = hosts.into_iter().map(Into::into).collect();
        self
    }
    pub fn with_credentials(mut self, user: impl Into<String>, password: impl Into<String>) -> Self {
        self.user = user.into();
        self.password = password.into();
        self
    }
    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = database.into();
        self
    }
    pub fn with_table(mut self, name: impl Into<String>, time_column: impl Into<String>) -> Self {
        self.tables.push(TableSpec {
            name: name.into(),
            time_column: time_column.into(),
        });
        self
    }
    pub fn with_range(mut self, begin: impl Into<String>, end: impl Into<String>) -> Self {
        self.begin = begin.into();
        self.end = end.into();
        self
    }
    pub fn with_max_file_size(mut self, bytes: u64) -> Self {
        self.max_file_size = bytes.max(1);
        self
    }
    pub fn with_granularities(mut self, granularities: Vec<Granularity>) -> Self {
        self.granularities = granularities;
        self
    }
    pub fn with_hdfs(
        mut self,
        addr: impl Into<String>,
        web_addr: impl Into<String>,
        root_dir: impl Into<String>,
    ) -> Self {
        self.hdfs.addr = addr.into();
        self.hdfs.web_addr = web_addr.into();
        self.hdfs.root_dir = root_dir.into();
        self
    }
    pub fn with_parallel_per_host(mut self, n: usize) -> Self {
        self.parallel_per_host = n.max(1);
        self
    }
    pub fn with_progress(mut self, yes: bool) -> Self {
        self.progress = yes;
        self
    }

    /// Checks the whole configuration up front and resolves it into the
    /// immutable options a run executes against. Everything that can be
    /// rejected before touching a remote system is rejected here.
    pub fn validate(&self) -> Result<RunOptions> {
        ensure!(!self.hosts.is_empty(), "no source hosts configured");
        ensure!(!self.tables.is_empty(), "no tables configured");
        for (i, table) in self.tables.iter().enumerate() {
            ensure!(!table.name.is_empty(), "table with empty name");
            ensure!(
                !table.time_column.is_empty(),
                "table {} has no time column",
                table.name
            );
            // staging-table names and destination paths derive from the name
            ensure!(
                !self.tables[..i].iter().any(|t| t.name == table.name),
                "table {} configured more than once",
                table.name
            );
        }
        ensure!(self.max_file_size > 0, "max_file_size must be positive");
        ensure!(
            !self.granularities.is_empty(),
            "no slot granularities configured"
        );
        for granularity in &self.granularities {
            if let Granularity::Hours(n) = granularity {
                ensure!(
                    (1..24).contains(n) && 24 % n == 0,
                    "hour granularity must divide a day, got {n}"
                );
            }
        }
        ensure!(self.parallel_per_host > 0, "parallel_per_host must be positive");
        ensure!(!self.hdfs.addr.is_empty(), "hdfs.addr not configured");
        ensure!(!self.hdfs.web_addr.is_empty(), "hdfs.web_addr not configured");
        ensure!(
            self.hdfs.root_dir.starts_with('/'),
            "hdfs.root_dir must be an absolute path"
        );

        let layout = TimeLayout::new(&self.ts_layout)?;
        let range = TimeRange::parse(&self.begin, &self.end, &layout)?;

        Ok(RunOptions {
            database: self.database.clone(),
            tables: self.tables.clone(),
            range,
            layout,
            max_file_size: self.max_file_size,
            granularities: self.granularities.clone(),
            hdfs_addr: self.hdfs.addr.clone(),
            hdfs_root: self.hdfs.root_dir.clone(),
            parallel_per_host: self.parallel_per_host,
            progress: self.progress,
        })
    }
}

/// Validated, immutable options a run executes against. Host credentials are
/// consumed separately when the connections are opened.
#[derive(Clone, Debug)]
pub struct RunOptions {
    pub database: String,
    pub tables: Vec<TableSpec>,
    pub range: TimeRange,
    pub layout: TimeLayout,
    pub max_file_size: u64,
    pub granularities: Vec<Granularity>,
    pub hdfs_addr: String,
    pub hdfs_root: String,
    pub parallel_per_host: usize,
    pub progress: bool,
}
