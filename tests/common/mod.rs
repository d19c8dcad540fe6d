use anyhow::{bail, Result};
use chexport::{
    ExportConfig, Granularity, SlotCount, SourceClient, SourceHost, TimeLayout, DEFAULT_TS_LAYOUT,
};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};
use time::PrimitiveDateTime;

/// The layout every test renders and parses timestamps with.
pub fn layout() -> TimeLayout {
    TimeLayout::new(DEFAULT_TS_LAYOUT).unwrap()
}

/// Parse a timestamp in the default layout (`2020-01-02 03:04:05`).
pub fn dt(text: &str) -> PrimitiveDateTime {
    layout().parse(text).unwrap()
}

/// Weighted rows: each entry stands for `weight` rows sharing one timestamp,
/// so a test can model a two-hundred-million-row bucket without materializing it.
pub fn rows(entries: &[(&str, u64)]) -> Vec<(PrimitiveDateTime, u64)> {
    entries.iter().map(|(ts, w)| (dt(ts), *w)).collect()
}

/// Base configuration most tests start from; override what the scenario needs.
pub fn base_config(root_dir: &str) -> ExportConfig {
    ExportConfig::default()
        .with_hosts(["ck1"])
        .with_table("events", "ts")
        .with_range("2020-01-01 00:00:00", "2021-01-01 00:00:00")
        .with_hdfs("nn1:8020", "nn1:9870", root_dir)
        .with_parallel_per_host(2)
        .with_progress(false)
}

/// Wrap a fake in the host handle the run expects.
pub fn host(addr: &str, fake: &Arc<FakeHost>) -> SourceHost {
    let client: Arc<dyn SourceClient> = fake.clone();
    SourceHost {
        addr: addr.to_string(),
        client,
    }
}

pub struct TableData {
    pub compressed_bytes: u64,
    pub rows: Vec<(PrimitiveDateTime, u64)>,
}

/// In-memory stand-in for one source host. It recognizes the statement
/// shapes the export sends and answers them from its weighted row sets;
/// side-effecting statements are recorded rather than executed.
pub struct FakeHost {
    tables: HashMap<String, TableData>,
    layout: TimeLayout,
    log: Mutex<Vec<String>>,
    planning_log: Mutex<Vec<String>>,
    fail_matching: Option<String>,
}

impl FakeHost {
    pub fn new() -> Self {
        Self {
            tables: HashMap::new(),
            layout: TimeLayout::new(DEFAULT_TS_LAYOUT).unwrap(),
            log: Mutex::new(Vec::new()),
            planning_log: Mutex::new(Vec::new()),
            fail_matching: None,
        }
    }

    pub fn with_table(
        mut self,
        name: &str,
        compressed_bytes: u64,
        rows: Vec<(PrimitiveDateTime, u64)>,
    ) -> Self {
        self.tables.insert(
            name.to_string(),
            TableData {
                compressed_bytes,
                rows,
            },
        );
        self
    }

    /// Any statement containing `pattern` fails, after being logged.
    pub fn failing_on(mut self, pattern: &str) -> Self {
        self.fail_matching = Some(pattern.to_string());
        self
    }

    /// Every side-effecting statement sent to this host, in arrival order.
    pub fn executed(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }

    /// How many grouped bucket queries the planner issued.
    pub fn planning_queries(&self) -> usize {
        self.planning_log.lock().unwrap().len()
    }

    /// The grouped bucket queries themselves, in arrival order.
    pub fn planning_statements(&self) -> Vec<String> {
        self.planning_log.lock().unwrap().clone()
    }

    fn table(&self, name: &str) -> Result<&TableData> {
        match self.tables.get(name) {
            Some(data) => Ok(data),
            None => bail!("table {name} does not exist"),
        }
    }

    fn check_fail(&self, stmt: &str) -> Result<()> {
        if let Some(pattern) = &self.fail_matching {
            if stmt.contains(pattern) {
                bail!("injected failure for statement matching {pattern:?}");
            }
        }
        Ok(())
    }

    fn bounds(&self, stmt: &str) -> (PrimitiveDateTime, PrimitiveDateTime) {
        (
            self.layout.parse(&extract(stmt, ">='", "'")).unwrap(),
            self.layout.parse(&extract(stmt, "<'", "'")).unwrap(),
        )
    }
}

fn extract(hay: &str, open: &str, close: &str) -> String {
    let start = hay.find(open).expect(open) + open.len();
    let rest = &hay[start..];
    rest[..rest.find(close).expect(close)].to_string()
}

/// Destination file paths pulled out of the CREATE statements a fake saw.
pub fn created_files(fake: &FakeHost) -> Vec<String> {
    fake.executed()
        .iter()
        .filter(|stmt| stmt.starts_with("CREATE TABLE"))
        .map(|stmt| extract(stmt, "HDFS('", "'"))
        .collect()
}

/// The `[begin, end)` filter bounds of every copy statement a fake saw,
/// sorted by begin since pool workers interleave.
pub fn copied_ranges(fake: &FakeHost) -> Vec<(String, String)> {
    let mut ranges: Vec<(String, String)> = fake
        .executed()
        .iter()
        .filter(|stmt| stmt.starts_with("INSERT INTO"))
        .map(|stmt| (extract(stmt, ">='", "'"), extract(stmt, "<'", "'")))
        .collect();
    ranges.sort();
    ranges
}

impl SourceClient for FakeHost {
    fn fetch_scalar(&self, stmt: &str) -> Result<u64> {
        self.check_fail(stmt)?;
        if stmt == "SELECT 1" {
            return Ok(1);
        }
        if stmt.starts_with("SELECT sum(data_compressed_bytes)") {
            let table = extract(stmt, "table='", "'");
            return Ok(self.table(&table)?.compressed_bytes);
        }
        if let Some(rest) = stmt.strip_prefix("SELECT count() FROM ") {
            return match rest.split_once(" WHERE ") {
                None => Ok(self.table(rest.trim())?.rows.iter().map(|(_, w)| w).sum()),
                Some((table, _)) => {
                    let (begin, end) = self.bounds(stmt);
                    Ok(self
                        .table(table.trim())?
                        .rows
                        .iter()
                        .filter(|(ts, _)| *ts >= begin && *ts < end)
                        .map(|(_, w)| w)
                        .sum())
                }
            };
        }
        bail!("unexpected scalar statement: {stmt}")
    }

    fn fetch_slot_counts(&self, stmt: &str) -> Result<Vec<SlotCount>> {
        self.planning_log.lock().unwrap().push(stmt.to_string());
        self.check_fail(stmt)?;
        let table = extract(stmt, "count() FROM ", " WHERE ");
        let granularity: Granularity = extract(stmt, "INTERVAL ", ")").parse().unwrap();
        let (begin, end) = self.bounds(stmt);

        let mut buckets: BTreeMap<PrimitiveDateTime, u64> = BTreeMap::new();
        for (ts, weight) in &self.table(&table)?.rows {
            if *ts >= begin && *ts < end {
                *buckets.entry(granularity.truncate(*ts)).or_insert(0) += weight;
            }
        }
        Ok(buckets
            .into_iter()
            .map(|(start, rows)| SlotCount { start, rows })
            .collect())
    }

    fn execute(&self, stmt: &str) -> Result<()> {
        self.log.lock().unwrap().push(stmt.to_string());
        self.check_fail(stmt)?;
        Ok(())
    }
}
