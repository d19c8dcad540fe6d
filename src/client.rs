//! Source-database access. The run only ever needs three call shapes, so the
//! pipeline is written against [`SourceClient`] and the HTTP implementation
//! stays at the edge.

use crate::config::{ExportConfig, DEFAULT_TS_LAYOUT};
use crate::timeslot::TimeLayout;
use crate::util;
use anyhow::{anyhow, bail, Context, Result};
use std::sync::Arc;
use time::PrimitiveDateTime;

/// One bucket from a grouped aggregation: bucket start and its row count.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SlotCount {
    pub start: PrimitiveDateTime,
    pub rows: u64,
}

/// The statement shapes the export needs from a source host.
pub trait SourceClient: Send + Sync {
    /// Single-value aggregate: first column of the first result row.
    fn fetch_scalar(&self, stmt: &str) -> Result<u64>;
    /// Bucket rows from a grouped aggregation, in result order.
    fn fetch_slot_counts(&self, stmt: &str) -> Result<Vec<SlotCount>>;
    /// Side-effecting statement with no result rows.
    fn execute(&self, stmt: &str) -> Result<()>;
}

/// A reachable source host and its dedicated connection.
#[derive(Clone)]
pub struct SourceHost {
    pub addr: String,
    pub client: Arc<dyn SourceClient>,
}

/// Client over the database's HTTP interface. Results come back tab-separated,
/// which is all the scalar and bucket queries need.
pub struct HttpClient {
    addr: String,
    url: String,
    user: String,
    password: String,
    database: String,
    http: reqwest::blocking::Client,
    tsv: TimeLayout,
}

impl HttpClient {
    pub fn new(host: &str, port: u16, database: &str, user: &str, password: &str) -> Result<Self> {
        // copy statements can run for a long time; disable the client timeout
        let http = reqwest::blocking::Client::builder()
            .timeout(None)
            .build()
            .context("build http client")?;
        Ok(Self {
            addr: host.to_string(),
            url: format!("http://{host}:{port}/"),
            user: user.to_string(),
            password: password.to_string(),
            database: database.to_string(),
            http,
            tsv: TimeLayout::new(DEFAULT_TS_LAYOUT)?,
        })
    }

    fn send(&self, stmt: &str) -> Result<String> {
        let resp = self
            .http
            .post(&self.url)
            .query(&[
                ("database", self.database.as_str()),
                ("user", self.user.as_str()),
                ("password", self.password.as_str()),
            ])
            .body(stmt.to_string())
            .send()
            .with_context(|| format!("host {}: send statement", self.addr))?;
        let status = resp.status();
        let body = resp
            .text()
            .with_context(|| format!("host {}: read response", self.addr))?;
        if !status.is_success() {
            bail!(
                "host {}: statement failed ({status}): {}",
                self.addr,
                body.trim()
            );
        }
        Ok(body)
    }
}

impl SourceClient for HttpClient {
    fn fetch_scalar(&self, stmt: &str) -> Result<u64> {
        let body = self.send(stmt)?;
        let line = body.lines().next().unwrap_or("").trim();
        line.parse()
            .with_context(|| format!("host {}: expected numeric scalar, got {line:?}", self.addr))
    }

    fn fetch_slot_counts(&self, stmt: &str) -> Result<Vec<SlotCount>> {
        let body = self.send(stmt)?;
        let mut out = Vec::new();
        for line in body.lines() {
            if line.is_empty() {
                continue;
            }
            let (start, rows) = line
                .split_once('\t')
                .ok_or_else(|| anyhow!("host {}: malformed bucket row {line:?}", self.addr))?;
            out.push(SlotCount {
                start: self.tsv.parse(start)?,
                rows: rows
                    .trim()
                    .parse()
                    .with_context(|| format!("host {}: bad row count in {line:?}", self.addr))?,
            });
        }
        Ok(out)
    }

    fn execute(&self, stmt: &str) -> Result<()> {
        self.send(stmt).map(|_| ())
    }
}

/// Opens one connection per configured host and probes each with a trivial
/// query, so an unreachable host fails the run before any work starts.
pub fn connect_hosts(cfg: &ExportConfig) -> Result<Vec<SourceHost>> {
    util::init_tracing_once();
    let mut hosts = Vec::with_capacity(cfg.hosts.len());
    for host in &cfg.hosts {
        let client = HttpClient::new(host, cfg.port, &cfg.database, &cfg.user, &cfg.password)?;
        client
            .fetch_scalar("SELECT 1")
            .with_context(|| format!("validate connection to {host}"))?;
        tracing::info!("initialized connection to {host}");
        hosts.push(SourceHost {
            addr: host.clone(),
            client: Arc::new(client),
        });
    }
    Ok(hosts)
}
