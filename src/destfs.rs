//! Destination filesystem seam. The run only manages directories; data files
//! are written by the source database's storage engine, never through here.

use anyhow::{bail, Context, Result};
use reqwest::Method;
use std::fs;
use std::io;

pub trait DestFs: Send + Sync {
    /// Recursively removes `path`. A missing path is not an error.
    fn remove_all(&self, path: &str) -> Result<()>;
    /// Recursively creates directory `path`.
    fn create_dir_all(&self, path: &str) -> Result<()>;
}

/// Directory management over the WebHDFS REST interface.
pub struct WebHdfs {
    base: String,
    user: String,
    http: reqwest::blocking::Client,
}

impl WebHdfs {
    pub fn new(web_addr: &str, user: &str) -> Result<Self> {
        Ok(Self {
            base: format!("http://{web_addr}/webhdfs/v1"),
            user: user.to_string(),
            http: reqwest::blocking::Client::builder()
                .build()
                .context("build webhdfs client")?,
        })
    }

    fn call(&self, method: Method, path: &str, query: &str) -> Result<()> {
        let url = format!("{}{path}?{query}&user.name={}", self.base, self.user);
        let resp = self
            .http
            .request(method, url)
            .send()
            .with_context(|| format!("webhdfs request for {path}"))?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().unwrap_or_default();
            bail!("webhdfs {path} failed ({status}): {}", body.trim());
        }
        Ok(())
    }
}

impl DestFs for WebHdfs {
    fn remove_all(&self, path: &str) -> Result<()> {
        self.call(Method::DELETE, path, "op=DELETE&recursive=true")
    }

    fn create_dir_all(&self, path: &str) -> Result<()> {
        self.call(Method::PUT, path, "op=MKDIRS")
    }
}

/// Local-disk implementation for single-node setups and tests.
pub struct LocalFs;

impl DestFs for LocalFs {
    fn remove_all(&self, path: &str) -> Result<()> {
        match fs::remove_dir_all(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("remove {path}")),
        }
    }

    fn create_dir_all(&self, path: &str) -> Result<()> {
        fs::create_dir_all(path).with_context(|| format!("create {path}"))
    }
}
