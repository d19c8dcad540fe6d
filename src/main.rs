use anyhow::Result;
use chexport::{connect_hosts, ExportConfig, ExportRun, WebHdfs};
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;

/// Archive time-ranged table data from a ClickHouse cluster into Parquet
/// files on HDFS.
#[derive(Parser, Debug)]
#[command(name = "chexport", version, about)]
struct Cli {
    /// JSON run configuration
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Disable the progress bar
    #[arg(long)]
    no_progress: bool,
}

fn main() -> ExitCode {
    match run() {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<bool> {
    let cli = Cli::parse();
    let mut cfg = ExportConfig::load(&cli.config)?;
    if cli.no_progress {
        cfg.progress = false;
    }
    let opts = cfg.validate()?;
    let hosts = connect_hosts(&cfg)?;
    let dest = WebHdfs::new(&cfg.hdfs.web_addr, &cfg.hdfs.user)?;
    let report = ExportRun::new(opts, hosts, Box::new(dest)).run()?;
    Ok(report.succeeded())
}
