use std::fs;
use std::path::{Path, PathBuf};
use anyhow::Result;

use crate::output::aggregator::{Discovery, DiscoveryReport};
use crate::output::{read_jsonl, write_csv, write_jsonl, write_summary_txt};

pub const JSONL_FILE: &str = "discovered.jsonl";
pub const CSV_FILE: &str = "discovered.csv";
pub const SUMMARY_FILE: &str = "summary.txt";

/// Paths of the files written for one report.
#[derive(Debug, Clone)]
pub struct OutputFiles {
    pub jsonl: PathBuf,
    pub csv: PathBuf,
    pub summary: PathBuf,
}

impl OutputFiles {
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            jsonl: dir.join(JSONL_FILE),
            csv: dir.join(CSV_FILE),
            summary: dir.join(SUMMARY_FILE),
        }
    }
}

/// Create the output directory and remove files left by a previous run.
///
/// Only the files this tool writes are touched; anything else in the directory stays.
pub fn prepare_output_dir(dir: &Path) -> Result<OutputFiles> {
    if !dir.exists() {
        fs::create_dir_all(dir)?;
        tracing::debug!(dir=%dir.display(), "created results directory");
    }

    let files = OutputFiles::in_dir(dir);
    for path in [&files.jsonl, &files.csv, &files.summary] {
        if path.is_file() {
            fs::remove_file(path)?;
            tracing::debug!(file=%path.display(), "removed previous result file");
        }
    }
    Ok(files)
}

/// Write jsonl, csv and summary for `report` into `dir`.
pub fn write_report(dir: &Path, report: &DiscoveryReport) -> Result<OutputFiles> {
    let files = prepare_output_dir(dir)?;
    write_jsonl(&files.jsonl, &report.endpoints)?;
    write_csv(&files.csv, &report.endpoints)?;
    write_summary_txt(&files.summary, report)?;
    Ok(files)
}

/// Rebuild a report from a previous run's JSONL output.
///
/// Without an explicit `target` the origin of the first recorded url is used.
pub fn load_resumed_report(path: &Path, target: Option<String>) -> Result<DiscoveryReport> {
    let mut endpoints = read_jsonl(path)?;
    endpoints.sort_by(|a, b| a.url.cmp(&b.url).then(a.method.cmp(&b.method)));
    endpoints.dedup_by(|a, b| a.url == b.url && a.method == b.method);

    let target = target.unwrap_or_else(|| target_from_endpoints(&endpoints));
    tracing::debug!(file=%path.display(), endpoints = endpoints.len(), target=%target, "loaded previous results");
    Ok(DiscoveryReport { target, endpoints, ..Default::default() })
}

/// `scheme://host[:port]` of the first endpoint, empty when there is none.
pub fn target_from_endpoints(endpoints: &[Discovery]) -> String {
    endpoints
        .first()
        .and_then(|d| url::Url::parse(&d.url).ok())
        .map(|u| u.origin().ascii_serialization())
        .unwrap_or_default()
}

fn status_label(status: u16) -> &'static str {
    match status {
        200..=299 => "Success",
        300..=399 => "Redirect",
        400..=499 => "Client Error",
        500..=599 => "Server Error",
        _ => "Unknown",
    }
}

pub fn print_summary(report: &DiscoveryReport) {
    let stats = &report.stats;
    println!("\n{}", "=".repeat(60));
    println!("  DISCOVERY REPORT: {}", report.target);
    println!("{}", "=".repeat(60));

    if report.endpoints.is_empty() {
        println!("\n[-] No endpoints discovered");
    } else {
        println!("\n[+] Endpoints ({}):", report.endpoints.len());
        for d in &report.endpoints {
            println!("    {:<6} {} {}", d.method, d.status, d.url);
        }
    }

    if !stats.by_status.is_empty() {
        println!("\n[*] Status Code Distribution:");
        for (status, count) in &stats.by_status {
            println!("      {}: {} ({})", status, count, status_label(*status));
        }
    }

    println!("\n[*] Probes:    {}", stats.probes_total);
    println!("    Excluded:  {}", stats.excluded);
    println!("    Failed:    {} ({} timeouts)", stats.failed, stats.timeouts);
    println!("    Duration:  {}ms", stats.elapsed_ms);
    if report.cancelled {
        println!("\n[!] Run was cancelled, report is partial");
    }
    println!();
}
