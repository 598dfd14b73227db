use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use indicatif::{ProgressBar, ProgressStyle};

use crate::cli::{Cli, Commands};
use endpoint_hunter::config::Config;
use endpoint_hunter::fuzz::{CandidateSet, EndpointFuzzer, Method};
use endpoint_hunter::output::results_manager::{load_resumed_report, print_summary, write_report};
use endpoint_hunter::output::DiscoveryReport;
use endpoint_hunter::probe::ProbeOutcome;

pub async fn run_from_cli(cli: Cli) -> anyhow::Result<()> {
    // Our crate at the requested level, HTTP internals kept at INFO so debug output stays readable.
    use tracing_subscriber::EnvFilter;
    let crate_level = if cli.debug { "debug" } else if cli.verbose { "info" } else { "warn" };
    let filter_str = format!(
        "endpoint_hunter={crate},reqwest=info,hyper=info,h2=info,rustls=warn",
        crate = crate_level
    );
    let env_filter = EnvFilter::try_new(&filter_str).unwrap_or_else(|_| EnvFilter::new(crate_level));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_ansi(true)
        .with_target(false)
        .init();

    match cli.command {
        Commands::Fuzz { base_url, wordlist, methods, concurrency, timeout_ms, exclude_status, insecure, config, out, resume } => {
            if let Some(resume_path) = resume {
                let report = load_resumed_report(&resume_path, base_url)?;
                return finish(&report, &out);
            }

            let mut cfg = match config {
                Some(path) => Config::from_json_file(&path)
                    .with_context(|| format!("failed to load config {}", path.display()))?,
                None => Config::default(),
            };
            if let Some(url) = base_url {
                cfg.base_url = url;
            }
            if !methods.is_empty() {
                cfg.methods = methods.iter().map(|m| m.parse::<Method>()).collect::<Result<_, _>>()?;
            }
            if let Some(c) = concurrency {
                cfg.concurrency = c;
            }
            if let Some(t) = timeout_ms {
                cfg.timeout_ms = t;
            }
            if !exclude_status.is_empty() {
                cfg.excluded_status = exclude_status.into_iter().collect();
            }
            cfg.insecure |= insecure;

            let wordlist = wordlist.context("--wordlist is required unless --resume is given")?;
            let words = endpoint_hunter::utils::load_wordlist(&wordlist)?;

            tracing::info!(target_url=%cfg.base_url, words = words.len(), concurrency = cfg.concurrency, timeout_ms = cfg.timeout_ms, "Starting fuzz");
            run_fuzz(cfg, words, &out).await?;
        }
    }
    Ok(())
}

async fn run_fuzz(cfg: Config, words: Vec<String>, out: &Path) -> anyhow::Result<()> {
    let fuzzer = EndpointFuzzer::new(cfg)?;
    let total = CandidateSet::generate(words.iter().cloned(), &fuzzer.config().methods)?.len();

    println!("[>] Target: {}", fuzzer.config().base_url);
    println!("[~] Candidates: {} (concurrency: {}, timeout: {}ms)", total, fuzzer.config().concurrency, fuzzer.config().timeout_ms);

    let token = fuzzer.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received, finishing in-flight probes");
            token.cancel();
        }
    });

    let pb = progress_bar(total as u64);
    let mut hits = 0usize;
    let report = fuzzer
        .run_with_progress(words, |outcome| {
            if let ProbeOutcome::Responded { .. } = outcome {
                hits += 1;
                pb.set_message(format!("{} hits", hits));
            }
            pb.inc(1);
        })
        .await?;
    pb.finish_and_clear();

    finish(&report, out)
}

fn finish(report: &DiscoveryReport, out: &Path) -> anyhow::Result<()> {
    print_summary(report);
    let files = write_report(out, report)?;
    println!("[+] Results written to {}", files.jsonl.parent().unwrap_or(out).display());
    Ok(())
}

fn progress_bar(len: u64) -> ProgressBar {
    let pb = ProgressBar::new(len);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.green/dim}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▓░"),
    );
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}
