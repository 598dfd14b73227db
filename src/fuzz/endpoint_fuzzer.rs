use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;
use reqwest::Client;
use tokio_util::sync::CancellationToken;

use crate::concurrent::{ConcurrentProbe, SchedulerStats};
use crate::config::Config;
use crate::error::ConfigError;
use crate::fuzz::candidates::{Candidate, CandidateSet};
use crate::http_client::create_probe_client;
use crate::output::aggregator::{DiscoveryReport, ResultAggregator, RunSummary};
use crate::probe::{probe_candidate, ClassificationPolicy, ProbeOutcome};

/// Discovers endpoints by trying every wordlist path with every configured method.
pub struct EndpointFuzzer {
    config: Config,
    client: Client,
    policy: Arc<ClassificationPolicy>,
    cancel: Mutex<CancellationToken>,
}

impl EndpointFuzzer {
    /// Validate `config` and build the shared HTTP client. Fails before any request is made.
    pub fn new(config: Config) -> Result<Self, ConfigError> {
        config.validate()?;
        let client = create_probe_client(&config)?;
        let policy = Arc::new(ClassificationPolicy::new(config.excluded_status.iter().copied()));
        Ok(Self {
            config,
            client,
            policy,
            cancel: Mutex::new(CancellationToken::new()),
        })
    }

    /// Token that stops admission of new probes when cancelled.
    ///
    /// Cancelling it ends the current run (or the next one, if none is active).
    /// A fresh token is installed once that run returns, so fetch the token again
    /// for every run that should be interruptible.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.lock().clone()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub async fn run<I, S>(&self, paths: I) -> Result<DiscoveryReport, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.run_with_progress(paths, |_| {}).await
    }

    /// Like [`run`](Self::run), calling `on_outcome` for every finished probe.
    pub async fn run_with_progress<I, S, P>(&self, paths: I, mut on_outcome: P) -> Result<DiscoveryReport, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        P: FnMut(&ProbeOutcome),
    {
        let candidates = CandidateSet::generate(paths, &self.config.methods)?;
        let run_token = self.cancel.lock().clone();
        let scheduler = ConcurrentProbe::new(self.config.concurrency)?.with_cancellation(run_token.child_token());
        let aggregator = ResultAggregator::new(self.config.base_url.clone());

        tracing::info!(
            target_url=%self.config.base_url,
            candidates = candidates.len(),
            methods = candidates.methods().len(),
            concurrency = self.config.concurrency,
            timeout_ms = self.config.timeout_ms,
            "starting endpoint fuzzing"
        );

        let start = Instant::now();
        let client = self.client.clone();
        let base_url: Arc<str> = Arc::from(self.config.base_url.as_str());
        let policy = self.policy.clone();
        let timeout = self.config.timeout();

        let task_fn = move |candidate: Candidate| {
            let client = client.clone();
            let base_url = base_url.clone();
            let policy = policy.clone();
            async move { probe_candidate(&client, &base_url, &candidate, timeout, &policy).await }
        };

        let stats: SchedulerStats = scheduler
            .run_with(candidates.iter(), task_fn, |outcome| {
                on_outcome(&outcome);
                aggregator.add(outcome);
            })
            .await;

        if run_token.is_cancelled() {
            let mut current = self.cancel.lock();
            if current.is_cancelled() {
                *current = CancellationToken::new();
            }
        }

        let elapsed_ms = start.elapsed().as_millis() as u64;
        let report = aggregator.finalize(RunSummary {
            elapsed_ms,
            peak_in_flight: stats.peak_in_flight,
            cancelled: stats.cancelled,
        });

        tracing::info!(
            admitted = stats.admitted,
            discovered = report.endpoints.len(),
            excluded = report.stats.excluded,
            failed = report.stats.failed,
            peak_in_flight = stats.peak_in_flight,
            cancelled = stats.cancelled,
            elapsed_ms,
            "endpoint fuzzing finished"
        );
        if report.stats.failed > 0 {
            tracing::warn!(failed = report.stats.failed, timeouts = report.stats.timeouts, "some probes got no usable response");
        }

        Ok(report)
    }
}
