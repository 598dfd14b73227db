use std::collections::BTreeSet;
use std::fmt;
use std::time::{Duration, Instant};

use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::fuzz::candidates::{Candidate, Method};

/// Why a probe produced no classifiable response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureReason {
    Timeout,
    Connect(String),
    Request(String),
    Body(String),
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::Timeout => f.write_str("timed out"),
            FailureReason::Connect(e) => write!(f, "connect error: {}", e),
            FailureReason::Request(e) => write!(f, "request error: {}", e),
            FailureReason::Body(e) => write!(f, "malformed response body: {}", e),
        }
    }
}

impl From<reqwest::Error> for FailureReason {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            FailureReason::Timeout
        } else if e.is_connect() {
            FailureReason::Connect(e.to_string())
        } else if e.is_body() || e.is_decode() {
            FailureReason::Body(e.to_string())
        } else {
            FailureReason::Request(e.to_string())
        }
    }
}

/// Result of a single probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// The target answered with a status outside the exclusion set.
    Responded { status_code: u16, url: String, method: Method },
    /// The target answered with a status treated as "not present".
    Excluded { status_code: u16 },
    /// No usable response (transport error, timeout, broken body).
    Failed { reason: FailureReason },
}

impl ProbeOutcome {
    pub fn is_responded(&self) -> bool {
        matches!(self, ProbeOutcome::Responded { .. })
    }
}

/// Decides which status codes count as "resource not present".
///
/// Anything outside the exclusion set is a hit, 5xx included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassificationPolicy {
    excluded: BTreeSet<u16>,
}

impl Default for ClassificationPolicy {
    fn default() -> Self {
        Self { excluded: BTreeSet::from([403, 404]) }
    }
}

impl ClassificationPolicy {
    pub fn new(excluded: impl IntoIterator<Item = u16>) -> Self {
        Self { excluded: excluded.into_iter().collect() }
    }

    pub fn is_excluded(&self, status: u16) -> bool {
        self.excluded.contains(&status)
    }

    pub fn excluded(&self) -> &BTreeSet<u16> {
        &self.excluded
    }

    pub fn classify(&self, status: u16, url: String, method: Method) -> ProbeOutcome {
        if self.is_excluded(status) {
            ProbeOutcome::Excluded { status_code: status }
        } else {
            ProbeOutcome::Responded { status_code: status, url, method }
        }
    }
}

/// Join base and path with exactly one `/` between them.
///
/// Only a single leading `/` of the path is treated as the separator; anything
/// after it belongs to the path and is kept verbatim.
pub fn join_url(base: &str, path: &str) -> String {
    let path = path.strip_prefix('/').unwrap_or(path);
    format!("{}/{}", base.trim_end_matches('/'), path)
}

/// Send one request for `candidate` and classify what comes back.
///
/// Never returns an error: every transport problem becomes `ProbeOutcome::Failed`.
/// `timeout` is a hard deadline over connect, headers and body.
pub async fn probe_candidate(
    client: &Client,
    base_url: &str,
    candidate: &Candidate,
    timeout: Duration,
    policy: &ClassificationPolicy,
) -> ProbeOutcome {
    let url = join_url(base_url, &candidate.path);
    let start = Instant::now();

    let res = tokio::time::timeout(timeout, send_and_drain(client, &url, candidate.method)).await;
    let elapsed_ms = start.elapsed().as_millis() as u64;

    match res {
        Ok(Ok(status)) => {
            tracing::trace!(method=%candidate.method, url=%url, status, elapsed_ms, "probe answered");
            policy.classify(status, url, candidate.method)
        }
        Ok(Err(reason)) => {
            tracing::debug!(method=%candidate.method, url=%url, %reason, elapsed_ms, "probe failed");
            ProbeOutcome::Failed { reason }
        }
        Err(_) => {
            tracing::debug!(method=%candidate.method, url=%url, elapsed_ms, "probe timed out");
            ProbeOutcome::Failed { reason: FailureReason::Timeout }
        }
    }
}

async fn send_and_drain(client: &Client, url: &str, method: Method) -> Result<u16, FailureReason> {
    let mut resp = client.request(method.into(), url).send().await?;
    let status = resp.status().as_u16();
    // Drain chunk by chunk so a broken body is still reported without buffering it
    while resp.chunk().await?.is_some() {}
    Ok(status)
}
