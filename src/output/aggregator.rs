use std::collections::BTreeMap;

use ahash::AHashSet;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::fuzz::candidates::Method;
use crate::probe::{FailureReason, ProbeOutcome};

/// One endpoint judged present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Discovery {
    pub method: Method,
    pub url: String,
    pub status: u16,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportStats {
    pub probes_total: usize,
    pub responded: usize,
    pub duplicates: usize,
    pub excluded: usize,
    pub failed: usize,
    pub timeouts: usize,
    pub peak_in_flight: usize,
    pub by_status: BTreeMap<u16, usize>,
    pub elapsed_ms: u64,
}

/// Final, deduplicated result of a run, sorted by url then method.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveryReport {
    pub target: String,
    pub endpoints: Vec<Discovery>,
    pub stats: ReportStats,
    pub cancelled: bool,
}

impl DiscoveryReport {
    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }
}

/// Facts about the run that only the scheduler knows.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunSummary {
    pub elapsed_ms: u64,
    pub peak_in_flight: usize,
    pub cancelled: bool,
}

#[derive(Default)]
struct Inner {
    seen: AHashSet<(Method, String)>,
    endpoints: Vec<Discovery>,
    stats: ReportStats,
    frozen: Option<DiscoveryReport>,
}

/// Collects probe outcomes from concurrently completing probes.
///
/// Shared behind an `Arc`; every mutation goes through one mutex.
pub struct ResultAggregator {
    target: String,
    inner: Mutex<Inner>,
}

impl ResultAggregator {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            inner: Mutex::new(Inner::default()),
        }
    }

    /// Record one outcome. Only `Responded` outcomes can enter the report;
    /// the others are counted and dropped.
    pub fn add(&self, outcome: ProbeOutcome) {
        let mut inner = self.inner.lock();
        if inner.frozen.is_some() {
            tracing::warn!(?outcome, "outcome arrived after report was finalized, ignoring");
            return;
        }

        inner.stats.probes_total += 1;
        match outcome {
            ProbeOutcome::Responded { status_code, url, method } => {
                *inner.stats.by_status.entry(status_code).or_insert(0) += 1;
                if inner.seen.insert((method, url.clone())) {
                    inner.stats.responded += 1;
                    tracing::info!(%method, url=%url, status=status_code, "endpoint discovered");
                    inner.endpoints.push(Discovery { method, url, status: status_code });
                } else {
                    inner.stats.duplicates += 1;
                }
            }
            ProbeOutcome::Excluded { status_code } => {
                *inner.stats.by_status.entry(status_code).or_insert(0) += 1;
                inner.stats.excluded += 1;
            }
            ProbeOutcome::Failed { reason } => {
                inner.stats.failed += 1;
                if reason == FailureReason::Timeout {
                    inner.stats.timeouts += 1;
                }
            }
        }
    }

    /// Build the report and freeze the aggregator. Later calls return the same report.
    pub fn finalize(&self, run: RunSummary) -> DiscoveryReport {
        let mut inner = self.inner.lock();
        if let Some(report) = &inner.frozen {
            return report.clone();
        }

        let mut endpoints = std::mem::take(&mut inner.endpoints);
        endpoints.sort_by(|a, b| a.url.cmp(&b.url).then(a.method.cmp(&b.method)));

        let mut stats = std::mem::take(&mut inner.stats);
        stats.elapsed_ms = run.elapsed_ms;
        stats.peak_in_flight = run.peak_in_flight;

        let report = DiscoveryReport {
            target: self.target.clone(),
            endpoints,
            stats,
            cancelled: run.cancelled,
        };
        inner.frozen = Some(report.clone());
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn hit(status: u16, url: &str, method: Method) -> ProbeOutcome {
        ProbeOutcome::Responded { status_code: status, url: url.to_string(), method }
    }

    #[test]
    fn test_only_responded_enters_report() {
        let agg = ResultAggregator::new("https://example.test");
        agg.add(hit(200, "https://example.test/admin", Method::Get));
        agg.add(ProbeOutcome::Excluded { status_code: 404 });
        agg.add(ProbeOutcome::Failed { reason: FailureReason::Timeout });
        agg.add(ProbeOutcome::Failed { reason: FailureReason::Connect("refused".into()) });

        let report = agg.finalize(RunSummary::default());
        assert_eq!(report.endpoints.len(), 1);
        assert_eq!(report.stats.probes_total, 4);
        assert_eq!(report.stats.excluded, 1);
        assert_eq!(report.stats.failed, 2);
        assert_eq!(report.stats.timeouts, 1);
        assert_eq!(report.stats.by_status.get(&404), Some(&1));
    }

    #[test]
    fn test_dedup_first_wins() {
        let agg = ResultAggregator::new("t");
        agg.add(hit(200, "https://x.test/a", Method::Get));
        agg.add(hit(500, "https://x.test/a", Method::Get));
        agg.add(hit(201, "https://x.test/a", Method::Post));

        let report = agg.finalize(RunSummary::default());
        assert_eq!(report.endpoints.len(), 2);
        assert_eq!(report.endpoints[0], Discovery { method: Method::Get, url: "https://x.test/a".into(), status: 200 });
        assert_eq!(report.stats.duplicates, 1);
    }

    #[test]
    fn test_sorted_by_url_then_method() {
        let agg = ResultAggregator::new("t");
        agg.add(hit(200, "https://x.test/b", Method::Get));
        agg.add(hit(200, "https://x.test/a", Method::Patch));
        agg.add(hit(200, "https://x.test/a", Method::Get));

        let order: Vec<(String, Method)> = agg
            .finalize(RunSummary::default())
            .endpoints
            .into_iter()
            .map(|d| (d.url, d.method))
            .collect();
        assert_eq!(
            order,
            vec![
                ("https://x.test/a".to_string(), Method::Get),
                ("https://x.test/a".to_string(), Method::Patch),
                ("https://x.test/b".to_string(), Method::Get),
            ]
        );
    }

    #[test]
    fn test_finalize_is_idempotent_and_freezes() {
        let agg = ResultAggregator::new("t");
        agg.add(hit(200, "https://x.test/a", Method::Get));
        let first = agg.finalize(RunSummary { elapsed_ms: 10, ..Default::default() });

        agg.add(hit(200, "https://x.test/late", Method::Get));
        let second = agg.finalize(RunSummary { elapsed_ms: 99, peak_in_flight: 1, cancelled: true });
        assert_eq!(first, second);
        assert_eq!(second.endpoints.len(), 1);
    }

    #[test]
    fn test_concurrent_adds() {
        let agg = Arc::new(ResultAggregator::new("t"));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let agg = agg.clone();
                std::thread::spawn(move || {
                    for i in 0..100 {
                        agg.add(hit(200, &format!("https://x.test/{}", i), Method::Get));
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        let report = agg.finalize(RunSummary::default());
        assert_eq!(report.endpoints.len(), 100);
        assert_eq!(report.stats.duplicates, 700);
        assert_eq!(report.stats.probes_total, 800);
    }
}
