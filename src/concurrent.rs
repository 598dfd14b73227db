use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use futures::stream::{FuturesUnordered, StreamExt};
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use crate::error::ConfigError;

/// Snapshot of what the scheduler has done so far.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchedulerStats {
    pub admitted: usize,
    pub completed: usize,
    pub task_errors: usize,
    pub peak_in_flight: usize,
    pub cancelled: bool,
}

/// Semaphore-gated probe executor with a fixed admission window.
///
/// Items are admitted in iteration order, at most `max_concurrency` at a time.
/// A finished task frees its permit immediately, so the next item is admitted
/// without waiting for the rest of the window. Completions are handed out in
/// the order they finish.
pub struct ConcurrentProbe {
    semaphore: Arc<Semaphore>,
    max_concurrency: usize,
    cancel: CancellationToken,
    admitted: AtomicUsize,
    completed: Arc<AtomicUsize>,
    errors: AtomicUsize,
    active: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
    cancelled: AtomicBool,
}

/// Keeps the in-flight gauge honest even if the task panics.
struct InFlightGuard(Arc<AtomicUsize>);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl ConcurrentProbe {
    pub fn new(max_concurrency: usize) -> Result<Self, ConfigError> {
        if max_concurrency == 0 || max_concurrency > Semaphore::MAX_PERMITS {
            return Err(ConfigError::InvalidConcurrency(max_concurrency));
        }
        Ok(Self {
            semaphore: Arc::new(Semaphore::new(max_concurrency)),
            max_concurrency,
            cancel: CancellationToken::new(),
            admitted: AtomicUsize::new(0),
            completed: Arc::new(AtomicUsize::new(0)),
            errors: AtomicUsize::new(0),
            active: Arc::new(AtomicUsize::new(0)),
            peak: Arc::new(AtomicUsize::new(0)),
            cancelled: AtomicBool::new(false),
        })
    }

    /// Use an externally owned token to stop admissions.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }

    /// Number of tasks running right now.
    pub fn in_flight(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    /// Run every item through `task_fn` and collect the outputs in completion order.
    pub async fn run<I, T, F, Fut>(&self, items: I, task_fn: F) -> Vec<Fut::Output>
    where
        I: IntoIterator<Item = T>,
        F: Fn(T) -> Fut + Clone + Send + 'static,
        Fut: Future + Send + 'static,
        Fut::Output: Send + 'static,
        T: Send + 'static,
    {
        let mut results = Vec::new();
        self.run_with(items, task_fn, |out| results.push(out)).await;
        results
    }

    /// Run every item through `task_fn`, passing each output to `on_done` as soon
    /// as its task is joined.
    ///
    /// Once the cancellation token fires no further item is admitted; tasks
    /// already running are awaited to completion (or their own timeout).
    pub async fn run_with<I, T, F, Fut, D>(&self, items: I, task_fn: F, mut on_done: D) -> SchedulerStats
    where
        I: IntoIterator<Item = T>,
        F: Fn(T) -> Fut + Clone + Send + 'static,
        Fut: Future + Send + 'static,
        Fut::Output: Send + 'static,
        T: Send + 'static,
        D: FnMut(Fut::Output),
    {
        let mut queue = items.into_iter();
        let mut running = FuturesUnordered::new();
        let mut admitting = true;

        while admitting {
            tokio::select! {
                biased;

                _ = self.cancel.cancelled() => {
                    self.stop_admissions();
                    admitting = false;
                }

                Some(joined) = running.next(), if !running.is_empty() => {
                    self.record(joined, &mut on_done);
                }

                permit = self.semaphore.clone().acquire_owned() => {
                    let Ok(permit) = permit else {
                        tracing::warn!("admission semaphore closed, no further items admitted");
                        admitting = false;
                        continue;
                    };
                    if self.cancel.is_cancelled() {
                        self.stop_admissions();
                        admitting = false;
                        continue;
                    }
                    let Some(item) = queue.next() else {
                        admitting = false;
                        continue;
                    };

                    self.admitted.fetch_add(1, Ordering::Relaxed);
                    let task_fn = task_fn.clone();
                    let completed = self.completed.clone();
                    let active = self.active.clone();
                    let peak = self.peak.clone();

                    running.push(tokio::spawn(async move {
                        let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                        peak.fetch_max(now, Ordering::SeqCst);
                        let _guard = InFlightGuard(active);

                        let result = task_fn(item).await;
                        completed.fetch_add(1, Ordering::Relaxed);
                        drop(permit); // Release semaphore
                        result
                    }));
                }
            }
        }

        while let Some(joined) = running.next().await {
            self.record(joined, &mut on_done);
        }

        self.stats()
    }

    fn stop_admissions(&self) {
        if !self.cancelled.swap(true, Ordering::SeqCst) {
            tracing::info!(admitted = self.admitted.load(Ordering::Relaxed), "cancellation requested, draining in-flight probes");
        }
    }

    fn record<O, D>(&self, joined: Result<O, tokio::task::JoinError>, on_done: &mut D)
    where
        D: FnMut(O),
    {
        match joined {
            Ok(output) => on_done(output),
            Err(e) => {
                self.errors.fetch_add(1, Ordering::Relaxed);
                tracing::error!(error=%e, "probe task aborted");
            }
        }
    }

    pub fn stats(&self) -> SchedulerStats {
        SchedulerStats {
            admitted: self.admitted.load(Ordering::Relaxed),
            completed: self.completed.load(Ordering::Relaxed),
            task_errors: self.errors.load(Ordering::Relaxed),
            peak_in_flight: self.peak.load(Ordering::SeqCst),
            cancelled: self.cancelled.load(Ordering::SeqCst),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_zero_concurrency_rejected() {
        assert!(matches!(ConcurrentProbe::new(0), Err(ConfigError::InvalidConcurrency(0))));
        let too_many = Semaphore::MAX_PERMITS + 1;
        assert!(matches!(ConcurrentProbe::new(too_many), Err(ConfigError::InvalidConcurrency(n)) if n == too_many));
        assert!(ConcurrentProbe::new(Semaphore::MAX_PERMITS).is_ok());
    }

    #[tokio::test]
    async fn test_every_item_runs_once() {
        let probe = ConcurrentProbe::new(4).unwrap();
        let mut out = probe.run(0..100u32, |n| async move { n * 2 }).await;
        out.sort_unstable();
        assert_eq!(out, (0..100u32).map(|n| n * 2).collect::<Vec<_>>());

        let stats = probe.stats();
        assert_eq!(stats.admitted, 100);
        assert_eq!(stats.completed, 100);
        assert_eq!(stats.task_errors, 0);
        assert!(!stats.cancelled);
    }

    #[tokio::test]
    async fn test_window_is_bounded() {
        let probe = ConcurrentProbe::new(3).unwrap();
        assert_eq!(probe.max_concurrency(), 3);
        probe
            .run(0..30u32, |_| async {
                tokio::time::sleep(Duration::from_millis(5)).await;
            })
            .await;

        let stats = probe.stats();
        assert!(stats.peak_in_flight <= 3, "peak {}", stats.peak_in_flight);
        assert!(stats.peak_in_flight >= 2, "expected overlap, peak {}", stats.peak_in_flight);
        assert_eq!(probe.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_panicking_task_is_counted_not_fatal() {
        let probe = ConcurrentProbe::new(2).unwrap();
        let out = probe
            .run(0..5u32, |n| async move {
                if n == 2 {
                    panic!("boom");
                }
                n
            })
            .await;

        assert_eq!(out.len(), 4);
        assert_eq!(probe.stats().task_errors, 1);
        assert_eq!(probe.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_cancel_before_start_admits_nothing() {
        let token = CancellationToken::new();
        token.cancel();
        let probe = ConcurrentProbe::new(8).unwrap().with_cancellation(token);
        let out = probe.run(0..10u32, |n| async move { n }).await;

        assert!(out.is_empty());
        let stats = probe.stats();
        assert_eq!(stats.admitted, 0);
        assert!(stats.cancelled);
    }

    #[tokio::test]
    async fn test_cancel_mid_run_drains_in_flight() {
        let probe = ConcurrentProbe::new(2).unwrap();
        let token = probe.cancellation_token();

        let out = probe
            .run(0..50u32, move |n| {
                let token = token.clone();
                async move {
                    if n == 3 {
                        token.cancel();
                    }
                    tokio::time::sleep(Duration::from_millis(2)).await;
                    n
                }
            })
            .await;

        let stats = probe.stats();
        assert!(stats.cancelled);
        assert!(stats.admitted < 50);
        // every admitted task was allowed to finish
        assert_eq!(out.len(), stats.admitted);
        assert_eq!(stats.completed, stats.admitted);
    }
}
