//! Bounded-concurrency dispatcher
//!
//! Logical connections are issued in batches of at most the concurrency
//! window. Every task in a batch runs as an independent spawned future and
//! the dispatcher joins the whole batch before starting the next one, so
//! peak concurrency never exceeds the window while throughput inside a
//! batch is unconstrained. Outcomes come back through the join handles, one
//! result slot per task; there is no shared mutable counter.

use std::future::Future;

use futures::future::join_all;
use hdrhistogram::Histogram;
use tracing::{debug, warn};

use crate::transport::SendOutcome;

/// Aggregate outcome of one full dispatch pass
pub struct DispatchReport {
    /// Logical connections issued
    pub issued: u64,

    /// Connections that failed to connect or send
    pub failures: u64,

    /// Batches run (ceil(total / window))
    pub batches: u64,

    /// Bytes written by successful connections
    pub bytes_sent: u64,

    /// Dial+send latency distribution in microseconds
    pub latencies: Histogram<u64>,
}

impl DispatchReport {
    fn new() -> Self {
        Self {
            issued: 0,
            failures: 0,
            batches: 0,
            bytes_sent: 0,
            latencies: Histogram::new_with_bounds(1, 60_000_000, 3).unwrap(), // 1µs to 60s
        }
    }

    fn absorb(&mut self, outcome: SendOutcome) {
        let latency_us = (outcome.latency.as_micros() as u64).max(1);
        if let Err(e) = self.latencies.record(latency_us) {
            debug!("latency sample out of histogram range: {}", e);
        }

        if outcome.success {
            self.bytes_sent += outcome.bytes_sent.unwrap_or(0);
        } else {
            self.failures += 1;
            match outcome.error {
                Some(error) => warn!("{}", error),
                None => warn!("connection failed without detail"),
            }
        }
    }
}

/// Issue `total` logical connections, at most `window` in flight at once.
///
/// `window` must be greater than zero; the configuration is validated
/// before any dispatch runs. The factory is called with the logical
/// connection index and returns the future that delivers that connection.
/// Failures inside a batch never abort it; they are tallied and the batch
/// proceeds with the remaining tasks.
pub async fn dispatch<F, Fut>(total: u64, window: u64, mut task_factory: F) -> DispatchReport
where
    F: FnMut(u64) -> Fut,
    Fut: Future<Output = SendOutcome> + Send + 'static,
{
    debug_assert!(window > 0);

    let mut report = DispatchReport::new();
    let mut issued = 0u64;

    while issued < total {
        let batch = window.min(total - issued);
        let mut handles = Vec::with_capacity(batch as usize);
        for _ in 0..batch {
            handles.push(tokio::spawn(task_factory(issued)));
            issued += 1;
        }

        // full join: the next batch must not start before this one completes
        for joined in join_all(handles).await {
            match joined {
                Ok(outcome) => report.absorb(outcome),
                Err(e) => {
                    warn!("dispatched task aborted: {}", e);
                    report.failures += 1;
                }
            }
        }
        report.batches += 1;
    }

    report.issued = issued;
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LoadError;
    use std::sync::atomic::{AtomicI64, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    fn instant_ok(_index: u64) -> impl Future<Output = SendOutcome> + Send + 'static {
        async { SendOutcome::ok(10, Duration::from_micros(5)) }
    }

    #[tokio::test]
    async fn test_issues_exactly_total_tasks() {
        let report = dispatch(17, 4, instant_ok).await;
        assert_eq!(report.issued, 17);
        assert_eq!(report.failures, 0);
        assert_eq!(report.latencies.len(), 17);
    }

    #[tokio::test]
    async fn test_batch_count_is_ceil_of_total_over_window() {
        assert_eq!(dispatch(4, 2, instant_ok).await.batches, 2);
        assert_eq!(dispatch(7, 3, instant_ok).await.batches, 3);
        assert_eq!(dispatch(5, 10, instant_ok).await.batches, 1);
        assert_eq!(dispatch(10, 1, instant_ok).await.batches, 10);
        assert_eq!(dispatch(0, 4, instant_ok).await.batches, 0);
    }

    #[tokio::test]
    async fn test_successes_plus_failures_equal_total() {
        let report = dispatch(10, 3, |index| async move {
            if index % 2 == 0 {
                SendOutcome::ok(1, Duration::from_micros(1))
            } else {
                SendOutcome::failed(
                    LoadError::connect(index, "refused"),
                    Duration::from_micros(1),
                )
            }
        })
        .await;
        assert_eq!(report.issued, 10);
        assert_eq!(report.failures, 5);
        assert_eq!(report.bytes_sent, 5);
    }

    #[tokio::test]
    async fn test_failures_do_not_abort_the_batch() {
        let report = dispatch(6, 6, |index| async move {
            if index == 0 {
                SendOutcome::failed(LoadError::connect(0, "refused"), Duration::ZERO)
            } else {
                SendOutcome::ok(1, Duration::from_micros(1))
            }
        })
        .await;
        assert_eq!(report.issued, 6);
        assert_eq!(report.failures, 1);
        assert_eq!(report.bytes_sent, 5);
    }

    #[tokio::test]
    async fn test_concurrency_never_exceeds_window() {
        let active = Arc::new(AtomicI64::new(0));
        let peak = Arc::new(AtomicI64::new(0));

        let report = dispatch(12, 3, |_| {
            let active = active.clone();
            let peak = peak.clone();
            async move {
                let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(20)).await;
                active.fetch_sub(1, Ordering::SeqCst);
                SendOutcome::ok(1, Duration::from_millis(20))
            }
        })
        .await;

        assert_eq!(report.issued, 12);
        assert_eq!(report.batches, 4);
        assert!(peak.load(Ordering::SeqCst) <= 3);
    }

    #[tokio::test]
    async fn test_indexes_are_sequential_across_batches() {
        let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
        dispatch(7, 2, |index| {
            let seen = seen.clone();
            async move {
                seen.lock().unwrap().push(index);
                SendOutcome::ok(0, Duration::from_micros(1))
            }
        })
        .await;

        let mut indexes = seen.lock().unwrap().clone();
        indexes.sort_unstable();
        assert_eq!(indexes, (0..7).collect::<Vec<u64>>());
    }
}
