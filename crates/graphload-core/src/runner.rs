//! Iteration and ramp control
//!
//! The iteration controller runs one full dispatch pass and measures it.
//! The ramp controller repeats iterations until the configured run count is
//! reached (or forever when unbounded), finalizes the timing statistics for
//! the level, then steps the load shape and starts over. It returns only
//! when a bounded sequence completes with both ramp steps at zero.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::config::LoadConfig;
use crate::dispatch;
use crate::error::Result;
use crate::stats::{RunStatistics, StatsSummary};
use crate::transport::{ConnectionTask, Transport};

/// Measurement of one full dispatch pass
#[derive(Debug, Clone)]
pub struct IterationResult {
    /// Wall-clock time for the whole pass
    pub elapsed: Duration,

    /// Connections that failed to connect or send
    pub failures: u64,

    /// Successfully delivered points per second
    pub throughput: f64,
}

/// Successful points per second; failed connections earn no credit
pub fn throughput(
    connections: u64,
    failures: u64,
    points_per_connection: u64,
    elapsed: Duration,
) -> f64 {
    let delivered = connections.saturating_sub(failures) * points_per_connection;
    let secs = elapsed.as_secs_f64();
    if secs > 0.0 {
        delivered as f64 / secs
    } else {
        0.0
    }
}

/// Remaining pacing budget before the next iteration may start.
///
/// `Some(delay)` means sleep for `delay`; `None` means the iteration
/// overran the interval and the caller reports the overage instead.
pub fn pacing_delay(interval: Duration, elapsed: Duration) -> Option<Duration> {
    interval.checked_sub(elapsed)
}

/// Runs single measured dispatch passes
pub struct IterationController {
    transport: Arc<dyn Transport>,
}

impl IterationController {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// One full pass: issue every configured connection and measure it
    pub async fn run_iteration(&self, config: &LoadConfig) -> IterationResult {
        let points = config.points_per_connection;
        let transport = self.transport.clone();

        let begin = Instant::now();
        let report = dispatch::dispatch(config.connections, config.simultaneous, move |index| {
            let transport = transport.clone();
            async move { transport.send(ConnectionTask { index, points }).await }
        })
        .await;
        let elapsed = begin.elapsed();

        let speed = throughput(config.connections, report.failures, points, elapsed);

        info!("Spent   : {:.3} seconds", elapsed.as_secs_f64());
        info!("Speed   : {:.0} metrics/second", speed);
        if report.failures > 0 {
            warn!(
                "Failed  : {} of {} connections",
                report.failures, config.connections
            );
        }
        debug!(
            "Latency : p50 {}µs / p99 {}µs / max {}µs, {} bytes written",
            report.latencies.value_at_quantile(0.50),
            report.latencies.value_at_quantile(0.99),
            report.latencies.max(),
            report.bytes_sent
        );

        IterationResult {
            elapsed,
            failures: report.failures,
            throughput: speed,
        }
    }
}

/// Drives iteration sequences across ramp levels
pub struct RampController {
    iterations: IterationController,
}

impl RampController {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            iterations: IterationController::new(transport),
        }
    }

    /// Run until a bounded sequence completes with both ramp steps zero.
    ///
    /// With ramp steps configured, or with an unbounded run count, this
    /// never returns. On termination it yields the final level's summary.
    pub async fn run(&self, initial: LoadConfig) -> Result<Option<StatsSummary>> {
        initial.validate()?;
        info!("Starting...");

        let mut config = initial;
        loop {
            let summary = self.run_level(&config).await?;
            if !config.has_ramp() {
                return Ok(summary);
            }

            let next = config.stepped();
            info!(
                "Increasing load by {} connections and {} points per connection",
                config.step_connections, config.step_points
            );
            info!(
                "Load    : {} x {} = {} metrics",
                next.connections,
                next.points_per_connection,
                next.gross_points()
            );
            config = next;
        }
    }

    /// One ramp level: `runs` measured iterations, or forever when zero
    async fn run_level(&self, config: &LoadConfig) -> Result<Option<StatsSummary>> {
        let mut stats = (config.runs > 0).then(|| RunStatistics::new(config.runs as usize));
        let mut iteration = 0u64;

        loop {
            info!("=== Iteration {} / {} ===", iteration, config.runs);
            info!(
                "Load    : {} = {} x {} metrics",
                config.gross_points(),
                config.connections,
                config.points_per_connection
            );

            let result = self.iterations.run_iteration(config).await;

            // pacing comes before the run-count check, so iterations stay
            // spaced at the interval even across ramp levels
            if !config.no_wait {
                match pacing_delay(config.interval, result.elapsed) {
                    Some(delay) if !delay.is_zero() => {
                        info!("Sleeping: {:.3} seconds", delay.as_secs_f64());
                        tokio::time::sleep(delay).await;
                    }
                    Some(_) => {}
                    None => {
                        let overtime = result.elapsed.saturating_sub(config.interval);
                        info!("Overtime: {:.3} seconds", overtime.as_secs_f64());
                    }
                }
            }

            iteration += 1;
            if let Some(recorder) = stats.as_mut() {
                recorder.record(result.elapsed)?;
                if recorder.is_full() {
                    break;
                }
            }
        }

        match stats {
            Some(recorder) => {
                let summary = recorder.finalize()?;
                info!(
                    "Result  : {:.6} +- {:.6} seconds",
                    summary.mean_secs, summary.stddev_secs
                );
                Ok(Some(summary))
            }
            None => Ok(None),
        }
    }
}
