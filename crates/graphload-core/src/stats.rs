//! Iteration timing statistics
//!
//! One `RunStatistics` lives for one ramp level: the buffer is allocated
//! once at the configured iteration count and never resized, and finalizing
//! consumes the recorder so it can only happen once per level.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{LoadError, Result};

/// Fixed-capacity recorder of per-iteration elapsed times
#[derive(Debug)]
pub struct RunStatistics {
    timings: Vec<Duration>,
    capacity: usize,
}

impl RunStatistics {
    /// Recorder for exactly `runs` iterations
    pub fn new(runs: usize) -> Self {
        Self {
            timings: Vec::with_capacity(runs),
            capacity: runs,
        }
    }

    /// Record one iteration's elapsed time; errors once the buffer is full
    pub fn record(&mut self, elapsed: Duration) -> Result<()> {
        if self.timings.len() >= self.capacity {
            return Err(LoadError::Statistics {
                recorded: self.timings.len(),
                capacity: self.capacity,
            });
        }
        self.timings.push(elapsed);
        Ok(())
    }

    /// Iterations recorded so far
    pub fn recorded(&self) -> usize {
        self.timings.len()
    }

    /// Whether exactly `runs` iterations have been recorded
    pub fn is_full(&self) -> bool {
        self.timings.len() == self.capacity && self.capacity > 0
    }

    /// Mean and population standard deviation of the recorded timings.
    ///
    /// One-shot: consumes the recorder, and is only valid once the buffer
    /// holds exactly the configured number of samples.
    pub fn finalize(self) -> Result<StatsSummary> {
        if !self.is_full() {
            return Err(LoadError::Statistics {
                recorded: self.timings.len(),
                capacity: self.capacity,
            });
        }

        let n = self.timings.len() as f64;
        let mean = self.timings.iter().map(Duration::as_secs_f64).sum::<f64>() / n;
        let variance = self
            .timings
            .iter()
            .map(|elapsed| (elapsed.as_secs_f64() - mean).powi(2))
            .sum::<f64>()
            / n;

        Ok(StatsSummary {
            samples: self.capacity,
            mean_secs: mean,
            stddev_secs: variance.sqrt(),
        })
    }
}

/// Mean and population standard deviation of one ramp level's iterations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsSummary {
    /// Number of iterations measured
    pub samples: usize,

    /// Mean elapsed seconds
    pub mean_secs: f64,

    /// Population standard deviation in seconds (divide by N)
    pub stddev_secs: f64,
}
