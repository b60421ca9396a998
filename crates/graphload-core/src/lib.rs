//! # Graphload Core
//!
//! Load-generation engine for Graphite-style time-series ingestion
//! endpoints: it issues many concurrent logical connections against a
//! target, writes synthetic metric points, and measures throughput and
//! timing across repeated iterations, optionally ramping the load shape
//! upward between iteration sequences.
//!
//! Building blocks, wired together by the `graphload` binary:
//! - [`LoadConfig`] - immutable description of one ramp level
//! - [`payload`] - synthetic line-protocol and query payloads
//! - [`Transport`] - polymorphic delivery (tcp/udp stream or http request)
//! - [`dispatch()`] - batched, bounded-concurrency dispatcher
//! - [`IterationController`] / [`RampController`] - the measurement loops
//! - [`RunStatistics`] - per-level timing aggregation

pub mod config;
pub mod dispatch;
pub mod error;
pub mod payload;
pub mod runner;
pub mod stats;
pub mod transport;

pub use config::*;
pub use dispatch::dispatch;
pub use dispatch::DispatchReport;
pub use error::*;
pub use runner::*;
pub use stats::*;
pub use transport::*;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::{LoadConfig, Protocol};
    pub use crate::error::{LoadError, Result};
    pub use crate::runner::{IterationController, RampController};
    pub use crate::stats::{RunStatistics, StatsSummary};
    pub use crate::transport::{ConnectionTask, SendOutcome, Transport};
}
