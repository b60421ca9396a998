//! Load run configuration
//!
//! `LoadConfig` is an immutable value describing one ramp level. The ramp
//! controller never mutates a config in place: stepping to the next level
//! produces a fresh value via [`LoadConfig::stepped`].

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{LoadError, Result};

/// Wire protocol used to reach the target endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Tcp,
    Udp,
    Http,
    Https,
}

impl Protocol {
    /// True for the byte-stream variants that dial a socket per connection
    pub fn is_stream(&self) -> bool {
        matches!(self, Protocol::Tcp | Protocol::Udp)
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Protocol::Tcp => "tcp",
            Protocol::Udp => "udp",
            Protocol::Http => "http",
            Protocol::Https => "https",
        };
        f.write_str(name)
    }
}

impl FromStr for Protocol {
    type Err = LoadError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "tcp" => Ok(Protocol::Tcp),
            "udp" => Ok(Protocol::Udp),
            "http" => Ok(Protocol::Http),
            "https" => Ok(Protocol::Https),
            other => Err(LoadError::Config(format!(
                "unknown protocol '{other}', expected tcp/udp/http/https"
            ))),
        }
    }
}

/// Immutable configuration for one ramp level
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadConfig {
    /// Target host:port
    pub host: String,

    /// Wire protocol
    pub protocol: Protocol,

    /// Total logical connections issued per iteration
    pub connections: u64,

    /// In-flight connections per batch (the concurrency window)
    pub simultaneous: u64,

    /// Data points written per connection
    pub points_per_connection: u64,

    /// Measured iterations per ramp level, 0 = unbounded
    pub runs: u64,

    /// Connections added at each ramp step
    pub step_connections: u64,

    /// Points per connection added at each ramp step
    pub step_points: u64,

    /// Minimum spacing between iteration starts
    pub interval: Duration,

    /// Skip the pacing delay after each iteration
    pub no_wait: bool,

    /// Metric name prefix, connection index is appended
    pub prefix: String,

    /// Dial timeout for stream transports
    pub dial_timeout: Duration,
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1:2003".to_string(),
            protocol: Protocol::Tcp,
            connections: 10_000,
            simultaneous: 1_000,
            points_per_connection: 1_000,
            runs: 0,
            step_connections: 0,
            step_points: 0,
            interval: Duration::from_secs(60),
            no_wait: false,
            prefix: "one_min.perf_test.test".to_string(),
            dial_timeout: Duration::from_millis(150),
        }
    }
}

impl LoadConfig {
    /// Validate the configuration before any iteration starts
    pub fn validate(&self) -> Result<()> {
        if self.simultaneous == 0 {
            return Err(LoadError::Config(
                "concurrency window (simul) must be greater than zero".into(),
            ));
        }
        if self.host.is_empty() {
            return Err(LoadError::Config("target host must not be empty".into()));
        }
        Ok(())
    }

    /// Whether a completed bounded sequence advances to another ramp level
    pub fn has_ramp(&self) -> bool {
        self.step_connections != 0 || self.step_points != 0
    }

    /// Configuration for the next ramp level; the current value is unchanged
    pub fn stepped(&self) -> LoadConfig {
        LoadConfig {
            connections: self.connections + self.step_connections,
            points_per_connection: self.points_per_connection + self.step_points,
            ..self.clone()
        }
    }

    /// Total points an iteration would deliver with zero failures
    pub fn gross_points(&self) -> u64 {
        self.connections * self.points_per_connection
    }
}
