//! Graphload CLI
//!
//! Command-line interface for the graphload synthetic load generator.
//!
//! ```bash
//! # hammer a local carbon listener over tcp
//! graphload --host 127.0.0.1:2003 --connections 1000 --simul 100 --points 500
//!
//! # five measured runs, ramping 500 connections per level
//! graphload --runs 5 --stepconnections 500 --nowait
//!
//! # query-style load against a render endpoint
//! graphload --proto http --host 127.0.0.1:8080 --connections 200 --simul 50
//! ```

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use graphload_core::{transport, LoadConfig, Protocol, RampController};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "graphload")]
#[command(version = "0.1.0")]
#[command(about = "Synthetic load generator for Graphite-style ingestion endpoints", long_about = None)]
struct Cli {
    /// Target host:port
    #[arg(long, default_value = "127.0.0.1:2003")]
    host: String,

    /// Protocol: tcp, udp, http or https
    #[arg(long, default_value = "tcp")]
    proto: Protocol,

    /// Connections per iteration
    #[arg(long, default_value_t = 10_000)]
    connections: u64,

    /// Simultaneously in-flight connections
    #[arg(long = "simul", default_value_t = 1_000)]
    simultaneous: u64,

    /// Datapoints per connection
    #[arg(long, default_value_t = 1_000)]
    points: u64,

    /// Worker threads for the runtime
    #[arg(long, default_value_t = 2)]
    threads: usize,

    /// Number of measured runs per ramp level, 0 = infinity
    #[arg(long, default_value_t = 0)]
    runs: u64,

    /// Increase number of connections with this step
    #[arg(long = "stepconnections", default_value_t = 0)]
    step_connections: u64,

    /// Increase number of points with this step
    #[arg(long = "steppoints", default_value_t = 0)]
    step_points: u64,

    /// Do not wait after iteration
    #[arg(long = "nowait")]
    no_wait: bool,

    /// Metric name prefix, connection index is appended
    #[arg(long, default_value = "one_min.perf_test.test")]
    prefix: String,

    /// Minimum seconds between iteration starts
    #[arg(long = "interval-secs", default_value_t = 60)]
    interval_secs: u64,

    /// Dial timeout for stream transports, in milliseconds
    #[arg(long = "dial-timeout-ms", default_value_t = 150)]
    dial_timeout_ms: u64,

    /// Write cpu profile to file (captured by an external profiler)
    #[arg(long)]
    cpuprofile: Option<PathBuf>,

    /// Write the final run statistics as JSON to this path
    /// (bounded, non-ramping runs only)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn load_config(&self) -> LoadConfig {
        LoadConfig {
            host: self.host.clone(),
            protocol: self.proto,
            connections: self.connections,
            simultaneous: self.simultaneous,
            points_per_connection: self.points,
            runs: self.runs,
            step_connections: self.step_connections,
            step_points: self.step_points,
            interval: Duration::from_secs(self.interval_secs),
            no_wait: self.no_wait,
            prefix: self.prefix.clone(),
            dial_timeout: Duration::from_millis(self.dial_timeout_ms),
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if cli.verbose { "debug" } else { "info" }));
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    if let Some(path) = &cli.cpuprofile {
        // profiling is an external collaborator's job; the flag only names
        // the file an attached profiler should write
        warn!(
            "cpu profiling is not built in, attach an external profiler writing to {}",
            path.display()
        );
    }

    let config = cli.load_config();
    config.validate().context("invalid configuration")?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(cli.threads.max(1))
        .enable_all()
        .build()
        .context("failed to build runtime")?;

    runtime.block_on(async {
        let transport = transport::for_config(&config).context("failed to set up transport")?;
        let controller = RampController::new(transport);
        let summary = controller.run(config).await.context("load run failed")?;

        if let Some(summary) = summary {
            if let Some(path) = &cli.output {
                let json = serde_json::to_string_pretty(&summary)
                    .context("failed to serialize statistics")?;
                std::fs::write(path, json)
                    .with_context(|| format!("failed to write {}", path.display()))?;
                info!("Results saved to {}", path.display());
            }
        }
        Ok(())
    })
}
