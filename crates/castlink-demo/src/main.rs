//! Castlink demo binary.
//!
//! # Usage
//!
//! ```bash
//! # Cooperative host
//! castlink-demo
//!
//! # Host that sits on one state update past the timeout
//! castlink-demo --stall-update --timeout-ms 500 --dump-log
//! ```

use std::time::Duration;

use castlink_demo::{DemoConfig, run};
use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Castlink demo
#[derive(Parser, Debug)]
#[command(name = "castlink-demo")]
#[command(about = "Run a scripted casting session against a simulated host")]
#[command(version)]
struct Args {
    /// Seed for request ids
    #[arg(long, default_value = "0")]
    seed: u64,

    /// Request timeout in milliseconds
    #[arg(long, default_value = "1000")]
    timeout_ms: u64,

    /// Number of state updates to send
    #[arg(long, default_value = "3")]
    turns: u32,

    /// Record rejected inbound messages in the debug log
    #[arg(long)]
    debug: bool,

    /// Host never sends session events
    #[arg(long)]
    drop_events: bool,

    /// Host withholds the reply to the second state update
    #[arg(long)]
    stall_update: bool,

    /// Emit the client debug log as JSON when done
    #[arg(long)]
    dump_log: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry().with(fmt::layer()).with(filter).init();

    let config = DemoConfig {
        seed: args.seed,
        request_timeout: Duration::from_millis(args.timeout_ms),
        debug: args.debug,
        drop_events: args.drop_events,
        stall_update: args.stall_update,
        turns: args.turns,
    };
    tracing::info!(?config, "castlink demo starting");

    let report = run(&config).await?;

    tracing::info!(
        device = %report.device_id,
        session = ?report.session_id,
        acknowledged = report.acknowledged,
        failures = ?report.failures,
        host_states = report.host_states.len(),
        "demo finished"
    );

    if args.dump_log {
        tracing::info!(log = %serde_json::to_string(&report.log)?, "debug log");
    }

    Ok(())
}
