//! Scripted casting session.
//!
//! Runs one complete game session through a real [`CastClient`] against the
//! simulated host: ready, scan, start with an initial board, a few state
//! updates, stop. The host can be told to drop its session events or to sit
//! on one state update long enough for it to time out, which shows how the
//! client recovers.
//!
//! [`CastClient`]: castlink_client::CastClient

#![forbid(unsafe_code)]

use std::time::Duration;

use castlink_client::{ClientConfig, ClientError, DebugLogEntry, StartOptions};
use castlink_harness::SimDriver;
use castlink_proto::payloads::ReadyPayload;
use serde_json::{Value, json};
use thiserror::Error;
use tracing::{info, warn};

/// Game id announced to the host.
pub const DEMO_GAME_ID: &str = "castlink-demo";

/// Demo settings.
#[derive(Debug, Clone)]
pub struct DemoConfig {
    /// Seed for request ids.
    pub seed: u64,
    /// Bridge timeout per request.
    pub request_timeout: Duration,
    /// Record rejected inbound messages in the debug log.
    pub debug: bool,
    /// Host acknowledges but never sends session events.
    pub drop_events: bool,
    /// Host withholds the reply to the second state update.
    pub stall_update: bool,
    /// State updates to send.
    pub turns: u32,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            request_timeout: Duration::from_millis(1_000),
            debug: false,
            drop_events: false,
            stall_update: false,
            turns: 3,
        }
    }
}

/// Errors that end the demo early.
#[derive(Error, Debug)]
pub enum DemoError {
    /// The host reported no devices
    #[error("host reported no devices")]
    NoDevices,

    /// The host is not able to cast
    #[error("casting unavailable")]
    Unavailable,

    /// A client operation the script depends on failed
    #[error("{step} failed: {source}")]
    Client {
        /// Script step
        step: &'static str,
        /// Underlying failure
        source: ClientError,
    },
}

/// What the session achieved.
#[derive(Debug, Clone, PartialEq)]
pub struct DemoReport {
    /// Device the session was started on.
    pub device_id: String,
    /// Session id reported by the host, if the session got that far.
    pub session_id: Option<String>,
    /// State updates the host acknowledged.
    pub acknowledged: u32,
    /// Error codes of failed state updates, in order.
    pub failures: Vec<String>,
    /// States the host recorded.
    pub host_states: Vec<Value>,
    /// Client debug log.
    pub log: Vec<DebugLogEntry>,
}

/// Run the scripted session.
///
/// Must run on a current-thread runtime; the client is not `Send`.
pub async fn run(config: &DemoConfig) -> Result<DemoReport, DemoError> {
    let client_config = ClientConfig::default()
        .with_request_timeout(config.request_timeout)
        .with_debug(config.debug);
    let driver = SimDriver::with_config(config.seed, client_config);
    let client = driver.client();
    driver.host().set_drop_events(config.drop_events);

    client
        .signal_ready(ReadyPayload::new(DEMO_GAME_ID))
        .await
        .map_err(|source| DemoError::Client { step: "ready", source })?;
    if !client.state().is_available {
        return Err(DemoError::Unavailable);
    }

    client
        .scan_for_devices()
        .await
        .map_err(|source| DemoError::Client { step: "scan", source })?;
    let state = client.state();
    let device = state.devices.first().ok_or(DemoError::NoDevices)?;
    info!(count = state.devices.len(), first = %device.name, "devices discovered");

    let device_id = device.id.clone();
    client
        .start_casting(device_id.clone(), StartOptions::with_initial_state(json!({ "turn": 0 })))
        .await
        .map_err(|source| DemoError::Client { step: "start", source })?;
    let session_id = client.state().session_id;
    match &session_id {
        Some(session_id) => info!(%device_id, %session_id, "casting"),
        None => warn!(%device_id, "start acknowledged but the host never connected"),
    }

    let mut acknowledged = 0;
    let mut failures = Vec::new();
    for turn in 1..=config.turns {
        let stall = config.stall_update && turn == 2;
        driver.host().set_withhold(stall);

        match client.send_state_update(json!({ "turn": turn })).await {
            Ok(()) => acknowledged += 1,
            Err(error) => {
                warn!(turn, code = error.code(), "state update failed");
                failures.push(error.code().to_owned());
            },
        }

        if stall {
            driver.host().set_withhold(false);
            let late = driver.host().release();
            info!(late, "stalled replies delivered after the timeout");
        }
    }

    client.reset_error();
    client
        .stop_casting()
        .await
        .map_err(|source| DemoError::Client { step: "stop", source })?;
    info!(acknowledged, failed = failures.len(), "session over");

    Ok(DemoReport {
        device_id,
        session_id,
        acknowledged,
        failures,
        host_states: driver.host().states(),
        log: client.debug_logs(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn default_session_delivers_every_turn() {
        let report = run(&DemoConfig::default()).await.expect("demo");

        assert_eq!(report.device_id, "sim-tv-1");
        assert_eq!(report.session_id.as_deref(), Some("sim-session-1"));
        assert_eq!(report.acknowledged, 3);
        assert!(report.failures.is_empty());
        assert_eq!(report.host_states, vec![
            json!({ "turn": 1 }),
            json!({ "turn": 2 }),
            json!({ "turn": 3 }),
        ]);
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_update_times_out_and_session_continues() {
        let config = DemoConfig { stall_update: true, ..DemoConfig::default() };
        let report = run(&config).await.expect("demo");

        assert_eq!(report.acknowledged, 2);
        assert_eq!(report.failures, vec!["BRIDGE_TIMEOUT".to_owned()]);
        // The host still applied the stalled update
        assert_eq!(report.host_states.len(), 3);
        assert!(report.log.iter().any(|e| e.message == "unmatched STATE_UPDATE_RESPONSE"));
    }

    #[tokio::test(start_paused = true)]
    async fn dropped_events_leave_no_session() {
        let config = DemoConfig { drop_events: true, turns: 2, ..DemoConfig::default() };
        let report = run(&config).await.expect("demo");

        assert!(report.session_id.is_none());
        assert_eq!(report.acknowledged, 0);
        assert_eq!(report.failures, vec!["NO_ACTIVE_SESSION".to_owned(); 2]);
        assert!(report.host_states.is_empty());
    }
}
