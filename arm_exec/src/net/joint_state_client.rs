//! Joint state subscriber

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::{debug, info, warn};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use comms_if::{
    eqpt::arm::JointState,
    net::{zmq, MonitoredSocket, SocketOptions},
};

use super::{NetError, RECV_TIMEOUT_MS};
use crate::kin_model::{JointConfiguration, MeasurementError};
use crate::shared_state::SharedControlState;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Receives joint states on a background thread until shutdown.
pub struct JointStateClient {
    join_handle: JoinHandle<()>,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("Could not parse the joint state: {0}")]
    ParseError(#[from] serde_json::Error),

    #[error("Invalid joint state: {0}")]
    InvalidMeasurement(#[from] MeasurementError),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl JointStateClient {
    /// Connect to the joint state source and start receiving.
    pub fn start(
        ctx: &zmq::Context,
        endpoint: &str,
        shared: Arc<SharedControlState>,
    ) -> Result<Self, NetError> {
        let socket_options = SocketOptions {
            connect_timeout: 1000,
            heartbeat_ivl: 500,
            heartbeat_ttl: 1000,
            heartbeat_timeout: 1000,
            linger: 0,
            recv_timeout: RECV_TIMEOUT_MS,
            ..Default::default()
        };

        let socket = MonitoredSocket::new(ctx, zmq::SUB, socket_options, endpoint)?;

        info!("Subscribed to joint states on {}", endpoint);

        let join_handle = thread::Builder::new()
            .name("joint_state_client".into())
            .spawn(move || receive(socket, &shared))
            .map_err(|e| NetError::ThreadError("joint state client", e))?;

        Ok(Self { join_handle })
    }

    /// Wait for the receive thread to notice shutdown and stop.
    pub fn join(self) {
        self.join_handle.join().ok();
    }
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Parse a joint state message and store it as the latest measurement.
///
/// Only the first positions, one per joint of the chain, are used.
pub fn ingest(shared: &SharedControlState, msg: &str) -> Result<(), IngestError> {
    let js: JointState = serde_json::from_str(msg)?;

    let q = JointConfiguration::from_measurement(&js.position_rad, shared.num_joints())?;
    shared.set_measurement(q)?;

    Ok(())
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

fn receive(socket: MonitoredSocket, shared: &SharedControlState) {
    let mut num_rejected: u64 = 0;

    while !shared.is_shutdown() {
        let msg = match socket.recv_string(0) {
            Ok(Ok(s)) => s,
            Ok(Err(_)) => {
                warn!("{}", NetError::NonUtf8Message);
                continue;
            }
            Err(zmq::Error::EAGAIN) => continue,
            Err(e) => {
                warn!("{}", NetError::RecvError(e));
                continue;
            }
        };

        match ingest(shared, &msg) {
            Ok(()) => {
                if num_rejected > 0 {
                    debug!("Joint state accepted after {} rejected", num_rejected);
                    num_rejected = 0;
                }
            }
            Err(e) => {
                // Only warn on the first of a run of bad messages
                if num_rejected == 0 {
                    warn!("{}", e);
                }
                num_rejected += 1;
            }
        }
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_ingest() {
        let shared = SharedControlState::new(3);

        ingest(
            &shared,
            r#"{"name": ["a", "b", "c", "finger"], "position_rad": [0.1, 0.2, 0.3, 0.04]}"#,
        )
        .unwrap();

        assert_eq!(
            shared.get_measurement().unwrap().as_slice(),
            &[0.1, 0.2, 0.3]
        );
    }

    #[test]
    fn test_ingest_rejects() {
        let shared = SharedControlState::new(3);

        assert!(matches!(
            ingest(&shared, r#"{"position_rad": [0.1, 0.2]}"#),
            Err(IngestError::InvalidMeasurement(_))
        ));
        assert!(matches!(
            ingest(&shared, "not json"),
            Err(IngestError::ParseError(_))
        ));
        assert!(!shared.has_measurement());
    }
}
