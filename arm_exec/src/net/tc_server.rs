//! Telecommand server

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::{info, warn};
use std::sync::{Arc, PoisonError};
use std::thread::{self, JoinHandle};

use comms_if::{
    net::{zmq, MonitoredSocket, SocketOptions},
    tc::{Tc, TcResponse},
};

use super::{NetError, RECV_TIMEOUT_MS};
use crate::ik_ctrl::StatusHandle;
use crate::shared_state::SharedControlState;
use crate::trigger::StartTrigger;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Answers telecommands on a background thread until shutdown.
pub struct TcServer {
    join_handle: JoinHandle<()>,
}

/// Everything a telecommand can act on.
#[derive(Clone)]
pub struct TcTargets {
    pub shared: Arc<SharedControlState>,
    pub trigger: Arc<StartTrigger>,
    pub status: StatusHandle,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl TcServer {
    pub fn start(ctx: &zmq::Context, endpoint: &str, targets: TcTargets) -> Result<Self, NetError> {
        let socket_options = SocketOptions {
            bind: true,
            linger: 0,
            recv_timeout: RECV_TIMEOUT_MS,
            send_timeout: 100,
            ..Default::default()
        };

        let socket = MonitoredSocket::new(ctx, zmq::REP, socket_options, endpoint)?;

        info!("Serving telecommands on {}", endpoint);

        let join_handle = thread::Builder::new()
            .name("tc_server".into())
            .spawn(move || serve(socket, &targets))
            .map_err(|e| NetError::ThreadError("telecommand server", e))?;

        Ok(Self { join_handle })
    }

    pub fn join(self) {
        self.join_handle.join().ok();
    }
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Execute a telecommand and build its response.
pub fn handle_tc(tc: &Tc, targets: &TcTargets) -> TcResponse {
    match tc {
        Tc::StartTrajectory => {
            if targets.trigger.fire() {
                info!("Start trigger received by telecommand");
                TcResponse::Ok
            } else {
                let state = targets
                    .status
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .state;
                warn!("Cannot start the trajectory in state {}", state.as_str());
                TcResponse::CannotExecute
            }
        }
        Tc::Status => TcResponse::Status(
            targets
                .status
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .to_tm(&targets.shared),
        ),
        Tc::Shutdown => {
            info!("Shutdown requested by telecommand");
            targets.shared.request_shutdown();
            TcResponse::Ok
        }
    }
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

fn serve(socket: MonitoredSocket, targets: &TcTargets) {
    while !targets.shared.is_shutdown() {
        let response = match socket.recv_string(0) {
            Ok(Ok(s)) => match Tc::from_json(&s) {
                Ok(tc) => handle_tc(&tc, targets),
                Err(e) => {
                    warn!("{}", e);
                    TcResponse::Invalid
                }
            },
            Ok(Err(_)) => {
                warn!("{}", NetError::NonUtf8Message);
                TcResponse::Invalid
            }
            Err(zmq::Error::EAGAIN) => continue,
            Err(e) => {
                warn!("{}", NetError::RecvError(e));
                continue;
            }
        };

        // A REP socket must answer every request before it can receive the next one
        let sent = serde_json::to_string(&response)
            .map_err(|e| e.to_string())
            .and_then(|r| socket.send(r.as_bytes(), 0).map_err(|e| e.to_string()));

        if let Err(e) = sent {
            warn!("Could not send the telecommand response: {}", e);
        }
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::ik_ctrl::{IkCtrlState, StatusReport};
    use std::sync::Mutex;

    fn targets() -> TcTargets {
        TcTargets {
            shared: Arc::new(SharedControlState::new(7)),
            trigger: Arc::new(StartTrigger::new()),
            status: Arc::new(Mutex::new(StatusReport::default())),
        }
    }

    #[test]
    fn test_start_before_gate() {
        let t = targets();

        assert_eq!(handle_tc(&Tc::StartTrajectory, &t), TcResponse::CannotExecute);
        assert!(!t.trigger.is_fired());
    }

    #[test]
    fn test_start_at_gate() {
        let t = targets();
        t.status.lock().unwrap().state = IkCtrlState::WaitForTrigger;
        t.trigger.arm();

        assert_eq!(handle_tc(&Tc::StartTrajectory, &t), TcResponse::Ok);
        assert!(t.trigger.is_fired());

        // A second start has nothing to release
        assert_eq!(handle_tc(&Tc::StartTrajectory, &t), TcResponse::CannotExecute);
    }

    #[test]
    fn test_status_and_shutdown() {
        let t = targets();

        match handle_tc(&Tc::Status, &t) {
            TcResponse::Status(tm) => {
                assert_eq!(tm.state, "WaitForPose");
                assert!(!tm.tracking_active);
            }
            other => panic!("Expected a status response, got {:?}", other),
        }

        assert_eq!(handle_tc(&Tc::Shutdown, &t), TcResponse::Ok);
        assert!(t.shared.is_shutdown());
    }
}
