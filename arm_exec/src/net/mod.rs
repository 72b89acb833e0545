//! # Network adapters
//!
//! ZMQ realisations of the control loop inputs and outputs:
//!
//! - [`JointStateClient`] subscribes to joint state measurements and stores them in the shared
//!   state.
//! - [`PosePublisher`] publishes the end-effector pose.
//! - [`CommandPublisher`] publishes one position command per joint, each on its own topic.
//! - [`TcServer`] answers telecommands from the operator console.
//!
//! All messages are JSON strings.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod joint_state_client;
mod publishers;
mod tc_server;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use comms_if::net::{zmq, MonitoredSocketError};

pub use joint_state_client::*;
pub use publishers::*;
pub use tc_server::*;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Receive timeout of the background sockets, bounding how long they take to notice shutdown.
const RECV_TIMEOUT_MS: i32 = 100;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum NetError {
    #[error("Socket error: {0}")]
    SocketError(#[from] MonitoredSocketError),

    #[error("Could not receive a message: {0}")]
    RecvError(zmq::Error),

    #[error("Could not send a message: {0}")]
    SendError(zmq::Error),

    #[error("Received a message which was not valid UTF-8")]
    NonUtf8Message,

    #[error("Could not start the {0} thread: {1}")]
    ThreadError(&'static str, std::io::Error),
}
