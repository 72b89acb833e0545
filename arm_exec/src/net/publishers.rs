//! Pose and joint command publishers

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::info;

use comms_if::{
    eqpt::arm::joint_command_topic,
    net::{zmq, MonitoredSocket, SocketOptions},
};

use super::NetError;
use crate::io::{CommandSink, OutputError, PoseSink};
use crate::kin_model::{CartesianPose, JointConfiguration};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Publishes the end-effector pose as an `EefPose` message.
pub struct PosePublisher {
    socket: MonitoredSocket,
}

/// Publishes each joint's command as a two part message, the joint's topic followed by a
/// `JointCommand`, so every joint controller can subscribe to its own channel.
pub struct CommandPublisher {
    socket: MonitoredSocket,
    topics: Vec<String>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl PosePublisher {
    pub fn new(ctx: &zmq::Context, endpoint: &str) -> Result<Self, NetError> {
        let socket = MonitoredSocket::new(ctx, zmq::PUB, publisher_options(), endpoint)?;

        info!("Publishing the end-effector pose on {}", endpoint);

        Ok(Self { socket })
    }
}

impl PoseSink for PosePublisher {
    fn publish_pose(&mut self, pose: &CartesianPose) -> Result<(), OutputError> {
        let msg = serde_json::to_string(&pose.to_msg())
            .map_err(|e| OutputError::SerialiseError("pose", e))?;

        self.socket
            .send(msg.as_bytes(), 0)
            .map_err(|e| OutputError::SendError("pose", e.to_string()))
    }
}

impl CommandPublisher {
    pub fn new(ctx: &zmq::Context, endpoint: &str, num_joints: usize) -> Result<Self, NetError> {
        let socket = MonitoredSocket::new(ctx, zmq::PUB, publisher_options(), endpoint)?;

        let topics = (0..num_joints).map(joint_command_topic).collect::<Vec<_>>();

        info!("Publishing joint commands on {} to {:?}", endpoint, topics);

        Ok(Self { socket, topics })
    }
}

impl CommandSink for CommandPublisher {
    fn send_commands(&mut self, cmd: &JointConfiguration) -> Result<(), OutputError> {
        for (topic, joint_cmd) in self.topics.iter().zip(cmd.to_commands()) {
            let msg = serde_json::to_string(&joint_cmd)
                .map_err(|e| OutputError::SerialiseError("joint command", e))?;

            self.socket
                .send_multipart(vec![topic.as_bytes(), msg.as_bytes()], 0)
                .map_err(|e| OutputError::SendError("joint command", e.to_string()))?;
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

fn publisher_options() -> SocketOptions {
    SocketOptions {
        bind: true,
        linger: 0,
        send_timeout: 10,
        send_hwm: 100,
        ..Default::default()
    }
}
