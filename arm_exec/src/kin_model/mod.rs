//! # Kinematic model
//!
//! The kinematic model is an ordered chain of joints running from a base frame to a tip frame,
//! built from a robot description file. Fixed joints in the description are folded into their
//! neighbours so the chain only contains movable joints, and the number of movable joints
//! defines the dimension of every joint configuration used by the controller.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod chain;
mod description;
mod types;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

pub use chain::*;
pub use description::*;
pub use types::*;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Errors that can occur while loading a robot description and extracting a chain from it.
#[derive(Debug, thiserror::Error)]
pub enum ModelLoadError {
    #[error("Could not read the robot description file {0:?}: {1}")]
    FileError(std::path::PathBuf, std::io::Error),

    #[error("The robot description is malformed: {0}")]
    Malformed(String),

    #[error("Frame {0:?} is not a link in the robot description")]
    UnknownFrame(String),

    #[error("Joint {joint:?} references unknown link {link:?}")]
    UnknownLink { joint: String, link: String },

    #[error("Link {0:?} has more than one parent joint")]
    MultipleParents(String),

    #[error("Joint {0:?} has a zero length axis")]
    InvalidAxis(String),

    #[error("Tip frame {tip:?} is not a descendant of base frame {base:?}")]
    NotConnected { base: String, tip: String },

    #[error("The chain between {base:?} and {tip:?} has no movable joints")]
    NoMovableJoints { base: String, tip: String },
}

/// Errors that can occur when turning a joint state measurement into a configuration.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MeasurementError {
    #[error("Expected at least {expected} joint positions but the measurement contains {actual}")]
    TooFewJoints { expected: usize, actual: usize },

    #[error("Expected {expected} joint positions but got {actual}")]
    WrongLength { expected: usize, actual: usize },

    #[error("Joint position {index} is not finite ({value})")]
    NonFinite { index: usize, value: f64 },
}
