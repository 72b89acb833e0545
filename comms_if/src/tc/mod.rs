//! # Telecommand module
//!
//! This module provides telecommand functionality to the communications
//! interface. Telecommands are sent by the operator console to the arm
//! executable as JSON strings.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::{Deserialize, Serialize};
use structopt::StructOpt;
use thiserror::Error;

// Internal
use crate::eqpt::arm::ArmStatusTm;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// A telecommand, i.e. an instruction sent to the arm by the operator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, StructOpt)]
#[serde(tag = "type")]
pub enum Tc {
    /// Release the start gate and begin tracking the trajectory.
    ///
    /// Only has an effect once initial positioning has completed.
    #[structopt(name = "start")]
    StartTrajectory,

    /// Request the current arm control status.
    #[structopt(name = "status")]
    Status,

    /// Stop both control loops and exit the executable.
    #[structopt(name = "shutdown")]
    Shutdown,
}

/// Response to a telecommand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TcResponse {
    /// The TC was accepted
    Ok,

    /// The TC was accepted and the status is returned
    Status(ArmStatusTm),

    /// The TC was valid but cannot be executed right now
    CannotExecute,

    /// The TC could not be parsed
    Invalid,
}

/// Possible parsing errors.
#[derive(Debug, Error)]
pub enum TcParseError {
    #[error("TC contains invalid JSON: {0}")]
    InvalidJson(serde_json::Error),

    #[error("Could not parse TC from the command line: {0}")]
    InvalidCommand(String),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Tc {
    /// Parse a new TC from a JSON packet
    pub fn from_json(json_str: &str) -> Result<Self, TcParseError> {
        serde_json::from_str(json_str).map_err(TcParseError::InvalidJson)
    }

    /// Serialise the TC into a JSON packet
    pub fn to_json(&self) -> Result<String, TcParseError> {
        serde_json::to_string(self).map_err(TcParseError::InvalidJson)
    }

    /// Parse a TC from a command line, such as `start` or `status`.
    pub fn from_line(line: &str) -> Result<Self, TcParseError> {
        Self::from_iter_safe(std::iter::once("tc").chain(line.split_whitespace()))
            .map_err(|e| TcParseError::InvalidCommand(e.message))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_tc_json() {
        assert_eq!(
            Tc::from_json(r#"{"type": "StartTrajectory"}"#).unwrap(),
            Tc::StartTrajectory
        );
        assert_eq!(Tc::from_json(r#"{"type":"Shutdown"}"#).unwrap(), Tc::Shutdown);
        assert!(Tc::from_json(r#"{"type": "Dance"}"#).is_err());

        let json = Tc::Status.to_json().unwrap();
        assert_eq!(Tc::from_json(&json).unwrap(), Tc::Status);
    }

    #[test]
    fn test_tc_from_line() {
        assert_eq!(Tc::from_line("start").unwrap(), Tc::StartTrajectory);
        assert_eq!(Tc::from_line("  shutdown ").unwrap(), Tc::Shutdown);
        assert!(Tc::from_line("jump").is_err());
    }
}
