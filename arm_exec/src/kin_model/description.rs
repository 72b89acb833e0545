//! Robot description file format
//!
//! A robot description is a TOML file listing the links of the robot and the joints connecting
//! them, in the same shape as a URDF tree:
//!
//! ```toml
//! [[links]]
//! name = "base"
//!
//! [[links]]
//! name = "upper_arm"
//!
//! [[joints]]
//! name = "shoulder"
//! type = "revolute"
//! parent = "base"
//! child = "upper_arm"
//! origin = { xyz = [0.0, 0.0, 0.1], rpy = [0.0, 0.0, 0.0] }
//! axis = [0.0, 0.0, 1.0]
//! limit = { lower = -3.0, upper = 3.0 }
//! ```

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Deserialize;
use std::path::Path;

use super::ModelLoadError;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The complete robot tree as read from a description file.
#[derive(Debug, Clone, Deserialize)]
pub struct RobotDescription {
    pub links: Vec<LinkDescription>,

    #[serde(default)]
    pub joints: Vec<JointDescription>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LinkDescription {
    pub name: String,
}

/// A joint connecting a parent link to a child link.
#[derive(Debug, Clone, Deserialize)]
pub struct JointDescription {
    pub name: String,

    #[serde(rename = "type")]
    pub joint_type: JointType,

    pub parent: String,

    pub child: String,

    /// Transform from the parent link frame to the joint frame.
    #[serde(default)]
    pub origin: Origin,

    /// Axis of motion in the joint frame. Does not need to be normalised.
    #[serde(default = "default_axis")]
    pub axis: [f64; 3],

    #[serde(default)]
    pub limit: Option<JointLimit>,
}

/// Origin of a joint relative to its parent link.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct Origin {
    /// Units: meters
    #[serde(default)]
    pub xyz: [f64; 3],

    /// Fixed axis roll, pitch, yaw.
    ///
    /// Units: radians
    #[serde(default)]
    pub rpy: [f64; 3],
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct JointLimit {
    pub lower: f64,
    pub upper: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JointType {
    Revolute,
    Continuous,
    Prismatic,
    Fixed,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl RobotDescription {
    /// Load a description from a file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ModelLoadError> {
        let desc_str = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ModelLoadError::FileError(path.as_ref().to_path_buf(), e))?;

        Self::from_toml_str(&desc_str)
    }

    /// Parse a description from a TOML string.
    pub fn from_toml_str(desc_str: &str) -> Result<Self, ModelLoadError> {
        toml::from_str(desc_str).map_err(|e| ModelLoadError::Malformed(e.to_string()))
    }

    pub fn has_link(&self, name: &str) -> bool {
        self.links.iter().any(|l| l.name == name)
    }
}

impl JointType {
    /// Whether the joint contributes a degree of freedom to the chain.
    pub fn is_movable(&self) -> bool {
        !matches!(self, JointType::Fixed)
    }
}

fn default_axis() -> [f64; 3] {
    [1.0, 0.0, 0.0]
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
