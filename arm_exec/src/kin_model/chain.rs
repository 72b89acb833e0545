//! Serial chain extracted from a robot description

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::debug;
use nalgebra::{Isometry3, Translation3, Unit, UnitQuaternion, Vector3};
use std::collections::HashMap;

use super::{JointType, ModelLoadError, Origin, RobotDescription};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Ordered movable joints from the base frame to the tip frame.
#[derive(Debug, Clone)]
pub struct Chain {
    base_frame: String,
    tip_frame: String,
    joints: Vec<ChainJoint>,

    /// Fixed transform from the last movable joint to the tip frame.
    tip_offset: Isometry3<f64>,
}

/// A single movable joint of the chain.
#[derive(Debug, Clone)]
pub struct ChainJoint {
    pub name: String,

    /// Transform from the previous joint's moving frame to this joint's frame, including any
    /// fixed joints between them.
    pub origin: Isometry3<f64>,

    /// Axis of motion in this joint's frame.
    pub axis: Unit<Vector3<f64>>,

    pub kind: JointKind,

    pub limits: Option<(f64, f64)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JointKind {
    Revolute,
    Prismatic,
}

/// Position and axis of every joint, plus the tip position, for one configuration.
///
/// Frame: Base
#[derive(Debug, Clone)]
pub struct JointFrames {
    pub origins: Vec<Vector3<f64>>,
    pub axes: Vec<Vector3<f64>>,
    pub tip: Isometry3<f64>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Chain {
    /// Extract the chain between `base_frame` and `tip_frame` from the description.
    pub fn build(
        desc: &RobotDescription,
        base_frame: &str,
        tip_frame: &str,
    ) -> Result<Self, ModelLoadError> {
        for frame in &[base_frame, tip_frame] {
            if !desc.has_link(frame) {
                return Err(ModelLoadError::UnknownFrame(frame.to_string()));
            }
        }

        // Map every child link to the joint which connects it to its parent
        let mut parent_joint = HashMap::new();

        for joint in desc.joints.iter() {
            for link in &[&joint.parent, &joint.child] {
                if !desc.has_link(link) {
                    return Err(ModelLoadError::UnknownLink {
                        joint: joint.name.clone(),
                        link: link.to_string(),
                    });
                }
            }

            if parent_joint.insert(joint.child.as_str(), joint).is_some() {
                return Err(ModelLoadError::MultipleParents(joint.child.clone()));
            }
        }

        // Walk up from the tip to the base. Any walk longer than the number of joints has gone
        // round a loop.
        let not_connected = || ModelLoadError::NotConnected {
            base: base_frame.to_string(),
            tip: tip_frame.to_string(),
        };

        let mut path = Vec::new();
        let mut link = tip_frame;

        while link != base_frame {
            let joint = parent_joint.get(link).ok_or_else(not_connected)?;
            path.push(*joint);
            link = joint.parent.as_str();

            if path.len() > desc.joints.len() {
                return Err(not_connected());
            }
        }

        path.reverse();

        // Fold fixed joints into the origin of the next movable joint, or into the tip offset
        let mut joints = Vec::new();
        let mut accumulated = Isometry3::identity();

        for joint in path {
            let origin = origin_to_isometry(&joint.origin);

            if !joint.joint_type.is_movable() {
                accumulated *= origin;
                continue;
            }

            let axis = Vector3::from(joint.axis);
            if axis.norm() < f64::EPSILON {
                return Err(ModelLoadError::InvalidAxis(joint.name.clone()));
            }

            let kind = match joint.joint_type {
                JointType::Prismatic => JointKind::Prismatic,
                _ => JointKind::Revolute,
            };

            let limits = match joint.joint_type {
                JointType::Continuous => None,
                _ => joint.limit.map(|l| (l.lower, l.upper)),
            };

            joints.push(ChainJoint {
                name: joint.name.clone(),
                origin: accumulated * origin,
                axis: Unit::new_normalize(axis),
                kind,
                limits,
            });

            accumulated = Isometry3::identity();
        }

        if joints.is_empty() {
            return Err(ModelLoadError::NoMovableJoints {
                base: base_frame.to_string(),
                tip: tip_frame.to_string(),
            });
        }

        debug!(
            "Built chain {} -> {} with joints {:?}",
            base_frame,
            tip_frame,
            joints.iter().map(|j| j.name.as_str()).collect::<Vec<_>>()
        );

        Ok(Self {
            base_frame: base_frame.to_string(),
            tip_frame: tip_frame.to_string(),
            joints,
            tip_offset: accumulated,
        })
    }

    /// Number of movable joints, the dimension of every configuration of this chain.
    pub fn num_joints(&self) -> usize {
        self.joints.len()
    }

    pub fn joints(&self) -> &[ChainJoint] {
        &self.joints
    }

    pub fn joint_names(&self) -> Vec<&str> {
        self.joints.iter().map(|j| j.name.as_str()).collect()
    }

    pub fn base_frame(&self) -> &str {
        &self.base_frame
    }

    pub fn tip_frame(&self) -> &str {
        &self.tip_frame
    }

    pub fn tip_offset(&self) -> &Isometry3<f64> {
        &self.tip_offset
    }

    /// Pose of the tip frame in the base frame.
    ///
    /// # Panics
    ///
    /// Panics if `q.len() != self.num_joints()`.
    pub fn tip_transform(&self, q: &[f64]) -> Isometry3<f64> {
        assert_eq!(q.len(), self.num_joints(), "configuration does not match chain");

        let mut transform = Isometry3::identity();
        for (joint, &position) in self.joints.iter().zip(q.iter()) {
            transform *= joint.origin;
            transform *= joint.motion(position);
        }

        transform * self.tip_offset
    }

    /// Origins and axes of every joint and the tip pose, all in the base frame.
    ///
    /// # Panics
    ///
    /// Panics if `q.len() != self.num_joints()`.
    pub fn joint_frames(&self, q: &[f64]) -> JointFrames {
        assert_eq!(q.len(), self.num_joints(), "configuration does not match chain");

        let mut transform = Isometry3::identity();
        let mut origins = Vec::with_capacity(self.num_joints());
        let mut axes = Vec::with_capacity(self.num_joints());

        for (joint, &position) in self.joints.iter().zip(q.iter()) {
            transform *= joint.origin;

            // Axis is fixed in the joint frame, so record it before the joint moves
            origins.push(transform.translation.vector);
            axes.push(transform.rotation * joint.axis.into_inner());

            transform *= joint.motion(position);
        }

        JointFrames {
            origins,
            axes,
            tip: transform * self.tip_offset,
        }
    }
}

impl ChainJoint {
    /// Transform produced by moving this joint to `position`.
    fn motion(&self, position: f64) -> Isometry3<f64> {
        match self.kind {
            JointKind::Revolute => Isometry3::from_parts(
                Translation3::identity(),
                UnitQuaternion::from_axis_angle(&self.axis, position),
            ),
            JointKind::Prismatic => Isometry3::from_parts(
                Translation3::from(self.axis.into_inner() * position),
                UnitQuaternion::identity(),
            ),
        }
    }
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

/// Roll, pitch and yaw about the fixed x, y, z axes, then translate.
fn origin_to_isometry(origin: &Origin) -> Isometry3<f64> {
    Isometry3::from_parts(
        Translation3::new(origin.xyz[0], origin.xyz[1], origin.xyz[2]),
        UnitQuaternion::from_euler_angles(origin.rpy[0], origin.rpy[1], origin.rpy[2]),
    )
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::test_util;
    use std::f64::consts::FRAC_PI_2;

    /// Planar two link arm with a fixed flange between the last joint and the tool.
    const TWO_LINK: &str = r#"
        [[links]]
        name = "base"
        [[links]]
        name = "upper"
        [[links]]
        name = "fore"
        [[links]]
        name = "flange"
        [[links]]
        name = "tool"

        [[joints]]
        name = "shoulder"
        type = "revolute"
        parent = "base"
        child = "upper"
        origin = { xyz = [0.0, 0.0, 0.1] }
        axis = [0.0, 0.0, 1.0]
        limit = { lower = -3.0, upper = 3.0 }

        [[joints]]
        name = "elbow"
        type = "continuous"
        parent = "upper"
        child = "fore"
        origin = { xyz = [0.5, 0.0, 0.0] }
        axis = [0.0, 0.0, 2.0]

        [[joints]]
        name = "flange_mount"
        type = "fixed"
        parent = "fore"
        child = "flange"
        origin = { xyz = [0.3, 0.0, 0.0] }

        [[joints]]
        name = "tool_mount"
        type = "fixed"
        parent = "flange"
        child = "tool"
        origin = { xyz = [0.1, 0.0, 0.0] }
    "#;

    fn two_link() -> Chain {
        let desc = RobotDescription::from_toml_str(TWO_LINK).unwrap();
        Chain::build(&desc, "base", "tool").unwrap()
    }

    #[test]
    fn test_fixed_joints_folded() {
        let chain = two_link();

        assert_eq!(chain.num_joints(), 2);
        assert_eq!(chain.joint_names(), vec!["shoulder", "elbow"]);
        assert!((chain.tip_offset().translation.vector.x - 0.4).abs() < 1e-12);
        assert_eq!(chain.joints()[0].limits, Some((-3.0, 3.0)));
        assert_eq!(chain.joints()[1].limits, None);
        assert!((chain.joints()[1].axis.norm() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_tip_transform_planar() {
        let chain = two_link();

        let zero = chain.tip_transform(&[0.0, 0.0]);
        assert!((zero.translation.vector - Vector3::new(0.9, 0.0, 0.1)).norm() < 1e-12);

        // Shoulder up by 90 degrees, elbow back by 90 degrees
        let bent = chain.tip_transform(&[FRAC_PI_2, -FRAC_PI_2]);
        assert!((bent.translation.vector - Vector3::new(0.4, 0.5, 0.1)).norm() < 1e-12);
        assert!(bent.rotation.angle() < 1e-12);
    }

    #[test]
    fn test_sub_chain() {
        let desc = RobotDescription::from_toml_str(TWO_LINK).unwrap();
        let chain = Chain::build(&desc, "upper", "flange").unwrap();

        assert_eq!(chain.joint_names(), vec!["elbow"]);
        assert_eq!(chain.base_frame(), "upper");
        assert_eq!(chain.tip_frame(), "flange");
    }

    #[test]
    fn test_build_errors() {
        let desc = RobotDescription::from_toml_str(TWO_LINK).unwrap();

        assert!(matches!(
            Chain::build(&desc, "world", "tool"),
            Err(ModelLoadError::UnknownFrame(f)) if f == "world"
        ));

        // Tip is an ancestor of the base
        assert!(matches!(
            Chain::build(&desc, "fore", "upper"),
            Err(ModelLoadError::NotConnected { .. })
        ));

        // Only fixed joints between the two frames
        assert!(matches!(
            Chain::build(&desc, "fore", "tool"),
            Err(ModelLoadError::NoMovableJoints { .. })
        ));

        // Same frame for base and tip
        assert!(matches!(
            Chain::build(&desc, "base", "base"),
            Err(ModelLoadError::NoMovableJoints { .. })
        ));
    }

    #[test]
    fn test_invalid_trees() {
        let two_parents = r#"
            [[links]]
            name = "a"
            [[links]]
            name = "b"
            [[links]]
            name = "c"
            [[joints]]
            name = "j1"
            type = "revolute"
            parent = "a"
            child = "c"
            [[joints]]
            name = "j2"
            type = "revolute"
            parent = "b"
            child = "c"
        "#;
        let desc = RobotDescription::from_toml_str(two_parents).unwrap();
        assert!(matches!(
            Chain::build(&desc, "a", "c"),
            Err(ModelLoadError::MultipleParents(l)) if l == "c"
        ));

        let unknown_link = r#"
            [[links]]
            name = "a"
            [[joints]]
            name = "j1"
            type = "revolute"
            parent = "a"
            child = "ghost"
        "#;
        let desc = RobotDescription::from_toml_str(unknown_link).unwrap();
        assert!(matches!(
            Chain::build(&desc, "a", "a"),
            Err(ModelLoadError::UnknownLink { .. })
        ));

        let zero_axis = r#"
            [[links]]
            name = "a"
            [[links]]
            name = "b"
            [[joints]]
            name = "j1"
            type = "revolute"
            parent = "a"
            child = "b"
            axis = [0.0, 0.0, 0.0]
        "#;
        let desc = RobotDescription::from_toml_str(zero_axis).unwrap();
        assert!(matches!(
            Chain::build(&desc, "a", "b"),
            Err(ModelLoadError::InvalidAxis(j)) if j == "j1"
        ));
    }

    #[test]
    fn test_iiwa_chain() {
        let chain = test_util::iiwa_chain();

        assert_eq!(chain.num_joints(), 7);
        assert_eq!(chain.joint_names()[0], "lbr_iiwa_joint_1");
        assert_eq!(chain.joint_names()[6], "lbr_iiwa_joint_7");

        // Straight up at zero, link offsets sum to the total height
        let tip = chain.tip_transform(&[0.0; 7]);
        let height = 0.1575 + 0.2025 + 0.2045 + 0.2155 + 0.1845 + 0.2155 + 0.081;
        assert!(tip.translation.vector.x.abs() < 1e-4);
        assert!(tip.translation.vector.y.abs() < 1e-4);
        assert!((tip.translation.vector.z - height).abs() < 1e-4);
    }
}
