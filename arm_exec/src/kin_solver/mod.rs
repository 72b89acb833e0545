//! # Kinematic solver
//!
//! Forward kinematics, velocity inverse kinematics and iterative position inverse kinematics on
//! a [`Chain`].
//!
//! The position solver is a Newton-Raphson iteration: at every step the Cartesian error between
//! the current and target poses is expressed as a twist in the base frame, mapped into a joint
//! correction through the pseudo-inverse of the geometric Jacobian, and added to the joint
//! estimate. It stops when the norm of the twist falls below the tolerance, or fails after the
//! maximum number of iterations.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod params;
mod twist;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::trace;
use nalgebra::{DMatrix, DVector};

use crate::kin_model::{CartesianPose, Chain, JointConfiguration, JointKind};

pub use params::*;
pub use twist::*;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Kinematic solver for a single chain.
///
/// The solver holds no state between calls, so it can be shared between the control loops.
#[derive(Debug, Clone)]
pub struct KinematicSolver {
    chain: Chain,
    params: SolverParams,
}

/// A converged position inverse kinematics solution.
#[derive(Debug, Clone, PartialEq)]
pub struct IkSolution {
    pub configuration: JointConfiguration,

    /// Number of corrections applied before convergence.
    pub iterations: u32,

    /// Norm of the final Cartesian error twist.
    pub residual: f64,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SolverError {
    /// The iteration limit was reached before the error fell below the tolerance.
    ///
    /// `partial` is the last joint estimate, which callers may still use.
    #[error(
        "Inverse kinematics did not converge after {iterations} iterations \
        (residual {residual:.3e})"
    )]
    NoConvergence {
        partial: JointConfiguration,
        iterations: u32,
        residual: f64,
    },

    #[error("Expected a configuration of {expected} joints but got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Could not compute the Jacobian pseudo-inverse: {0}")]
    PseudoInverse(String),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl KinematicSolver {
    pub fn new(chain: Chain, params: SolverParams) -> Self {
        Self { chain, params }
    }

    pub fn chain(&self) -> &Chain {
        &self.chain
    }

    pub fn params(&self) -> &SolverParams {
        &self.params
    }

    pub fn num_joints(&self) -> usize {
        self.chain.num_joints()
    }

    /// Pose of the tip frame for the given configuration.
    ///
    /// # Panics
    ///
    /// Panics if the configuration does not have one position per joint of the chain.
    pub fn forward(&self, q: &JointConfiguration) -> CartesianPose {
        CartesianPose::from_isometry(&self.chain.tip_transform(q.as_slice()))
    }

    /// Geometric Jacobian of the chain, 6 rows by one column per joint.
    ///
    /// The upper three rows map joint rates onto the linear velocity of the tip origin, the lower
    /// three onto the angular velocity of the tip, both in the base frame.
    pub fn jacobian(&self, q: &JointConfiguration) -> Result<DMatrix<f64>, SolverError> {
        self.check_dimension(q)?;

        let frames = self.chain.joint_frames(q.as_slice());
        let tip = frames.tip.translation.vector;
        let mut jac = DMatrix::zeros(6, self.num_joints());

        for (i, joint) in self.chain.joints().iter().enumerate() {
            let axis = frames.axes[i];

            match joint.kind {
                JointKind::Revolute => {
                    let lin = axis.cross(&(tip - frames.origins[i]));
                    for r in 0..3 {
                        jac[(r, i)] = lin[r];
                        jac[(r + 3, i)] = axis[r];
                    }
                }
                JointKind::Prismatic => {
                    for r in 0..3 {
                        jac[(r, i)] = axis[r];
                    }
                }
            }
        }

        Ok(jac)
    }

    /// Joint rates producing the given tip twist at configuration `q`.
    ///
    /// Singular values of the Jacobian below the pseudo-inverse threshold are discarded, so the
    /// result is the least squares, minimum norm solution near singularities.
    pub fn inverse_velocity(
        &self,
        q: &JointConfiguration,
        twist: &Twist,
    ) -> Result<DVector<f64>, SolverError> {
        let jac = self.jacobian(q)?;

        let jac_pinv = jac
            .pseudo_inverse(self.params.pinv_eps)
            .map_err(|e| SolverError::PseudoInverse(e.to_string()))?;

        Ok(jac_pinv * twist.to_vector())
    }

    /// Joint configuration placing the tip at `target`, starting the search from `seed`.
    pub fn inverse_position(
        &self,
        seed: &JointConfiguration,
        target: &CartesianPose,
    ) -> Result<IkSolution, SolverError> {
        self.check_dimension(seed)?;

        let mut q = seed.clone();

        for iteration in 0..self.params.max_iterations {
            let error = Twist::between(&self.forward(&q), target);
            let residual = error.norm();

            if residual < self.params.tolerance {
                return Ok(IkSolution {
                    configuration: q,
                    iterations: iteration,
                    residual,
                });
            }

            let correction = self.inverse_velocity(&q, &error)?;

            // A non-finite correction would poison every later estimate
            if correction.iter().any(|dq| !dq.is_finite()) {
                return Err(SolverError::NoConvergence {
                    partial: q,
                    iterations: iteration,
                    residual,
                });
            }

            q.add_correction(&correction);

            trace!("IK iteration {}: residual {:.3e}", iteration, residual);
        }

        let residual = Twist::between(&self.forward(&q), target).norm();

        if residual < self.params.tolerance {
            Ok(IkSolution {
                configuration: q,
                iterations: self.params.max_iterations,
                residual,
            })
        } else {
            Err(SolverError::NoConvergence {
                partial: q,
                iterations: self.params.max_iterations,
                residual,
            })
        }
    }

    fn check_dimension(&self, q: &JointConfiguration) -> Result<(), SolverError> {
        if q.len() != self.num_joints() {
            return Err(SolverError::DimensionMismatch {
                expected: self.num_joints(),
                actual: q.len(),
            });
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
