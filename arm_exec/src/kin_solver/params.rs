//! Parameters for the kinematic solver

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Deserialize;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters of the position inverse kinematics iteration.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct SolverParams {
    /// Maximum number of Newton-Raphson corrections before giving up.
    pub max_iterations: u32,

    /// Norm of the Cartesian error twist below which the solve has converged.
    ///
    /// Units: meters and radians, combined
    pub tolerance: f64,

    /// Singular values of the Jacobian below this threshold are ignored by the pseudo-inverse.
    pub pinv_eps: f64,
}

impl Default for SolverParams {
    fn default() -> Self {
        Self {
            max_iterations: 100,
            tolerance: 1e-6,
            pinv_eps: 1e-5,
        }
    }
}
