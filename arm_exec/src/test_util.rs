//! Fixtures shared by the unit tests

use crate::kin_model::{Chain, RobotDescription};
use crate::kin_solver::{KinematicSolver, SolverParams};

pub const IIWA_DESCRIPTION: &str = include_str!("../../params/lbr_iiwa.toml");

pub fn iiwa_chain() -> Chain {
    let desc = RobotDescription::from_toml_str(IIWA_DESCRIPTION).unwrap();
    Chain::build(&desc, "lbr_iiwa_link_0", "lbr_iiwa_link_7").unwrap()
}

pub fn iiwa_solver() -> KinematicSolver {
    KinematicSolver::new(iiwa_chain(), SolverParams::default())
}
