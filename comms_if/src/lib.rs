//! # Communications interface crate.
//!
//! Provides all common communications interfaces for the arm control software.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Telecommands sent from the operator console to the arm executable
pub mod tc;

/// Message definitions for equipment (joint states, joint commands, poses)
pub mod eqpt;

/// Network module
pub mod net;
