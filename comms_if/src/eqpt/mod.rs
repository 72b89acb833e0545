//! # Equipment Interface
//!
//! This module defines the interface structures which are exchanged with the robot's joint
//! controllers and any pose consumer.

// -----------------------------------------------------------------------------------------------
// MODULES
// -----------------------------------------------------------------------------------------------

pub mod arm;
