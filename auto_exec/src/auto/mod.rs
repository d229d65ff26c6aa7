//! # Autonomy module
//!
//! This module provides the drive autonomy of the executable: localisation,
//! cost mapping, path representation and planning, trajectory control, and the
//! [`DriveMgr`] state machine which ties them together.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

pub mod drive_mgr;
pub mod loc;
pub mod map;
pub mod nav;
pub mod path;
pub mod traj_ctrl;

// ------------------------------------------------------------------------------------------------
// EXPORTS
// ------------------------------------------------------------------------------------------------

pub use drive_mgr::{DriveMgr, DriveMgrError, DriveMgrOutput};
