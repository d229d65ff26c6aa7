//! # Trajectory control module
//!
//! Trajectory control is responsible for keeping the platform on the target
//! path. It does this using a pair of PID controllers operating on the lateral
//! error and heading error respectively.
//!
//! The path itself is made up of a number of points on the XY plane of the map
//! frame, joined in sequence. A path segment is defined as the line connecting
//! two neighbouring points.
//!
//! The lateral error is the distance between the platform's current location
//! and the path segment, i.e. how far off the segment we are. The heading
//! error is the difference between the platform's heading and the heading of
//! the segment. The controllers attempt to minimise these errors by outputting
//! crab and curvature demands which are saturated to their limits. Speed
//! demands are calculated from the curvature demand, the tighter the turn, the
//! slower the desired speed.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

pub mod controllers;
pub mod params;
pub mod state;

// ---------------------------------------------------------------------------
// EXPORTS
// ---------------------------------------------------------------------------

pub use controllers::*;
pub use params::TrajCtrlParams;
pub use state::*;
