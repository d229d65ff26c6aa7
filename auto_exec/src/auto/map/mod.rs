//! # Map module
//!
//! Provides the layered [`GridMap`] and the [`CostMap`] built from a stored
//! map's occupancy grid and zones.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

pub mod cost_map;
pub mod grid_map;

// ------------------------------------------------------------------------------------------------
// EXPORTS
// ------------------------------------------------------------------------------------------------

pub use cost_map::{CostMap, CostMapData, CostMapError, CostMapLayer, CostMapParams};
pub use grid_map::{GridMap, GridMapError};
