//! # Map Manager
//!
//! This library provides the map document model and a filesystem map store.
//!
//! A map is a named document holding the metric description of an environment:
//! an occupancy grid raster, plus annotations layered on top of it - markers
//! (named poses), zones (typed polygons), nodes (waypoint graph vertices) and
//! routes (named node sequences). The store persists each map as a directory
//! containing the document as JSON and the occupancy grid as a PNG with a
//! thumbnail.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

pub mod documents;
pub mod grid;
pub mod store;

// ------------------------------------------------------------------------------------------------
// RE-EXPORTS
// ------------------------------------------------------------------------------------------------

pub use documents::{MapDoc, Marker, Node, Point, Pose, Quaternion, Route, Zone, ZoneType};
pub use grid::OccupancyGrid;
pub use store::MapStore;
