//! # Navigation
//!
//! This module provides high level navigation for the platform: the
//! [`path_planner::PathPlanner`] plans minimum cost paths through the cost
//! map towards a target pose.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

pub mod path_planner;

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

use super::{loc::Pose, path::Path, path::PathError};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A reduced pose on the map plane, as used by the navigation system.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct NavPose {
    /// Position on the map plane
    pub position_m: Vector2<f64>,

    /// Heading (angle to the +ve map x axis) in radians
    pub heading_rad: f64,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum NavError {
    #[error("{0} is outside the map: {1}")]
    PointOutsideMap(String, Vector2<f64>),

    #[error("Couldn't build the path fan: {0}")]
    CouldNotBuildFan(PathError),

    #[error("Path is empty")]
    EmptyPath,

    #[error("No traversable path to the target could be found")]
    NoPathToTarget,

    #[error("Best path doesn't reach the target, returning best fit")]
    BestPathNotAtTarget(Vec<Path>),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl NavPose {
    pub fn new(position_m: Vector2<f64>, heading_rad: f64) -> Self {
        Self {
            position_m,
            heading_rad,
        }
    }

    pub fn from_pose(pose: &Pose) -> Self {
        Self {
            position_m: pose.position2(),
            heading_rad: pose.get_heading(),
        }
    }

    /// Build the pose at the end of the given path, facing along its last segment.
    ///
    /// Returns `None` if the path has fewer than 2 points.
    pub fn from_path_last_point(path: &Path) -> Option<Self> {
        let num_points = path.get_num_points();
        if num_points < 2 {
            return None;
        }

        let last_segment = path.get_segment_to_target(num_points - 1)?;

        Some(Self {
            position_m: last_segment.target_m,
            heading_rad: last_segment.heading_rad,
        })
    }

    /// Convert back into a full [`Pose`] on the map plane.
    pub fn to_pose(&self) -> Pose {
        Pose::from_heading(self.position_m.x, self.position_m.y, self.heading_rad)
    }

    /// Unit vector pointing in the pose's forward direction.
    pub fn forward(&self) -> Vector2<f64> {
        Vector2::new(self.heading_rad.cos(), self.heading_rad.sin())
    }
}
