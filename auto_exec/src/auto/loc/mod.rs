//! # Localisation module
//!
//! This module provides the platform's pose estimate. The real localisation
//! pipeline is not part of this executable, so the pose either comes from an
//! external setter or from the dead-reckoned [`fake::FakeLoc`] source used in
//! development and testing.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

pub mod fake;

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use nalgebra::{UnitQuaternion, Vector2, Vector3};
use serde::{Deserialize, Serialize};

use self::fake::FakeLoc;

// ------------------------------------------------------------------------------------------------
// DATA STRUCTURES
// ------------------------------------------------------------------------------------------------

/// The current pose (position and attitude in the map frame) of the platform.
#[derive(Debug, Copy, Clone, Serialize, Deserialize, Default)]
pub struct Pose {
    /// The position in the map frame
    pub position_m: Vector3<f64>,

    /// The attitude of the platform in the map frame. This is a quaternion that will rotate an
    /// object from the map frame into the body frame.
    pub attitude_q: UnitQuaternion<f64>,
}

/// Provides an interface for the localisation system of the platform.
#[derive(Debug, Clone)]
pub struct LocMgr {
    source: LocSource,

    pose: Option<Pose>,

    fake: Option<FakeLoc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LocMgrParams {
    pub source: LocSource,

    /// Initial position in the map frame, used by the fake source.
    pub initial_position_m: [f64; 2],

    /// Initial heading in radians, used by the fake source.
    pub initial_heading_rad: f64,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Copy, Clone, Deserialize)]
pub enum LocSource {
    /// Pose is provided externally via [`LocMgr::set_pose`]
    OnSet,

    /// Pose is dead-reckoned from the commanded manoeuvres
    Fake,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Pose {
    pub fn new(position_m: Vector3<f64>, attitude_q: UnitQuaternion<f64>) -> Self {
        Self {
            position_m,
            attitude_q,
        }
    }

    /// Build a pose from a 2D position and heading.
    pub fn from_heading(x_m: f64, y_m: f64, heading_rad: f64) -> Self {
        Self {
            position_m: Vector3::new(x_m, y_m, 0.0),
            attitude_q: UnitQuaternion::from_euler_angles(0.0, 0.0, heading_rad),
        }
    }

    /// Return the heading (angle to the positive map x axis) of the platform in radians.
    pub fn get_heading(&self) -> f64 {
        self.attitude_q.euler_angles().2
    }

    /// The 2D position of the platform on the map plane.
    pub fn position2(&self) -> Vector2<f64> {
        Vector2::new(self.position_m.x, self.position_m.y)
    }

    /// Unit vector pointing in the platform's forward direction on the map plane.
    pub fn forward2(&self) -> Vector2<f64> {
        let heading = self.get_heading();
        Vector2::new(heading.cos(), heading.sin())
    }
}

impl LocMgr {
    pub fn new(params: &LocMgrParams) -> Self {
        let fake = match params.source {
            LocSource::Fake => Some(FakeLoc::new(Pose::from_heading(
                params.initial_position_m[0],
                params.initial_position_m[1],
                params.initial_heading_rad,
            ))),
            _ => None,
        };

        Self {
            source: params.source,
            pose: None,
            fake,
        }
    }

    pub fn set_pose(&mut self, pose: Pose) {
        self.pose = Some(pose);
    }

    pub fn get_pose(&self) -> Option<Pose> {
        match self.source {
            LocSource::OnSet => self.pose,
            LocSource::Fake => self.fake.as_ref().map(|f| f.pose()),
        }
    }

    /// Propagate the fake source by the given manoeuvre over the given time step.
    ///
    /// Has no effect for other sources.
    pub fn propagate(&mut self, cmd: &nav_if::tc::mnvr::MnvrCmd, dt_s: f64) {
        if let Some(ref mut fake) = self.fake {
            fake.propagate(cmd, dt_s);
        }
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_pose_heading() {
        let pose = Pose::from_heading(1.0, 2.0, std::f64::consts::FRAC_PI_2);

        assert!((pose.get_heading() - std::f64::consts::FRAC_PI_2).abs() < 1e-9);
        assert!(pose.forward2().x.abs() < 1e-9);
        assert!((pose.forward2().y - 1.0).abs() < 1e-9);
    }
}
