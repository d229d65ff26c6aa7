//! # Fake localisation source
//!
//! Dead-reckons the platform's pose from the commanded manoeuvres, assuming
//! they are executed perfectly. Used when no real localisation pipeline is
//! connected.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use nalgebra::{UnitQuaternion, Vector3};
use nav_if::tc::mnvr::MnvrCmd;

use super::Pose;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct FakeLoc {
    pose: Pose,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl FakeLoc {
    pub fn new(initial_pose: Pose) -> Self {
        Self { pose: initial_pose }
    }

    pub fn pose(&self) -> Pose {
        self.pose
    }

    /// Propagate the pose by the given manoeuvre over the given time step.
    pub fn propagate(&mut self, cmd: &MnvrCmd, dt_s: f64) {
        match *cmd {
            MnvrCmd::Ackerman {
                speed_ms,
                curv_m,
                crab_rad,
            } => {
                let dist_m = speed_ms * dt_s;
                let heading_rad = self.pose.get_heading();

                // Crab shifts the direction of travel without changing the heading
                let travel_rad = heading_rad + crab_rad;

                if curv_m.abs() <= f64::EPSILON {
                    // Straight line
                    self.pose.position_m += Vector3::new(
                        dist_m * travel_rad.cos(),
                        dist_m * travel_rad.sin(),
                        0.0,
                    );
                } else {
                    // Move in an arc about the centre of rotation, which is 1/curv away
                    // perpendicular to the direction of travel
                    let radius_m = 1.0 / curv_m;
                    let delta_rad = dist_m * curv_m;

                    let centre = self.pose.position_m
                        + Vector3::new(
                            -radius_m * travel_rad.sin(),
                            radius_m * travel_rad.cos(),
                            0.0,
                        );

                    let end_rad = travel_rad + delta_rad;
                    self.pose.position_m = centre
                        + Vector3::new(radius_m * end_rad.sin(), -radius_m * end_rad.cos(), 0.0);

                    self.pose.attitude_q =
                        UnitQuaternion::from_euler_angles(0.0, 0.0, heading_rad + delta_rad);
                }
            }
            MnvrCmd::PointTurn { rate_rads } => {
                self.pose.attitude_q = UnitQuaternion::from_euler_angles(
                    0.0,
                    0.0,
                    self.pose.get_heading() + rate_rads * dt_s,
                );
            }
            MnvrCmd::Stop => (),
        }
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use std::f64::consts::{FRAC_PI_2, PI};

    use super::*;

    #[test]
    fn test_straight_line() {
        let mut fake = FakeLoc::new(Pose::from_heading(0.0, 0.0, 0.0));

        fake.propagate(
            &MnvrCmd::Ackerman {
                speed_ms: 1.0,
                curv_m: 0.0,
                crab_rad: 0.0,
            },
            2.0,
        );

        let pose = fake.pose();
        assert!((pose.position_m.x - 2.0).abs() < 1e-9);
        assert!(pose.position_m.y.abs() < 1e-9);
    }

    #[test]
    fn test_arc_quarter_circle() {
        let mut fake = FakeLoc::new(Pose::from_heading(0.0, 0.0, 0.0));

        // Curvature 1 (radius 1 m), travel a quarter circle (pi/2 m)
        fake.propagate(
            &MnvrCmd::Ackerman {
                speed_ms: 1.0,
                curv_m: 1.0,
                crab_rad: 0.0,
            },
            FRAC_PI_2,
        );

        let pose = fake.pose();
        assert!((pose.position_m.x - 1.0).abs() < 1e-9);
        assert!((pose.position_m.y - 1.0).abs() < 1e-9);
        assert!((pose.get_heading() - FRAC_PI_2).abs() < 1e-9);
    }

    #[test]
    fn test_point_turn() {
        let mut fake = FakeLoc::new(Pose::from_heading(1.0, 1.0, 0.0));

        fake.propagate(&MnvrCmd::PointTurn { rate_rads: PI }, 0.5);

        let pose = fake.pose();
        assert!((pose.get_heading() - FRAC_PI_2).abs() < 1e-9);
        assert!((pose.position_m.x - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_stop_is_noop() {
        let mut fake = FakeLoc::new(Pose::from_heading(1.0, 2.0, 0.3));

        fake.propagate(&MnvrCmd::Stop, 1.0);

        let pose = fake.pose();
        assert!((pose.position_m.x - 1.0).abs() < 1e-9);
        assert!((pose.position_m.y - 2.0).abs() < 1e-9);
        assert!((pose.get_heading() - 0.3).abs() < 1e-9);
    }
}
