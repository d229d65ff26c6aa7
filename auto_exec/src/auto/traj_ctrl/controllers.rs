//! # Trajectory controllers module
//!
//! This module provides the PID controllers used for TrajCtrl, including their
//! error calculations.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use nalgebra::Vector3;
use serde::Serialize;
use std::time::Instant;

// Internal
use crate::auto::{loc::Pose, path::PathSegment};
use nav_if::tc::mnvr::MnvrCmd;
use util::maths::poly_val;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A PID controller
#[derive(Debug, Serialize, Clone)]
pub struct PidController {
    /// Previous instant that the error was passed in
    #[serde(skip)]
    prev_time: Option<Instant>,

    /// Proportional gain
    k_p: f64,

    /// Integral gain
    k_i: f64,

    /// Dervative gain
    k_d: f64,

    /// Previous error
    prev_error: Option<f64>,

    /// The integral accumulation
    integral: f64,
}

/// The trajectory controllers
#[derive(Debug, Serialize, Clone)]
pub struct TrajControllers {
    /// Lateral error controller
    lat_ctrl: PidController,

    /// Heading error controller
    head_ctrl: PidController,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl PidController {
    /// Create a new controller with the given gains.
    pub fn new(k_p: f64, k_i: f64, k_d: f64) -> Self {
        Self {
            k_p,
            k_i,
            k_d,
            integral: 0f64,
            prev_time: None,
            prev_error: None,
        }
    }

    /// Get the value of the controller for the given error.
    ///
    /// This function is time-aware so there is no need to pass in a delta-time
    /// value.
    pub fn get(&mut self, error: f64) -> f64 {
        // Get current time
        let curr_time = Instant::now();

        // Calculate dt
        let dt = self
            .prev_time
            .map(|t0| (curr_time - t0).as_secs_f64());

        // Accumulate the integral term.
        //
        // If there's no time difference then we don't accumulate the integral.
        // The other option is to add on the error and that will produce a
        // large spike in integral compared to normal operation, so we don't do
        // this.
        self.integral += match dt {
            Some(t) => error * t,
            None => 0f64,
        };

        // Calculate the derivative.
        //
        // If there's no time difference again we assume no derivative, for the
        // same reasons as for integral.
        let deriv = match (self.prev_error, dt) {
            (Some(e), Some(t)) => (error - e) / t,
            (None, Some(t)) => error / t,
            _ => 0f64,
        };

        // Calculate the output
        let out = self.k_p * error + self.k_i * self.integral + self.k_d * deriv;

        // Remember the previous error and time
        self.prev_error = Some(error);
        self.prev_time = Some(curr_time);

        out
    }
}

impl TrajControllers {
    /// Create a new instance of the controllers from the parameters
    pub fn new(params: &super::TrajCtrlParams) -> Self {
        Self {
            lat_ctrl: PidController::new(params.lat_k_p, params.lat_k_i, params.lat_k_d),
            head_ctrl: PidController::new(params.head_k_p, params.head_k_i, params.head_k_d),
        }
    }

    /// Get the ackerman demand for the current path segment and pose.
    pub fn get_ackerman_cmd(
        &mut self,
        segment: &PathSegment,
        pose: &Pose,
        report: &mut super::StatusReport,
        params: &super::TrajCtrlParams,
    ) -> MnvrCmd {
        // Calculate lateral error
        let lat_err_m = Self::calc_lat_error(segment, pose);
        report.lat_error_m = lat_err_m;

        // Calcualte heading error
        let head_err_rad = Self::calc_head_error(segment, pose);
        report.head_error_rad = head_err_rad;

        // Enforce limits on heading and lateral errors
        if lat_err_m.abs() > params.lat_error_limit_m {
            report.lat_error_limit_exceeded = true;
        }
        if head_err_rad.abs() > params.head_error_limit_rad {
            report.head_error_limit_exceeded = true;
        }

        // Pass the errors through the controllers. The lateral error controlls
        // the crab demand and the heading controlls the curvature
        let mut crab_dem_rad = self.lat_ctrl.get(lat_err_m);
        let mut curv_dem_m = self.head_ctrl.get(head_err_rad);

        // Apply limits to curv and crab demands
        crab_dem_rad = crab_dem_rad.clamp(params.min_crab_dem_rad, params.max_crab_dem_rad);
        curv_dem_m = curv_dem_m.clamp(params.min_curv_dem_m, params.max_curv_dem_m);

        // Calculate speed demand from the curvature to speed map, then apply
        // the speed limits
        let speed_dem_ms = poly_val(&curv_dem_m, &params.curv_speed_map_coeffs)
            .clamp(params.min_speed_dem_ms, params.max_speed_dem_ms);

        MnvrCmd::Ackerman {
            speed_ms: speed_dem_ms,
            curv_m: curv_dem_m,
            crab_rad: crab_dem_rad,
        }
    }

    /// Calculate the lateral error to the segment.
    ///
    /// Lateral error will be positive if the platform is to the "left" of the
    /// segment, and negative if it's to the right (following right hand rule).
    pub(crate) fn calc_lat_error(segment: &PathSegment, pose: &Pose) -> f64 {
        let pos_m = pose.position2();

        // The segment direction is a unit vector, so the signed perpendicular
        // distance to the segment's line is the z component of the cross
        // product between the direction and the start->platform vector.
        let to_pos = pos_m - segment.start_m;

        Vector3::new(segment.direction[0], segment.direction[1], 0.0)
            .cross(&Vector3::new(to_pos[0], to_pos[1], 0.0))[2]
    }

    /// Calculate the heading error to the segment
    ///
    /// The heading error is +ve if the platform is pointing to the right of
    /// the segment, and negative if it's pointing to the left (right hand rule
    /// about Z)
    pub(crate) fn calc_head_error(segment: &PathSegment, pose: &Pose) -> f64 {
        // The magnitude of the error is the angle between the segment
        // direction and the platform's forward vector. The sign comes from the
        // extended cross product between the two, the vectors are just zero on
        // the z.
        let pose_dir = pose.forward2();

        let head_err_rad = segment.direction.angle(&pose_dir);

        let cross = Vector3::new(pose_dir[0], pose_dir[1], 0.0).cross(&Vector3::new(
            segment.direction[0],
            segment.direction[1],
            0.0,
        ));

        head_err_rad * cross[2].signum()
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::auto::path::Path;
    use nalgebra::Vector2;

    fn x_axis_segment() -> PathSegment {
        let path = Path::direct(Vector2::new(0.0, 0.0), Vector2::new(2.0, 0.0), 1.0);
        path.get_segment_to_target(1).unwrap()
    }

    #[test]
    fn test_lat_error_sign() {
        let segment = x_axis_segment();

        // Left of the segment (positive y) gives positive error
        let left = Pose::from_heading(0.5, 0.25, 0.0);
        assert!(TrajControllers::calc_lat_error(&segment, &left) > 0.0);

        // Right of the segment gives negative error
        let right = Pose::from_heading(0.5, -0.25, 0.0);
        assert!(TrajControllers::calc_lat_error(&segment, &right) < 0.0);

        // On the segment gives (near) zero error
        let on = Pose::from_heading(0.5, 0.0, 0.0);
        assert!(TrajControllers::calc_lat_error(&segment, &on).abs() < 1e-9);
    }

    #[test]
    fn test_head_error_sign() {
        let segment = x_axis_segment();

        // Pointing left of the segment gives negative error
        let left = Pose::from_heading(0.0, 0.0, 0.3);
        assert!(TrajControllers::calc_head_error(&segment, &left) < 0.0);

        // Pointing right gives positive error
        let right = Pose::from_heading(0.0, 0.0, -0.3);
        assert!(TrajControllers::calc_head_error(&segment, &right) > 0.0);
    }

    #[test]
    fn test_pid_proportional() {
        let mut pid = PidController::new(2.0, 0.0, 0.0);

        // Pure proportional controller output is just k_p * error
        assert!((pid.get(1.5) - 3.0).abs() < 1e-9);
        assert!((pid.get(-0.5) + 1.0).abs() < 1e-9);
    }
}
