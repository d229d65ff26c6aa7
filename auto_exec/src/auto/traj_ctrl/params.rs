//! Trajectory control parameters

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::Deserialize;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for trajectory control
#[derive(Deserialize, Debug, Clone)]
pub struct TrajCtrlParams {
    /// Proportional gain of the lateral error controller
    pub lat_k_p: f64,

    /// Integral gain of the lateral error controller
    pub lat_k_i: f64,

    /// Derivative gain of the lateral error controller
    pub lat_k_d: f64,

    /// Proportional gain of the heading error controller
    pub head_k_p: f64,

    /// Integral gain of the heading error controller
    pub head_k_i: f64,

    /// Derivative gain of the heading error controller
    pub head_k_d: f64,

    /// Lower saturation limit on the curvature demand
    pub min_curv_dem_m: f64,

    /// Upper saturation limit on the curvature demand
    pub max_curv_dem_m: f64,

    /// Lower saturation limit on the crab demand
    pub min_crab_dem_rad: f64,

    /// Upper saturation limit on the crab demand
    pub max_crab_dem_rad: f64,

    /// Coefficients of the polynomial mapping curvature demands to speed
    /// demands, highest power first. Three coefficients give the quadratic
    /// c[0]*x^2 + c[1]*x + c[2].
    pub curv_speed_map_coeffs: Vec<f64>,

    /// Lower saturation limit on the speed demand
    pub min_speed_dem_ms: f64,

    /// Upper saturation limit on the speed demand
    pub max_speed_dem_ms: f64,

    /// Lateral errors greater than this abort the path sequence.
    pub lat_error_limit_m: f64,

    /// Heading errors greater than this abort the path sequence.
    pub head_error_limit_rad: f64,

    /// Turn rate demanded while adjusting heading at the start of a segment.
    pub head_adjust_rate_rads: f64,

    /// Heading errors under this threshold end a heading adjustment.
    pub head_adjust_threshold_rad: f64,
}
