//! # DriveMgr Parameters

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::Deserialize;

use crate::auto::{loc::LocMgrParams, map::CostMapParams, nav::path_planner::PathPlannerParams};

use super::{goto::GotoParams, stop::StopParams, wait_new_pose::WaitNewPoseParams};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct DriveMgrParams {
    pub loc_mgr: LocMgrParams,

    pub wait_new_pose: WaitNewPoseParams,

    pub stop: StopParams,

    pub goto: GotoParams,

    pub cost_map: CostMapParams,

    pub path_planner: PathPlannerParams,

    /// Separation between points in paths built from named routes, in meters.
    pub route_point_sep_m: f64,
}
