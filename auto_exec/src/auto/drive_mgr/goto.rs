//! # [`Goto`] DriveMgr state
//!
//! Goto navigates the platform to a target position by planning a minimum
//! cost path through the cost map and executing it with TrajCtrl. If the
//! planner could not produce a path all the way to the target the best
//! partial plan is executed and planning is retried from the new pose, up to
//! a limited number of replans.

// -----------------------------------------------------------------------------------------------
// IMPORTS
// -----------------------------------------------------------------------------------------------

use log::{info, warn};
use serde::Deserialize;

use super::{
    params::DriveMgrParams,
    states::{Pause, Stop, WaitNewPose},
    DriveMgrError, DriveMgrOutput, DriveMgrPersistantData, DriveMgrState, StackAction, StepOutput,
};
use crate::auto::{
    loc::Pose,
    map::CostMapData,
    nav::{path_planner::PathPlanner, NavError, NavPose},
    path::Path,
    traj_ctrl::TrajCtrl,
};
use nav_if::{
    action::GoalStatus,
    tc::{drive::DriveCmd, mnvr::MnvrCmd},
};

// -----------------------------------------------------------------------------------------------
// STRUCTS
// -----------------------------------------------------------------------------------------------

pub struct Goto {
    traj_ctrl: TrajCtrl,

    /// The target to navigate to
    target: NavPose,

    /// Whether an arrival heading was requested
    heading_required: bool,

    /// Number of replans performed so far
    num_replans: usize,

    /// The full path of the executing sequence, used to re-check traversability
    planned_path: Option<Path>,

    /// True while TrajCtrl is executing a planned sequence
    executing: bool,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct GotoParams {
    /// Length of each planned path leg, in meters
    pub leg_length_m: f64,

    /// Maximum number of replans before the goal is aborted
    pub max_replans: usize,
}

// -----------------------------------------------------------------------------------------------
// IMPLS
// -----------------------------------------------------------------------------------------------

impl Goto {
    pub fn new(x_m: f64, y_m: f64, heading_rad: Option<f64>) -> Result<Self, DriveMgrError> {
        let traj_ctrl = TrajCtrl::init("traj_ctrl.toml").map_err(DriveMgrError::TrajCtrlError)?;

        Ok(Self {
            traj_ctrl,
            // If no arrival heading was given one is chosen when planning
            // starts, pointing from the start position to the target.
            target: NavPose::new(nalgebra::Vector2::new(x_m, y_m), heading_rad.unwrap_or(0.0)),
            heading_required: heading_rad.is_some(),
            num_replans: 0,
            planned_path: None,
            executing: false,
        })
    }

    pub fn step(
        &mut self,
        params: &DriveMgrParams,
        persistant: &mut DriveMgrPersistantData,
        cmd: Option<DriveCmd>,
    ) -> Result<StepOutput, DriveMgrError> {
        // Check for pause or abort commands
        match cmd {
            Some(DriveCmd::Pause) => {
                return Ok(StepOutput {
                    action: StackAction::PushAbove(DriveMgrState::Pause(Pause::new())),
                    data: DriveMgrOutput::None,
                })
            }
            Some(DriveCmd::Abort) => {
                persistant.abort_goal("goal aborted by command");
                return Ok(StepOutput {
                    action: StackAction::Abort,
                    data: DriveMgrOutput::None,
                });
            }
            Some(_) => warn!("Only Pause and Abort commands are accepted in Goto state"),
            _ => (),
        };

        // Get the pose
        let current_pose = match persistant.loc_mgr.get_pose() {
            Some(p) => p,
            None => {
                return Ok(StepOutput {
                    action: StackAction::PushAbove(DriveMgrState::WaitNewPose(WaitNewPose::new())),
                    data: DriveMgrOutput::None,
                })
            }
        };

        // If TrajCtrl isn't executing a sequence we either need to plan (or replan), or we've
        // arrived at the target.
        if !self.executing {
            let start = NavPose::from_pose(&current_pose);

            // Arrival check
            let dist_to_target_m = (self.target.position_m - start.position_m).norm();
            if dist_to_target_m <= params.path_planner.target_tolerance_m {
                info!(
                    "Goto target reached, {:.2} m from target, goal complete",
                    dist_to_target_m
                );
                persistant.succeed_goal();
                return Ok(StepOutput {
                    action: StackAction::Replace(DriveMgrState::Stop(Stop::new())),
                    data: DriveMgrOutput::None,
                });
            }

            // If no arrival heading was requested aim to arrive pointing from the start towards
            // the target, which gives the planner's alignment heuristic something sensible to
            // work with.
            if !self.heading_required {
                let to_target = self.target.position_m - start.position_m;
                self.target.heading_rad = to_target[1].atan2(to_target[0]);
            }

            let paths = self.plan(params, persistant, &start)?;

            self.traj_ctrl
                .begin_path_sequence(paths.clone())
                .map_err(DriveMgrError::TrajCtrlError)?;

            // Publish the full planned path in the TM
            let mut full_path = Path::new_empty();
            for path in &paths {
                full_path.points_m.extend_from_slice(&path.points_m);
            }
            persistant.set_goal_path(&full_path);
            self.planned_path = Some(full_path);

            self.executing = true;
        }
        // While executing, re-check the part of the plan still ahead against the cost map. A map
        // update may have made the plan unsafe since it was produced.
        else if let Some(remaining) = self.remaining_path(&current_pose) {
            let traversable = matches!(
                persistant.cost_map.get_path_cost(&remaining),
                Ok(CostMapData::Cost(_))
            );

            if !traversable {
                warn!("Planned path is no longer traversable, stopping to replan");

                self.traj_ctrl
                    .abort_path_sequence()
                    .map_err(DriveMgrError::TrajCtrlError)?;

                // The sequence is only unloaded by the next proc, run it now so a fresh plan can
                // be loaded next cycle
                self.traj_ctrl
                    .proc(&current_pose)
                    .map_err(DriveMgrError::TrajCtrlError)?;

                self.planned_path = None;
                self.executing = false;

                return Ok(StepOutput {
                    action: StackAction::None,
                    data: DriveMgrOutput::Mnvr(MnvrCmd::Stop),
                });
            }
        }

        // The platform is moving under this state
        persistant.is_stopped = false;
        persistant.set_goal_status(GoalStatus::Active);

        // Step TrajCtrl
        let (mnvr_cmd, traj_ctrl_status) = self
            .traj_ctrl
            .proc(&current_pose)
            .map_err(DriveMgrError::TrajCtrlError)?;

        if traj_ctrl_status.sequence_finished {
            if traj_ctrl_status.sequence_aborted {
                persistant.abort_goal("trajectory error limits exceeded");
                return Ok(StepOutput {
                    action: StackAction::Replace(DriveMgrState::Stop(Stop::new())),
                    data: DriveMgrOutput::None,
                });
            }

            // Sequence finished cleanly, next cycle will either replan or detect arrival
            self.executing = false;
            return Ok(StepOutput::none());
        }

        match mnvr_cmd {
            Some(mnvr) => Ok(StepOutput {
                action: StackAction::None,
                data: DriveMgrOutput::Mnvr(mnvr),
            }),
            None => Ok(StepOutput::none()),
        }
    }

    /// Plan a path sequence from the given start pose towards the target.
    ///
    /// If the planner cannot reach the target the best partial plan is used instead, provided the
    /// replan budget hasn't been exhausted.
    fn plan(
        &mut self,
        params: &DriveMgrParams,
        persistant: &mut DriveMgrPersistantData,
        start: &NavPose,
    ) -> Result<Vec<Path>, DriveMgrError> {
        let planner = PathPlanner::new(params.path_planner.clone());

        match planner.plan_indirect(
            &persistant.cost_map,
            start,
            &self.target,
            params.goto.leg_length_m,
        ) {
            Ok(paths) => Ok(paths),
            Err(NavError::BestPathNotAtTarget(paths)) => {
                if self.num_replans >= params.goto.max_replans {
                    persistant.abort_goal("no path to target");
                    return Err(DriveMgrError::NavError(NavError::NoPathToTarget));
                }

                self.num_replans += 1;
                info!(
                    "Plan doesn't reach the target, executing best partial plan (replan {} of {})",
                    self.num_replans, params.goto.max_replans
                );

                Ok(paths)
            }
            Err(e) => {
                persistant.abort_goal("path planning failed");
                Err(DriveMgrError::NavError(e))
            }
        }
    }

    /// The part of the planned path from the point nearest the given pose to the end.
    ///
    /// Returns `None` if there is no plan, or if fewer than two points remain (a path needs at
    /// least one segment to be costed).
    fn remaining_path(&self, pose: &Pose) -> Option<Path> {
        let path = self.planned_path.as_ref()?;
        let pos = pose.position2();

        let mut nearest = 0;
        let mut nearest_dist_m = f64::INFINITY;
        for (i, point) in path.points_m.iter().enumerate() {
            let dist_m = (point - pos).norm();
            if dist_m < nearest_dist_m {
                nearest = i;
                nearest_dist_m = dist_m;
            }
        }

        if path.points_m.len() - nearest < 2 {
            return None;
        }

        Some(Path {
            points_m: path.points_m[nearest..].to_vec(),
        })
    }
}

// -----------------------------------------------------------------------------------------------
// TESTS
// -----------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::auto::{
        loc::{LocMgr, LocMgrParams, LocSource},
        map::{CostMap, CostMapParams},
        nav::path_planner::PathPlannerParams,
        traj_ctrl::TrajCtrlParams,
    };
    use map_manager::{MapDoc, OccupancyGrid};
    use nalgebra::Vector2;
    use nav_if::action::DriveTarget;

    fn cost_map(occupancy: u8) -> CostMap {
        let doc = MapDoc::new("goto_test", 0.25, 80, 80);
        let grid = OccupancyGrid::from_cells(80, 80, vec![occupancy; 80 * 80]).unwrap();

        CostMap::from_map(
            CostMapParams {
                occ_unsafe_threshold: 90,
                occ_cost_factor: 0.5,
                inflation_radius_m: 0.0,
                slow_down_zone_cost: 0.3,
            },
            &doc,
            &grid,
        )
        .unwrap()
    }

    fn test_persistant() -> DriveMgrPersistantData {
        let mut persistant = DriveMgrPersistantData {
            map_doc: MapDoc::new("goto_test", 0.25, 80, 80),
            cost_map: cost_map(0),
            loc_mgr: LocMgr::new(&LocMgrParams {
                source: LocSource::OnSet,
                initial_position_m: [0.0, 0.0],
                initial_heading_rad: 0.0,
            }),
            drive_tm: super::super::DriveTm::default(),
            is_stopped: false,
            active_goal: None,
            goal_status: GoalStatus::Pending,
            next_goal_id: 0,
            goal_dist_travelled_m: 0.0,
            goal_path_length_m: None,
            goal_target_m: None,
            last_fb_pose: None,
        };

        persistant.loc_mgr.set_pose(Pose::from_heading(3.0, 10.0, 0.0));
        persistant
    }

    fn test_params() -> DriveMgrParams {
        DriveMgrParams {
            loc_mgr: LocMgrParams {
                source: LocSource::OnSet,
                initial_position_m: [0.0, 0.0],
                initial_heading_rad: 0.0,
            },
            wait_new_pose: super::super::wait_new_pose::WaitNewPoseParams { max_wait_time_s: 5.0 },
            stop: super::super::stop::StopParams {
                min_stationary_time_s: 0.5,
                position_delta_max_magn_m: 0.01,
                attitude_delta_max_magn_rad: 0.01,
            },
            goto: GotoParams {
                leg_length_m: 2.0,
                max_replans: 3,
            },
            cost_map: CostMapParams {
                occ_unsafe_threshold: 90,
                occ_cost_factor: 0.5,
                inflation_radius_m: 0.0,
                slow_down_zone_cost: 0.3,
            },
            path_planner: PathPlannerParams {
                test_curvs_m: vec![-0.5, -0.25, 0.0, 0.25, 0.5],
                test_heads_rad: vec![-0.4, 0.0, 0.4],
                path_point_separation_m: 0.1,
                heuristic_remaining_cost_weight: 1.0,
                heuristic_alignment_cost_weight: 0.5,
                target_tolerance_m: 0.5,
                max_path_length_m: 3.0,
                min_path_length_m: 1.0,
                max_num_nodes: 5000,
            },
            route_point_sep_m: 0.05,
        }
    }

    fn test_goto(x_m: f64, y_m: f64) -> Goto {
        Goto {
            traj_ctrl: TrajCtrl::new(TrajCtrlParams {
                lat_k_p: 1.0,
                lat_k_i: 0.0,
                lat_k_d: 0.0,
                head_k_p: 1.0,
                head_k_i: 0.0,
                head_k_d: 0.0,
                min_curv_dem_m: -2.0,
                max_curv_dem_m: 2.0,
                min_crab_dem_rad: -0.5,
                max_crab_dem_rad: 0.5,
                curv_speed_map_coeffs: vec![0.0, 0.1],
                min_speed_dem_ms: 0.01,
                max_speed_dem_ms: 0.1,
                lat_error_limit_m: 1.0,
                head_error_limit_rad: 1.0,
                head_adjust_rate_rads: 0.2,
                head_adjust_threshold_rad: 0.1,
            }),
            target: NavPose::new(Vector2::new(x_m, y_m), 0.0),
            heading_required: false,
            num_replans: 0,
            planned_path: None,
            executing: false,
        }
    }

    #[test]
    fn test_goto_stops_when_plan_becomes_untraversable() {
        let mut persistant = test_persistant();
        let params = test_params();

        persistant.start_goal(DriveTarget::Goto {
            x_m: 8.0,
            y_m: 10.0,
            heading_rad: None,
        });

        let mut goto = test_goto(8.0, 10.0);

        // First step plans and starts executing
        goto.step(&params, &mut persistant, None).unwrap();
        assert!(goto.executing);
        assert!(goto.planned_path.is_some());

        // The map updates and every cell becomes unsafe
        persistant.cost_map = cost_map(100);

        // The next step must hold a stop demand and unload the sequence so a
        // replan can be attempted, without aborting the goal
        let out = goto.step(&params, &mut persistant, None).unwrap();

        assert!(matches!(out.action, StackAction::None));
        assert!(matches!(out.data, DriveMgrOutput::Mnvr(MnvrCmd::Stop)));
        assert!(!goto.executing);
        assert!(goto.planned_path.is_none());
        assert!(persistant.drive_tm.result.is_none());
    }

    #[test]
    fn test_goto_executes_on_open_map() {
        let mut persistant = test_persistant();
        let params = test_params();

        persistant.start_goal(DriveTarget::Goto {
            x_m: 8.0,
            y_m: 10.0,
            heading_rad: None,
        });

        let mut goto = test_goto(8.0, 10.0);

        // The first step plans, and since the platform starts aligned with the
        // path the heading adjust completes in one cycle
        goto.step(&params, &mut persistant, None).unwrap();
        assert!(goto.executing);
        assert_eq!(persistant.goal_status, GoalStatus::Active);

        // Subsequent steps produce manouvre demands
        let out = goto.step(&params, &mut persistant, None).unwrap();
        assert!(matches!(out.data, DriveMgrOutput::Mnvr(_)));
    }
}
