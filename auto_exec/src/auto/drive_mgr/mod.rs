//! # DriveMgr module
//!
//! This module implements the [`DriveMgr`] state machine, which is responsible for executing
//! drive goals against the loaded map. The state machine is broken down into a number of modes:
//!
//! - `Off` - No goal is being executed
//! - `Pause` - The active goal has been paused. It may be resumed with the `resume` tc.
//! - `Stop` - The platform is stopping, ready to move into Off mode.
//! - `Follow` - The platform is following a ground-specified path using TrajCtrl.
//! - `Goto` - The platform is navigating itself towards a given coordinate.
//!
//! Goals follow the goal/feedback/result pattern: a `follow` or `goto` command opens a goal,
//! feedback on the goal is produced every cycle, and a single result is produced when the goal
//! reaches a terminal status. A new goal arriving while one is active preempts the active goal.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

mod follow;
mod goto;
mod params;
mod pause;
mod stop;
pub mod tm;
mod wait_new_pose;

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::fmt::Display;

pub use self::{params::DriveMgrParams, tm::DriveTm};

use super::{
    loc::{LocMgr, Pose},
    map::{CostMap, CostMapError},
    nav::NavError,
    path::{Path, PathError},
    traj_ctrl::TrajCtrlError,
};

// ------------------------------------------------------------------------------------------------
// EXPORTS
// ------------------------------------------------------------------------------------------------

pub mod states {
    pub use super::follow::Follow;
    pub use super::goto::Goto;
    pub use super::pause::Pause;
    pub use super::stop::Stop;
    pub use super::wait_new_pose::WaitNewPose;
}

use chrono::Utc;
use log::{error, info, warn};
use map_manager::{MapDoc, OccupancyGrid};
use nalgebra::Vector2;
use nav_if::{
    action::{DriveFeedback, DriveGoal, DriveOutcome, DriveResult, DriveTarget, GoalStatus},
    tc::{drive::DriveCmd, mnvr::MnvrCmd},
};
use states::*;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Drive Manager
///
/// This struct is responsible for managing the state of the drive system, including the active
/// goal and the current operating state of the system.
pub struct DriveMgr {
    /// Parameters for the DriveMgr and all it's states.
    pub params: DriveMgrParams,

    /// Persistant data of the DriveMgr.
    ///
    /// This is data which is valid over all states, such as the cost map and the active goal.
    /// This allows the data to not be lost when a new state is entered.
    pub persistant: DriveMgrPersistantData,

    /// The stack of states in the system.
    ///
    /// The states in the manager are stackable, which allows maximum reusability of similar
    /// operations. For example Follow and Goto both need to wait for a pose lock at particular
    /// points, so one state, [`DriveMgrState::WaitNewPose`], is written which performs the
    /// required actions. When one of the higher level states needs a pose lock it just pushes
    /// the WaitNewPose state above itself on the stack.
    ///
    /// This also allows easy actions to be performed at the end of a mode, for example Stop can
    /// be pushed below the current state, so that when it is poped the Stop state will be
    /// executed next.
    stack: DriveMgrStack,
}

pub struct DriveMgrPersistantData {
    /// The loaded map document, providing zones, nodes and routes.
    pub map_doc: MapDoc,

    /// Cost map built from the loaded map, used for planning and path checks.
    pub cost_map: CostMap,

    /// Instance of the [`LocMgr`] module, providing the localisation source.
    pub loc_mgr: LocMgr,

    /// Telemetry packet to be sent by the TM server, summarising the drive state.
    pub drive_tm: DriveTm,

    /// Determines if the platform *should* be stopped now, i.e. if a `Stop` mode has completed
    /// and no mode has commanded the platform to move since.
    ///
    /// Note: Not guaranteed to actually mean the platform is stopped, since it could slip.
    pub is_stopped: bool,

    /// The goal currently being executed.
    active_goal: Option<DriveGoal>,

    /// Status of the active goal.
    goal_status: GoalStatus,

    /// The id to assign to the next goal.
    next_goal_id: u64,

    /// Distance travelled since the active goal was accepted.
    goal_dist_travelled_m: f64,

    /// Length of the path planned for the active goal.
    goal_path_length_m: Option<f64>,

    /// The final target position of the active goal.
    goal_target_m: Option<Vector2<f64>>,

    /// Pose at the last feedback update, used to integrate distance travelled.
    last_fb_pose: Option<Pose>,
}

/// State stacking abstraction.
#[derive(Default)]
pub struct DriveMgrStack(Vec<DriveMgrState>);

/// Output of a state's step function.
pub struct StepOutput {
    /// Action to perform on the stack itself
    pub action: StackAction,

    /// Data to pass out of the state machine
    pub data: DriveMgrOutput,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Errors that can occur in the drive manager.
#[derive(Debug, thiserror::Error)]
pub enum DriveMgrError {
    #[error("Failed to load DriveMgrParams: {0:?}")]
    ParamLoadError(util::params::LoadError),

    #[error("Error in TrajCtrl: {0}")]
    TrajCtrlError(TrajCtrlError),

    #[error("Error in Path processing: {0}")]
    PathError(PathError),

    #[error("Navigation error: {0}")]
    NavError(NavError),

    #[error("Cost map error: {0}")]
    CostMapError(CostMapError),
}

pub enum DriveMgrState {
    Stop(Stop),
    Pause(Pause),
    WaitNewPose(WaitNewPose),
    // In a box to reduce the size of the state enum
    Follow(Box<Follow>),
    Goto(Box<Goto>),
}

/// Actions that can be performed on the Stack at the end of a state's step function.
pub enum StackAction {
    None,
    Abort,
    Clear,
    PushAbove(DriveMgrState),
    PushBelow(DriveMgrState),
    Pop,
    Replace(DriveMgrState),
}

/// Possible data that can be passed out of a state's step function.
pub enum DriveMgrOutput {
    /// No action required by the drive system
    None,

    /// Manouvre command to be executed by the platform
    Mnvr(MnvrCmd),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl DriveMgr {
    /// Initialise the drive manager from the parameter file at the given path and the loaded map.
    pub fn init(
        params_path: &str,
        map_doc: MapDoc,
        grid: &OccupancyGrid,
    ) -> Result<Self, DriveMgrError> {
        // Load parameters
        let params: DriveMgrParams = match util::params::load(params_path) {
            Ok(p) => p,
            Err(e) => return Err(DriveMgrError::ParamLoadError(e)),
        };

        Ok(Self {
            params: params.clone(),
            persistant: DriveMgrPersistantData::new(&params, map_doc, grid)?,
            stack: DriveMgrStack::new(),
        })
    }

    /// Step the drive manager by one cycle, processing the given command if there is one.
    pub fn step(&mut self, mut cmd: Option<DriveCmd>) -> Result<DriveMgrOutput, DriveMgrError> {
        // A new goal command arriving while a goal is active preempts the active goal. The stack
        // is cleared and the command is handled below as if the manager was off, with a Stop
        // pushed above the new state so the platform is brought to rest first.
        let mut preempted = false;
        if matches!(cmd, Some(DriveCmd::Follow(_)) | Some(DriveCmd::Goto { .. }))
            && !self.stack.is_empty()
        {
            info!("New goal received while a goal is active, preempting the active goal");
            self.persistant.preempt_goal();
            self.stack.clear();
            preempted = true;
        }

        // Get a reference to the current top state
        let top = self.stack.top();

        // Step the top, and get the action required by the state
        let output = match top {
            // Call the top's step function
            Some(top) => top.step(&self.params, &mut self.persistant, cmd),
            // If there is no top the mgr is off, but we can still accept some commands to change
            // state.
            None => {
                match cmd.take() {
                    Some(DriveCmd::Follow(spec)) => {
                        self.persistant
                            .start_goal(DriveTarget::Follow(spec.clone()));
                        self.stack
                            .push_above(DriveMgrState::Follow(Box::new(Follow::new(spec)?)));
                        if preempted {
                            self.stack.push_above(DriveMgrState::Stop(Stop::new()));
                        }
                        StepOutput::none()
                    }
                    Some(DriveCmd::Goto {
                        x_m,
                        y_m,
                        heading_rad,
                    }) => {
                        self.persistant.start_goal(DriveTarget::Goto {
                            x_m,
                            y_m,
                            heading_rad,
                        });
                        self.stack.push_above(DriveMgrState::Goto(Box::new(
                            Goto::new(x_m, y_m, heading_rad)?,
                        )));
                        if preempted {
                            self.stack.push_above(DriveMgrState::Stop(Stop::new()));
                        }
                        StepOutput::none()
                    }
                    Some(_) => {
                        warn!("Cannot pause, resume, or abort as the DriveMgr is Off");
                        StepOutput::none()
                    }
                    None => StepOutput::none(),
                }
            }
        };

        let is_action = output.action.is_some();

        // Perform any actions required by the top state
        match output.action {
            StackAction::None => (),
            StackAction::Clear => self.stack.clear(),
            StackAction::Abort => {
                self.stack.clear();
                self.stack.push_above(DriveMgrState::Stop(Stop::new()))
            }
            StackAction::PushAbove(s) => self.stack.push_above(s),
            StackAction::PushBelow(s) => self.stack.push_below(s),
            StackAction::Pop => {
                self.stack.pop();
            }
            StackAction::Replace(s) => {
                self.stack.pop();
                self.stack.push_above(s)
            }
        }

        if self.stack.top().is_some() && is_action {
            info!("DriveMgr state change to: {}", self.stack.top().unwrap());
        }

        // Update the feedback for the active goal
        self.persistant.update_feedback();

        Ok(output.data)
    }

    pub fn is_off(&self) -> bool {
        self.stack.is_empty()
    }

    pub fn get_tm(&self) -> DriveTm {
        self.persistant.drive_tm.clone()
    }

    /// Set the pose in the localisation manager.
    pub fn set_pose(&mut self, pose: Pose) {
        self.persistant.loc_mgr.set_pose(pose);
    }

    /// Propagate the localisation estimate with the manouvre command executed this cycle.
    ///
    /// Only has an effect if the localisation source is `Fake`.
    pub fn propagate_loc(&mut self, cmd: &MnvrCmd, dt_s: f64) {
        self.persistant.loc_mgr.propagate(cmd, dt_s);
    }
}

impl DriveMgrStack {
    /// Create a new empty stack
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Returns true if the stack is empty (has no states)
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns a mutable reference of the top state in the stack. Returns None if the stack is
    /// empty.
    pub fn top(&mut self) -> Option<&mut DriveMgrState> {
        self.0.last_mut()
    }

    /// Pushes a new state onto the stack above the current top
    pub fn push_above(&mut self, new: DriveMgrState) {
        self.0.push(new)
    }

    /// Pushes a new state onto the stack below the current top. If the stack is empty this is
    /// equivalent of [`DriveMgrStack::push_above()`].
    pub fn push_below(&mut self, new: DriveMgrState) {
        if self.is_empty() {
            self.0.push(new)
        } else {
            self.0.insert(self.0.len() - 1, new)
        }
    }

    /// Pops the current top of the stack, removing it. Returns None if the stack is empty.
    pub fn pop(&mut self) -> Option<DriveMgrState> {
        self.0.pop()
    }

    pub fn clear(&mut self) {
        self.0.clear()
    }
}

impl Display for DriveMgrState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DriveMgrState::Stop(_) => write!(f, "DriveMgrState::Stop"),
            DriveMgrState::Pause(_) => write!(f, "DriveMgrState::Pause"),
            DriveMgrState::WaitNewPose(_) => write!(f, "DriveMgrState::WaitNewPose"),
            DriveMgrState::Follow(_) => write!(f, "DriveMgrState::Follow"),
            DriveMgrState::Goto(_) => write!(f, "DriveMgrState::Goto"),
        }
    }
}

impl DriveMgrState {
    fn step(
        &mut self,
        params: &DriveMgrParams,
        persistant: &mut DriveMgrPersistantData,
        cmd: Option<DriveCmd>,
    ) -> StepOutput {
        let out = match self {
            DriveMgrState::Stop(stop) => stop.step(params, persistant, cmd),
            DriveMgrState::Pause(pause) => pause.step(params, persistant, cmd),
            DriveMgrState::WaitNewPose(wait) => wait.step(params, persistant, cmd),
            DriveMgrState::Follow(follow) => follow.step(params, persistant, cmd),
            DriveMgrState::Goto(goto) => goto.step(params, persistant, cmd),
        };

        // If an output is an error, we print it to the screen but we actually abort, keeping the
        // system working
        match out {
            Ok(o) => o,
            Err(e) => {
                error!("{}", e);
                persistant.abort_goal(&e.to_string());
                StepOutput {
                    action: StackAction::Abort,
                    data: DriveMgrOutput::None,
                }
            }
        }
    }
}

impl DriveMgrPersistantData {
    pub fn new(
        params: &DriveMgrParams,
        map_doc: MapDoc,
        grid: &OccupancyGrid,
    ) -> Result<Self, DriveMgrError> {
        let cost_map = CostMap::from_map(params.cost_map.clone(), &map_doc, grid)
            .map_err(DriveMgrError::CostMapError)?;

        Ok(Self {
            map_doc,
            cost_map,
            loc_mgr: LocMgr::new(&params.loc_mgr),
            drive_tm: DriveTm::default(),
            is_stopped: false,
            active_goal: None,
            goal_status: GoalStatus::Pending,
            next_goal_id: 0,
            goal_dist_travelled_m: 0.0,
            goal_path_length_m: None,
            goal_target_m: None,
            last_fb_pose: None,
        })
    }

    /// Open a new goal with the given target, returning its id.
    pub fn start_goal(&mut self, target: DriveTarget) -> u64 {
        let id = self.next_goal_id;
        self.next_goal_id += 1;

        info!("Drive goal {} accepted: {:?}", id, target);

        self.active_goal = Some(DriveGoal { id, target });
        self.goal_status = GoalStatus::Pending;
        self.goal_dist_travelled_m = 0.0;
        self.goal_path_length_m = None;
        self.goal_target_m = None;
        self.last_fb_pose = None;

        self.drive_tm.goal_id = Some(id);
        self.drive_tm.status = Some(self.goal_status);
        self.drive_tm.result = None;

        id
    }

    /// Change the status of the active goal. Illegal transitions are ignored.
    pub fn set_goal_status(&mut self, status: GoalStatus) {
        if self.active_goal.is_none() || self.goal_status == status {
            return;
        }

        if self.goal_status.can_transition(status) {
            self.goal_status = status;
            self.drive_tm.status = Some(status);
        } else {
            warn!(
                "Illegal goal status transition {:?} -> {:?} ignored",
                self.goal_status, status
            );
        }
    }

    /// Finish the active goal successfully.
    pub fn succeed_goal(&mut self) {
        self.finish_goal(DriveOutcome::Succeeded);
    }

    /// Finish the active goal as aborted with the given reason.
    pub fn abort_goal(&mut self, reason: &str) {
        self.finish_goal(DriveOutcome::Aborted {
            reason: reason.into(),
        });
    }

    /// Finish the active goal as preempted by a newer goal.
    pub fn preempt_goal(&mut self) {
        self.finish_goal(DriveOutcome::Preempted);
    }

    fn finish_goal(&mut self, outcome: DriveOutcome) {
        let goal = match self.active_goal.take() {
            Some(g) => g,
            None => return,
        };

        info!("Drive goal {} finished: {:?}", goal.id, outcome);

        self.goal_status = outcome.status();
        self.drive_tm.status = Some(self.goal_status);
        self.drive_tm.result = Some(DriveResult {
            goal_id: goal.id,
            outcome,
        });
        self.drive_tm.path = None;
        self.goal_path_length_m = None;
        self.goal_target_m = None;
    }

    /// Record the path being executed for the active goal, used for TM and feedback.
    pub fn set_goal_path(&mut self, path: &Path) {
        self.goal_path_length_m = path.get_length();
        self.goal_target_m = path.points_m.last().copied();
        self.drive_tm.path = Some(path.clone());
    }

    /// Update the feedback on the active goal, called once per step.
    fn update_feedback(&mut self) {
        let pose = self.loc_mgr.get_pose();
        self.drive_tm.pose = pose;

        let goal = match self.active_goal {
            Some(ref g) => g,
            None => return,
        };

        // Integrate the distance travelled while the goal is active
        if let Some(p) = pose {
            if let Some(last) = self.last_fb_pose {
                if self.goal_status == GoalStatus::Active {
                    self.goal_dist_travelled_m += (p.position_m - last.position_m).norm();
                }
            }
            self.last_fb_pose = Some(p);
        }

        let dist_remaining_m = match (pose, self.goal_target_m) {
            (Some(p), Some(t)) => (t - p.position2()).norm(),
            _ => 0.0,
        };

        let completion = match self.goal_path_length_m {
            Some(l) if l > 0.0 => (self.goal_dist_travelled_m / l).min(1.0),
            _ => 0.0,
        };

        self.drive_tm.feedback = Some(DriveFeedback {
            goal_id: goal.id,
            timestamp: Utc::now(),
            status: self.goal_status,
            pose: pose.map(|p| (p.position_m[0], p.position_m[1], p.get_heading())),
            dist_travelled_m: self.goal_dist_travelled_m,
            dist_remaining_m,
            completion,
        });
    }
}

impl StepOutput {
    pub fn none() -> Self {
        Self {
            action: StackAction::None,
            data: DriveMgrOutput::None,
        }
    }
}

impl StackAction {
    pub fn is_some(&self) -> bool {
        !matches!(self, &StackAction::None)
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::auto::{loc::LocSource, map::CostMapParams};

    fn test_persistant() -> DriveMgrPersistantData {
        let map_doc = MapDoc::new("test", 0.5, 20, 20);
        let grid = OccupancyGrid::from_cells(20, 20, vec![0u8; 400]).unwrap();

        let params = CostMapParams {
            occ_unsafe_threshold: 50,
            occ_cost_factor: 0.5,
            inflation_radius_m: 0.0,
            slow_down_zone_cost: 0.5,
        };

        let cost_map = CostMap::from_map(params, &map_doc, &grid).unwrap();

        DriveMgrPersistantData {
            map_doc,
            cost_map,
            loc_mgr: LocMgr::new(&crate::auto::loc::LocMgrParams {
                source: LocSource::OnSet,
                initial_position_m: [0.0, 0.0],
                initial_heading_rad: 0.0,
            }),
            drive_tm: DriveTm::default(),
            is_stopped: false,
            active_goal: None,
            goal_status: GoalStatus::Pending,
            next_goal_id: 0,
            goal_dist_travelled_m: 0.0,
            goal_path_length_m: None,
            goal_target_m: None,
            last_fb_pose: None,
        }
    }

    fn test_params() -> DriveMgrParams {
        DriveMgrParams {
            loc_mgr: crate::auto::loc::LocMgrParams {
                source: LocSource::OnSet,
                initial_position_m: [0.0, 0.0],
                initial_heading_rad: 0.0,
            },
            wait_new_pose: super::wait_new_pose::WaitNewPoseParams { max_wait_time_s: 5.0 },
            stop: super::stop::StopParams {
                min_stationary_time_s: 0.5,
                position_delta_max_magn_m: 0.01,
                attitude_delta_max_magn_rad: 0.01,
            },
            goto: super::goto::GotoParams {
                leg_length_m: 2.0,
                max_replans: 3,
            },
            cost_map: CostMapParams {
                occ_unsafe_threshold: 50,
                occ_cost_factor: 0.5,
                inflation_radius_m: 0.0,
                slow_down_zone_cost: 0.5,
            },
            path_planner: crate::auto::nav::path_planner::PathPlannerParams {
                test_curvs_m: vec![-0.5, 0.0, 0.5],
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

    #[test]
    fn test_stack() {
        let mut stack = DriveMgrStack::new();
        assert!(stack.is_empty());

        stack.push_above(DriveMgrState::Stop(Stop::new()));
        stack.push_above(DriveMgrState::Pause(Pause::new()));
        assert!(matches!(stack.top(), Some(DriveMgrState::Pause(_))));

        // Push below puts the new state under the top
        stack.push_below(DriveMgrState::WaitNewPose(WaitNewPose::new()));
        assert!(matches!(stack.top(), Some(DriveMgrState::Pause(_))));

        assert!(matches!(stack.pop(), Some(DriveMgrState::Pause(_))));
        assert!(matches!(stack.pop(), Some(DriveMgrState::WaitNewPose(_))));
        assert!(matches!(stack.pop(), Some(DriveMgrState::Stop(_))));
        assert!(stack.pop().is_none());
    }

    #[test]
    fn test_goal_lifecycle() {
        let mut persistant = test_persistant();

        let id = persistant.start_goal(DriveTarget::Goto {
            x_m: 1.0,
            y_m: 1.0,
            heading_rad: None,
        });
        assert_eq!(id, 0);
        assert_eq!(persistant.goal_status, GoalStatus::Pending);

        persistant.set_goal_status(GoalStatus::Active);
        assert_eq!(persistant.goal_status, GoalStatus::Active);

        persistant.succeed_goal();
        assert!(persistant.active_goal.is_none());

        let result = persistant.drive_tm.result.clone().unwrap();
        assert_eq!(result.goal_id, 0);
        assert_eq!(result.outcome, DriveOutcome::Succeeded);

        // Goal ids increase monotonically
        let id = persistant.start_goal(DriveTarget::Goto {
            x_m: 2.0,
            y_m: 2.0,
            heading_rad: None,
        });
        assert_eq!(id, 1);
    }

    #[test]
    fn test_illegal_status_transition_ignored() {
        let mut persistant = test_persistant();

        persistant.start_goal(DriveTarget::Goto {
            x_m: 1.0,
            y_m: 1.0,
            heading_rad: None,
        });

        // Pending -> Paused is not legal, status should be unchanged
        persistant.set_goal_status(GoalStatus::Paused);
        assert_eq!(persistant.goal_status, GoalStatus::Pending);
    }

    #[test]
    fn test_preempt_goal() {
        let mut persistant = test_persistant();

        let first = persistant.start_goal(DriveTarget::Goto {
            x_m: 1.0,
            y_m: 1.0,
            heading_rad: None,
        });
        persistant.set_goal_status(GoalStatus::Active);

        persistant.preempt_goal();

        let result = persistant.drive_tm.result.clone().unwrap();
        assert_eq!(result.goal_id, first);
        assert_eq!(result.outcome, DriveOutcome::Preempted);
    }

    #[test]
    fn test_wait_new_pose_demands_stop_while_waiting() {
        let mut persistant = test_persistant();
        let params = test_params();

        // No pose has been set, so the state must hold the platform stopped
        // and stay on the stack
        let mut wait = WaitNewPose::new();
        let out = wait.step(&params, &mut persistant, None).unwrap();

        assert!(matches!(out.action, StackAction::None));
        assert!(matches!(out.data, DriveMgrOutput::Mnvr(MnvrCmd::Stop)));
    }

    #[test]
    fn test_wait_new_pose_timeout_aborts() {
        let mut persistant = test_persistant();
        let mut params = test_params();

        // A negative wait time expires on the first step
        params.wait_new_pose.max_wait_time_s = -1.0;

        let id = persistant.start_goal(DriveTarget::Goto {
            x_m: 1.0,
            y_m: 1.0,
            heading_rad: None,
        });

        let mut wait = WaitNewPose::new();
        let out = wait.step(&params, &mut persistant, None).unwrap();

        // The stack is cleared and the stop demand issued directly, since the
        // Stop state can't confirm stationarity without a pose
        assert!(matches!(out.action, StackAction::Clear));
        assert!(matches!(out.data, DriveMgrOutput::Mnvr(MnvrCmd::Stop)));

        let result = persistant.drive_tm.result.clone().unwrap();
        assert_eq!(result.goal_id, id);
        assert!(matches!(result.outcome, DriveOutcome::Aborted { .. }));
    }

    #[test]
    fn test_wait_new_pose_pops_on_pose() {
        let mut persistant = test_persistant();
        let params = test_params();

        persistant.loc_mgr.set_pose(Pose::from_heading(1.0, 1.0, 0.0));

        let mut wait = WaitNewPose::new();
        let out = wait.step(&params, &mut persistant, None).unwrap();

        assert!(matches!(out.action, StackAction::Pop));
    }
}
