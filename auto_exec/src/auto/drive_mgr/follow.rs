//! # [`Follow`] DriveMgr state

// -----------------------------------------------------------------------------------------------
// IMPORTS
// -----------------------------------------------------------------------------------------------

use log::{error, info, warn};

use super::{
    params::DriveMgrParams,
    states::{Pause, Stop, WaitNewPose},
    DriveMgrError, DriveMgrOutput, DriveMgrPersistantData, DriveMgrState, StackAction, StepOutput,
};
use crate::auto::{map::CostMapData, path::Path, traj_ctrl::TrajCtrl};
use nav_if::{
    action::GoalStatus,
    tc::drive::{DriveCmd, PathSpec},
};

// -----------------------------------------------------------------------------------------------
// STRUCTS
// -----------------------------------------------------------------------------------------------

pub struct Follow {
    traj_ctrl: TrajCtrl,
    path_spec: PathSpec,
    path: Option<Path>,
}

// -----------------------------------------------------------------------------------------------
// IMPLS
// -----------------------------------------------------------------------------------------------

impl Follow {
    pub fn new(path_spec: PathSpec) -> Result<Self, DriveMgrError> {
        // Create TrajCtrl instance
        let traj_ctrl = TrajCtrl::init("traj_ctrl.toml").map_err(DriveMgrError::TrajCtrlError)?;

        Ok(Self {
            traj_ctrl,
            path_spec,
            path: None,
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
            Some(_) => warn!("Only Pause and Abort commands are accepted in Follow state"),
            _ => (),
        };

        // Get the pose
        let current_pose = match persistant.loc_mgr.get_pose() {
            Some(p) => p,
            // If no pose push a wait for pose state
            None => {
                return Ok(StepOutput {
                    action: StackAction::PushAbove(DriveMgrState::WaitNewPose(WaitNewPose::new())),
                    data: DriveMgrOutput::None,
                })
            }
        };

        // If the path hasn't been calculated yet set it
        if self.path.is_none() {
            let path = Path::from_spec(
                &self.path_spec,
                &current_pose,
                &persistant.map_doc,
                params.route_point_sep_m,
            )
            .map_err(DriveMgrError::PathError)?;

            // Check the path doesn't cross any untraversable cells before committing to it
            let path_cost = persistant
                .cost_map
                .get_path_cost(&path)
                .map_err(|e| DriveMgrError::CostMapError(e.into()))?;

            if matches!(path_cost, CostMapData::None | CostMapData::Unsafe) {
                persistant.abort_goal("path crosses untraversable terrain");
                return Ok(StepOutput {
                    action: StackAction::Abort,
                    data: DriveMgrOutput::None,
                });
            }

            // Set the path in TrajCtrl. TrajCtrl accepts a path sequence, a vec of paths, and can
            // do heading adjustments between each path. We will just load our path as a single
            // path to simplify things.
            self.traj_ctrl
                .begin_path_sequence(vec![path.clone()])
                .map_err(DriveMgrError::TrajCtrlError)?;

            persistant.set_goal_path(&path);
            self.path = Some(path);
        }

        // The platform is moving under this state
        persistant.is_stopped = false;
        persistant.set_goal_status(GoalStatus::Active);

        // Step TrajCtrl
        let (mnvr_cmd, traj_ctrl_status) = self
            .traj_ctrl
            .proc(&current_pose)
            .map_err(DriveMgrError::TrajCtrlError)?;

        // Check for TrajCtrl finishing
        if traj_ctrl_status.sequence_finished {
            if traj_ctrl_status.sequence_aborted {
                error!("TrajCtrl aborted the path sequence");
                persistant.abort_goal("trajectory error limits exceeded");
            } else {
                info!("TrajCtrl sequence finished, exiting Follow mode");
                persistant.succeed_goal();
            }

            return Ok(StepOutput {
                action: StackAction::Replace(DriveMgrState::Stop(Stop::new())),
                data: DriveMgrOutput::None,
            });
        }

        // Output the manouvre command
        match mnvr_cmd {
            Some(mnvr) => Ok(StepOutput {
                action: StackAction::None,
                data: DriveMgrOutput::Mnvr(mnvr),
            }),
            None => Ok(StepOutput::none()),
        }
    }
}
