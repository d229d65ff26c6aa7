//! # [`DriveMgrState::WaitNewPose`] implementation

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::{debug, error, warn};
use serde::Deserialize;
use util::session;

use super::{
    params::DriveMgrParams, states::{Pause, Stop}, DriveMgrError, DriveMgrOutput,
    DriveMgrPersistantData, DriveMgrState, StackAction, StepOutput,
};
use nav_if::tc::{drive::DriveCmd, mnvr::MnvrCmd};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// WaitNewPose state.
///
/// This state is designed to wait for the LocMgr to be able to provide a new pose. It should be
/// used if the [`LocMgr::get_pose()`] function returns `None`. It will wait up to the provided time
/// duration before aborting.
#[derive(Debug)]
pub struct WaitNewPose {
    start_time: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WaitNewPoseParams {
    /// Maximum duration to wait before aborting
    pub max_wait_time_s: f64,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl WaitNewPose {
    pub fn new() -> Self {
        Self {
            start_time: session::get_elapsed_seconds(),
        }
    }

    pub fn step(
        &mut self,
        params: &DriveMgrParams,
        persistant: &mut DriveMgrPersistantData,
        cmd: Option<DriveCmd>,
    ) -> Result<StepOutput, DriveMgrError> {
        // Get the current time
        let time_s = session::get_elapsed_seconds();

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
                    action: StackAction::Replace(DriveMgrState::Stop(Stop::new())),
                    data: DriveMgrOutput::None,
                });
            }
            Some(_) => warn!("Only Pause and Abort commands are accepted in WaitNewPose state"),
            _ => (),
        };

        // Check if we have a new pose yet
        if persistant.loc_mgr.get_pose().is_some() {
            debug!("Pose lock obtained, took {} s", time_s - self.start_time);
            // If we do pop self off the stack
            Ok(StepOutput {
                action: StackAction::Pop,
                data: DriveMgrOutput::None,
            })
        }
        // Otherwise, check if the time we've waited is less than the time we're supposed to wait.
        else if time_s - self.start_time > params.wait_new_pose.max_wait_time_s {
            // Clear the stack to abort. No Stop state is pushed since Stop needs a pose to
            // confirm the platform is stationary, which is exactly what we don't have, so the
            // stop demand is issued directly instead.
            error!(
                "Couldn't get pose lock within {} s, aborting",
                params.wait_new_pose.max_wait_time_s
            );

            persistant.abort_goal("no pose available");

            Ok(StepOutput {
                action: StackAction::Clear,
                data: DriveMgrOutput::Mnvr(MnvrCmd::Stop),
            })
        } else {
            // While waiting keep the platform stopped, we can't safely hold any other demand
            // without knowing where we are
            Ok(StepOutput {
                action: StackAction::None,
                data: DriveMgrOutput::Mnvr(MnvrCmd::Stop),
            })
        }
    }
}
