//! #  [`DriveMgrState::Stop`] implementation

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::{info, warn};
use serde::Deserialize;
use util::session;

use super::{
    params::DriveMgrParams, states::WaitNewPose, DriveMgrError, DriveMgrOutput,
    DriveMgrPersistantData, DriveMgrState, StackAction, StepOutput,
};
use crate::auto::loc::Pose;
use nav_if::tc::drive::DriveCmd;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Stop state of the DriveMgr.
///
/// Brings the platform to rest and pops itself off the stack once the pose has
/// been stationary for the required time.
#[derive(Debug)]
pub struct Stop {
    /// Time at which the platform was first considered to be stationary
    stationary_start_time_s: f64,

    /// Pose at the last stationary check
    last_pose: Option<Pose>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct StopParams {
    /// Time in seconds the platform must be stationary before it is considered stopped
    pub min_stationary_time_s: f64,

    /// Maximum position change magnitude that will still be considered stationary
    pub position_delta_max_magn_m: f64,

    /// Maximum attitude change magnitude that will be considered stationary
    pub attitude_delta_max_magn_rad: f64,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Stop {
    pub fn new() -> Self {
        Self {
            stationary_start_time_s: 0.0,
            last_pose: None,
        }
    }

    pub fn step(
        &mut self,
        params: &DriveMgrParams,
        persistant: &mut DriveMgrPersistantData,
        cmd: Option<DriveCmd>,
    ) -> Result<StepOutput, DriveMgrError> {
        // Abort is the only command honoured while stopping, anything else
        // has to wait until the stop completes.
        match cmd {
            None => (),
            Some(DriveCmd::Abort) => {
                persistant.abort_goal("goal aborted by command");
                return Ok(StepOutput {
                    action: StackAction::Clear,
                    data: DriveMgrOutput::None,
                });
            }
            Some(other) => {
                warn!("{:?} ignored while in DriveMgrState::Stop", other);
            }
        }

        // Without a pose there is no way to judge whether we're stationary
        let current_pose = match persistant.loc_mgr.get_pose() {
            Some(p) => p,
            None => {
                return Ok(StepOutput {
                    action: StackAction::PushAbove(DriveMgrState::WaitNewPose(WaitNewPose::new())),
                    data: DriveMgrOutput::None,
                })
            }
        };

        let current_time_s = session::get_elapsed_seconds();

        // The first cycle with a pose just records it, and the stationary
        // clock starts from here
        let last_pose = match self.last_pose.take() {
            Some(p) => p,
            None => {
                self.stationary_start_time_s = current_time_s;
                self.last_pose = Some(current_pose);

                return Ok(StepOutput::none());
            }
        };

        // Motion beyond either delta limit restarts the stationary clock
        let pos_delta_magn_m = (current_pose.position_m - last_pose.position_m).norm();
        let att_delta_magn_rad = last_pose.attitude_q.angle_to(&current_pose.attitude_q);

        if pos_delta_magn_m > params.stop.position_delta_max_magn_m
            || att_delta_magn_rad > params.stop.attitude_delta_max_magn_rad
        {
            self.stationary_start_time_s = current_time_s;
        }

        self.last_pose = Some(current_pose);

        // Check again next cycle if the platform hasn't been still long enough
        let stationary_time_s = current_time_s - self.stationary_start_time_s;
        if stationary_time_s <= params.stop.min_stationary_time_s {
            return Ok(StepOutput::none());
        }

        info!(
            "Platform stationary for {} s, DriveMgrState::Stop complete successfully",
            stationary_time_s
        );
        persistant.is_stopped = true;

        Ok(StepOutput {
            action: StackAction::Pop,
            data: DriveMgrOutput::None,
        })
    }
}
