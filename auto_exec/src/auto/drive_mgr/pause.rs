//! # [`DriveMgrState::Pause`] implementation

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::warn;

use super::{
    params::DriveMgrParams, states::Stop, DriveMgrError, DriveMgrOutput, DriveMgrPersistantData,
    DriveMgrState, StackAction, StepOutput,
};
use nav_if::{action::GoalStatus, tc::drive::DriveCmd};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Debug)]
pub struct Pause {
    stop_issued: bool,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Pause {
    pub fn new() -> Self {
        Self { stop_issued: false }
    }

    pub fn step(
        &mut self,
        _params: &DriveMgrParams,
        persistant: &mut DriveMgrPersistantData,
        cmd: Option<DriveCmd>,
    ) -> Result<StepOutput, DriveMgrError> {
        // The only commands accepted in Pause are Abort and Resume, but the Stop must be completed
        // first.
        match cmd {
            Some(DriveCmd::Abort) => {
                persistant.abort_goal("goal aborted by command");
                return Ok(StepOutput {
                    action: StackAction::Abort,
                    data: DriveMgrOutput::None,
                });
            }
            Some(DriveCmd::Resume) => {
                persistant.set_goal_status(GoalStatus::Active);
                return Ok(StepOutput {
                    action: StackAction::Pop,
                    data: DriveMgrOutput::None,
                });
            }
            None => (),
            _ => {
                warn!(
                    "Only DriveCmd::Abort and DriveCmd::Resume are accepted when in \
                    DriveMgrState::Pause, {:?} ignored",
                    cmd
                );
            }
        }

        // Issue stop if not already done
        if !self.stop_issued {
            self.stop_issued = true;

            persistant.set_goal_status(GoalStatus::Paused);

            Ok(StepOutput {
                action: StackAction::PushAbove(DriveMgrState::Stop(Stop::new())),
                data: DriveMgrOutput::None,
            })
        } else {
            Ok(StepOutput::none())
        }
    }
}
