//! # Defines the telemetry pack for the drive manager

// -----------------------------------------------------------------------------------------------
// IMPORTS
// -----------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

use crate::auto::{loc::Pose, path::Path};
use nav_if::action::{DriveFeedback, DriveResult, GoalStatus};

// -----------------------------------------------------------------------------------------------
// STRUCTS
// -----------------------------------------------------------------------------------------------

/// Summary of the drive manager state, sent by the TM server every cycle.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DriveTm {
    /// The current pose estimate.
    pub pose: Option<Pose>,

    /// The path currently being executed.
    pub path: Option<Path>,

    /// Id of the active goal, if any.
    pub goal_id: Option<u64>,

    /// Status of the active goal.
    pub status: Option<GoalStatus>,

    /// Latest feedback on the active goal.
    pub feedback: Option<DriveFeedback>,

    /// Result of the most recently finished goal.
    pub result: Option<DriveResult>,
}
