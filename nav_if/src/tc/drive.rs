//! # Drive telecommands
//!
//! Commands for the drive manager: goal requests and control of an active
//! goal.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};
use structopt::StructOpt;

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// A command that can be performed by the drive manager.
#[derive(Debug, Clone, Serialize, Deserialize, StructOpt)]
pub enum DriveCmd {
    /// Pause the active goal. Can be resumed with the `resume` command.
    #[structopt(name = "pause")]
    Pause,

    /// Resume a previously paused goal.
    #[structopt(name = "resume")]
    Resume,

    /// Abort the active goal.
    #[structopt(name = "abort")]
    Abort,

    /// Follow the given path without planning around obstacles.
    #[structopt(name = "follow")]
    Follow(PathSpec),

    /// Autonomously navigate to the given coordinates in the map frame.
    #[structopt(name = "goto")]
    Goto {
        /// The x-coordinate of the target point in the map frame.
        x_m: f64,

        /// The y-coordinate of the target point in the map frame.
        y_m: f64,

        /// The heading to arrive at the target with. If not given any arrival
        /// heading is accepted.
        heading_rad: Option<f64>,
    },
}

/// A specification from which a concrete path can be built.
#[derive(Debug, Clone, Serialize, Deserialize, StructOpt)]
pub enum PathSpec {
    /// A sequence of (curvature, distance) pairs that defines a path starting
    /// from the current pose.
    #[structopt(name = "ackseq")]
    AckSeq {
        /// Spacing between the generated points of the path
        #[structopt(name = "sep")]
        separation_m: f64,

        /// Flat list of alternating curvature [1/m] and distance [m] values
        #[structopt(required = true)]
        seq: Vec<f64>,
    },

    /// A named route from the loaded map, resolved through the map manager.
    #[structopt(name = "route")]
    Route {
        /// The name of the route in the map
        name: String,
    },
}
