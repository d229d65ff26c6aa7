//! # Manouvre telecommands
//!
//! Manouvre demands are the lowest level of motion command in the system.
//! They are produced by the trajectory controller while following a path, and
//! can also be sent directly from the ground for checkout purposes.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};
use structopt::StructOpt;

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// A manouvre that can be demanded of the platform.
#[derive(Debug, Copy, Clone, Serialize, Deserialize, StructOpt)]
pub enum MnvrCmd {
    /// A generic ackerman command.
    ///
    /// An ackerman manouvre will drive the platform in a circle around a
    /// centre of rotation, whose location is defined by the curvature of the
    /// turn and the crab angle.
    #[structopt(name = "ack")]
    Ackerman {
        /// The speed of the manouvre in meters/second.
        ///
        /// Positive speeds are "forwards", negative speeds are "backwards"
        speed_ms: f64,

        /// The curvature of the manouvre in 1/meters.
        ///
        /// Follows the right hand rule about the platform's Z+ (upwards) axis,
        /// so that positive curvature is a turn to the left, and negative
        /// curvature a turn to the right.
        curv_m: f64,

        /// The crab angle of the manouvre in radians.
        ///
        /// Follows the right hand grip rule about the platform's Z+ (upwards)
        /// axis, so that positive crab angles will move to the left, and
        /// negative crab angles to the right.
        crab_rad: f64,
    },

    /// A turn-on-the-spot manouvre about the centre of the wheelbase.
    #[structopt(name = "pt")]
    PointTurn {
        /// The turn rate of the manouvre in radians/second.
        ///
        /// Follows the right hand rule about the platform's Z+ (upwards) axis,
        /// so that a positive turn rate will rotate the platform to the left,
        /// and a negative turn rate to the right.
        rate_rads: f64,
    },

    /// Stop the platform, setting all drive speeds to zero.
    #[structopt(name = "stop")]
    Stop,
}
