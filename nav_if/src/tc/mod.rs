//! # Telecommand module
//!
//! This module defines the telecommands that can be sent to the autonomy
//! executable, and the responses the executable gives. Telecommands are
//! serialised as JSON strings on the wire.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

pub mod drive;
pub mod mnvr;

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

// External
use serde::{Deserialize, Serialize};
use structopt::StructOpt;
use thiserror::Error;

// Internal
use drive::DriveCmd;
use mnvr::MnvrCmd;

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// A telecommand, i.e. an instruction sent to the autonomy executable by the
/// ground station.
#[derive(Debug, Clone, Serialize, Deserialize, StructOpt)]
pub enum Tc {
    /// Put the executable into safe mode, no motion demands will be produced.
    #[structopt(name = "safe")]
    MakeSafe,

    /// Clear a ground-commanded safe mode.
    #[structopt(name = "unsafe")]
    MakeUnsafe,

    /// Perform a direct manouvre, bypassing the drive manager. Used for
    /// checkout only.
    #[structopt(name = "mnvr")]
    Mnvr(MnvrCmd),

    /// A command for the drive manager (goals and goal control).
    #[structopt(name = "drive")]
    Drive(DriveCmd),
}

/// Response to a telecommand.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum TcResponse {
    /// The TC was accepted.
    Ok,

    /// The TC could not be parsed.
    Invalid,

    /// The TC was understood but cannot be executed now, for example because
    /// the executable is in safe mode.
    CannotExecute,
}

/// Possible parsing errors.
#[derive(Debug, Error)]
pub enum TcParseError {
    #[error("TC contains invalid JSON: {0}")]
    InvalidJson(serde_json::Error),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Tc {
    /// Parse a new TC from a JSON packet
    pub fn from_json(json_str: &str) -> Result<Self, TcParseError> {
        serde_json::from_str(json_str).map_err(TcParseError::InvalidJson)
    }

    /// Serialise the TC into a JSON packet
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tc_json_round_trip() {
        let tc = Tc::Drive(DriveCmd::Goto {
            x_m: 4.5,
            y_m: -2.0,
            heading_rad: None,
        });

        let json = tc.to_json().unwrap();
        let parsed = Tc::from_json(&json).unwrap();

        match parsed {
            Tc::Drive(DriveCmd::Goto { x_m, y_m, .. }) => {
                assert!((x_m - 4.5).abs() < f64::EPSILON);
                assert!((y_m + 2.0).abs() < f64::EPSILON);
            }
            _ => panic!("Parsed TC has wrong variant"),
        }
    }

    #[test]
    fn test_tc_invalid_json() {
        assert!(matches!(
            Tc::from_json("{not even json"),
            Err(TcParseError::InvalidJson(_))
        ));

        // Valid JSON but not a TC
        assert!(matches!(
            Tc::from_json(r#"{"Warp": 9}"#),
            Err(TcParseError::InvalidJson(_))
        ));
    }
}
