//! # Data Store

use log::{info, warn};

use crate::auto::drive_mgr::tm::DriveTm;
use nav_if::tc::{drive::DriveCmd, mnvr::MnvrCmd};

// ---------------------------------------------------------------------------
// ENUMS
// ---------------------------------------------------------------------------

/// Gives the reason the platform has been put into safe mode
#[derive(Debug, Eq, PartialEq, Copy, Clone)]
pub enum SafeModeCause {
    MakeSafeTc,
    TcServerNotConnected,
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Global data store for the executable.
#[derive(Default)]
pub struct DataStore {
    // Cycle management
    /// Number of cycles already executed
    pub num_cycles: u128,

    /// Session elapsed time at the start of the cycle
    pub session_time_s: f64,

    // Safe mode variables
    /// Determines if the platform is in safe mode.
    pub safe: bool,

    /// Gives the reason for the platform being in safe mode.
    pub safe_cause: Option<SafeModeCause>,

    // Commands pending execution this cycle
    /// Drive command to be passed to the drive manager
    pub drive_cmd: Option<DriveCmd>,

    /// Direct manouvre command, bypassing the drive manager
    pub mnvr_cmd: Option<MnvrCmd>,

    // Outputs
    /// The manouvre command output by this cycle, used to propagate the fake
    /// localisation source
    pub mnvr_output: Option<MnvrCmd>,

    /// Drive telemetry produced by the drive manager this cycle
    pub drive_tm: Option<DriveTm>,

    // Monitoring Counters
    /// Number of consecutive cycle overruns
    pub num_consec_cycle_overruns: u64,
}

// ---------------------------------------------------------------------------
// IMPLS
// ---------------------------------------------------------------------------

impl DataStore {
    /// Puts the platform into safe mode with the given cause.
    pub fn make_safe(&mut self, cause: SafeModeCause) {
        if !self.safe {
            warn!("Make safe requested, cause: {:?}", cause);
            self.safe = true;
            self.safe_cause = Some(cause);

            // Drop any pending commands so nothing executes while safe
            self.drive_cmd = None;
            self.mnvr_cmd = None;
        }
    }

    /// Attempts to disable the safe mode by clearing the given cause.
    ///
    /// Returns `Ok(())` if this cause was cleared and safe mode was disabled, or `Err(())`
    /// otherwise. To remove safe mode the provided cause must match the initial reason for safe
    /// mode being enabled.
    ///
    /// If safe mode was not enabled `Ok(())` is returned
    pub fn make_unsafe(&mut self, cause: SafeModeCause) -> Result<(), ()> {
        if !self.safe {
            return Ok(());
        }

        match self.safe_cause {
            Some(root_cause) => {
                if cause == root_cause {
                    self.safe = false;
                    self.safe_cause = None;
                    info!("Make unsafe requested, root cause match, safe mode disabled");
                    Ok(())
                } else {
                    Err(())
                }
            }
            None => Ok(()),
        }
    }

    /// Perform actions required at the start of a cycle.
    ///
    /// Clears those items that need clearing at the start of a cycle.
    pub fn cycle_start(&mut self) {
        self.mnvr_output = None;
        self.drive_tm = None;

        self.session_time_s = util::session::get_elapsed_seconds();
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_safe_mode_cause_matching() {
        let mut ds = DataStore::default();

        ds.make_safe(SafeModeCause::MakeSafeTc);
        assert!(ds.safe);

        // Only the root cause can clear safe mode
        assert!(ds.make_unsafe(SafeModeCause::TcServerNotConnected).is_err());
        assert!(ds.safe);

        assert!(ds.make_unsafe(SafeModeCause::MakeSafeTc).is_ok());
        assert!(!ds.safe);

        // Clearing while not safe is a no-op
        assert!(ds.make_unsafe(SafeModeCause::MakeSafeTc).is_ok());
    }

    #[test]
    fn test_make_safe_drops_pending_commands() {
        let mut ds = DataStore::default();
        ds.drive_cmd = Some(DriveCmd::Pause);
        ds.mnvr_cmd = Some(MnvrCmd::Stop);

        ds.make_safe(SafeModeCause::MakeSafeTc);

        assert!(ds.drive_cmd.is_none());
        assert!(ds.mnvr_cmd.is_none());
    }

    #[test]
    fn test_cycle_start_clears_outputs() {
        let mut ds = DataStore::default();
        ds.mnvr_output = Some(MnvrCmd::Stop);

        ds.cycle_start();

        assert!(ds.mnvr_output.is_none());
        assert!(ds.drive_tm.is_none());
    }
}
