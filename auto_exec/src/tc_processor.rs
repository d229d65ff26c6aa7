//! # Telecommand processor module
//!
//! Routes validated TCs to the module that executes them.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::debug;

// Internal
use auto_lib::data_store::{DataStore, SafeModeCause};
use nav_if::tc::Tc;

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Apply a telecommand to the datastore.
///
/// Commands are routed by writing into the relevant datastore slot, the
/// owning module picks them up on its next step.
pub(crate) fn exec(ds: &mut DataStore, tc: &Tc) {
    match tc {
        Tc::Mnvr(m) => ds.mnvr_cmd = Some(*m),
        Tc::Drive(d) => ds.drive_cmd = Some(d.clone()),
        Tc::MakeSafe => {
            debug!("MakeSafe command recieved");
            ds.make_safe(SafeModeCause::MakeSafeTc);
        }
        Tc::MakeUnsafe => {
            debug!("MakeUnsafe command recieved");
            ds.make_unsafe(SafeModeCause::MakeSafeTc).ok();
        }
    }
}
