//! # Executable parameters

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::Deserialize;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Parameters for the `auto_exec` binary itself.
#[derive(Debug, Clone, Deserialize)]
pub struct AutoExecParams {
    /// Endpoint the TC server binds to.
    pub tc_endpoint: String,

    /// Endpoint the TM server binds to.
    pub tm_endpoint: String,

    /// Root directory of the map store, relative to the software root.
    pub map_store_root: String,

    /// Name of the map to load from the store at startup.
    pub map_name: String,
}
