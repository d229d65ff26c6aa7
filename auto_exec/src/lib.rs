//! # Autonomy executable library
//!
//! Provides all the modules used by the `auto_exec` binary: the autonomy
//! state machine and its supporting map, navigation and control modules, plus
//! the telecommand/telemetry network endpoints.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Autonomy module - the drive manager and the modules it builds on
pub mod auto;

/// Global data store for the executable
pub mod data_store;

/// Executable-level parameters
pub mod params;

/// Timed telecommand script interpreter
pub mod script;

/// Telecommand server - receives TCs from the operator
pub mod tc_server;

/// Telemetry server - publishes the executable's state
pub mod tm_server;
