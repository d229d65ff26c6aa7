//! # Navigation Interface Library
//!
//! This library defines the interface surface between the autonomy executable
//! and its ground-side clients: the telecommand envelope, the Drive action
//! protocol, and the network layer used to carry both.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

pub mod action;
pub mod net;
pub mod tc;
