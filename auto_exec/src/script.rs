//! # Script interpreter module
//!
//! This module provides an interpreter for timed telecommand scripts, allowing
//! telecommands to be executed from a file rather than over the network.
//!
//! Scripts contain one entry per line in the format `time_s: <tc json>;`, for
//! example:
//!
//! ```text
//! 1.0: {"Drive": {"Goto": {"x_m": 5.0, "y_m": 2.0, "heading_rad": null}}};
//! ```

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use regex::RegexBuilder;
use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

// Internal
use nav_if::tc::{Tc, TcParseError};
use util::session::get_elapsed_seconds;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A command which is scripted to occur at a specific time.
pub struct Command {
    /// The time the command is supposed to execute at
    exec_time_s: f64,

    /// The Telecommand to run
    tc: Tc,
}

/// A script interpreter.
///
/// After initialising with the path to the script to run use
/// `.get_pending_tcs` to acquire a list of telecommands that need executing.
pub struct ScriptInterpreter {
    _script_path: PathBuf,
    cmds: VecDeque<Command>,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("Could not find the script at {0}")]
    ScriptNotFound(String),

    #[error("Could not load the script: {0}")]
    ScriptLoadError(std::io::Error),

    #[error("The script is empty (or is so bad it can't be read)")]
    ScriptEmpty,

    #[error(
        "Script contains an invalid timestamp: {0}. \
        Should be a float (like 1.0)"
    )]
    InvalidTimestamp(String),

    #[error("Script contains an invalid TC at {0} s: {1}")]
    InvalidTc(f64, TcParseError),
}

pub enum PendingTcs {
    None,
    Some(Vec<Tc>),
    EndOfScript,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl ScriptInterpreter {
    /// Create a new interpreter from the given script path.
    pub fn new<P: AsRef<Path>>(script_path: P) -> Result<Self, ScriptError> {
        // Get the path in a buffer
        let path = PathBuf::from(script_path.as_ref());

        // Check that the script file exists.
        if !path.exists() {
            return Err(ScriptError::ScriptNotFound(
                path.to_string_lossy().to_string(),
            ));
        }

        // Load the script into a string
        let script = match fs::read_to_string(script_path) {
            Ok(s) => s,
            Err(e) => return Err(ScriptError::ScriptLoadError(e)),
        };

        Self::from_str(path, &script)
    }

    fn from_str(path: PathBuf, script: &str) -> Result<Self, ScriptError> {
        // Each entry is a `time: payload;` line, the payload being the TC JSON
        let line_re = RegexBuilder::new(r"^\s*(\d+(\.\d+)?)\s*:\s*([^;]*);")
            .multi_line(true)
            .build()
            .unwrap();

        let mut cmds: VecDeque<Command> = VecDeque::new();

        for cap in line_re.captures_iter(script) {
            let time_str = cap.get(1).unwrap().as_str();
            let exec_time_s: f64 = time_str
                .parse()
                .map_err(|e| ScriptError::InvalidTimestamp(format!("{}", e)))?;

            let tc = Tc::from_json(cap.get(3).unwrap().as_str())
                .map_err(|e| ScriptError::InvalidTc(exec_time_s, e))?;

            cmds.push_back(Command { exec_time_s, tc });
        }

        if cmds.is_empty() {
            return Err(ScriptError::ScriptEmpty);
        }

        Ok(ScriptInterpreter {
            _script_path: path,
            cmds,
        })
    }

    /// Return a vector of pending TCs, or `None` if no TCs need executing now.
    pub fn get_pending_tcs(&mut self) -> PendingTcs {
        if self.cmds.is_empty() {
            return PendingTcs::EndOfScript;
        }

        let current_time_s = get_elapsed_seconds();

        // Pop every command at the head of the queue whose exec time has
        // already passed. The queue is in script order so we can stop at the
        // first future command.
        let mut tc_vec: Vec<Tc> = Vec::new();

        while let Some(cmd) = self.cmds.front() {
            if cmd.exec_time_s >= current_time_s {
                break;
            }

            tc_vec.push(self.cmds.pop_front().unwrap().tc);
        }

        if tc_vec.is_empty() {
            PendingTcs::None
        } else {
            PendingTcs::Some(tc_vec)
        }
    }

    /// Get the number of TCs in the script
    pub fn get_num_tcs(&self) -> usize {
        self.cmds.len()
    }

    /// Get the length of the script in seconds
    pub fn get_duration(&self) -> f64 {
        match self.cmds.back() {
            Some(c) => c.exec_time_s,
            None => 0f64,
        }
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_parse_script() {
        let script = r#"
            0.5: "MakeSafe";
            1.0: "MakeUnsafe";
            2.5: {"Drive": {"Goto": {"x_m": 5.0, "y_m": 2.0, "heading_rad": null}}};
        "#;

        let interp = ScriptInterpreter::from_str(PathBuf::from("test"), script).unwrap();

        assert_eq!(interp.get_num_tcs(), 3);
        assert!((interp.get_duration() - 2.5).abs() < 1e-9);
    }

    #[test]
    fn test_empty_script_rejected() {
        let result = ScriptInterpreter::from_str(PathBuf::from("test"), "no commands here");

        assert!(matches!(result, Err(ScriptError::ScriptEmpty)));
    }

    #[test]
    fn test_invalid_tc_rejected() {
        let result =
            ScriptInterpreter::from_str(PathBuf::from("test"), "1.0: {\"NotARealTc\": 1};");

        assert!(matches!(result, Err(ScriptError::InvalidTc(_, _))));
    }
}
