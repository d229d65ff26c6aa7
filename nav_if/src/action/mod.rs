//! # Drive Action Protocol
//!
//! The drive action follows the classic goal/feedback/result pattern: the
//! ground requests a goal, the executable streams feedback while the goal is
//! active, and a single result is produced when the goal reaches a terminal
//! status.
//!
//! Goal ids are issued by the drive manager and increase monotonically within
//! a session, so clients can discard feedback belonging to a stale goal.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::tc::drive::PathSpec;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A requested drive goal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriveGoal {
    /// Id assigned to this goal by the drive manager.
    pub id: u64,

    /// What the goal should achieve.
    pub target: DriveTarget,
}

/// Feedback on the active goal, published once per cycle while a goal exists.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriveFeedback {
    /// Id of the goal this feedback belongs to.
    pub goal_id: u64,

    /// Time the feedback was generated.
    pub timestamp: DateTime<Utc>,

    /// Current status of the goal.
    pub status: GoalStatus,

    /// Current pose estimate, as (x [m], y [m], heading [rad]).
    pub pose: Option<(f64, f64, f64)>,

    /// Distance travelled since the goal was accepted, in meters.
    pub dist_travelled_m: f64,

    /// Straight-line distance remaining to the target, in meters.
    pub dist_remaining_m: f64,

    /// Fraction of the planned path that has been completed, in [0, 1].
    pub completion: f64,
}

/// The single result produced when a goal reaches a terminal status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriveResult {
    /// Id of the goal this result belongs to.
    pub goal_id: u64,

    /// How the goal ended.
    pub outcome: DriveOutcome,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// What a drive goal should achieve.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DriveTarget {
    /// Navigate autonomously to the given position in the map frame,
    /// optionally arriving with a specific heading.
    Goto {
        x_m: f64,
        y_m: f64,
        heading_rad: Option<f64>,
    },

    /// Follow the given path without planning.
    Follow(PathSpec),
}

/// Status of a drive goal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum GoalStatus {
    /// The goal has been accepted but execution hasn't started yet.
    Pending,

    /// The goal is being executed.
    Active,

    /// The goal is paused, awaiting a resume or abort.
    Paused,

    /// Terminal: the goal completed successfully.
    Succeeded,

    /// Terminal: the goal was aborted, either by command or by an execution
    /// failure.
    Aborted,

    /// Terminal: the goal was replaced by a newer goal.
    Preempted,
}

/// How a drive goal ended.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum DriveOutcome {
    Succeeded,
    Aborted { reason: String },
    Preempted,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Default for GoalStatus {
    fn default() -> Self {
        Self::Pending
    }
}

impl Default for DriveFeedback {
    fn default() -> Self {
        Self {
            goal_id: 0,
            timestamp: Utc::now(),
            status: GoalStatus::default(),
            pose: None,
            dist_travelled_m: 0.0,
            dist_remaining_m: 0.0,
            completion: 0.0,
        }
    }
}

impl GoalStatus {
    /// True if this status is terminal, i.e. no further transitions are
    /// possible.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Aborted | Self::Preempted)
    }

    /// True if the transition from self to `to` is legal.
    ///
    /// Legal transitions are:
    /// - `Pending -> Active | Aborted | Preempted`
    /// - `Active -> Paused | Succeeded | Aborted | Preempted`
    /// - `Paused -> Active | Aborted | Preempted`
    pub fn can_transition(&self, to: GoalStatus) -> bool {
        use GoalStatus::*;

        match (self, to) {
            (Pending, Active) => true,
            (Active, Paused) => true,
            (Paused, Active) => true,
            (Active, Succeeded) => true,
            (Pending, Aborted) | (Active, Aborted) | (Paused, Aborted) => true,
            (Pending, Preempted) | (Active, Preempted) | (Paused, Preempted) => true,
            _ => false,
        }
    }
}

impl DriveOutcome {
    /// Get the terminal status matching this outcome.
    pub fn status(&self) -> GoalStatus {
        match self {
            Self::Succeeded => GoalStatus::Succeeded,
            Self::Aborted { .. } => GoalStatus::Aborted,
            Self::Preempted => GoalStatus::Preempted,
        }
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_transitions() {
        use GoalStatus::*;

        assert!(Pending.can_transition(Active));

        // Goals can be recalled or fail before execution starts
        assert!(Pending.can_transition(Aborted));
        assert!(Pending.can_transition(Preempted));

        assert!(Active.can_transition(Paused));
        assert!(Paused.can_transition(Active));
        assert!(Active.can_transition(Succeeded));
        assert!(Paused.can_transition(Preempted));

        // No leaving a terminal status
        assert!(!Succeeded.can_transition(Active));
        assert!(!Aborted.can_transition(Pending));
        assert!(!Preempted.can_transition(Paused));

        // No skipping straight to success from pending or paused
        assert!(!Pending.can_transition(Succeeded));
        assert!(!Paused.can_transition(Succeeded));
    }

    #[test]
    fn test_outcome_status() {
        assert_eq!(DriveOutcome::Succeeded.status(), GoalStatus::Succeeded);
        assert_eq!(
            DriveOutcome::Aborted {
                reason: "test".into()
            }
            .status(),
            GoalStatus::Aborted
        );
        assert!(DriveOutcome::Preempted.status().is_terminal());
    }
}
