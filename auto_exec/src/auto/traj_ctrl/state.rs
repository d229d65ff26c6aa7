//! Trajectory control module state

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// Internal
use super::*;
use crate::auto::{loc::Pose, path::Path};
use nav_if::tc::mnvr::MnvrCmd;
use util::params;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

pub struct TrajCtrl {
    params: TrajCtrlParams,

    /// Executing mode
    mode: TrajCtrlMode,

    input_pose: Option<Pose>,
    output_mnvr_cmd: Option<MnvrCmd>,
    report: StatusReport,

    /// The loaded sequence, cleared when the sequence finishes or aborts
    path_sequence: Option<Vec<Path>>,

    /// Index into the sequence of the path being executed
    path_index: usize,

    /// Index into the current path of the point being driven towards
    target_point_index: usize,

    /// PID controllers producing the manouvre commands
    controllers: TrajControllers,
}

/// The status report containing various error flags and monitoring quantities.
#[derive(Default, Copy, Clone)]
pub struct StatusReport {
    /// Lateral error to the current path segment
    pub lat_error_m: f64,

    /// Longitudonal error to the current target point
    pub long_error_m: f64,

    /// Heading error to the current path segment
    pub head_error_rad: f64,

    /// True if the lateral error limit was exceeded this cycle
    pub lat_error_limit_exceeded: bool,

    /// True if the heading error limit was exceeded this cycle
    pub head_error_limit_exceeded: bool,

    /// If true the sequence has finished and the module has returned to `Off`
    pub sequence_finished: bool,

    /// If true the sequence was ended by an error limit exceedance rather than
    /// reaching the end of the final path
    pub sequence_aborted: bool,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Potential errors that can occur during processing of the module.
#[derive(Debug, thiserror::Error)]
pub enum TrajCtrlError {
    #[error("Could not load the trajectory control parameters: {0}")]
    ParamLoadError(params::LoadError),

    /// A new sequence was loaded before the current one finished. The current sequence must be
    /// allowed to finish or be aborted first.
    #[error("A path sequence is already loaded")]
    SequenceAlreadyLoaded,

    /// The sequence to be loaded contains no paths.
    #[error("Cannot load an empty path sequence")]
    AttemptEmptySeqLoad,

    /// Some paths in the sequence to be loaded have fewer than two points. The vector gives
    /// their indices.
    #[error("The sequence contains invalid paths at index(s) {0:?}")]
    SequenceContainsInvalidPaths(Vec<usize>),

    /// An executing mode found no loaded sequence.
    #[error("No path sequence has been set")]
    NoSequence,

    /// Trajectory control was processed without a known pose.
    #[error("No pose has been set")]
    NoPose,
}

/// The possible modes of execution of TrajCtrl. Each mode is handled by a
/// `mode_xyz` function.
#[derive(Debug, Copy, Clone)]
pub enum TrajCtrlMode {
    Off,
    FollowPath,
    HeadingAdjust,
    SequenceFinished,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl TrajCtrl {
    /// Intiailise the TrajCtrl module from the parameter file at the given
    /// path.
    pub fn init(params_path: &str) -> Result<Self, TrajCtrlError> {
        let params = params::load(params_path).map_err(TrajCtrlError::ParamLoadError)?;

        Ok(Self::new(params))
    }

    /// Create a new TrajCtrl module from the given parameters.
    pub fn new(params: TrajCtrlParams) -> Self {
        Self {
            controllers: TrajControllers::new(&params),
            params,
            mode: TrajCtrlMode::Off,
            input_pose: None,
            output_mnvr_cmd: None,
            report: StatusReport::default(),
            path_sequence: None,
            path_index: 0,
            target_point_index: 0,
        }
    }

    /// Process one cycle of trajectory control with the given pose, producing
    /// the manouvre command (if any) and the cycle's status report.
    pub fn proc(&mut self, pose: &Pose) -> Result<(Option<MnvrCmd>, StatusReport), TrajCtrlError> {
        self.input_pose = Some(*pose);
        self.output_mnvr_cmd = None;
        self.report = StatusReport::default();

        // The mode functions fill in the outputs and handle any mode switches
        match self.mode {
            TrajCtrlMode::Off => self.mode_off(),
            TrajCtrlMode::FollowPath => self.mode_follow_path(),
            TrajCtrlMode::HeadingAdjust => self.mode_head_adjust(),
            TrajCtrlMode::SequenceFinished => self.mode_seq_finished(),
        }?;

        Ok((self.output_mnvr_cmd, self.report))
    }

    /// Load a new path sequence for execution.
    ///
    /// Execution begins on the next call to `proc`, starting in `HeadingAdjust`
    /// mode to line the platform up with the first segment.
    ///
    /// Only one sequence may be loaded at a time, loading another is an error
    /// until the current one finishes or is ended with `abort_path_sequence`.
    pub fn begin_path_sequence(&mut self, seq: Vec<Path>) -> Result<(), TrajCtrlError> {
        if self.path_sequence.is_some() {
            return Err(TrajCtrlError::SequenceAlreadyLoaded);
        }

        if seq.is_empty() {
            return Err(TrajCtrlError::AttemptEmptySeqLoad);
        }

        // Every path needs at least one segment to follow
        let invalid_path_indexes: Vec<usize> = seq
            .iter()
            .enumerate()
            .filter(|(_, p)| p.get_num_points() < 2)
            .map(|(i, _)| i)
            .collect();

        if !invalid_path_indexes.is_empty() {
            return Err(TrajCtrlError::SequenceContainsInvalidPaths(
                invalid_path_indexes,
            ));
        }

        // The first target is point 1 not 0, since a segment runs from the
        // point before the target up to the target itself.
        self.path_sequence = Some(seq);
        self.path_index = 0;
        self.target_point_index = 1;

        self.mode = TrajCtrlMode::HeadingAdjust;

        Ok(())
    }

    /// End the executing path sequence early.
    ///
    /// Moves the mode to sequence finished, so the next `proc` issues a stop
    /// command and clears the sequence. Does nothing if no sequence is loaded.
    pub fn abort_path_sequence(&mut self) -> Result<(), TrajCtrlError> {
        if self.path_sequence.is_some() {
            self.mode = TrajCtrlMode::SequenceFinished;
        }

        Ok(())
    }

    /// True if there is no sequence loaded and the module is not executing.
    pub fn is_off(&self) -> bool {
        matches!(self.mode, TrajCtrlMode::Off)
    }

    /// Mode not executing.
    ///
    /// No actions are taken in this mode. To move from Off to HeadingAdjust
    /// the user must call `begin_path_sequence`.
    fn mode_off(&mut self) -> Result<(), TrajCtrlError> {
        Ok(())
    }

    /// Mode following path
    ///
    /// In this mode TrajCtrl will output manouvre commands to execute the
    /// current path.
    fn mode_follow_path(&mut self) -> Result<(), TrajCtrlError> {
        let path_seq = self
            .path_sequence
            .clone()
            .ok_or(TrajCtrlError::NoSequence)?;
        let pose = self.input_pose.ok_or(TrajCtrlError::NoPose)?;

        // ---- TARGET MANAGEMENT ----

        // A negative longitudonal error means the target has been passed,
        // advance to the next point
        let long_err_m = self.get_long_error()?;

        if long_err_m < 0f64 {
            self.target_point_index += 1;
        }

        // Running off the end of the path moves on to the next path in the
        // sequence, and off the end of the sequence finishes it
        if self.target_point_index >= path_seq[self.path_index].get_num_points() {
            self.path_index += 1;
            self.target_point_index = 1;
        }

        if self.path_index >= path_seq.len() {
            self.mode = TrajCtrlMode::SequenceFinished;
            return self.mode_seq_finished();
        }

        // ---- COMMAND GENERATION ----

        // Target management has kept the indices valid, so the segment exists
        let segment = path_seq[self.path_index]
            .get_segment_to_target(self.target_point_index)
            .unwrap();

        let mnvr_cmd =
            self.controllers
                .get_ackerman_cmd(&segment, &pose, &mut self.report, &self.params);

        // Exceeding an error limit aborts immediately, so the platform stops
        // as close to the path as possible
        if self.report.lat_error_limit_exceeded || self.report.head_error_limit_exceeded {
            self.report.sequence_aborted = true;
            self.mode = TrajCtrlMode::SequenceFinished;
            self.mode_seq_finished()?;
        } else {
            self.output_mnvr_cmd = Some(mnvr_cmd);
        }

        Ok(())
    }

    /// Mode heading adjustment.
    ///
    /// In this mode TrajCtrl will command a point turn to align the platform
    /// with the current path segment.
    ///
    /// Sequences start in this mode so the platform lines up with the first
    /// segment before following it. Within a sequence consecutive paths are
    /// followed directly, the planner keeps them continuous in heading.
    fn mode_head_adjust(&mut self) -> Result<(), TrajCtrlError> {
        let path_seq = self
            .path_sequence
            .as_ref()
            .ok_or(TrajCtrlError::NoSequence)?;
        let pose = self.input_pose.ok_or(TrajCtrlError::NoPose)?;

        let segment = path_seq[self.path_index]
            .get_segment_to_target(self.target_point_index)
            .unwrap();
        let head_err_rad = TrajControllers::calc_head_error(&segment, &pose);

        self.report.head_error_rad = head_err_rad;

        // Within the threshold the adjustment is complete, stop turning and
        // start following the path
        if head_err_rad.abs() < self.params.head_adjust_threshold_rad {
            self.output_mnvr_cmd = Some(MnvrCmd::Stop);

            self.mode = TrajCtrlMode::FollowPath;
        } else {
            // The error and the turn rate share a sense, so turning against
            // the sign of the error reduces it
            self.output_mnvr_cmd = Some(MnvrCmd::PointTurn {
                rate_rads: -head_err_rad.signum() * self.params.head_adjust_rate_rads,
            });
        }

        Ok(())
    }

    /// Mode sequence finished.
    ///
    /// Runs once the sequence has completed or aborted. Issues a stop command,
    /// flags the end of the sequence in the report, unloads the sequence and
    /// returns to `Off`.
    fn mode_seq_finished(&mut self) -> Result<(), TrajCtrlError> {
        self.output_mnvr_cmd = Some(MnvrCmd::Stop);

        self.report.sequence_finished = true;

        self.path_sequence = None;
        self.path_index = 0;
        self.target_point_index = 0;

        self.mode = TrajCtrlMode::Off;

        Ok(())
    }

    /// Get the longitudonal error to the current target point.
    ///
    /// Positive errors indicate that the platform hasn't reached the target
    /// yet. Negative errors indicate the target has been passed.
    fn get_long_error(&mut self) -> Result<f64, TrajCtrlError> {
        let path_seq = self
            .path_sequence
            .as_ref()
            .ok_or(TrajCtrlError::NoSequence)?;
        let pose = self.input_pose.ok_or(TrajCtrlError::NoPose)?;

        // Target management keeps the indices within the current path
        let segment = path_seq[self.path_index]
            .get_segment_to_target(self.target_point_index)
            .unwrap();

        // Project the platform->target vector onto the segment direction. The
        // projection is the distance left to travel along the segment, which
        // goes negative once the platform's position is beyond the target.
        let to_target = segment.target_m - pose.position2();
        let long_err_m = segment.direction.dot(&to_target);

        self.report.long_error_m = long_err_m;

        Ok(long_err_m)
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use nalgebra::Vector2;

    fn test_params() -> TrajCtrlParams {
        TrajCtrlParams {
            lat_k_p: 1.0,
            lat_k_i: 0.0,
            lat_k_d: 0.0,
            head_k_p: 1.0,
            head_k_i: 0.0,
            head_k_d: 0.0,
            min_curv_dem_m: -2.0,
            max_curv_dem_m: 2.0,
            min_crab_dem_rad: -0.5,
            max_crab_dem_rad: 0.5,
            curv_speed_map_coeffs: vec![0.0, 0.1],
            min_speed_dem_ms: 0.01,
            max_speed_dem_ms: 0.1,
            lat_error_limit_m: 1.0,
            head_error_limit_rad: 1.0,
            head_adjust_rate_rads: 0.2,
            head_adjust_threshold_rad: 0.1,
        }
    }

    #[test]
    fn test_empty_sequence_rejected() {
        let mut traj_ctrl = TrajCtrl::new(test_params());

        assert!(matches!(
            traj_ctrl.begin_path_sequence(vec![]),
            Err(TrajCtrlError::AttemptEmptySeqLoad)
        ));
    }

    #[test]
    fn test_follow_straight_path() {
        let mut traj_ctrl = TrajCtrl::new(test_params());

        // Straight path along the x axis, platform at the origin facing along
        // it, so no heading adjust should be needed.
        let path = Path::direct(Vector2::new(0.0, 0.0), Vector2::new(1.0, 0.0), 0.05);
        traj_ctrl.begin_path_sequence(vec![path]).unwrap();

        // First cycle is heading adjust, which should complete immediately and
        // issue a stop
        let pose = Pose::from_heading(0.0, 0.0, 0.0);
        let (cmd, _) = traj_ctrl.proc(&pose).unwrap();
        assert!(matches!(cmd, Some(MnvrCmd::Stop)));

        // Next cycle should produce an ackerman demand
        let (cmd, report) = traj_ctrl.proc(&pose).unwrap();
        assert!(matches!(cmd, Some(MnvrCmd::Ackerman { .. })));
        assert!(!report.sequence_finished);

        // Stepping the pose to beyond the end of the path should finish the
        // sequence within a few cycles
        let end_pose = Pose::from_heading(1.1, 0.0, 0.0);
        let mut finished = false;
        for _ in 0..30 {
            let (_, report) = traj_ctrl.proc(&end_pose).unwrap();
            if report.sequence_finished {
                finished = true;
                break;
            }
        }
        assert!(finished);
        assert!(traj_ctrl.is_off());
    }

    #[test]
    fn test_heading_adjust_turn_sense() {
        let mut traj_ctrl = TrajCtrl::new(test_params());

        let path = Path::direct(Vector2::new(0.0, 0.0), Vector2::new(1.0, 0.0), 0.05);
        traj_ctrl.begin_path_sequence(vec![path]).unwrap();

        // Platform pointing left of the segment, the error is negative so we
        // expect a positive turn rate to bring it back
        let pose = Pose::from_heading(0.0, 0.0, 1.0);
        let (cmd, _) = traj_ctrl.proc(&pose).unwrap();

        match cmd {
            Some(MnvrCmd::PointTurn { rate_rads }) => assert!(rate_rads > 0.0),
            other => panic!("expected point turn command, got {:?}", other),
        }
    }

    #[test]
    fn test_abort_path_sequence() {
        let mut traj_ctrl = TrajCtrl::new(test_params());

        let path = Path::direct(Vector2::new(0.0, 0.0), Vector2::new(1.0, 0.0), 0.05);
        traj_ctrl.begin_path_sequence(vec![path]).unwrap();

        traj_ctrl.abort_path_sequence().unwrap();

        // The next proc issues a stop and clears the sequence
        let pose = Pose::from_heading(0.0, 0.0, 0.0);
        let (cmd, report) = traj_ctrl.proc(&pose).unwrap();

        assert!(matches!(cmd, Some(MnvrCmd::Stop)));
        assert!(report.sequence_finished);
        assert!(traj_ctrl.is_off());

        // Aborting with nothing loaded is a no-op
        traj_ctrl.abort_path_sequence().unwrap();
    }

    #[test]
    fn test_lat_error_abort() {
        let mut traj_ctrl = TrajCtrl::new(test_params());

        let path = Path::direct(Vector2::new(0.0, 0.0), Vector2::new(1.0, 0.0), 0.05);
        traj_ctrl.begin_path_sequence(vec![path]).unwrap();

        // Get through heading adjust
        let pose = Pose::from_heading(0.0, 0.0, 0.0);
        traj_ctrl.proc(&pose).unwrap();

        // Pose way off the path, sequence should be aborted
        let off_pose = Pose::from_heading(0.1, 5.0, 0.0);
        let (cmd, report) = traj_ctrl.proc(&off_pose).unwrap();

        assert!(report.sequence_aborted);
        assert!(report.sequence_finished);
        assert!(matches!(cmd, Some(MnvrCmd::Stop)));
    }
}
