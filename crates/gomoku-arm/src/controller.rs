//! Non-blocking staged arm controller.
//!
//! Each call that starts a sequence commands the first joint and returns.
//! [`ArmController::advance`] is then polled with the current time; once a
//! stage's settle time has passed, the commanded joint is checked and the
//! next stage is entered.

use std::time::Instant;

use gomoku_core::{GridCell, GridSize};
use serde::{Deserialize, Serialize};

use crate::actuator::{Joint, Switch};
use crate::calibration::{CalibrationLattice, JointAngles};
use crate::motion::{JointKind, MotionTiming, Stage};
use crate::ArmConfigError;

/// Arm configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArmParams {
    pub grid_size: GridSize,
    pub lattice: CalibrationLattice,
    /// Pose above the stone supply.
    pub supply_pose: JointAngles,
    /// Rest pose reached by every reset.
    pub home_pose: JointAngles,
    pub timing: MotionTiming,
    /// Maximum accepted distance between a joint's angle and its target once
    /// the settle time is over.
    pub position_tolerance_deg: f32,
    /// Re-commands of a stage before giving up with [`Stage::Fault`].
    pub max_retries: u32,
}

impl Default for ArmParams {
    fn default() -> Self {
        Self {
            grid_size: GridSize::NINE,
            lattice: CalibrationLattice::default(),
            supply_pose: JointAngles::new(75.0, 30.0, 25.0),
            home_pose: JointAngles::default(),
            timing: MotionTiming::default(),
            position_tolerance_deg: 1.0,
            max_retries: 2,
        }
    }
}

impl ArmParams {
    pub fn validate(&self) -> Result<(), ArmConfigError> {
        let tol = self.position_tolerance_deg;
        if !tol.is_finite() || tol < 0.0 {
            return Err(ArmConfigError::InvalidTolerance(tol));
        }
        Ok(())
    }
}

/// The actuators of the arm.
pub struct ArmHardware {
    pub base: Box<dyn Joint>,
    pub shoulder: Box<dyn Joint>,
    pub elbow: Box<dyn Joint>,
    pub pump: Box<dyn Switch>,
    pub magnet: Box<dyn Switch>,
}

impl ArmHardware {
    fn joint_mut(&mut self, kind: JointKind) -> &mut dyn Joint {
        match kind {
            JointKind::Base => self.base.as_mut(),
            JointKind::Shoulder => self.shoulder.as_mut(),
            JointKind::Elbow => self.elbow.as_mut(),
        }
    }
}

fn angle_of(pose: &JointAngles, kind: JointKind) -> f32 {
    match kind {
        JointKind::Base => pose.base,
        JointKind::Shoulder => pose.shoulder,
        JointKind::Elbow => pose.elbow,
    }
}

pub struct ArmController {
    hw: ArmHardware,
    params: ArmParams,
    stage: Stage,
    stage_started: Instant,
    /// Pose of the current place or grip sequence.
    target: JointAngles,
    retries: u32,
}

impl ArmController {
    pub fn new(hw: ArmHardware, params: ArmParams) -> Result<Self, ArmConfigError> {
        params.validate()?;
        Ok(Self {
            hw,
            target: params.home_pose,
            params,
            stage: Stage::Idle,
            stage_started: Instant::now(),
            retries: 0,
        })
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn params(&self) -> &ArmParams {
        &self.params
    }

    pub fn grid_size(&self) -> GridSize {
        self.params.grid_size
    }

    /// Joint angles for a board cell, `None` when it is off the board.
    pub fn interpolate(&self, cell: GridCell) -> Option<JointAngles> {
        self.params.lattice.interpolate(self.params.grid_size, cell)
    }

    /// Bring every joint home through the reset sequence.
    pub fn initialize(&mut self, now: Instant) -> bool {
        self.start(Stage::ResetStartElbow, self.params.home_pose, now)
    }

    /// Start placing the held stone at `cell`.
    ///
    /// Off-board cells are logged and ignored. Returns whether a sequence
    /// started.
    pub fn place_at(&mut self, cell: GridCell, now: Instant) -> bool {
        let Some(target) = self.interpolate(cell) else {
            log::warn!(
                "ignoring placement at {cell}: outside the {0}x{0} board",
                self.params.grid_size.lines()
            );
            return false;
        };
        log::debug!(
            "placing at {cell}: base {:.1}, shoulder {:.1}, elbow {:.1}",
            target.base,
            target.shoulder,
            target.elbow
        );
        self.start(Stage::PlaceStartBase, target, now)
    }

    /// Start fetching a stone from the supply.
    pub fn grip_new_piece(&mut self, now: Instant) -> bool {
        self.start(Stage::GripStartBase, self.params.supply_pose, now)
    }

    /// Pump on, settle, magnet on.
    pub fn grip(&mut self) {
        self.hw.pump.on();
        std::thread::sleep(self.params.timing.switch_settle());
        self.hw.magnet.on();
    }

    /// Magnet off, settle, pump off.
    pub fn release(&mut self) {
        self.hw.magnet.off();
        std::thread::sleep(self.params.timing.switch_settle());
        self.hw.pump.off();
    }

    /// Acknowledge a finished (or faulted) sequence and return to `Idle`.
    pub fn reset(&mut self, now: Instant) {
        if matches!(self.stage, Stage::Completed | Stage::Fault) {
            self.stage = Stage::Idle;
            self.stage_started = now;
            self.retries = 0;
        }
    }

    /// Advance the sequence if the current stage's settle time has passed.
    pub fn advance(&mut self, now: Instant) -> Stage {
        if self.stage.is_rest() {
            return self.stage;
        }
        let gate = self.params.timing.gate(self.stage);
        if now.saturating_duration_since(self.stage_started) < gate {
            return self.stage;
        }

        if let Some(kind) = self.stage.joint() {
            let goal = self.goal(kind);
            let joint = self.hw.joint_mut(kind);
            let goal = joint.clamp(goal);
            let actual = joint.angle();
            if (actual - goal).abs() > self.params.position_tolerance_deg {
                if self.retries < self.params.max_retries {
                    self.retries += 1;
                    log::warn!(
                        "{kind} at {actual:.1} deg, expected {goal:.1} in {:?}; retry {}/{}",
                        self.stage,
                        self.retries,
                        self.params.max_retries
                    );
                    self.hw.joint_mut(kind).set_angle(goal);
                    self.stage_started = now;
                } else {
                    log::error!(
                        "{kind} stuck at {actual:.1} deg (target {goal:.1}) in {:?}",
                        self.stage
                    );
                    self.fault(now);
                }
                return self.stage;
            }
        }

        match self.stage {
            Stage::PlaceMoveElbow => self.release(),
            Stage::GripMoveElbow => self.grip(),
            _ => {}
        }
        let next = self.stage.next();
        self.enter(next, now);
        self.stage
    }

    /// Stop in `Fault`, dropping a held stone.
    fn fault(&mut self, now: Instant) {
        if self.hw.pump.is_on() || self.hw.magnet.is_on() {
            log::warn!("releasing the held stone after a fault in {:?}", self.stage);
            self.release();
        }
        self.stage = Stage::Fault;
        self.stage_started = now;
    }

    fn start(&mut self, first: Stage, target: JointAngles, now: Instant) -> bool {
        if !self.stage.is_rest() {
            log::warn!("arm busy in {:?}, not starting {:?}", self.stage, first);
            return false;
        }
        self.target = target;
        self.enter(first, now);
        true
    }

    fn enter(&mut self, stage: Stage, now: Instant) {
        self.stage = stage;
        self.stage_started = now;
        self.retries = 0;
        if let Some(kind) = stage.joint() {
            let goal = self.goal(kind);
            self.hw.joint_mut(kind).set_angle(goal);
        }
        log::trace!("arm stage {stage:?}");
    }

    fn goal(&self, kind: JointKind) -> f32 {
        if self.stage.is_reset() {
            angle_of(&self.params.home_pose, kind)
        } else {
            angle_of(&self.target, kind)
        }
    }
}
