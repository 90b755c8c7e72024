//! Arm side of the Gomoku robot.
//!
//! [`CalibrationLattice`] turns a board cell into joint angles,
//! [`ArmController`] runs the staged place/grip/reset sequences when polled
//! with [`ArmController::advance`], and [`ArmWorker`] owns the controller on
//! its own thread, executing queued moves strictly one at a time.

mod actuator;
mod calibration;
mod controller;
mod error;
mod motion;
mod worker;

pub use actuator::{
    Joint, PwmOutput, PwmSwitch, Servo, ServoConfig, SimulatedPwm, Switch, MAGNET_CHANNEL,
    PUMP_CHANNEL, PWM_CHANNELS,
};
pub use calibration::{CalibrationLattice, JointAngles};
pub use controller::{ArmController, ArmHardware, ArmParams};
pub use error::ArmConfigError;
pub use motion::{JointKind, MotionTiming, Stage};
pub use worker::{ArmWorker, MoveTask, TaskReport};
