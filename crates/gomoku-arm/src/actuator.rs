//! Joint and switch abstractions over PWM channels.
//!
//! The arm runs three hobby servos plus a vacuum pump and an electromagnet
//! on a 16-channel PWM board. Pulse generation itself lives behind
//! [`PwmOutput`]; everything above it talks in degrees and on/off.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::ArmConfigError;

/// Number of channels on the PWM board.
pub const PWM_CHANNELS: u8 = 16;
pub const PUMP_CHANNEL: u8 = 15;
pub const MAGNET_CHANNEL: u8 = 14;

/// Channel-level pulse output.
pub trait PwmOutput: Send + Sync {
    fn set_pulse_width_us(&self, channel: u8, micros: f32);
}

impl<P: PwmOutput + ?Sized> PwmOutput for Arc<P> {
    fn set_pulse_width_us(&self, channel: u8, micros: f32) {
        (**self).set_pulse_width_us(channel, micros)
    }
}

/// A single rotary joint.
pub trait Joint: Send {
    /// Command an absolute angle in degrees; implementations clamp to their
    /// mechanical range.
    fn set_angle(&mut self, degrees: f32);

    /// Last commanded (or measured) angle in degrees.
    fn angle(&self) -> f32;

    /// The angle `set_angle(degrees)` ends up commanding. Joints without
    /// mechanical limits return `degrees` unchanged.
    fn clamp(&self, degrees: f32) -> f32 {
        degrees
    }

    /// Step toward `target` in increments of at most `step` degrees, sleeping
    /// `delay` after each increment.
    fn set_angle_smoothly(&mut self, target: f32, step: f32, delay: Duration) {
        let step = step.abs();
        if step <= f32::EPSILON {
            self.set_angle(target);
            return;
        }
        loop {
            let current = self.angle();
            let remaining = target - current;
            if remaining.abs() <= step {
                self.set_angle(target);
                return;
            }
            self.set_angle(current + step.copysign(remaining));
            if self.angle() == current {
                // Clamped at a mechanical limit.
                return;
            }
            std::thread::sleep(delay);
        }
    }
}

/// A binary actuator.
pub trait Switch: Send {
    fn set(&mut self, on: bool);
    fn is_on(&self) -> bool;

    fn on(&mut self) {
        self.set(true)
    }

    fn off(&mut self) {
        self.set(false)
    }
}

/// Linear angle to pulse-width calibration of one servo.
///
/// `min_angle_pulse_us` may be larger than `max_angle_pulse_us` for servos
/// mounted in reverse.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ServoConfig {
    pub channel: u8,
    pub min_angle: f32,
    pub max_angle: f32,
    pub min_angle_pulse_us: f32,
    pub max_angle_pulse_us: f32,
}

impl ServoConfig {
    /// Base joint: rotation around the vertical axis, positive clockwise.
    pub const BASE: ServoConfig = ServoConfig {
        channel: 1,
        min_angle: -90.0,
        max_angle: 90.0,
        min_angle_pulse_us: 2500.0,
        max_angle_pulse_us: 1000.0,
    };

    /// Shoulder joint: positive moves the arm forward.
    pub const SHOULDER: ServoConfig = ServoConfig {
        channel: 2,
        min_angle: 0.0,
        max_angle: 90.0,
        min_angle_pulse_us: 1750.0,
        max_angle_pulse_us: 1000.0,
    };

    /// Elbow joint: positive moves the tool down.
    pub const ELBOW: ServoConfig = ServoConfig {
        channel: 0,
        min_angle: 0.0,
        max_angle: 75.0,
        min_angle_pulse_us: 1750.0,
        max_angle_pulse_us: 2375.0,
    };

    pub fn validate(&self) -> Result<(), ArmConfigError> {
        if self.channel >= PWM_CHANNELS {
            return Err(ArmConfigError::InvalidChannel(self.channel));
        }
        let finite = self.min_angle.is_finite() && self.max_angle.is_finite();
        if !finite || self.min_angle >= self.max_angle {
            return Err(ArmConfigError::InvalidServoRange {
                channel: self.channel,
                min: self.min_angle,
                max: self.max_angle,
            });
        }
        Ok(())
    }

    #[inline]
    pub fn clamp(&self, degrees: f32) -> f32 {
        degrees.clamp(self.min_angle, self.max_angle)
    }

    /// Pulse width for `degrees` after clamping.
    pub fn pulse_us(&self, degrees: f32) -> f32 {
        let ratio = (self.clamp(degrees) - self.min_angle) / (self.max_angle - self.min_angle);
        self.min_angle_pulse_us + ratio * (self.max_angle_pulse_us - self.min_angle_pulse_us)
    }
}

/// Open-loop servo on a PWM channel.
pub struct Servo<P> {
    pwm: P,
    config: ServoConfig,
    angle: f32,
}

impl<P: PwmOutput> Servo<P> {
    pub fn new(pwm: P, config: ServoConfig) -> Result<Self, ArmConfigError> {
        config.validate()?;
        Ok(Self {
            pwm,
            angle: config.clamp(0.0),
            config,
        })
    }

    pub fn config(&self) -> &ServoConfig {
        &self.config
    }
}

impl<P: PwmOutput> Joint for Servo<P> {
    fn set_angle(&mut self, degrees: f32) {
        self.angle = self.config.clamp(degrees);
        self.pwm
            .set_pulse_width_us(self.config.channel, self.config.pulse_us(self.angle));
    }

    fn angle(&self) -> f32 {
        self.angle
    }

    fn clamp(&self, degrees: f32) -> f32 {
        self.config.clamp(degrees)
    }
}

/// Pump or electromagnet driven by a fixed on/off pulse width.
pub struct PwmSwitch<P> {
    pwm: P,
    channel: u8,
    on_pulse_us: f32,
    off_pulse_us: f32,
    on: bool,
}

impl<P: PwmOutput> PwmSwitch<P> {
    pub fn new(pwm: P, channel: u8) -> Result<Self, ArmConfigError> {
        if channel >= PWM_CHANNELS {
            return Err(ArmConfigError::InvalidChannel(channel));
        }
        Ok(Self {
            pwm,
            channel,
            on_pulse_us: 2500.0,
            off_pulse_us: 500.0,
            on: false,
        })
    }
}

impl<P: PwmOutput> Switch for PwmSwitch<P> {
    fn set(&mut self, on: bool) {
        let pulse = if on {
            self.on_pulse_us
        } else {
            self.off_pulse_us
        };
        self.pwm.set_pulse_width_us(self.channel, pulse);
        self.on = on;
    }

    fn is_on(&self) -> bool {
        self.on
    }
}

/// Dry-run PWM backend: logs and remembers the last pulse of each channel.
#[derive(Debug, Default)]
pub struct SimulatedPwm {
    pulses: Mutex<[Option<f32>; PWM_CHANNELS as usize]>,
}

impl SimulatedPwm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_pulse_us(&self, channel: u8) -> Option<f32> {
        let pulses = self.pulses.lock().unwrap_or_else(PoisonError::into_inner);
        pulses.get(channel as usize).copied().flatten()
    }
}

impl PwmOutput for SimulatedPwm {
    fn set_pulse_width_us(&self, channel: u8, micros: f32) {
        log::trace!("pwm channel {channel}: {micros:.0}us");
        let mut pulses = self.pulses.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(slot) = pulses.get_mut(channel as usize) {
            *slot = Some(micros);
        }
    }
}
