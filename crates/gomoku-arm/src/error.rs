/// Invalid arm configuration, reported at construction time.
#[derive(thiserror::Error, Debug, PartialEq)]
pub enum ArmConfigError {
    #[error("calibration point ({row}, {col}) has a non-finite angle")]
    NonFiniteCalibration { row: usize, col: usize },
    #[error("servo on channel {channel}: min angle {min} must be below max angle {max}")]
    InvalidServoRange { channel: u8, min: f32, max: f32 },
    #[error("position tolerance must be finite and non-negative (got {0})")]
    InvalidTolerance(f32),
    #[error("pwm channel {0} is out of range (0..=15)")]
    InvalidChannel(u8),
}
