//! JSON configuration of the whole robot.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use gomoku_arm::{ArmConfigError, ArmParams, JointAngles, ServoConfig};
use gomoku_core::Stone;
use gomoku_game::EngineParams;
use gomoku_vision::VisionParams;
use serde::{Deserialize, Serialize};

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid config {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error(transparent)]
    Arm(#[from] ArmConfigError),
    #[error("vision grid is {vision}x{vision} but arm grid is {arm}x{arm}")]
    GridMismatch { vision: u8, arm: u8 },
    #[error("servo channel {0} is used twice")]
    ChannelConflict(u8),
    #[error("{pose} {joint} angle {angle} is outside the servo range [{min}, {max}]")]
    PoseOutOfRange {
        pose: String,
        joint: &'static str,
        angle: f32,
        min: f32,
        max: f32,
    },
}

/// Calibration of the three arm servos.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServoSet {
    pub base: ServoConfig,
    pub shoulder: ServoConfig,
    pub elbow: ServoConfig,
}

impl Default for ServoSet {
    fn default() -> Self {
        Self {
            base: ServoConfig::BASE,
            shoulder: ServoConfig::SHOULDER,
            elbow: ServoConfig::ELBOW,
        }
    }
}

impl ServoSet {
    fn channels(&self) -> [u8; 3] {
        [self.base.channel, self.shoulder.channel, self.elbow.channel]
    }

    /// Every joint of `angles` must lie within its servo's range.
    fn check_pose(
        &self,
        pose: impl Fn() -> String,
        angles: JointAngles,
    ) -> Result<(), ConfigError> {
        let joints = [
            ("base", angles.base, &self.base),
            ("shoulder", angles.shoulder, &self.shoulder),
            ("elbow", angles.elbow, &self.elbow),
        ];
        for (joint, angle, servo) in joints {
            if !(servo.min_angle..=servo.max_angle).contains(&angle) {
                return Err(ConfigError::PoseOutOfRange {
                    pose: pose(),
                    joint,
                    angle,
                    min: servo.min_angle,
                    max: servo.max_angle,
                });
            }
        }
        Ok(())
    }
}

/// Everything the robot needs at startup.
///
/// Missing fields take their defaults, so a file only has to list what
/// differs from the stock setup.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct RobotConfig {
    /// Color the robot plays. Black moves first.
    pub robot_stone: Stone,
    pub vision: VisionParams,
    pub arm: ArmParams,
    pub servos: ServoSet,
    pub engine: EngineParams,
}

impl Default for RobotConfig {
    fn default() -> Self {
        Self {
            robot_stone: Stone::White,
            vision: VisionParams::default(),
            arm: ArmParams::default(),
            servos: ServoSet::default(),
            engine: EngineParams::default(),
        }
    }
}

impl RobotConfig {
    /// Read and validate a config file.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: RobotConfig =
            serde_json::from_str(&raw).map_err(|source| ConfigError::Json {
                path: path.to_path_buf(),
                source,
            })?;
        config.validate()?;
        Ok(config)
    }

    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self).map_err(|source| ConfigError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        fs::write(path, json + "\n").map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let vision = self.vision.pieces.grid_size.lines();
        let arm = self.arm.grid_size.lines();
        if vision != arm {
            return Err(ConfigError::GridMismatch { vision, arm });
        }
        self.arm.validate()?;

        let channels = self.servos.channels();
        for (i, &ch) in channels.iter().enumerate() {
            if channels[..i].contains(&ch)
                || ch == gomoku_arm::PUMP_CHANNEL
                || ch == gomoku_arm::MAGNET_CHANNEL
            {
                return Err(ConfigError::ChannelConflict(ch));
            }
        }
        for servo in [&self.servos.base, &self.servos.shoulder, &self.servos.elbow] {
            servo.validate()?;
        }

        for (row, points) in self.arm.lattice.points().iter().enumerate() {
            for (col, &angles) in points.iter().enumerate() {
                self.servos
                    .check_pose(|| format!("lattice point ({row}, {col})"), angles)?;
            }
        }
        self.servos
            .check_pose(|| "supply pose".to_string(), self.arm.supply_pose)?;
        self.servos
            .check_pose(|| "home pose".to_string(), self.arm.home_pose)?;
        Ok(())
    }
}
