//! Facade crate of the Gomoku robot.
//!
//! This crate provides:
//! - re-exports of the core, vision, arm and game crates
//! - [`RobotConfig`], one JSON file for the whole robot
//! - [`Robot`], which wires the vision runner, the turn coordinator and the
//!   arm worker together
//!
//! ## Quickstart
//!
//! ```no_run
//! use gomoku_robot::{simulated_hardware, ImageDirSource, Robot, RobotConfig};
//! use std::time::Duration;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = RobotConfig::load_json("robot.json")?;
//! let (_pwm, hardware) = simulated_hardware(&config.servos)?;
//! let mut robot = Robot::new(&config, hardware)?;
//! robot.begin();
//! let summary = robot.run(&mut ImageDirSource::new("frames")?)?;
//! println!("{} moves, {:?}", summary.moves.len(), summary.status);
//! robot.shutdown(Duration::from_secs(60));
//! # Ok(())
//! # }
//! ```

mod config;
mod robot;

pub use gomoku_arm as arm;
pub use gomoku_core as core;
pub use gomoku_game as game;
pub use gomoku_vision as vision;

pub use config::{ConfigError, RobotConfig, ServoSet};
pub use robot::{pwm_hardware, simulated_hardware, Robot, RobotError, RunSummary};

pub use gomoku_core::{GridCell, GridSize, PieceEvent, Stone};
pub use gomoku_game::GameStatus;
pub use gomoku_vision::{FrameIter, FrameSource, ImageDirSource};
