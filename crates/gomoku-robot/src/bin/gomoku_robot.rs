//! gomoku-robot CLI: play Gomoku from a camera or a directory of frames.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use gomoku_robot::{simulated_hardware, ImageDirSource, Robot, RobotConfig, Stone};
use log::LevelFilter;

type CliError = Box<dyn std::error::Error>;
type CliResult<T> = Result<T, CliError>;

#[derive(Parser)]
#[command(name = "gomoku-robot")]
#[command(about = "Camera-guided Gomoku robot arm (dry-run PWM backend)")]
#[command(version)]
struct Cli {
    /// Robot config (JSON). Defaults are used when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Replay the image files of a directory, in name order.
    #[arg(long)]
    frames: Option<PathBuf>,

    /// Read frames from the camera with this index; ignored with `--frames`.
    #[cfg(feature = "camera")]
    #[arg(long)]
    camera: Option<u32>,

    /// Color the robot plays; overrides the config.
    #[arg(long, value_enum)]
    robot: Option<RobotStone>,

    /// Log verbosity (off, error, warn, info, debug, trace).
    #[arg(long, default_value = "info")]
    log_level: LevelFilter,

    /// Seconds to wait for queued arm moves once the frames run out.
    #[arg(long, default_value = "120")]
    wait_secs: u64,

    /// Write the default config to this path and exit.
    #[arg(long)]
    write_default_config: Option<PathBuf>,

    /// Emit JSON log lines through `tracing`.
    #[cfg(feature = "tracing")]
    #[arg(long)]
    json_log: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum RobotStone {
    Black,
    White,
}

impl From<RobotStone> for Stone {
    fn from(s: RobotStone) -> Self {
        match s {
            RobotStone::Black => Stone::Black,
            RobotStone::White => Stone::White,
        }
    }
}

fn init_logging(cli: &Cli) -> CliResult<()> {
    #[cfg(feature = "tracing")]
    {
        let _ = tracing_log::LogTracer::init();
        log::set_max_level(cli.log_level);
        gomoku_robot::core::init_tracing(cli.json_log);
        Ok(())
    }
    #[cfg(not(feature = "tracing"))]
    {
        gomoku_robot::core::init_with_level(cli.log_level)?;
        Ok(())
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> CliResult<()> {
    init_logging(cli)?;

    if let Some(path) = &cli.write_default_config {
        RobotConfig::default().write_json(path)?;
        println!("wrote default config to {}", path.display());
        return Ok(());
    }

    let mut config = match &cli.config {
        Some(path) => RobotConfig::load_json(path)?,
        None => RobotConfig::default(),
    };
    if let Some(stone) = cli.robot {
        config.robot_stone = stone.into();
    }

    let (_pwm, hardware) = simulated_hardware(&config.servos)?;
    let mut robot = Robot::new(&config, hardware)?;
    if let Some(cell) = robot.begin() {
        log::info!("opening move at {cell}");
    }

    let summary = if let Some(dir) = &cli.frames {
        let mut source = ImageDirSource::new(dir)?;
        robot.run(&mut source)?
    } else {
        run_camera(cli, &mut robot)?
    };

    let reports = robot.shutdown(Duration::from_secs(cli.wait_secs));
    log::info!("arm executed {} moves", reports.len());
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

#[cfg(feature = "camera")]
fn run_camera(cli: &Cli, robot: &mut Robot) -> CliResult<gomoku_robot::RunSummary> {
    let index = cli.camera.unwrap_or(0);
    let mut source = gomoku_robot::vision::CameraSource::open(index)?;
    Ok(robot.run(&mut source)?)
}

#[cfg(not(feature = "camera"))]
fn run_camera(_cli: &Cli, _robot: &mut Robot) -> CliResult<gomoku_robot::RunSummary> {
    Err("no frame source: pass --frames DIR (camera input needs the `camera` feature)".into())
}
