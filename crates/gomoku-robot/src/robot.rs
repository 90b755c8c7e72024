//! Wiring of vision, game and arm into one running robot.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;
use std::time::Duration;

use gomoku_arm::{
    ArmConfigError, ArmController, ArmHardware, ArmWorker, PwmOutput, PwmSwitch, Servo,
    SimulatedPwm, TaskReport, MAGNET_CHANNEL, PUMP_CHANNEL,
};
use gomoku_core::{GridCell, PieceEvent, PieceListener};
use gomoku_game::{GameStatus, GomokuEngine, TurnCoordinator};
use gomoku_vision::{FrameSource, RunEnd, RunStats, StopHandle, VisionError, VisionRunner};
use serde::Serialize;

use crate::config::{ConfigError, RobotConfig, ServoSet};

#[cfg(feature = "tracing")]
use tracing::instrument;

#[derive(thiserror::Error, Debug)]
pub enum RobotError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Arm(#[from] ArmConfigError),
    #[error("failed to start the arm worker: {0}")]
    Spawn(#[source] std::io::Error),
    #[error(transparent)]
    Vision(#[from] VisionError),
}

/// Servos, pump and magnet on one shared PWM board.
pub fn pwm_hardware<P>(pwm: P, servos: &ServoSet) -> Result<ArmHardware, ArmConfigError>
where
    P: PwmOutput + Clone + 'static,
{
    Ok(ArmHardware {
        base: Box::new(Servo::new(pwm.clone(), servos.base)?),
        shoulder: Box::new(Servo::new(pwm.clone(), servos.shoulder)?),
        elbow: Box::new(Servo::new(pwm.clone(), servos.elbow)?),
        pump: Box::new(PwmSwitch::new(pwm.clone(), PUMP_CHANNEL)?),
        magnet: Box::new(PwmSwitch::new(pwm, MAGNET_CHANNEL)?),
    })
}

/// Dry-run hardware; the returned board records every pulse.
pub fn simulated_hardware(
    servos: &ServoSet,
) -> Result<(Arc<SimulatedPwm>, ArmHardware), ArmConfigError> {
    let pwm = Arc::new(SimulatedPwm::new());
    let hw = pwm_hardware(Arc::clone(&pwm), servos)?;
    Ok((pwm, hw))
}

type Coordinator = TurnCoordinator<GomokuEngine, Arc<ArmWorker>>;

/// Outcome of [`Robot::run`].
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RunSummary {
    pub frames: u64,
    pub rectified: u64,
    pub processed: u64,
    pub events: u64,
    pub stopped: bool,
    pub status: GameStatus,
    /// Robot moves enqueued so far, in order.
    pub moves: Vec<GridCell>,
}

/// Vision runner, turn coordinator and arm worker of one game.
///
/// The coordinator runs on the caller's thread as the runner's listener; the
/// arm worker runs on its own thread.
pub struct Robot {
    runner: VisionRunner,
    coordinator: Rc<RefCell<Coordinator>>,
    moves: Rc<RefCell<Vec<GridCell>>>,
    worker: Arc<ArmWorker>,
}

impl Robot {
    /// Validate `config`, start the arm worker on `hardware` and register the
    /// coordinator with a fresh vision runner.
    pub fn new(config: &RobotConfig, hardware: ArmHardware) -> Result<Self, RobotError> {
        config.validate()?;
        let controller = ArmController::new(hardware, config.arm.clone())?;
        let worker = Arc::new(ArmWorker::spawn(controller).map_err(RobotError::Spawn)?);

        let engine = GomokuEngine::with_params(
            config.arm.grid_size,
            config.robot_stone,
            config.engine.clone(),
        );
        let coordinator = Rc::new(RefCell::new(TurnCoordinator::new(
            engine,
            Arc::clone(&worker),
            config.robot_stone,
        )));
        let moves = Rc::new(RefCell::new(Vec::new()));

        let mut runner = VisionRunner::new(config.vision.clone());
        let listener_coordinator = Rc::clone(&coordinator);
        let listener_moves = Rc::clone(&moves);
        runner.register_listener(move |event: &PieceEvent| {
            if let Some(cell) = listener_coordinator.borrow_mut().handle(event) {
                listener_moves.borrow_mut().push(cell);
            }
        });

        log::info!(
            "robot ready: plays {}, {lines}x{lines} board",
            config.robot_stone,
            lines = config.arm.grid_size.lines()
        );
        Ok(Self {
            runner,
            coordinator,
            moves,
            worker,
        })
    }

    /// Register another listener; it runs after the coordinator.
    pub fn register_listener<L: PieceListener + 'static>(&mut self, listener: L) {
        self.runner.register_listener(listener);
    }

    /// Make the opening move when the robot plays Black.
    pub fn begin(&mut self) -> Option<GridCell> {
        let cell = self.coordinator.borrow_mut().begin()?;
        self.moves.borrow_mut().push(cell);
        Some(cell)
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.runner.stop_handle()
    }

    pub fn status(&self) -> GameStatus {
        self.coordinator.borrow().status()
    }

    pub fn moves(&self) -> Vec<GridCell> {
        self.moves.borrow().clone()
    }

    pub fn worker(&self) -> &ArmWorker {
        &self.worker
    }

    /// Feed frames from `source` until it ends or the stop handle fires.
    #[cfg_attr(feature = "tracing", instrument(level = "info", skip_all))]
    pub fn run<S>(&mut self, source: &mut S) -> Result<RunSummary, RobotError>
    where
        S: FrameSource + ?Sized,
    {
        let (end, stats) = self.runner.run(source)?;
        Ok(self.summary(end, stats))
    }

    fn summary(&self, end: RunEnd, stats: RunStats) -> RunSummary {
        RunSummary {
            frames: stats.frames,
            rectified: stats.rectified,
            processed: stats.processed,
            events: stats.events,
            stopped: end == RunEnd::Stopped,
            status: self.status(),
            moves: self.moves(),
        }
    }

    /// Wait up to `timeout` for queued moves, then stop the arm worker.
    /// Returns the reports of the executed moves.
    pub fn shutdown(self, timeout: Duration) -> Vec<TaskReport> {
        if !self.worker.wait_idle(timeout) {
            log::warn!("{} arm moves still pending at shutdown", self.worker.pending());
        }
        let reports = self.worker.reports();
        let Robot {
            runner,
            coordinator,
            worker,
            ..
        } = self;
        // The coordinator holds the only other handle to the worker.
        drop(runner);
        drop(coordinator);
        match Arc::try_unwrap(worker) {
            Ok(worker) => {
                worker.shutdown();
            }
            Err(_) => log::warn!("arm worker still shared; it stops when the last handle drops"),
        }
        reports
    }
}
