use std::sync::{Arc, Mutex};
use std::time::Duration;

use gomoku_arm::{
    ArmController, ArmHardware, ArmParams, ArmWorker, CalibrationLattice, Joint, JointAngles,
    MotionTiming, PwmSwitch, Servo, ServoConfig, SimulatedPwm, Stage, Switch, MAGNET_CHANNEL,
    PUMP_CHANNEL,
};
use gomoku_core::{GridCell, GridSize, MoveSink};

type Log = Arc<Mutex<Vec<(&'static str, f32)>>>;

struct RecordingJoint {
    name: &'static str,
    angle: f32,
    log: Log,
}

impl Joint for RecordingJoint {
    fn set_angle(&mut self, degrees: f32) {
        self.log.lock().unwrap().push((self.name, degrees));
        self.angle = degrees;
    }

    fn angle(&self) -> f32 {
        self.angle
    }
}

struct RecordingSwitch {
    on: bool,
}

impl Switch for RecordingSwitch {
    fn set(&mut self, on: bool) {
        self.on = on;
    }

    fn is_on(&self) -> bool {
        self.on
    }
}

fn fast_params() -> ArmParams {
    ArmParams {
        supply_pose: JointAngles::new(80.0, 30.0, 25.0),
        timing: MotionTiming {
            stage_settle_ms: 2,
            reset_elbow_settle_ms: 3,
            switch_settle_ms: 0,
            poll_interval_ms: 1,
        },
        ..ArmParams::default()
    }
}

fn recording_worker(log: &Log) -> ArmWorker {
    let joint = |name| {
        Box::new(RecordingJoint {
            name,
            angle: 0.0,
            log: Arc::clone(log),
        }) as Box<dyn Joint>
    };
    let hw = ArmHardware {
        base: joint("base"),
        shoulder: joint("shoulder"),
        elbow: joint("elbow"),
        pump: Box::new(RecordingSwitch { on: false }),
        magnet: Box::new(RecordingSwitch { on: false }),
    };
    let arm = ArmController::new(hw, fast_params()).expect("valid params");
    ArmWorker::spawn(arm).expect("spawn worker")
}

#[test]
fn executes_moves_strictly_in_order() {
    let log = Log::default();
    let worker = recording_worker(&log);

    assert!(worker.enqueue_move(GridCell::new(2, 2)));
    assert!(worker.enqueue_move(GridCell::new(3, 3)));
    assert!(worker.wait_idle(Duration::from_secs(10)), "worker did not finish");

    let reports = worker.reports();
    assert_eq!(reports.len(), 2);
    assert_eq!(reports[0].task.cell, GridCell::new(2, 2));
    assert_eq!(reports[1].task.cell, GridCell::new(3, 3));
    assert!(reports.iter().all(|r| r.outcome == Stage::Completed));

    let lattice = CalibrationLattice::default();
    let first = lattice
        .interpolate(GridSize::NINE, GridCell::new(2, 2))
        .expect("on board");
    let second = lattice
        .interpolate(GridSize::NINE, GridCell::new(3, 3))
        .expect("on board");

    let bases: Vec<f32> = log
        .lock()
        .unwrap()
        .iter()
        .filter(|(name, _)| *name == "base")
        .map(|(_, angle)| *angle)
        .collect();
    // Homing, then per task: supply, home, cell, home.
    assert_eq!(
        bases,
        vec![0.0, 80.0, 0.0, first.base, 0.0, 80.0, 0.0, second.base, 0.0]
    );

    let arm = worker.shutdown().expect("controller back");
    assert_eq!(arm.stage(), Stage::Idle);
}

#[test]
fn rejects_off_board_moves_without_queueing() {
    let log = Log::default();
    let worker = recording_worker(&log);
    assert!(!worker.enqueue_move(GridCell::new(9, 0)));
    assert!(!worker.enqueue_move(GridCell::new(0, 12)));
    assert_eq!(worker.pending(), 0);
    assert!(worker.wait_idle(Duration::from_secs(1)));
    assert!(worker.reports().is_empty());
}

#[test]
fn shutdown_joins_an_idle_worker() {
    let log = Log::default();
    let worker = recording_worker(&log);
    assert!(worker.wait_idle(Duration::from_secs(1)));
    let arm = worker.shutdown().expect("controller back");
    assert_eq!(arm.grid_size(), GridSize::NINE);
}

#[test]
fn runs_on_simulated_servos() {
    let pwm = Arc::new(SimulatedPwm::new());
    let servo = |cfg| Servo::new(Arc::clone(&pwm), cfg).expect("servo config");
    let switch = |channel| PwmSwitch::new(Arc::clone(&pwm), channel).expect("switch channel");
    let hw = ArmHardware {
        base: Box::new(servo(ServoConfig::BASE)),
        shoulder: Box::new(servo(ServoConfig::SHOULDER)),
        elbow: Box::new(servo(ServoConfig::ELBOW)),
        pump: Box::new(switch(PUMP_CHANNEL)),
        magnet: Box::new(switch(MAGNET_CHANNEL)),
    };
    let arm = ArmController::new(hw, fast_params()).expect("valid params");
    let worker = ArmWorker::spawn(arm).expect("spawn worker");

    assert!(worker.enqueue_move(GridCell::new(8, 0)));
    assert!(worker.wait_idle(Duration::from_secs(10)));
    assert_eq!(worker.reports()[0].outcome, Stage::Completed);
    // Released and back home.
    assert_eq!(pwm.last_pulse_us(PUMP_CHANNEL), Some(500.0));
    assert_eq!(pwm.last_pulse_us(ServoConfig::BASE.channel), Some(1750.0));
}
