mod common;

use std::time::Duration;

use gomoku_robot::arm::{Stage, PUMP_CHANNEL};
use gomoku_robot::{simulated_hardware, FrameIter, GameStatus, GridCell, Robot, Stone};

use common::{board_frame, fast_config, BLACK};

#[test]
fn human_stone_drives_one_robot_move() {
    let config = fast_config();
    let (pwm, hardware) = simulated_hardware(&config.servos).expect("valid servos");
    let mut robot = Robot::new(&config, hardware).expect("robot starts");
    assert_eq!(robot.begin(), None);

    // Camera cell (4, 6) is robot cell (4, 2).
    let frames = vec![board_frame(&[((4, 6), BLACK)]); 12];
    let summary = robot.run(&mut FrameIter::new(frames)).expect("replay");

    assert_eq!(summary.frames, 12);
    assert_eq!(summary.events, 1);
    assert_eq!(summary.status, GameStatus::InProgress);
    assert_eq!(summary.moves.len(), 1);
    assert_ne!(summary.moves[0], GridCell::new(4, 2));

    let reports = robot.shutdown(Duration::from_secs(10));
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].task.cell, summary.moves[0]);
    assert_eq!(reports[0].outcome, Stage::Completed);
    // The stone was released: pump off.
    assert_eq!(pwm.last_pulse_us(PUMP_CHANNEL), Some(500.0));
}

#[test]
fn black_robot_opens_and_ignores_its_own_echo() {
    let mut config = fast_config();
    config.robot_stone = Stone::Black;
    let (_pwm, hardware) = simulated_hardware(&config.servos).expect("valid servos");
    let mut robot = Robot::new(&config, hardware).expect("robot starts");

    let opening = robot.begin().expect("black opens");
    assert_eq!(opening, GridCell::new(4, 4));

    // The center maps to itself under the camera to robot flip.
    let frames = vec![board_frame(&[((4, 4), BLACK)]); 12];
    let summary = robot.run(&mut FrameIter::new(frames)).expect("replay");
    assert_eq!(summary.events, 1);
    assert_eq!(summary.moves, vec![opening]);

    let reports = robot.shutdown(Duration::from_secs(10));
    assert_eq!(reports.len(), 1);
}

#[test]
fn listeners_after_the_coordinator_see_every_event() {
    use std::sync::{Arc, Mutex};

    let config = fast_config();
    let (_pwm, hardware) = simulated_hardware(&config.servos).expect("valid servos");
    let mut robot = Robot::new(&config, hardware).expect("robot starts");
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    robot.register_listener(move |e: &gomoku_robot::PieceEvent| {
        sink.lock().expect("lock").push(e.cell);
    });

    let frames = vec![board_frame(&[((4, 6), BLACK)]); 12];
    robot.run(&mut FrameIter::new(frames)).expect("replay");
    assert_eq!(*seen.lock().expect("lock"), vec![GridCell::new(4, 2)]);
    robot.shutdown(Duration::from_secs(10));
}
