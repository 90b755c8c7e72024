//! Background worker that executes queued moves one at a time.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use gomoku_core::{GridCell, GridSize, MoveSink};

use crate::controller::ArmController;
use crate::motion::Stage;

#[cfg(feature = "tracing")]
use tracing::instrument;

/// One requested placement.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MoveTask {
    pub id: u64,
    pub cell: GridCell,
}

/// Result of one executed task.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TaskReport {
    pub task: MoveTask,
    /// `Completed`, or `Fault` when a joint got stuck.
    pub outcome: Stage,
}

#[derive(Default)]
struct QueueState {
    tasks: VecDeque<MoveTask>,
    in_flight: Option<MoveTask>,
    next_id: u64,
    reports: Vec<TaskReport>,
}

struct Shared {
    state: Mutex<QueueState>,
    work: Condvar,
    idle: Condvar,
    running: AtomicBool,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

/// Owns the arm controller on a dedicated thread and serializes moves.
///
/// Each task fetches a stone from the supply, places it, and returns home.
/// The next task starts only after the previous one reached a rest stage.
pub struct ArmWorker {
    shared: Arc<Shared>,
    grid_size: GridSize,
    handle: Option<JoinHandle<ArmController>>,
}

impl ArmWorker {
    /// Move `controller` to a new thread. The arm is homed before the first
    /// task runs.
    pub fn spawn(controller: ArmController) -> std::io::Result<Self> {
        let shared = Arc::new(Shared {
            state: Mutex::new(QueueState::default()),
            work: Condvar::new(),
            idle: Condvar::new(),
            running: AtomicBool::new(true),
        });
        let grid_size = controller.grid_size();
        let thread_shared = Arc::clone(&shared);
        let handle = std::thread::Builder::new()
            .name("arm-worker".into())
            .spawn(move || worker_loop(controller, &thread_shared))?;

        Ok(Self {
            shared,
            grid_size,
            handle: Some(handle),
        })
    }

    /// Tasks waiting plus the one being executed.
    pub fn pending(&self) -> usize {
        let state = self.shared.lock();
        state.tasks.len() + usize::from(state.in_flight.is_some())
    }

    /// Reports of every finished task, in execution order.
    pub fn reports(&self) -> Vec<TaskReport> {
        self.shared.lock().reports.clone()
    }

    /// Block until the queue is drained and no task is running, or `timeout`
    /// passes. Returns whether the worker is idle.
    pub fn wait_idle(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut state = self.shared.lock();
        while !state.tasks.is_empty() || state.in_flight.is_some() {
            let now = Instant::now();
            if now >= deadline || !self.shared.is_running() {
                return false;
            }
            state = self
                .shared
                .idle
                .wait_timeout(state, deadline - now)
                .map(|(guard, _)| guard)
                .unwrap_or_else(|e| e.into_inner().0);
        }
        true
    }

    /// Stop after the current poll and join the thread. Queued tasks that
    /// have not started are dropped. Returns the controller.
    pub fn shutdown(mut self) -> Option<ArmController> {
        self.stop_and_join()
    }

    fn stop_and_join(&mut self) -> Option<ArmController> {
        {
            // The worker reads the flag with the queue lock held.
            let _state = self.shared.lock();
            self.shared.running.store(false, Ordering::SeqCst);
        }
        self.shared.work.notify_all();
        self.shared.idle.notify_all();
        let handle = self.handle.take()?;
        match handle.join() {
            Ok(controller) => Some(controller),
            Err(_) => {
                log::error!("arm worker thread panicked");
                None
            }
        }
    }
}

impl MoveSink for ArmWorker {
    /// Queue a placement. Never blocks beyond the queue lock.
    fn enqueue_move(&self, cell: GridCell) -> bool {
        if !self.grid_size.contains(cell) {
            log::warn!(
                "ignoring move {cell}: outside the {0}x{0} board",
                self.grid_size.lines()
            );
            return false;
        }
        if !self.shared.is_running() {
            log::warn!("ignoring move {cell}: arm worker stopped");
            return false;
        }
        let mut state = self.shared.lock();
        let task = MoveTask {
            id: state.next_id,
            cell,
        };
        state.next_id += 1;
        state.tasks.push_back(task);
        log::debug!("queued move #{} at {cell} ({} waiting)", task.id, state.tasks.len());
        drop(state);
        self.shared.work.notify_one();
        true
    }
}

impl Drop for ArmWorker {
    fn drop(&mut self) {
        if self.handle.is_some() {
            self.stop_and_join();
        }
    }
}

fn worker_loop(mut arm: ArmController, shared: &Shared) -> ArmController {
    log::info!("arm worker started");
    if arm.initialize(Instant::now()) {
        let outcome = drive(&mut arm, shared);
        arm.reset(Instant::now());
        if outcome == Stage::Fault {
            log::error!("arm failed to reach the home pose");
        }
    }

    while let Some(task) = next_task(shared) {
        let outcome = run_task(&mut arm, shared, task);

        let mut state = shared.lock();
        state.in_flight = None;
        state.reports.push(TaskReport { task, outcome });
        if state.tasks.is_empty() {
            shared.idle.notify_all();
        }
    }

    log::info!("arm worker stopped");
    arm
}

/// Wait for the next task; `None` once the worker is stopped.
fn next_task(shared: &Shared) -> Option<MoveTask> {
    let mut state = shared.lock();
    loop {
        if !shared.is_running() {
            return None;
        }
        if let Some(task) = state.tasks.pop_front() {
            state.in_flight = Some(task);
            return Some(task);
        }
        state = shared
            .work
            .wait(state)
            .unwrap_or_else(PoisonError::into_inner);
    }
}

#[cfg_attr(feature = "tracing", instrument(level = "info", skip(arm, shared), fields(cell = %task.cell)))]
fn run_task(arm: &mut ArmController, shared: &Shared, task: MoveTask) -> Stage {
    log::info!("move #{}: fetching a stone for {}", task.id, task.cell);
    arm.grip_new_piece(Instant::now());
    let fetched = drive(arm, shared);
    arm.reset(Instant::now());
    if fetched != Stage::Completed {
        log::error!("move #{}: grip sequence ended in {fetched:?}", task.id);
        return fetched;
    }

    if !arm.place_at(task.cell, Instant::now()) {
        return Stage::Fault;
    }
    let placed = drive(arm, shared);
    arm.reset(Instant::now());
    match placed {
        Stage::Completed => log::info!("move #{}: placed at {}", task.id, task.cell),
        other => log::error!("move #{}: place sequence ended in {other:?}", task.id),
    }
    placed
}

/// Poll the controller until it rests or the worker is stopped.
fn drive(arm: &mut ArmController, shared: &Shared) -> Stage {
    let poll = arm.params().timing.poll_interval();
    loop {
        let stage = arm.advance(Instant::now());
        if stage.is_rest() || !shared.is_running() {
            return stage;
        }
        std::thread::sleep(poll);
    }
}
