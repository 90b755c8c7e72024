//! The vision loop: frames in, confirmed piece events out.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use gomoku_core::{PieceEvent, PieceListener};
use image::RgbImage;
use serde::{Deserialize, Serialize};

use crate::board::{BoardDetector, BoardDetectorParams};
use crate::debounce::{DebounceParams, Debouncer};
use crate::pieces::{PieceDetector, PieceDetectorParams};
use crate::source::FrameSource;
use crate::VisionError;

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Settings of the whole vision pipeline.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct VisionParams {
    pub board: BoardDetectorParams,
    pub pieces: PieceDetectorParams,
    pub debounce: DebounceParams,
    /// Only every `frame_skip`-th rectified frame is searched for stones.
    pub frame_skip: u32,
}

impl Default for VisionParams {
    fn default() -> Self {
        Self {
            board: BoardDetectorParams::default(),
            pieces: PieceDetectorParams::default(),
            debounce: DebounceParams::default(),
            frame_skip: 2,
        }
    }
}

/// Cooperative stop flag for [`VisionRunner::run`], checked once per frame.
#[derive(Clone, Debug, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Why [`VisionRunner::run`] returned.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunEnd {
    SourceExhausted,
    Stopped,
}

/// Counters of one [`VisionRunner::run`] call.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RunStats {
    pub frames: u64,
    pub rectified: u64,
    pub processed: u64,
    pub events: u64,
}

/// Drives board detection, stone detection and debouncing, and dispatches
/// confirmed stones to the registered listeners.
pub struct VisionRunner {
    board: BoardDetector,
    pieces: PieceDetector,
    debouncer: Debouncer,
    frame_skip: u32,
    rectified_frames: u64,
    processed_frames: u64,
    listeners: Vec<Box<dyn PieceListener>>,
    stop: StopHandle,
}

impl VisionRunner {
    pub fn new(params: VisionParams) -> Self {
        Self {
            board: BoardDetector::new(params.board),
            pieces: PieceDetector::new(params.pieces),
            debouncer: Debouncer::new(params.debounce),
            frame_skip: params.frame_skip.max(1),
            rectified_frames: 0,
            processed_frames: 0,
            listeners: Vec::new(),
            stop: StopHandle::default(),
        }
    }

    /// Listeners are called synchronously, in registration order, on the
    /// thread running the loop.
    pub fn register_listener<L>(&mut self, listener: L)
    where
        L: PieceListener + 'static,
    {
        self.listeners.push(Box::new(listener));
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    pub fn debouncer(&self) -> &Debouncer {
        &self.debouncer
    }

    /// Start over for a new game: clears candidates and committed cells.
    pub fn reset(&mut self) {
        self.debouncer.reset();
        self.rectified_frames = 0;
        self.processed_frames = 0;
    }

    /// Run one frame through the pipeline.
    ///
    /// Frames without a board are ignored. Of the rectified frames only every
    /// `frame_skip`-th one reaches the stone detector. Returns the events
    /// dispatched for this frame.
    #[cfg_attr(feature = "tracing", instrument(level = "debug", skip_all))]
    pub fn process_frame(&mut self, frame: &RgbImage) -> Vec<PieceEvent> {
        let Some(board) = self.board.detect(frame) else {
            log::trace!("no board in frame");
            return Vec::new();
        };
        self.rectified_frames += 1;
        if self.rectified_frames % self.frame_skip as u64 != 0 {
            return Vec::new();
        }
        self.processed_frames += 1;

        let detections = self.pieces.detect(&board.image);
        let events = self
            .debouncer
            .observe(detections.iter().filter_map(|d| Some((d.cell, d.color.stone()?))));

        for event in &events {
            log::info!("piece confirmed: {} at {}", event.stone, event.cell);
            for listener in &mut self.listeners {
                listener.on_piece_confirmed(event);
            }
        }
        events
    }

    /// Pull frames until the source ends or the stop handle fires.
    ///
    /// A failing source ends the loop with its error.
    pub fn run<S>(&mut self, source: &mut S) -> Result<(RunEnd, RunStats), VisionError>
    where
        S: FrameSource + ?Sized,
    {
        let mut stats = RunStats::default();
        let (rectified_before, processed_before) = (self.rectified_frames, self.processed_frames);
        let end = loop {
            if self.stop.is_stopped() {
                break RunEnd::Stopped;
            }
            let Some(frame) = source.next_frame()? else {
                break RunEnd::SourceExhausted;
            };
            stats.frames += 1;
            stats.events += self.process_frame(&frame).len() as u64;
        };
        stats.rectified = self.rectified_frames - rectified_before;
        stats.processed = self.processed_frames - processed_before;
        log::info!(
            "vision loop ended ({end:?}): {} frames, {} rectified, {} processed, {} events",
            stats.frames,
            stats.rectified,
            stats.processed,
            stats.events
        );
        Ok((end, stats))
    }
}
