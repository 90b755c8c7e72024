//! Vision pipeline of the Gomoku robot.
//!
//! ## Quickstart
//!
//! ```
//! use gomoku_vision::{FrameIter, VisionParams, VisionRunner};
//! use gomoku_core::PieceEvent;
//!
//! let mut runner = VisionRunner::new(VisionParams::default());
//! runner.register_listener(|e: &PieceEvent| println!("{} at {}", e.stone, e.cell));
//!
//! let frames = vec![image::RgbImage::new(64, 48)];
//! let (_end, stats) = runner.run(&mut FrameIter::new(frames)).unwrap();
//! assert_eq!(stats.rectified, 0);
//! ```
//!
//! Per frame:
//! 1. Find the board as the largest 4-vertex outline and warp it to a square.
//! 2. Find circles on the square with a Hough-gradient transform.
//! 3. Snap circles to intersections, classify their color, flip to robot space.
//! 4. Confirm stones seen for enough consecutive frames and notify listeners.

mod board;
mod debounce;
mod error;
mod homography;
mod hough;
mod pieces;
mod runner;
mod source;

pub use board::{order_corners, BoardDetector, BoardDetectorParams, RectifiedBoard};
pub use debounce::{DebounceParams, Debouncer, PieceCandidate};
pub use error::VisionError;
pub use homography::{homography_from_4pt, warp_perspective_gray, Homography};
pub use hough::{detect_circles, Circle, HoughParams};
pub use pieces::{DetectedColor, PieceDetection, PieceDetector, PieceDetectorParams};
pub use runner::{RunEnd, RunStats, StopHandle, VisionParams, VisionRunner};
pub use source::{FrameIter, FrameSource, ImageDirSource};

#[cfg(feature = "camera")]
pub use source::CameraSource;
