use std::path::PathBuf;

/// Failures of the frame acquisition side of the vision pipeline.
///
/// Detection itself never fails: a frame without a board or without stones
/// is just skipped.
#[derive(thiserror::Error, Debug)]
pub enum VisionError {
    #[error("failed to open camera {index}: {reason}")]
    CameraOpen { index: u32, reason: String },
    #[error("failed to read a frame from the camera: {0}")]
    CameraRead(String),
    #[error("failed to decode image {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
