//! Frame sources for the vision loop.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use image::RgbImage;

use crate::VisionError;

/// Producer of camera frames.
///
/// `Ok(None)` means the source is exhausted and the vision loop ends
/// normally. Errors end the loop with that error.
pub trait FrameSource {
    fn next_frame(&mut self) -> Result<Option<RgbImage>, VisionError>;
}

impl<S: FrameSource + ?Sized> FrameSource for Box<S> {
    fn next_frame(&mut self) -> Result<Option<RgbImage>, VisionError> {
        (**self).next_frame()
    }
}

/// Frames from any iterator, mostly for tests and synthetic input.
pub struct FrameIter<I> {
    frames: I,
}

impl<I> FrameIter<I>
where
    I: Iterator<Item = RgbImage>,
{
    pub fn new(frames: impl IntoIterator<IntoIter = I>) -> Self {
        Self {
            frames: frames.into_iter(),
        }
    }
}

impl<I> FrameSource for FrameIter<I>
where
    I: Iterator<Item = RgbImage>,
{
    fn next_frame(&mut self) -> Result<Option<RgbImage>, VisionError> {
        Ok(self.frames.next())
    }
}

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp", "tif", "tiff"];

/// Replays the images of a directory in file name order.
#[derive(Debug)]
pub struct ImageDirSource {
    paths: VecDeque<PathBuf>,
}

impl ImageDirSource {
    pub fn new(dir: impl AsRef<Path>) -> Result<Self, VisionError> {
        let mut paths = Vec::new();
        for entry in std::fs::read_dir(dir.as_ref())? {
            let path = entry?.path();
            let is_image = path
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
                .unwrap_or(false);
            if path.is_file() && is_image {
                paths.push(path);
            }
        }
        paths.sort();
        log::info!(
            "replaying {} frames from {}",
            paths.len(),
            dir.as_ref().display()
        );
        Ok(Self {
            paths: paths.into(),
        })
    }

    pub fn remaining(&self) -> usize {
        self.paths.len()
    }
}

impl FrameSource for ImageDirSource {
    fn next_frame(&mut self) -> Result<Option<RgbImage>, VisionError> {
        let Some(path) = self.paths.pop_front() else {
            return Ok(None);
        };
        let img = image::open(&path).map_err(|source| VisionError::Decode {
            path: path.clone(),
            source,
        })?;
        Ok(Some(img.to_rgb8()))
    }
}

#[cfg(feature = "camera")]
pub use camera::CameraSource;

#[cfg(feature = "camera")]
mod camera {
    use image::RgbImage;
    use nokhwa::pixel_format::RgbFormat;
    use nokhwa::utils::{CameraIndex, RequestedFormat, RequestedFormatType};
    use nokhwa::Camera;

    use super::FrameSource;
    use crate::VisionError;

    /// Live frames from a local camera.
    pub struct CameraSource {
        camera: Camera,
    }

    impl CameraSource {
        /// Open camera `index` and start streaming.
        pub fn open(index: u32) -> Result<Self, VisionError> {
            let open_err = |e: nokhwa::NokhwaError| VisionError::CameraOpen {
                index,
                reason: e.to_string(),
            };
            let requested =
                RequestedFormat::new::<RgbFormat>(RequestedFormatType::AbsoluteHighestFrameRate);
            let mut camera = Camera::new(CameraIndex::Index(index), requested).map_err(open_err)?;
            camera.open_stream().map_err(open_err)?;
            log::info!(
                "camera {index} streaming at {}x{}",
                camera.resolution().width(),
                camera.resolution().height()
            );
            Ok(Self { camera })
        }
    }

    impl FrameSource for CameraSource {
        fn next_frame(&mut self) -> Result<Option<RgbImage>, VisionError> {
            let read_err = |e: nokhwa::NokhwaError| VisionError::CameraRead(e.to_string());
            let buffer = self.camera.frame().map_err(read_err)?;
            let decoded = buffer.decode_image::<RgbFormat>().map_err(read_err)?;
            let (w, h) = (decoded.width(), decoded.height());
            let frame = RgbImage::from_raw(w, h, decoded.into_raw())
                .ok_or_else(|| VisionError::CameraRead(format!("short frame buffer {w}x{h}")))?;
            Ok(Some(frame))
        }
    }

    impl Drop for CameraSource {
        fn drop(&mut self) {
            if let Err(e) = self.camera.stop_stream() {
                log::warn!("failed to stop camera stream: {e}");
            }
        }
    }
}
