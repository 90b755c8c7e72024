//! Stone detection on the rectified board.

use gomoku_core::{GridCell, GridSize, Stone};
use image::GrayImage;
use nalgebra::Point2;
use serde::{Deserialize, Serialize};

use crate::hough::{detect_circles, Circle, HoughParams};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Parameters of the stone detector.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct PieceDetectorParams {
    pub grid_size: GridSize,
    /// Gaussian sigma applied before the circle transform (5x5 equivalent).
    pub blur_sigma: f32,
    pub hough: HoughParams,
    /// Minimum distance between circle centers, as a fraction of the grid
    /// spacing.
    pub min_center_dist_frac: f32,
    /// A circle snaps to its nearest intersection only when closer than this
    /// fraction of the grid spacing.
    pub snap_radius_frac: f32,
    /// Color is sampled inside this fraction of the circle radius.
    pub sample_radius_frac: f32,
    /// Mean intensity below this is a black stone.
    pub black_max: f32,
    /// Mean intensity above this is a white stone.
    pub white_min: f32,
}

impl Default for PieceDetectorParams {
    fn default() -> Self {
        Self {
            grid_size: GridSize::NINE,
            blur_sigma: 1.1,
            hough: HoughParams::default(),
            min_center_dist_frac: 0.4,
            snap_radius_frac: 0.25,
            sample_radius_frac: 0.7,
            black_max: 90.0,
            white_min: 110.0,
        }
    }
}

/// Color class of a detected circle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetectedColor {
    Black,
    White,
    /// Intensity between the two thresholds; never debounced.
    Ambiguous,
}

impl DetectedColor {
    pub fn stone(self) -> Option<Stone> {
        match self {
            DetectedColor::Black => Some(Stone::Black),
            DetectedColor::White => Some(Stone::White),
            DetectedColor::Ambiguous => None,
        }
    }
}

/// One stone seen in one rectified frame.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PieceDetection {
    /// Intersection in robot space.
    pub cell: GridCell,
    pub color: DetectedColor,
    /// Circle center in rectified board pixels.
    pub center: Point2<f32>,
    pub radius: f32,
}

/// Finds stones on a rectified board and assigns them to grid intersections.
#[derive(Clone, Debug)]
pub struct PieceDetector {
    params: PieceDetectorParams,
}

impl Default for PieceDetector {
    fn default() -> Self {
        Self::new(PieceDetectorParams::default())
    }
}

impl PieceDetector {
    pub fn new(params: PieceDetectorParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &PieceDetectorParams {
        &self.params
    }

    /// Distance between adjacent intersections for a `side x side` board
    /// image.
    pub fn grid_spacing(&self, side: u32) -> f32 {
        let n = self.params.grid_size.lines() as f32;
        (side.max(1) - 1) as f32 / (n - 1.0)
    }

    /// Camera-space intersection positions, row-major.
    pub fn grid_points(&self, side: u32) -> Vec<(GridCell, Point2<f32>)> {
        let spacing = self.grid_spacing(side);
        self.params
            .grid_size
            .cells()
            .map(|cell| {
                let p = Point2::new(cell.col as f32 * spacing, cell.row as f32 * spacing);
                (cell, p)
            })
            .collect()
    }

    /// Detect stones on a square rectified board.
    ///
    /// Circles away from every intersection are discarded. Cells are reported
    /// in robot space; the order of the result carries no meaning.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "debug", skip(self, board), fields(side = board.width()))
    )]
    pub fn detect(&self, board: &GrayImage) -> Vec<PieceDetection> {
        let side = board.width().min(board.height());
        if side < 2 {
            return Vec::new();
        }
        let spacing = self.grid_spacing(side);
        let blurred = imageproc::filter::gaussian_blur_f32(board, self.params.blur_sigma);
        let circles = detect_circles(
            &blurred,
            &self.params.hough,
            self.params.min_center_dist_frac * spacing,
        );
        log::trace!("{} circle candidates, spacing {:.1}px", circles.len(), spacing);

        circles
            .iter()
            .filter_map(|c| self.classify(board, c, spacing))
            .collect()
    }

    fn classify(&self, board: &GrayImage, circle: &Circle, spacing: f32) -> Option<PieceDetection> {
        let camera_cell = self.snap(circle, spacing)?;
        let sample_radius = circle.radius * self.params.sample_radius_frac;
        let mean = mean_intensity(board, circle.x, circle.y, sample_radius)?;
        let color = if mean < self.params.black_max {
            DetectedColor::Black
        } else if mean > self.params.white_min {
            DetectedColor::White
        } else {
            DetectedColor::Ambiguous
        };

        Some(PieceDetection {
            cell: self.params.grid_size.reverse(camera_cell),
            color,
            center: Point2::new(circle.x, circle.y),
            radius: circle.radius,
        })
    }

    /// Nearest intersection, if within the snap radius.
    fn snap(&self, circle: &Circle, spacing: f32) -> Option<GridCell> {
        if spacing <= 0.0 {
            return None;
        }
        let last = self.params.grid_size.lines() as f32 - 1.0;
        // The lattice is regular, so rounding picks the nearest point.
        let col = (circle.x / spacing).round().clamp(0.0, last);
        let row = (circle.y / spacing).round().clamp(0.0, last);
        let dx = circle.x - col * spacing;
        let dy = circle.y - row * spacing;
        let limit = self.params.snap_radius_frac * spacing;
        if dx * dx + dy * dy >= limit * limit {
            return None;
        }
        self.params.grid_size.cell(row as i32, col as i32)
    }
}

/// Mean gray level of the pixels within `radius` of `(cx, cy)`.
fn mean_intensity(img: &GrayImage, cx: f32, cy: f32, radius: f32) -> Option<f32> {
    let (w, h) = img.dimensions();
    let r2 = radius * radius;
    let x0 = (cx - radius).floor().max(0.0) as u32;
    let y0 = (cy - radius).floor().max(0.0) as u32;
    let x1 = ((cx + radius).ceil().max(0.0) as u32).min(w.saturating_sub(1));
    let y1 = ((cy + radius).ceil().max(0.0) as u32).min(h.saturating_sub(1));

    let mut sum = 0u64;
    let mut count = 0u64;
    for y in y0..=y1 {
        for x in x0..=x1 {
            let dx = x as f32 - cx;
            let dy = y as f32 - cy;
            if dx * dx + dy * dy <= r2 {
                sum += img.get_pixel(x, y)[0] as u64;
                count += 1;
            }
        }
    }
    (count > 0).then(|| sum as f32 / count as f32)
}
