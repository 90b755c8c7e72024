//! Board localization and perspective rectification.

use image::{GrayImage, RgbImage};
use imageproc::contours::{find_contours, BorderType};
use imageproc::distance_transform::Norm;
use imageproc::geometry::{approximate_polygon_dp, arc_length};
use imageproc::point::Point;
use nalgebra::Point2;
use serde::{Deserialize, Serialize};

use crate::homography::{homography_from_4pt, warp_perspective_gray, Homography};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Parameters of the board localizer.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct BoardDetectorParams {
    /// Side of the canonical rectified square, in pixels.
    pub board_px: u32,
    /// Gaussian sigma applied before edge detection (7x7 kernel equivalent).
    pub blur_sigma: f32,
    pub canny_low: f32,
    pub canny_high: f32,
    /// Chebyshev dilation radius applied to the edge map; 0 disables it.
    pub edge_dilate_px: u8,
    /// Polygon approximation tolerance as a fraction of the contour perimeter.
    pub approx_epsilon_frac: f64,
    /// Contours enclosing less than this many square pixels are ignored.
    pub min_area_px: f64,
}

impl Default for BoardDetectorParams {
    fn default() -> Self {
        Self {
            board_px: 480,
            blur_sigma: 1.4,
            canny_low: 50.0,
            canny_high: 150.0,
            edge_dilate_px: 1,
            approx_epsilon_frac: 0.02,
            min_area_px: 1000.0,
        }
    }
}

/// A board found in a frame, warped to the canonical square.
#[derive(Clone, Debug)]
pub struct RectifiedBoard {
    /// Grayscale rectified board, `board_px x board_px`.
    pub image: GrayImage,
    /// Board corners in the source frame, ordered TL, TR, BR, BL.
    pub corners: [Point2<f32>; 4],
    pub h_img_from_rect: Homography,
}

/// Locates the physical board as the largest quadrilateral outline.
#[derive(Clone, Debug, Default)]
pub struct BoardDetector {
    params: BoardDetectorParams,
}

impl BoardDetector {
    pub fn new(params: BoardDetectorParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &BoardDetectorParams {
        &self.params
    }

    /// Find and rectify the board.
    ///
    /// `None` means no board is visible in this frame; callers retry on the
    /// next frame.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "debug", skip(self, frame), fields(width = frame.width(), height = frame.height()))
    )]
    pub fn detect(&self, frame: &RgbImage) -> Option<RectifiedBoard> {
        let gray = image::imageops::grayscale(frame);
        self.detect_gray(&gray)
    }

    /// Same as [`BoardDetector::detect`] for an already grayscale frame.
    pub fn detect_gray(&self, gray: &GrayImage) -> Option<RectifiedBoard> {
        let quad = self.find_quad(gray)?;
        let corners = order_corners(&quad);

        let s = (self.params.board_px.max(2) - 1) as f32;
        let rect = [
            Point2::new(0.0, 0.0),
            Point2::new(s, 0.0),
            Point2::new(s, s),
            Point2::new(0.0, s),
        ];
        let h_img_from_rect = homography_from_4pt(&rect, &corners)?;
        let image = warp_perspective_gray(
            gray,
            &h_img_from_rect,
            self.params.board_px,
            self.params.board_px,
        );

        Some(RectifiedBoard {
            image,
            corners,
            h_img_from_rect,
        })
    }

    /// Polygon approximation of the largest external contour, when it has
    /// exactly four vertices.
    fn find_quad(&self, gray: &GrayImage) -> Option<[Point2<f32>; 4]> {
        let blurred = imageproc::filter::gaussian_blur_f32(gray, self.params.blur_sigma);
        let mut edges =
            imageproc::edges::canny(&blurred, self.params.canny_low, self.params.canny_high);
        if self.params.edge_dilate_px > 0 {
            edges = imageproc::morphology::dilate(&edges, Norm::LInf, self.params.edge_dilate_px);
        }

        let largest = find_contours::<i32>(&edges)
            .into_iter()
            .filter(|c| c.border_type == BorderType::Outer && c.parent.is_none())
            .map(|c| {
                let area = polygon_area(&c.points);
                (c, area)
            })
            .filter(|(_, area)| *area >= self.params.min_area_px)
            .max_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(c, _)| c)?;

        let perimeter = arc_length(&largest.points, true);
        let approx = approximate_polygon_dp(
            &largest.points,
            perimeter * self.params.approx_epsilon_frac,
            true,
        );
        let vertices = dedup_closing_vertex(approx);
        log::trace!(
            "largest contour: {} points, {} polygon vertices",
            largest.points.len(),
            vertices.len()
        );

        let quad: [Point<i32>; 4] = vertices.try_into().ok()?;
        Some(quad.map(|p| Point2::new(p.x as f32, p.y as f32)))
    }
}

/// Order four corners as TL, TR, BR, BL.
///
/// `x + y` is smallest at the top-left and largest at the bottom-right;
/// `x - y` is largest at the top-right and smallest at the bottom-left.
pub fn order_corners(pts: &[Point2<f32>; 4]) -> [Point2<f32>; 4] {
    let sum = |p: &&Point2<f32>| p.x + p.y;
    let diff = |p: &&Point2<f32>| p.x - p.y;
    let pick = |best: Option<&Point2<f32>>| best.copied().unwrap_or(pts[0]);

    [
        pick(pts.iter().min_by(|a, b| sum(a).total_cmp(&sum(b)))),
        pick(pts.iter().max_by(|a, b| diff(a).total_cmp(&diff(b)))),
        pick(pts.iter().max_by(|a, b| sum(a).total_cmp(&sum(b)))),
        pick(pts.iter().min_by(|a, b| diff(a).total_cmp(&diff(b)))),
    ]
}

/// Shoelace area of a closed polygon.
fn polygon_area(points: &[Point<i32>]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }
    let twice: i64 = points
        .iter()
        .zip(points.iter().cycle().skip(1))
        .map(|(a, b)| a.x as i64 * b.y as i64 - b.x as i64 * a.y as i64)
        .sum();
    twice.abs() as f64 * 0.5
}

fn dedup_closing_vertex(mut vertices: Vec<Point<i32>>) -> Vec<Point<i32>> {
    if vertices.len() > 1 && vertices.first() == vertices.last() {
        vertices.pop();
    }
    vertices
}
