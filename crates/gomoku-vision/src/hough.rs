//! Hough-gradient circle detection.
//!
//! Every edge pixel votes along its gradient direction, both ways, at all
//! distances in `[min_radius, max_radius]`. Circle centers collect votes from
//! the whole rim. Peaks are picked greedily by vote count with a minimum
//! center distance, and each center gets the radius best supported by the
//! edge pixels around it.

use image::GrayImage;
use serde::{Deserialize, Serialize};

/// Circle detector settings, mirroring the usual Hough-gradient knobs.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct HoughParams {
    /// Inverse accumulator resolution (1.0 = one bin per pixel).
    pub dp: f32,
    /// Upper Canny threshold; the lower one is half of it.
    pub canny_high: f32,
    /// Minimum votes for a center candidate.
    pub accumulator_threshold: f32,
    pub min_radius: u32,
    pub max_radius: u32,
    /// Minimum fraction of the rim circumference that must be edge pixels.
    pub min_rim_support: f32,
}

impl Default for HoughParams {
    fn default() -> Self {
        Self {
            dp: 1.2,
            canny_high: 100.0,
            accumulator_threshold: 20.0,
            min_radius: 18,
            max_radius: 24,
            min_rim_support: 0.3,
        }
    }
}

/// A detected circle in image coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Circle {
    pub x: f32,
    pub y: f32,
    pub radius: f32,
    pub votes: f32,
}

struct EdgePixel {
    x: f32,
    y: f32,
    dx: f32,
    dy: f32,
}

/// Detect circles in an already smoothed grayscale image.
///
/// `min_dist` is the minimum distance between two accepted centers.
/// Circles are returned strongest first.
pub fn detect_circles(gray: &GrayImage, params: &HoughParams, min_dist: f32) -> Vec<Circle> {
    let (w, h) = gray.dimensions();
    if w < 3 || h < 3 || params.max_radius < params.min_radius || params.dp <= 0.0 {
        return Vec::new();
    }

    let edge_pixels = collect_edges(gray, params);
    if edge_pixels.is_empty() {
        return Vec::new();
    }

    let acc_w = (w as f32 / params.dp).ceil() as usize;
    let acc_h = (h as f32 / params.dp).ceil() as usize;
    let accum = vote(&edge_pixels, params, acc_w, acc_h);
    let centers = pick_centers(&accum, acc_w, acc_h, params, min_dist);

    centers
        .into_iter()
        .filter_map(|(x, y, votes)| {
            let radius = estimate_radius(&edge_pixels, x, y, params)?;
            Some(Circle {
                x,
                y,
                radius,
                votes,
            })
        })
        .collect()
}

fn collect_edges(gray: &GrayImage, params: &HoughParams) -> Vec<EdgePixel> {
    let edges = imageproc::edges::canny(gray, params.canny_high * 0.5, params.canny_high);
    let gx = imageproc::gradients::horizontal_sobel(gray);
    let gy = imageproc::gradients::vertical_sobel(gray);

    let mut out = Vec::new();
    for (x, y, px) in edges.enumerate_pixels() {
        if px[0] == 0 {
            continue;
        }
        let vx = gx.get_pixel(x, y)[0] as f32;
        let vy = gy.get_pixel(x, y)[0] as f32;
        let mag = vx.hypot(vy);
        if mag < 1e-3 {
            continue;
        }
        out.push(EdgePixel {
            x: x as f32,
            y: y as f32,
            dx: vx / mag,
            dy: vy / mag,
        });
    }
    out
}

fn vote(edges: &[EdgePixel], params: &HoughParams, acc_w: usize, acc_h: usize) -> Vec<f32> {
    let mut accum = vec![0.0f32; acc_w * acc_h];
    let inv_dp = 1.0 / params.dp;

    for e in edges {
        // One vote per direction per edge pixel: nearby radii fall into the
        // same bin and must not be counted twice.
        for sign in [1.0f32, -1.0] {
            let mut last = usize::MAX;
            for r in params.min_radius..=params.max_radius {
                let cx = (e.x + sign * e.dx * r as f32) * inv_dp;
                let cy = (e.y + sign * e.dy * r as f32) * inv_dp;
                if cx < 0.0 || cy < 0.0 {
                    break;
                }
                let (ix, iy) = (cx as usize, cy as usize);
                if ix >= acc_w || iy >= acc_h {
                    break;
                }
                let idx = iy * acc_w + ix;
                if idx != last {
                    accum[idx] += 1.0;
                    last = idx;
                }
            }
        }
    }
    accum
}

/// Greedy peak selection: local maxima above threshold, strongest first,
/// each at least `min_dist` away from the already accepted ones. Centers are
/// refined to the vote-weighted centroid of the 3x3 bin neighborhood.
fn pick_centers(
    accum: &[f32],
    acc_w: usize,
    acc_h: usize,
    params: &HoughParams,
    min_dist: f32,
) -> Vec<(f32, f32, f32)> {
    let at = |x: usize, y: usize| accum[y * acc_w + x];

    let mut peaks = Vec::new();
    for y in 1..acc_h.saturating_sub(1) {
        for x in 1..acc_w.saturating_sub(1) {
            let v = at(x, y);
            if v < params.accumulator_threshold {
                continue;
            }
            if v > at(x - 1, y) && v >= at(x + 1, y) && v > at(x, y - 1) && v >= at(x, y + 1) {
                peaks.push((x, y, v));
            }
        }
    }
    peaks.sort_by(|a, b| b.2.total_cmp(&a.2));

    let min_dist_sq = min_dist * min_dist;
    let mut accepted: Vec<(f32, f32, f32)> = Vec::new();
    for (x, y, v) in peaks {
        let mut sw = 0.0f32;
        let mut sx = 0.0f32;
        let mut sy = 0.0f32;
        for ny in y - 1..=y + 1 {
            for nx in x - 1..=x + 1 {
                let w = at(nx, ny);
                sw += w;
                sx += w * nx as f32;
                sy += w * ny as f32;
            }
        }
        let cx = (sx / sw + 0.5) * params.dp;
        let cy = (sy / sw + 0.5) * params.dp;

        let far_enough = accepted.iter().all(|&(ax, ay, _)| {
            let (dx, dy) = (ax - cx, ay - cy);
            dx * dx + dy * dy >= min_dist_sq
        });
        if far_enough {
            accepted.push((cx, cy, v));
        }
    }
    accepted
}

/// Radius with the largest edge support around `(cx, cy)`, if enough of the
/// rim is present.
fn estimate_radius(edges: &[EdgePixel], cx: f32, cy: f32, params: &HoughParams) -> Option<f32> {
    let lo = params.min_radius as f32 - 0.5;
    let hi = params.max_radius as f32 + 0.5;
    let bins = (params.max_radius - params.min_radius + 1) as usize;
    let mut hist = vec![0u32; bins];
    let mut sums = vec![0.0f32; bins];

    for e in edges {
        let d = (e.x - cx).hypot(e.y - cy);
        if d < lo || d >= hi {
            continue;
        }
        let bin = ((d - lo) as usize).min(bins - 1);
        hist[bin] += 1;
        sums[bin] += d;
    }

    let (best, &count) = hist.iter().enumerate().max_by_key(|(_, c)| **c)?;
    let radius = params.min_radius as f32 + best as f32;
    let circumference = std::f32::consts::TAU * radius;
    if (count as f32) < params.min_rim_support * circumference {
        return None;
    }
    Some(sums[best] / count as f32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;
    use imageproc::drawing::draw_filled_circle_mut;

    fn blurred_with_circles(circles: &[((i32, i32), i32, u8)]) -> GrayImage {
        let mut img = GrayImage::from_pixel(300, 240, Luma([150]));
        for &(center, radius, value) in circles {
            draw_filled_circle_mut(&mut img, center, radius, Luma([value]));
        }
        imageproc::filter::gaussian_blur_f32(&img, 1.1)
    }

    #[test]
    fn finds_dark_and_bright_discs() {
        let img = blurred_with_circles(&[((80, 90), 20, 20), ((200, 140), 21, 235)]);
        let mut found = detect_circles(&img, &HoughParams::default(), 24.0);
        found.sort_by(|a, b| a.x.total_cmp(&b.x));

        assert_eq!(found.len(), 2, "{found:?}");
        assert!((found[0].x - 80.0).abs() < 2.5 && (found[0].y - 90.0).abs() < 2.5);
        assert!((found[1].x - 200.0).abs() < 2.5 && (found[1].y - 140.0).abs() < 2.5);
        assert!((found[0].radius - 20.0).abs() < 2.0, "{:?}", found[0]);
    }

    #[test]
    fn ignores_discs_outside_the_radius_range() {
        let img = blurred_with_circles(&[((100, 100), 8, 20), ((200, 120), 45, 235)]);
        let found = detect_circles(&img, &HoughParams::default(), 24.0);
        assert!(found.is_empty(), "{found:?}");
    }

    #[test]
    fn flat_image_has_no_circles() {
        let img = GrayImage::from_pixel(64, 64, Luma([128]));
        assert!(detect_circles(&img, &HoughParams::default(), 10.0).is_empty());
    }
}
