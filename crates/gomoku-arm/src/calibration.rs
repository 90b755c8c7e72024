//! Grid cell to joint angle mapping.
//!
//! Nine poses are measured by hand: the board corners, edge midpoints and
//! center. Every other intersection is bilinearly interpolated from the four
//! surrounding poses of that 3x3 lattice.

use gomoku_core::{GridCell, GridSize};
use serde::{Deserialize, Serialize};

use crate::ArmConfigError;

/// Angles of the three arm joints, in degrees.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct JointAngles {
    pub base: f32,
    pub shoulder: f32,
    pub elbow: f32,
}

impl JointAngles {
    pub const fn new(base: f32, shoulder: f32, elbow: f32) -> Self {
        Self {
            base,
            shoulder,
            elbow,
        }
    }

    /// Linear blend; returns `self` exactly at `t = 0` and `other` exactly at
    /// `t = 1`.
    pub fn lerp(self, other: JointAngles, t: f32) -> JointAngles {
        let mix = |a: f32, b: f32| a * (1.0 - t) + b * t;
        JointAngles {
            base: mix(self.base, other.base),
            shoulder: mix(self.shoulder, other.shoulder),
            elbow: mix(self.elbow, other.elbow),
        }
    }

    fn is_finite(&self) -> bool {
        self.base.is_finite() && self.shoulder.is_finite() && self.elbow.is_finite()
    }
}

/// The 3x3 reference poses, `points[row][col]` in robot space.
///
/// Row 0 is the board edge nearest the camera side of the grid, column 0 the
/// left edge; lattice index 1 is the middle line of the board.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "[[JointAngles; 3]; 3]", into = "[[JointAngles; 3]; 3]")]
pub struct CalibrationLattice {
    points: [[JointAngles; 3]; 3],
}

impl Default for CalibrationLattice {
    fn default() -> Self {
        Self {
            points: [
                [
                    JointAngles::new(-30.0, 60.0, 45.0),
                    JointAngles::new(0.0, 62.0, 48.0),
                    JointAngles::new(30.0, 60.0, 45.0),
                ],
                [
                    JointAngles::new(-24.0, 38.0, 30.0),
                    JointAngles::new(0.0, 40.0, 32.0),
                    JointAngles::new(24.0, 38.0, 30.0),
                ],
                [
                    JointAngles::new(-20.0, 15.0, 12.0),
                    JointAngles::new(0.0, 17.0, 14.0),
                    JointAngles::new(20.0, 15.0, 12.0),
                ],
            ],
        }
    }
}

impl CalibrationLattice {
    pub fn new(points: [[JointAngles; 3]; 3]) -> Result<Self, ArmConfigError> {
        for (row, line) in points.iter().enumerate() {
            for (col, p) in line.iter().enumerate() {
                if !p.is_finite() {
                    return Err(ArmConfigError::NonFiniteCalibration { row, col });
                }
            }
        }
        Ok(Self { points })
    }

    #[inline]
    pub fn point(&self, row: usize, col: usize) -> JointAngles {
        self.points[row][col]
    }

    pub fn points(&self) -> &[[JointAngles; 3]; 3] {
        &self.points
    }

    /// Joint angles for `cell` on a `grid` board, `None` when the cell is off
    /// the board.
    ///
    /// The cell is scaled to lattice coordinates in `[0, 2]`; the lower
    /// lattice index is capped at 1 so the far edge interpolates inside the
    /// last lattice square.
    pub fn interpolate(&self, grid: GridSize, cell: GridCell) -> Option<JointAngles> {
        if !grid.contains(cell) {
            return None;
        }
        let last = (grid.lines() - 1) as f32;
        let r = cell.row as f32 * 2.0 / last;
        let c = cell.col as f32 * 2.0 / last;
        let r0 = (r.floor() as usize).min(1);
        let c0 = (c.floor() as usize).min(1);
        let fr = r - r0 as f32;
        let fc = c - c0 as f32;

        let p = &self.points;
        let top = p[r0][c0].lerp(p[r0][c0 + 1], fc);
        let bottom = p[r0 + 1][c0].lerp(p[r0 + 1][c0 + 1], fc);
        Some(top.lerp(bottom, fr))
    }
}

impl TryFrom<[[JointAngles; 3]; 3]> for CalibrationLattice {
    type Error = ArmConfigError;

    fn try_from(points: [[JointAngles; 3]; 3]) -> Result<Self, Self::Error> {
        Self::new(points)
    }
}

impl From<CalibrationLattice> for [[JointAngles; 3]; 3] {
    fn from(lattice: CalibrationLattice) -> Self {
        lattice.points
    }
}
