#![allow(dead_code)]

use gomoku_robot::arm::MotionTiming;
use gomoku_robot::RobotConfig;
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_polygon_mut};
use imageproc::point::Point;

/// Board from (80, 40) to (560, 520) in a 640x560 frame: 60 px per cell on
/// the default 9x9 grid.
pub fn board_frame(stones: &[((u8, u8), [u8; 3])]) -> RgbImage {
    let mut img = RgbImage::from_pixel(640, 560, Rgb([30, 30, 30]));
    let quad = [
        Point::new(80, 40),
        Point::new(560, 40),
        Point::new(560, 520),
        Point::new(80, 520),
    ];
    draw_polygon_mut(&mut img, &quad, Rgb([200, 180, 140]));
    for &((row, col), color) in stones {
        let center = (80 + col as i32 * 60, 40 + row as i32 * 60);
        draw_filled_circle_mut(&mut img, center, 21, Rgb(color));
    }
    img
}

pub const BLACK: [u8; 3] = [20, 20, 20];

/// Default config with millisecond settle times.
pub fn fast_config() -> RobotConfig {
    let mut config = RobotConfig::default();
    config.arm.timing = MotionTiming {
        stage_settle_ms: 2,
        reset_elbow_settle_ms: 3,
        switch_settle_ms: 0,
        poll_interval_ms: 1,
    };
    config
}
