use criterion::{black_box, criterion_group, criterion_main, Criterion};
use gomoku_vision::{BoardDetector, PieceDetector, VisionParams, VisionRunner};
use image::{GrayImage, Luma, Rgb, RgbImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_polygon_mut};
use imageproc::point::Point;

const SPACING: f32 = 479.0 / 8.0;

fn make_board(stones: &[(u8, u8, u8)]) -> GrayImage {
    let mut img = GrayImage::from_pixel(480, 480, Luma([180]));
    for &(row, col, v) in stones {
        let center = (
            (col as f32 * SPACING).round() as i32,
            (row as f32 * SPACING).round() as i32,
        );
        draw_filled_circle_mut(&mut img, center, 21, Luma([v]));
    }
    img
}

fn make_frame() -> RgbImage {
    let mut img = RgbImage::from_pixel(640, 560, Rgb([30, 30, 30]));
    let quad = [
        Point::new(96, 44),
        Point::new(548, 58),
        Point::new(566, 512),
        Point::new(78, 500),
    ];
    draw_polygon_mut(&mut img, &quad, Rgb([200, 180, 140]));
    img
}

fn bench_piece_detector(c: &mut Criterion) {
    let stones: Vec<_> = (1..8u8)
        .flat_map(|r| (1..8u8).map(move |c| (r, c, if (r + c) % 2 == 0 { 25 } else { 235 })))
        .filter(|(r, c, _)| (r * 7 + c) % 3 == 0)
        .collect();
    let board = make_board(&stones);
    let detector = PieceDetector::default();

    c.bench_function("piece_detect_480px", |b| {
        b.iter(|| {
            let found = detector.detect(black_box(&board));
            black_box(found.len());
        })
    });
}

fn bench_board_detector(c: &mut Criterion) {
    let frame = make_frame();
    let detector = BoardDetector::default();

    c.bench_function("board_detect_640x560", |b| {
        b.iter(|| {
            let board = detector.detect(black_box(&frame));
            black_box(board.is_some());
        })
    });
}

fn bench_process_frame(c: &mut Criterion) {
    let frame = make_frame();
    let mut runner = VisionRunner::new(VisionParams {
        frame_skip: 1,
        ..VisionParams::default()
    });

    c.bench_function("process_frame_640x560", |b| {
        b.iter(|| black_box(runner.process_frame(black_box(&frame)).len()))
    });
}

criterion_group!(
    piece_detection,
    bench_piece_detector,
    bench_board_detector,
    bench_process_frame
);
criterion_main!(piece_detection);
