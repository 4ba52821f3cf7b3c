use super::*;
use crate::pixel::FrameStack;
use crate::testing::{Spot, add_uniform_noise, gaussian_frame};

fn stack_from(width: usize, height: usize, pixels: Vec<f64>) -> FrameStack<f64> {
    FrameStack::new(width, height, vec![pixels]).unwrap()
}

fn detect(stack: &FrameStack<f64>, threshold: f64, min_distance: f64, negative: bool) -> Vec<Peak> {
    find_peaks(
        stack,
        0,
        &stack.bounds(0),
        threshold,
        min_distance,
        negative,
        &Progress::new(),
    )
}

fn crowded_frame() -> FrameStack<f64> {
    let spots = [
        Spot::new(10.0, 10.0, 150.0, 1.5),
        Spot::new(13.0, 11.0, 120.0, 1.5),
        Spot::new(30.0, 8.0, 200.0, 2.0),
        Spot::new(31.5, 12.0, 90.0, 1.2),
        Spot::new(20.0, 30.0, 180.0, 1.0),
        Spot::new(5.0, 34.0, 100.0, 1.8),
    ];
    let mut pixels = gaussian_frame(40, 40, 10.0, &spots);
    add_uniform_noise(&mut pixels, 8.0, 7);
    stack_from(40, 40, pixels)
}

#[test]
fn test_single_spot_found_at_brightest_pixel() {
    let pixels = gaussian_frame(32, 32, 10.0, &[Spot::new(12.0, 17.0, 200.0, 1.5)]);
    let stack = stack_from(32, 32, pixels);

    let peaks = detect(&stack, 50.0, 4.0, false);
    assert_eq!(peaks.len(), 1);
    assert_eq!(peaks[0].x(), 12.0);
    assert_eq!(peaks[0].y(), 17.0);
    assert!((peaks[0].pixel_value - 210.0).abs() < 1e-9);
    assert!(peaks[0].valid);
}

#[test]
fn test_nothing_above_threshold_is_empty() {
    let stack = stack_from(16, 16, vec![10.0; 256]);
    assert!(detect(&stack, 50.0, 4.0, false).is_empty());
}

#[test]
fn test_single_candidate_survives_any_distance() {
    let mut pixels = vec![0.0; 100];
    pixels[55] = 100.0;
    let stack = stack_from(10, 10, pixels);
    let peaks = detect(&stack, 50.0, 1000.0, false);
    assert_eq!(peaks.len(), 1);
    assert_eq!((peaks[0].x(), peaks[0].y()), (5.0, 5.0));
}

#[test]
fn test_minimum_distance_invariant() {
    let stack = crowded_frame();
    for min_distance in [1.0, 2.5, 4.0, 7.0] {
        let peaks = detect(&stack, 40.0, min_distance, false);
        assert!(!peaks.is_empty());
        for (i, a) in peaks.iter().enumerate() {
            for b in &peaks[i + 1..] {
                assert!(
                    a.pos.distance(b.pos) >= min_distance,
                    "{:?} and {:?} closer than {min_distance}",
                    a.pos,
                    b.pos
                );
            }
        }
    }
}

#[test]
fn test_detection_is_idempotent() {
    let stack = crowded_frame();
    let first = detect(&stack, 40.0, 3.0, false);
    let second = detect(&stack, 40.0, 3.0, false);
    assert_eq!(first.len(), second.len());
    for (a, b) in first.iter().zip(&second) {
        assert_eq!(a.pos, b.pos);
        assert_eq!(a.pixel_value, b.pixel_value);
    }
}

#[test]
fn test_results_are_strongest_first() {
    let stack = crowded_frame();
    let peaks = detect(&stack, 40.0, 3.0, false);
    for pair in peaks.windows(2) {
        assert!(pair[0].pixel_value >= pair[1].pixel_value);
    }
}

#[test]
fn test_separated_spots_each_found_once() {
    let spots = [
        Spot::new(8.0, 8.0, 200.0, 1.2),
        Spot::new(24.0, 8.0, 150.0, 1.2),
        Spot::new(16.0, 24.0, 100.0, 1.2),
    ];
    let stack = stack_from(32, 32, gaussian_frame(32, 32, 0.0, &spots));
    let peaks = detect(&stack, 30.0, 4.0, false);
    let mut positions: Vec<(f64, f64)> = peaks.iter().map(|p| (p.x(), p.y())).collect();
    positions.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.total_cmp(&b.1)));
    assert_eq!(positions, vec![(8.0, 8.0), (16.0, 24.0), (24.0, 8.0)]);
}

#[test]
fn test_negative_mode_finds_dips() {
    let mut pixels = vec![0.0; 400];
    // Dip of depth 120 at (5, 5) and a shallower one at (15, 12).
    pixels[5 * 20 + 5] = -120.0;
    pixels[5 * 20 + 6] = -80.0;
    pixels[12 * 20 + 15] = -70.0;
    // A bright spot must be ignored in negative mode.
    pixels[2 * 20 + 17] = 500.0;
    let stack = stack_from(20, 20, pixels);

    let peaks = detect(&stack, 50.0, 3.0, true);
    assert_eq!(peaks.len(), 2);
    assert_eq!((peaks[0].x(), peaks[0].y()), (5.0, 5.0));
    assert_eq!(peaks[0].pixel_value, -120.0);
    assert_eq!((peaks[1].x(), peaks[1].y()), (15.0, 12.0));
}

#[test]
fn test_equal_values_resolved_in_reverse_scan_order() {
    let mut pixels = vec![0.0; 100];
    pixels[2 * 10 + 3] = 100.0;
    pixels[2 * 10 + 4] = 100.0;
    let stack = stack_from(10, 10, pixels);

    let peaks = detect(&stack, 50.0, 2.0, false);
    assert_eq!(peaks.len(), 1);
    assert_eq!((peaks[0].x(), peaks[0].y()), (4.0, 2.0));
}

#[test]
fn test_region_limits_the_scan() {
    let spots = [
        Spot::new(5.0, 5.0, 200.0, 1.0),
        Spot::new(25.0, 25.0, 200.0, 1.0),
    ];
    let stack = stack_from(32, 32, gaussian_frame(32, 32, 0.0, &spots));
    let region = Rect::new(16, 16, 16, 16);
    let peaks = find_peaks(&stack, 0, &region, 50.0, 4.0, false, &Progress::new());
    assert_eq!(peaks.len(), 1);
    assert_eq!((peaks[0].x(), peaks[0].y()), (25.0, 25.0));
}

#[test]
fn test_cancelled_scan_returns_nothing() {
    let stack = crowded_frame();
    let progress = Progress::new();
    progress.cancel();
    let peaks = find_peaks(&stack, 0, &stack.bounds(0), 40.0, 3.0, false, &progress);
    assert!(peaks.is_empty());
}

#[test]
fn test_suppress_uses_supplied_order_and_drops_invalid() {
    let mut a = Peak::candidate(0, 0, 1.0, 0);
    a.r_squared = 0.5;
    let mut b = Peak::candidate(1, 0, 1.0, 0);
    b.r_squared = 0.9;
    let mut c = Peak::candidate(10, 0, 1.0, 0);
    c.r_squared = 0.1;
    let mut d = Peak::candidate(20, 0, 1.0, 0);
    d.invalidate();

    let kept = suppress(
        vec![a, b, c, d],
        2.0,
        |p, q| p.r_squared.total_cmp(&q.r_squared),
        &Progress::new(),
    );
    let xs: Vec<f64> = kept.iter().map(Peak::x).collect();
    assert_eq!(xs, vec![1.0, 10.0]);
    assert!(kept.iter().all(|p| p.valid));
}

#[test]
fn test_suppress_drops_nan_positions() {
    let mut bad = Peak::candidate(0, 0, 5.0, 0);
    bad.pos.y = f64::NAN;
    let good = Peak::candidate(3, 3, 1.0, 0);
    let kept = suppress(
        vec![bad, good],
        1.0,
        |p, q| p.pixel_value.total_cmp(&q.pixel_value),
        &Progress::new(),
    );
    assert_eq!(kept.len(), 1);
    assert_eq!(kept[0].x(), 3.0);
}
