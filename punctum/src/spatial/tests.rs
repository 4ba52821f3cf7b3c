use super::*;

fn brute_force(points: &[DVec2], query: DVec2, radius: f64) -> Vec<usize> {
    let mut found: Vec<usize> = points
        .iter()
        .enumerate()
        .filter(|(_, p)| p.distance_squared(query) <= radius * radius)
        .map(|(i, _)| i)
        .collect();
    found.sort();
    found
}

fn grid_points() -> Vec<DVec2> {
    let mut points = Vec::new();
    for y in 0..12 {
        for x in 0..9 {
            points.push(DVec2::new(x as f64 * 1.7, y as f64 * 1.3 + (x % 3) as f64 * 0.2));
        }
    }
    points
}

#[test]
fn test_build_empty_returns_none() {
    assert!(KdTree::build(std::iter::empty()).is_none());
}

#[test]
fn test_single_point() {
    let tree = KdTree::build([(7, DVec2::new(1.0, 2.0))]).unwrap();
    assert_eq!(tree.len(), 1);
    assert_eq!(tree.radius_search(DVec2::new(1.0, 2.0), 0.0), vec![(7, 0.0)]);
    assert!(tree.radius_search(DVec2::new(5.0, 5.0), 1.0).is_empty());
}

#[test]
fn test_radius_search_matches_brute_force() {
    let points = grid_points();
    let tree = KdTree::build(points.iter().copied().enumerate()).unwrap();

    for &(qx, qy, r) in &[
        (0.0, 0.0, 2.0),
        (7.3, 6.1, 3.5),
        (13.6, 14.3, 1.0),
        (-4.0, -4.0, 5.0),
        (6.8, 7.8, 0.0),
        (5.0, 5.0, 100.0),
    ] {
        let query = DVec2::new(qx, qy);
        let mut found: Vec<usize> = tree
            .radius_search(query, r)
            .into_iter()
            .map(|(slot, _)| slot)
            .collect();
        found.sort();
        assert_eq!(found, brute_force(&points, query, r), "query {query:?} r {r}");
    }
}

#[test]
fn test_radius_search_sorted_by_distance() {
    let points = grid_points();
    let tree = KdTree::build(points.iter().copied().enumerate()).unwrap();
    let results = tree.radius_search(DVec2::new(6.0, 6.0), 4.0);
    assert!(results.len() > 3);
    for pair in results.windows(2) {
        assert!(pair[0].1 <= pair[1].1);
    }
}

#[test]
fn test_radius_search_reports_slots_not_positions() {
    let tree = KdTree::build([
        (10, DVec2::new(0.0, 0.0)),
        (20, DVec2::new(1.0, 0.0)),
        (30, DVec2::new(10.0, 0.0)),
    ])
    .unwrap();
    let results = tree.radius_search(DVec2::new(0.2, 0.0), 1.0);
    let slots: Vec<usize> = results.iter().map(|&(s, _)| s).collect();
    assert_eq!(slots, vec![10, 20]);
    assert!((results[0].1 - 0.04).abs() < 1e-12);
}

#[test]
fn test_duplicate_points_are_all_found() {
    let tree = KdTree::build((0..6).map(|i| (i, DVec2::new(3.0, 3.0)))).unwrap();
    assert_eq!(tree.radius_search(DVec2::new(3.0, 3.0), 0.0).len(), 6);
}

#[test]
fn test_non_finite_query_returns_nothing() {
    let tree = KdTree::build([(0, DVec2::new(0.0, 0.0))]).unwrap();
    assert!(tree.radius_search(DVec2::new(f64::NAN, 0.0), 1.0).is_empty());
    assert!(tree.radius_search(DVec2::ZERO, f64::NAN).is_empty());
    assert!(!tree.any_within(DVec2::new(f64::NAN, 0.0), 1.0, |_| true));
}

#[test]
fn test_any_within_stops_on_first_match() {
    let points = grid_points();
    let tree = KdTree::build(points.iter().copied().enumerate()).unwrap();

    let mut calls = 0;
    let found = tree.any_within(DVec2::new(6.0, 6.0), 10.0, |_| {
        calls += 1;
        true
    });
    assert!(found);
    assert_eq!(calls, 1);

    assert!(!tree.any_within(DVec2::new(6.0, 6.0), 10.0, |_| false));
    assert!(tree.any_within(DVec2::new(6.0, 6.0), 10.0, |slot| slot == 40));
    assert!(!tree.any_within(DVec2::new(-50.0, -50.0), 1.0, |_| true));
}
