use super::*;

#[test]
fn test_mirror_index_inside_is_identity() {
    for i in 0..5 {
        assert_eq!(mirror_index(i, 5), i);
    }
}

#[test]
fn test_mirror_index_reflects_without_repeating_border() {
    assert_eq!(mirror_index(-1, 5), 1);
    assert_eq!(mirror_index(-2, 5), 2);
    assert_eq!(mirror_index(5, 5), 3);
    assert_eq!(mirror_index(6, 5), 2);
    // Far away values keep bouncing between the borders.
    assert_eq!(mirror_index(8, 5), 0);
    assert_eq!(mirror_index(-8, 5), 0);
    assert_eq!(mirror_index(9, 5), 1);
}

#[test]
fn test_mirror_index_single_sample() {
    assert_eq!(mirror_index(-3, 1), 0);
    assert_eq!(mirror_index(7, 1), 0);
}

#[test]
fn test_rect_mirror_with_offset_origin() {
    let rect = Rect::new(10, 20, 4, 3);
    assert_eq!(rect.mirror(10, 20), (10, 20));
    assert_eq!(rect.mirror(9, 19), (11, 21));
    assert_eq!(rect.mirror(14, 23), (12, 21));
}

#[test]
fn test_rect_intersect() {
    let a = Rect::new(0, 0, 10, 10);
    let b = Rect::new(5, -5, 10, 8);
    assert_eq!(a.intersect(&b), Some(Rect::new(5, 0, 5, 3)));

    let c = Rect::new(10, 0, 3, 3);
    assert_eq!(a.intersect(&c), None);
}

#[test]
fn test_rect_contains() {
    let rect = Rect::new(2, 3, 4, 5);
    assert!(rect.contains(2, 3));
    assert!(rect.contains(5, 7));
    assert!(!rect.contains(6, 7));
    assert!(!rect.contains(2, 8));
    assert!(!rect.contains(1, 3));
}

#[test]
fn test_sample_conversions() {
    assert_eq!(200u8.to_f64(), 200.0);
    assert_eq!(u8::from_f64(300.0), 255);
    assert_eq!(u16::from_f64(-4.0), 0);
    assert_eq!(i16::from_f64(-4.6), -4);
    assert_eq!(f32::from_f64(1.5), 1.5);
}

#[test]
fn test_frame_stack_rejects_wrong_frame_size() {
    let result = FrameStack::new(3, 2, vec![vec![0u16; 6], vec![0u16; 5]]);
    match result {
        Err(Error::FrameSize { index, actual, .. }) => {
            assert_eq!(index, 1);
            assert_eq!(actual, 5);
        }
        other => panic!("unexpected result: {other:?}"),
    }
}

#[test]
fn test_frame_stack_rejects_empty_frames() {
    assert!(FrameStack::<f32>::new(0, 4, vec![]).is_err());
}

#[test]
fn test_frame_stack_get_mirrors_out_of_bounds() {
    // 3x2 frame:
    // 0 1 2
    // 3 4 5
    let stack = FrameStack::new(3, 2, vec![(0..6).map(|v| v as f32).collect()]).unwrap();
    assert_eq!(stack.frame_count(), 1);
    assert_eq!(stack.bounds(0), Rect::from_size(3, 2));
    assert_eq!(stack.get(1, 1, 0), 4.0);
    assert_eq!(stack.get(-1, 0, 0), 1.0);
    assert_eq!(stack.get(3, 0, 0), 1.0);
    assert_eq!(stack.get(0, -1, 0), 3.0);
    assert_eq!(stack.get(2, 2, 0), 2.0);
}
