//! Tests for die faces and shake classification

use shakedice::dice::types::{
    is_shaking, is_shaking_with, magnitude, DieFace, MotionSample, SHAKE_THRESHOLD,
};

#[test]
fn test_magnitude_is_euclidean_norm() {
    let samples = [
        MotionSample::new(0.0, 0.0, 0.0),
        MotionSample::new(1.0, 2.0, 2.0),
        MotionSample::new(-1.0, -2.0, -2.0),
        MotionSample::new(0.3, -0.7, 9.81),
    ];
    for s in samples {
        let expected = (s.x * s.x + s.y * s.y + s.z * s.z).sqrt();
        assert!(magnitude(&s) >= 0.0);
        assert!((magnitude(&s) - expected).abs() < 1e-6);
    }
    assert!((magnitude(&MotionSample::new(1.0, 2.0, 2.0)) - 3.0).abs() < 1e-6);
}

#[test]
fn test_sample_at_threshold_is_not_a_shake() {
    let sample = MotionSample::new(0.0, 0.0, 1.78);
    assert!((magnitude(&sample) - 1.78).abs() < 1e-6);
    assert!(!is_shaking(&sample));
}

#[test]
fn test_unit_cube_diagonal_is_not_a_shake() {
    let sample = MotionSample::new(1.0, 1.0, 1.0);
    assert!((magnitude(&sample) - 3.0_f32.sqrt()).abs() < 1e-6);
    assert!(!is_shaking(&sample));
}

#[test]
fn test_strong_sample_is_a_shake() {
    let sample = MotionSample::new(1.5, 1.0, 1.0);
    assert!((magnitude(&sample) - 2.0616).abs() < 1e-3);
    assert!(is_shaking(&sample));
}

#[test]
fn test_sensitivity_range() {
    // A sample of magnitude 1.6 only counts on the most sensitive setting.
    let sample = MotionSample::new(0.0, 0.0, 1.6);
    assert!(is_shaking_with(&sample, 1.5));
    assert!(!is_shaking_with(&sample, SHAKE_THRESHOLD));
    assert!(!is_shaking_with(&sample, 2.0));
}

#[test]
fn test_die_face_parse_valid() {
    for value in 1..=6u8 {
        let face = DieFace::try_from(value).expect("valid face");
        assert_eq!(face.value(), value);
        assert_eq!(face.to_string(), value.to_string());
    }
}

#[test]
fn test_die_face_parse_invalid() {
    assert_eq!(DieFace::new(0), None);
    assert_eq!(DieFace::new(7), None);
    assert_eq!(DieFace::new(255), None);
}

#[test]
fn test_die_face_tables() {
    assert_eq!(DieFace::ONE.pips(), &[(1, 1)]);
    assert_eq!(DieFace::SIX.pips().len(), 6);
    assert_eq!(DieFace::default(), DieFace::ONE);
    assert_eq!(DieFace::ALL.len(), 6);
}
