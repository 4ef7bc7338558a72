//! Operating-range clamping properties.

use approx::assert_abs_diff_eq;
use proptest::prelude::*;
use vfx_denoise::provider::nvidia::{HEIGHT_RANGE, WIDTH_RANGE, clamp_size};

proptest! {
    #[test]
    fn dominant_axis_lands_in_range(w in 1u32..8000, h in 1u32..8000) {
        let (rw, rh) = clamp_size(w, h);
        if w > h {
            prop_assert!((WIDTH_RANGE.0..=WIDTH_RANGE.1).contains(&rw));
        } else {
            prop_assert!((HEIGHT_RANGE.0..=HEIGHT_RANGE.1).contains(&rh));
        }
    }

    #[test]
    fn aspect_ratio_is_kept(w in 1u32..8000, h in 1u32..8000) {
        let (rw, rh) = clamp_size(w, h);
        if w > h {
            assert_abs_diff_eq!(rh as f64, (rw as f64 * h as f64 / w as f64).max(1.0), epsilon = 0.5 + 1e-9);
        } else {
            assert_abs_diff_eq!(rw as f64, (rh as f64 * w as f64 / h as f64).max(1.0), epsilon = 0.5 + 1e-9);
        }
    }

    #[test]
    fn both_axes_non_zero(w in 1u32..100_000, h in 1u32..100_000) {
        let (rw, rh) = clamp_size(w, h);
        prop_assert!(rw >= 1 && rh >= 1, "clamp_size({}, {}) = ({}, {})", w, h, rw, rh);
    }

    #[test]
    fn in_range_sizes_unchanged(w in 142u32..=1080, h in 80u32..=1080) {
        prop_assert_eq!(clamp_size(w, h), (w, h));
    }
}

#[test]
fn test_portrait_full_hd() {
    assert_eq!(clamp_size(1080, 1920), (608, 1080));
}

#[test]
fn test_extreme_aspect_never_zero() {
    assert_eq!(clamp_size(5000, 1), (1920, 1));
    assert_eq!(clamp_size(1, 5000), (1, 1080));
}

#[test]
fn test_4k_downscaled() {
    assert_eq!(clamp_size(3840, 2160), (1920, 1080));
}
