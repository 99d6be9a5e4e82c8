//! NaN-safe checks shared by the parameter builders.
use std::cmp::Ordering::{Equal, Greater};

/// Return true iff x > 0.0 and finite.
#[inline]
pub(crate) fn gt0(x: f64) -> bool {
    x.is_finite() && x.partial_cmp(&0.0) == Some(Greater)
}

/// Return true iff x >= 0.0 and finite.
#[inline]
pub(crate) fn ge0(x: f64) -> bool {
    x.is_finite() && matches!(x.partial_cmp(&0.0), Some(Greater) | Some(Equal))
}

#[cfg(test)]
mod validation_test {
    use super::*;

    #[test]
    fn test_gt0() {
        assert!(gt0(1e-300));
        assert!(!gt0(0.0));
        assert!(!gt0(-0.0));
        assert!(!gt0(f64::NAN));
        assert!(!gt0(f64::INFINITY));
    }

    #[test]
    fn test_ge0() {
        assert!(ge0(0.0));
        assert!(ge0(-0.0));
        assert!(ge0(2.5));
        assert!(!ge0(-1e-12));
        assert!(!ge0(f64::NAN));
        assert!(!ge0(f64::INFINITY));
    }
}
