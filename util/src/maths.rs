//! Utility maths functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use num_traits::Float;

/// Return the largest absolute element-wise difference between two vectors.
///
/// If the vectors do not have the same length, or are empty, `None` is
/// returned.
pub fn max_abs_diff<T>(a: &[T], b: &[T]) -> Option<T>
where
    T: Float,
{
    if a.len() != b.len() || a.is_empty() {
        return None;
    }

    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (*x - *y).abs())
        .fold(None, |max, e| match max {
            Some(m) if m >= e => Some(m),
            _ => Some(e),
        })
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_max_abs_diff() {
        assert_eq!(max_abs_diff(&[0f64, 1.0, 2.0], &[0.5, 1.0, -1.0]), Some(3.0));
        assert_eq!(max_abs_diff::<f64>(&[], &[]), None);
        assert_eq!(max_abs_diff(&[0f64], &[0.0, 1.0]), None);
    }
}
