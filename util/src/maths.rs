//! Utility maths functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use num_traits::Float;

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Apply polynomial coefficients to a value.
///
/// Coefficients are given highest power first, i.e. 3 coefficients make the
/// 2nd order polynomial `c[0]*x^2 + c[1]*x + c[2]`.
pub fn poly_val<T>(value: &T, coeffs: &[T]) -> T
where
    T: Float + std::ops::AddAssign,
{
    let mut res = T::from(0).unwrap();

    for i in 0..(coeffs.len() as i32) {
        res += value.powi(coeffs.len() as i32 - 1 - i) * coeffs[i as usize];
    }

    res
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_poly_val() {
        // 2x^2 + 3x + 1 at x = 2 -> 15
        let coeffs = [2.0, 3.0, 1.0];
        assert!((poly_val(&2.0, &coeffs) - 15.0).abs() < 1e-12);
    }
}
