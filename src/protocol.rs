//! Wire protocol for the Fibonacci value stream.
//!
//! The protocol has exactly one operation:
//! - Client sends one raw byte, the requested index `n` (0-255).
//! - Server replies with one UTF-8 text line: the decimal form of the
//!   computed value, terminated by `\n`.
//!
//! There is no framing beyond this and no pipelining: each request byte
//! produces exactly one response line, in request order.

/// Compute the n-th Fibonacci number with Binet's closed form.
///
/// With `phi = (1 + sqrt 5) / 2` the result is
/// `(phi^n - sign / phi^n) / sqrt 5`, where `sign` is `+1` for even `n`
/// and `-1` for odd `n`. Exact for small `n`; floating-point rounding
/// grows with `n`.
pub fn fib_binet(n: u8) -> f64 {
    let sqrt5 = 5.0_f64.sqrt();
    let phi = (1.0 + sqrt5) / 2.0;

    let sign = if n % 2 == 0 { 1.0 } else { -1.0 };
    let phi_n = phi.powi(i32::from(n));

    (phi_n - sign / phi_n) / sqrt5
}

/// Format a computed value as its wire line.
pub fn format_response(value: f64) -> String {
    format!("{value}\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_small_indices_exact() {
        assert_eq!(fib_binet(0), 0.0);
        assert!((fib_binet(1) - 1.0).abs() < 1e-9);
        assert!((fib_binet(2) - 1.0).abs() < 1e-9);
        assert!((fib_binet(3) - 2.0).abs() < 1e-9);
        assert!((fib_binet(10) - 55.0).abs() < 1e-9);
        assert!((fib_binet(20) - 6765.0).abs() < 1e-6);
        assert!((fib_binet(30) - 832_040.0).abs() < 1e-3);
    }

    #[test]
    fn test_matches_iterative_fibonacci() {
        // Relative tolerance: rounding error grows with n but stays tiny
        // within u64 range.
        let (mut a, mut b) = (0u64, 1u64);
        for n in 0..=90u8 {
            let expected = a as f64;
            let got = fib_binet(n);
            let tolerance = if expected == 0.0 { 1e-9 } else { expected * 1e-9 };
            assert!(
                (got - expected).abs() <= tolerance,
                "n={n}: got {got}, expected {expected}"
            );
            let next = a + b;
            a = b;
            b = next;
        }
    }

    #[test]
    fn test_odd_index_sign() {
        // Odd n flips the correction term; n=1 and n=2 both compute to 1.
        assert!((fib_binet(1) - fib_binet(2)).abs() < 1e-9);
    }

    #[test]
    fn test_response_format() {
        assert_eq!(format_response(55.0), "55\n");
        assert_eq!(format_response(0.0), "0\n");
        assert!(format_response(fib_binet(200)).ends_with('\n'));
    }
}
