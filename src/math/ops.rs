//! Pure Math Operations
//!
//! Deterministic, side-effect free integer functions. Results are exact
//! (arbitrary precision), so they never overflow or wrap.

use num_bigint::BigInt;
use num_traits::{One, Zero};

// == Power ==
/// Returns `base` raised to `exp`.
pub fn power(base: i64, exp: u32) -> BigInt {
    BigInt::from(base).pow(exp)
}

// == Fibonacci ==
/// Returns the n-th Fibonacci number, 0-indexed (`fibonacci(0) == 0`).
///
/// Iterative: O(n) additions, two live values.
pub fn fibonacci(n: u64) -> BigInt {
    let mut a = BigInt::zero();
    let mut b = BigInt::one();
    for _ in 0..n {
        let next = &a + &b;
        a = std::mem::replace(&mut b, next);
    }
    a
}

// == Factorial ==
/// Returns `n!`, with `factorial(0) == 1`.
pub fn factorial(n: u64) -> BigInt {
    (2..=n).fold(BigInt::one(), |acc, i| acc * i)
}

// == Calculator ==
/// Seam over the pure functions so callers can substitute a spy in tests.
pub trait Calculator: Send + Sync {
    fn power(&self, base: i64, exp: u32) -> BigInt;
    fn fibonacci(&self, n: u64) -> BigInt;
    fn factorial(&self, n: u64) -> BigInt;
}

/// The production calculator: forwards to the free functions.
#[derive(Debug, Clone, Copy, Default)]
pub struct PureMath;

impl Calculator for PureMath {
    fn power(&self, base: i64, exp: u32) -> BigInt {
        power(base, exp)
    }

    fn fibonacci(&self, n: u64) -> BigInt {
        fibonacci(n)
    }

    fn factorial(&self, n: u64) -> BigInt {
        factorial(n)
    }
}
