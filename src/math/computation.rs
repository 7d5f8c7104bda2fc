//! Computation Descriptor
//!
//! A validated request for one of the three operations, with its cache key
//! and canonical audit representation.

use std::fmt;

use num_bigint::BigInt;

use super::Calculator;

/// One validated computation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Computation {
    Power { base: i64, exp: u32 },
    Fibonacci { n: u64 },
    Factorial { n: u64 },
}

impl Computation {
    /// Name recorded in the request log for this operation.
    pub fn endpoint(&self) -> &'static str {
        match self {
            Computation::Power { .. } => "pow",
            Computation::Fibonacci { .. } => "fib",
            Computation::Factorial { .. } => "factorial",
        }
    }

    /// Namespace used in cache keys.
    fn key_prefix(&self) -> &'static str {
        match self {
            Computation::Power { .. } => "pow",
            Computation::Fibonacci { .. } => "fib",
            Computation::Factorial { .. } => "fact",
        }
    }

    /// Canonical arguments, comma-joined (`"2,8"`, `"7"`).
    pub fn input(&self) -> String {
        match self {
            Computation::Power { base, exp } => format!("{},{}", base, exp),
            Computation::Fibonacci { n } | Computation::Factorial { n } => n.to_string(),
        }
    }

    /// Cache key of the form `<op>:<arg1>[:arg2]`.
    pub fn cache_key(&self) -> String {
        match self {
            Computation::Power { base, exp } => format!("{}:{}:{}", self.key_prefix(), base, exp),
            Computation::Fibonacci { n } | Computation::Factorial { n } => {
                format!("{}:{}", self.key_prefix(), n)
            }
        }
    }

    /// Runs the computation on the given calculator.
    pub fn evaluate(&self, calc: &dyn Calculator) -> BigInt {
        match *self {
            Computation::Power { base, exp } => calc.power(base, exp),
            Computation::Fibonacci { n } => calc.fibonacci(n),
            Computation::Factorial { n } => calc.factorial(n),
        }
    }
}

impl fmt::Display for Computation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.endpoint(), self.input())
    }
}
