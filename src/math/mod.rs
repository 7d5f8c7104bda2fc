//! Math Module
//!
//! Pure integer computations and the canonical description of a request.

mod computation;
mod ops;


// Re-export public types
pub use computation::Computation;
pub use ops::{factorial, fibonacci, power, Calculator, PureMath};
