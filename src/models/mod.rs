//! Request and Response models for the math API
//!
//! This module defines the DTOs (Data Transfer Objects) used for
//! serializing/deserializing HTTP request and response bodies.

pub mod requests;
pub mod responses;

// Re-export commonly used types
pub use requests::{InputLimits, LoginRequest, NQuery, PowQuery};
pub use responses::{HealthResponse, LoginResponse, ResultResponse, StatsResponse};
