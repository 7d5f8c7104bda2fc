//! Service Module
//!
//! The cache-aside computation pipeline and the request recorder it
//! reports to.

mod orchestrator;
mod recorder;
mod stats;

pub use orchestrator::ComputationOrchestrator;
pub use recorder::RequestRecorder;
pub use stats::{OrchestratorStats, StatsSnapshot};
