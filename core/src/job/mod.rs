//! Job controller: `planning → dispatching → reviewing → {planning | done}`.
//!
//! Each cycle runs one turn of every active planner conversation, drains
//! waves of ready tasks, then sends the newly finished work through the
//! review gate (and the reconciler on its cadence). Fix batches send the job
//! back to planning; the shared revision budget bounds how often.

pub mod controller;
pub mod phase;
pub mod types;

pub use controller::{run_job, JobController};
pub use phase::{JobPhase, PhaseTransition};
pub use types::{Capabilities, JobOptions, JobOutcome, JobStatus};
