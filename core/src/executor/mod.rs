//! Task graph, routing and wave dispatch.
//!
//! ```text
//! Batch
//!   ↓
//! TaskGraph::admit() → ids, deps, cycle, domain policy, scope checks
//!   ↓
//! TaskGraph::ready_tasks() → priority, then insertion order
//!   ↓
//! Dispatcher::run_wave() → Vec<Handoff> (JoinSet, one WorkRequest per task)
//!   ↓
//! TaskGraph::apply_handoff() + block_unreachable()
//! ```

pub mod artifacts;
pub mod graph;
pub mod project;
pub mod router;
pub mod scheduler;
pub mod traits;
pub mod types;

pub use artifacts::{Artifact, ArtifactStore};
pub use graph::TaskGraph;
pub use project::HandoffDigest;
pub use router::{DepartmentRouter, PoolKind, WorkerPools};
pub use scheduler::Dispatcher;
pub use traits::*;
pub use types::*;
