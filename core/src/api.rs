//! Stable re-exports for consumers (`cli`, `plugins`, and external crates).
//!
//! Prefer importing from `swarm_core::api` instead of reaching into internal modules.

pub use crate::config::{
    apply_env_overrides, get_swarm_data_dir, load_default, load_from_path, AppConfig,
    CapabilitiesConfig, CommandConfig, DispatchConfig, EventsOutConfig, JobConfig, LoggingConfig,
    OutputConfig, PlannerConfig, PlannerProvider, ReconcilerConfig, ReplayPlannerConfig,
    ReviewerProvider, StaticScanConfig, WorkerProvider,
};
pub use crate::error::{ProtocolError, SwarmError, ValidationError, WorkerFailure};
pub use crate::events_out::{
    start_events_out, EventLog, EventSink, EventType, EventsOutTx, JobEvent, NoopSink,
};
pub use crate::executor::project::{
    MAX_FILES_PER_HANDOFF, MAX_FILE_CONTENT_CHARS, MAX_FILE_TREE_ENTRIES, MAX_HANDOFF_SUMMARY_CHARS,
};
pub use crate::executor::{
    Artifact, ArtifactSinkPlugin, ArtifactStore, Batch, DepartmentRouter, Dispatcher, Domain,
    Handoff, HandoffDigest, HandoffMetrics, HandoffStatus, Objective, PlanRequest, PlannerPlugin,
    PoolKind, ReviewKind, ReviewRequest, ReviewerPlugin, Task, TaskGraph, TaskId, TaskStatus,
    WorkRequest, WorkerPlugin, WorkerPools,
};
pub use crate::job::{
    run_job, Capabilities, JobController, JobOptions, JobOutcome, JobPhase, JobStatus,
};
pub use crate::planner::{
    extract_json, parse_planner_response, parse_worker_response, RetryPolicy, SubplanPolicy,
    TrivialPredicate,
};
pub use crate::review::{Defect, RevisionBudget, Severity};
