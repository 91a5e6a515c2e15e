use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::executor::PoolKind;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub job: JobConfig,

    #[serde(default)]
    pub planner: PlannerConfig,

    #[serde(default)]
    pub dispatch: DispatchConfig,

    #[serde(default)]
    pub reconciler: ReconcilerConfig,

    #[serde(default)]
    pub events_out: EventsOutConfig,

    #[serde(default)]
    pub output: OutputConfig,

    #[serde(default)]
    pub capabilities: CapabilitiesConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            logging: LoggingConfig::default(),
            job: JobConfig::default(),
            planner: PlannerConfig::default(),
            dispatch: DispatchConfig::default(),
            reconciler: ReconcilerConfig::default(),
            events_out: EventsOutConfig::default(),
            output: OutputConfig::default(),
            capabilities: CapabilitiesConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_logging_enabled")]
    pub enabled: bool,

    /// If true, log to stderr.
    #[serde(default = "default_logging_console")]
    pub console: bool,

    /// If true, log to a file under `directory` (or OS temp dir if unset).
    #[serde(default = "default_logging_file")]
    pub file: bool,

    /// EnvFilter string, e.g. "info" or "swarm_core=debug".
    #[serde(default = "default_logging_level")]
    pub level: String,

    /// Optional directory for log files. If empty or unset, uses OS temp dir.
    #[serde(default)]
    pub directory: Option<String>,
}

fn default_logging_enabled() -> bool {
    true
}

fn default_logging_console() -> bool {
    true
}

fn default_logging_file() -> bool {
    false
}

fn default_logging_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: default_logging_enabled(),
            console: default_logging_console(),
            file: default_logging_file(),
            level: default_logging_level(),
            directory: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobConfig {
    /// Fix cycles allowed per job before it is forced to `partial`.
    #[serde(default = "default_revision_ceiling")]
    pub revision_ceiling: u32,

    #[serde(default = "default_max_fixes_per_sweep")]
    pub max_fixes_per_sweep: usize,
}

fn default_revision_ceiling() -> u32 {
    15
}

fn default_max_fixes_per_sweep() -> usize {
    5
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            revision_ceiling: default_revision_ceiling(),
            max_fixes_per_sweep: default_max_fixes_per_sweep(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlannerConfig {
    #[serde(default = "default_max_batch_size")]
    pub max_batch_size: usize,

    /// Retries after the first failed attempt of a planner or reviewer call.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    /// Turn budget per conversation.
    #[serde(default = "default_max_turns")]
    pub max_turns: u32,

    /// Delegation stops at this depth.
    #[serde(default = "default_max_depth")]
    pub max_depth: u32,

    /// Delegated tasks with at most this many scope entries run directly.
    #[serde(default = "default_trivial_scope_max")]
    pub trivial_scope_max: usize,

    #[serde(default = "default_enforce_domain_policy")]
    pub enforce_domain_policy: bool,
}

fn default_max_batch_size() -> usize {
    10
}

fn default_max_retries() -> u32 {
    3
}

fn default_base_delay_ms() -> u64 {
    2_000
}

fn default_max_delay_ms() -> u64 {
    30_000
}

fn default_max_turns() -> u32 {
    20
}

fn default_max_depth() -> u32 {
    3
}

fn default_trivial_scope_max() -> usize {
    3
}

fn default_enforce_domain_policy() -> bool {
    true
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            max_batch_size: default_max_batch_size(),
            max_retries: default_max_retries(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            max_turns: default_max_turns(),
            max_depth: default_max_depth(),
            trivial_scope_max: default_trivial_scope_max(),
            enforce_domain_policy: default_enforce_domain_policy(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchConfig {
    #[serde(default = "default_max_parallel")]
    pub max_parallel: usize,

    /// Per-task worker timeout. Unset means no timeout.
    #[serde(default)]
    pub task_timeout_ms: Option<u64>,
}

fn default_max_parallel() -> usize {
    10
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            max_parallel: default_max_parallel(),
            task_timeout_ms: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconcilerConfig {
    #[serde(default = "default_reconciler_enabled")]
    pub enabled: bool,

    /// Run after every N completed controller cycles.
    #[serde(default = "default_interval_cycles")]
    pub interval_cycles: u32,
}

fn default_reconciler_enabled() -> bool {
    true
}

fn default_interval_cycles() -> u32 {
    3
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            enabled: default_reconciler_enabled(),
            interval_cycles: default_interval_cycles(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventsOutConfig {
    pub enabled: bool,
    pub path: String,
    pub channel_capacity: usize,
    pub drop_when_full: bool,
}

impl Default for EventsOutConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            path: "./swarm.events.jsonl".to_string(),
            channel_capacity: 2048,
            drop_when_full: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_output_dir")]
    pub dir: String,
}

fn default_output_dir() -> String {
    "./output_project".to_string()
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CapabilitiesConfig {
    #[serde(default)]
    pub planner: PlannerProvider,

    /// Planner used for delegated tasks. Delegation is off when unset.
    #[serde(default)]
    pub subplanner: Option<PlannerProvider>,

    #[serde(default)]
    pub worker: WorkerProvider,

    /// Per-pool worker overrides, e.g. `[capabilities.pools.qa]`.
    #[serde(default)]
    pub pools: HashMap<PoolKind, WorkerProvider>,

    #[serde(default)]
    pub reviewer: ReviewerProvider,
}

/// External command speaking JSON over stdin/stdout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandConfig {
    pub cmd: String,

    #[serde(default)]
    pub args: Vec<String>,

    #[serde(default)]
    pub envs: HashMap<String, String>,

    #[serde(default = "default_command_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_command_timeout_ms() -> u64 {
    300_000
}

impl CommandConfig {
    pub fn new(cmd: impl Into<String>) -> Self {
        Self {
            cmd: cmd.into(),
            args: Vec::new(),
            envs: HashMap::new(),
            timeout_ms: default_command_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "provider")]
pub enum PlannerProvider {
    #[serde(rename = "command")]
    Command(CommandConfig),
    #[serde(rename = "replay")]
    Replay(ReplayPlannerConfig),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplayPlannerConfig {
    #[serde(default = "default_replay_file")]
    pub plan_file: String,
}

fn default_replay_file() -> String {
    "./plan.json".to_string()
}

impl Default for PlannerProvider {
    fn default() -> Self {
        PlannerProvider::Replay(ReplayPlannerConfig {
            plan_file: default_replay_file(),
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "provider")]
pub enum WorkerProvider {
    #[serde(rename = "command")]
    Command(CommandConfig),
}

impl Default for WorkerProvider {
    fn default() -> Self {
        WorkerProvider::Command(CommandConfig::new("swarm-worker"))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "provider")]
pub enum ReviewerProvider {
    #[serde(rename = "static_scan")]
    StaticScan(StaticScanConfig),
    #[serde(rename = "command")]
    Command(CommandConfig),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StaticScanConfig {
    /// Lines longer than this are reported as style defects.
    #[serde(default = "default_max_line_len")]
    pub max_line_len: usize,

    /// Manifest files that must exist once any code is produced.
    #[serde(default = "default_required_manifests")]
    pub required_manifests: Vec<String>,
}

fn default_max_line_len() -> usize {
    160
}

fn default_required_manifests() -> Vec<String> {
    Vec::new()
}

impl Default for StaticScanConfig {
    fn default() -> Self {
        Self {
            max_line_len: default_max_line_len(),
            required_manifests: default_required_manifests(),
        }
    }
}

impl Default for ReviewerProvider {
    fn default() -> Self {
        ReviewerProvider::StaticScan(StaticScanConfig::default())
    }
}
