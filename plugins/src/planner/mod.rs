pub mod command;
pub mod replay;

pub use command::CommandPlannerPlugin;
pub use replay::ReplayPlannerPlugin;

use swarm_core::api::{Objective, PlanRequest};

/// Prefix for ids the planner left out: `task` at the root, the parent id below it.
pub(crate) fn id_prefix(request: &PlanRequest) -> String {
    match &request.objective {
        Objective::Job { .. } => "task".to_string(),
        Objective::Task { task } => task.id.clone(),
    }
}
