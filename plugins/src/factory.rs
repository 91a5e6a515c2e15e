use std::sync::Arc;

use swarm_core::api::{
    AppConfig, ArtifactSinkPlugin, Capabilities, PlannerPlugin, PlannerProvider, ReviewerPlugin,
    ReviewerProvider, WorkerPlugin, WorkerPools, WorkerProvider,
};

use crate::planner::{CommandPlannerPlugin, ReplayPlannerPlugin};
use crate::review::{CommandReviewerPlugin, StaticScanReviewerPlugin};
use crate::sink::FsArtifactSink;
use crate::worker::CommandWorkerPlugin;

pub fn build_planner(provider: &PlannerProvider) -> Arc<dyn PlannerPlugin> {
    match provider {
        PlannerProvider::Command(cmd) => Arc::new(CommandPlannerPlugin::new(cmd.clone())),
        PlannerProvider::Replay(r_cfg) => Arc::new(ReplayPlannerPlugin::new(r_cfg.plan_file.clone())),
    }
}

pub fn build_subplanner(cfg: &AppConfig) -> Option<Arc<dyn PlannerPlugin>> {
    cfg.capabilities.subplanner.as_ref().map(build_planner)
}

pub fn build_worker(provider: &WorkerProvider) -> Arc<dyn WorkerPlugin> {
    match provider {
        WorkerProvider::Command(cmd) => Arc::new(CommandWorkerPlugin::new(cmd.clone())),
    }
}

pub fn build_worker_pools(cfg: &AppConfig) -> WorkerPools {
    cfg.capabilities
        .pools
        .iter()
        .fold(WorkerPools::new(build_worker(&cfg.capabilities.worker)), |pools, (kind, provider)| {
            pools.with_pool(*kind, build_worker(provider))
        })
}

pub fn build_reviewer(provider: &ReviewerProvider) -> Arc<dyn ReviewerPlugin> {
    match provider {
        ReviewerProvider::StaticScan(scan_cfg) => {
            Arc::new(StaticScanReviewerPlugin::new(scan_cfg.clone()))
        }
        ReviewerProvider::Command(cmd) => Arc::new(CommandReviewerPlugin::new(cmd.clone())),
    }
}

/// Wire every capability the config names. The reconciler shares the reviewer.
pub fn build_capabilities(cfg: &AppConfig) -> Capabilities {
    let reviewer = build_reviewer(&cfg.capabilities.reviewer);
    let mut caps = Capabilities::new(
        build_planner(&cfg.capabilities.planner),
        build_worker_pools(cfg),
        reviewer.clone(),
    );
    if let Some(sub) = build_subplanner(cfg) {
        caps = caps.with_subplanner(sub);
    }
    if cfg.reconciler.enabled {
        caps = caps.with_reconciler(reviewer);
    }
    caps
}

pub fn build_sink(cfg: &AppConfig) -> Arc<dyn ArtifactSinkPlugin> {
    let dir = shellexpand::tilde(&cfg.output.dir).to_string();
    Arc::new(FsArtifactSink::new(dir))
}

#[cfg(test)]
mod tests {
    use super::*;
    use swarm_core::api::{CommandConfig, PoolKind};

    #[test]
    fn default_config_builds_replay_and_static_scan() {
        let cfg = AppConfig::default();
        let caps = build_capabilities(&cfg);
        assert_eq!(caps.planner.name(), "replay");
        assert_eq!(caps.reviewer.name(), "static_scan");
        assert!(caps.subplanner.is_none());
        assert!(caps.reconciler.is_some());
    }

    #[test]
    fn pools_and_subplanner_follow_config() {
        let mut cfg = AppConfig::default();
        cfg.capabilities.subplanner = Some(PlannerProvider::Command(CommandConfig::new("sub")));
        cfg.capabilities
            .pools
            .insert(PoolKind::Qa, WorkerProvider::Command(CommandConfig::new("qa")));
        cfg.reconciler.enabled = false;

        let caps = build_capabilities(&cfg);
        assert_eq!(caps.subplanner.as_ref().map(|p| p.name()), Some("command"));
        assert!(caps.reconciler.is_none());
        assert_eq!(caps.workers.worker_for(PoolKind::Qa).name(), "command");
    }
}
