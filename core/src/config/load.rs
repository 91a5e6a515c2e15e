use std::path::{Path, PathBuf};

use super::types::AppConfig;
use crate::error::SwarmError;

/// Get the default swarm data directory: ~/.swarm
pub fn get_swarm_data_dir() -> anyhow::Result<PathBuf> {
    let home = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .map_err(|_| anyhow::anyhow!("Cannot determine home directory"))?;
    Ok(PathBuf::from(home).join(".swarm"))
}

pub fn load_from_path(path: &Path) -> Result<AppConfig, SwarmError> {
    let s = std::fs::read_to_string(path)?;
    toml::from_str::<AppConfig>(&s)
        .map_err(|e| SwarmError::Config(format!("{}: {e}", path.display())))
}

/// Load config by priority, then apply `SWARM_*` environment overrides.
///
/// Priority: `$SWARM_CONFIG` > `~/.swarm/config.toml` > `./swarm.toml` > defaults.
pub fn load_default() -> Result<AppConfig, SwarmError> {
    let explicit = std::env::var("SWARM_CONFIG")
        .ok()
        .filter(|v| !v.trim().is_empty())
        .map(PathBuf::from);
    let home_config = get_swarm_data_dir().ok().map(|d| d.join("config.toml"));
    let local_config = Path::new("swarm.toml");

    let mut cfg = if let Some(path) = explicit {
        load_from_path(&path)?
    } else if let Some(path) = home_config.filter(|p| p.exists()) {
        load_from_path(&path)?
    } else if local_config.exists() {
        load_from_path(local_config)?
    } else {
        AppConfig::default()
    };

    apply_env_overrides(&mut cfg, |key| std::env::var(key).ok())?;
    validate(&cfg)?;
    Ok(cfg)
}

/// Apply `SWARM_*` overrides read through `lookup`. Empty values are ignored.
pub fn apply_env_overrides<F>(cfg: &mut AppConfig, lookup: F) -> Result<(), SwarmError>
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(v) = get("SWARM_REVISION_CEILING") {
        cfg.job.revision_ceiling = parse_env("SWARM_REVISION_CEILING", &v)?;
    }
    if let Some(v) = get("SWARM_MAX_FIXES") {
        cfg.job.max_fixes_per_sweep = parse_env("SWARM_MAX_FIXES", &v)?;
    }
    if let Some(v) = get("SWARM_MAX_PARALLEL") {
        cfg.dispatch.max_parallel = parse_env("SWARM_MAX_PARALLEL", &v)?;
    }
    if let Some(v) = get("SWARM_OUTPUT_DIR") {
        cfg.output.dir = v;
    }
    if let Some(v) = get("SWARM_LOG_LEVEL") {
        cfg.logging.level = v;
    }
    if let Some(v) = get("SWARM_EVENTS_OUT") {
        cfg.events_out.enabled = true;
        cfg.events_out.path = v;
    }
    Ok(())
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, SwarmError>
where
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| SwarmError::Config(format!("{key}={value}: {e}")))
}

pub fn validate(cfg: &AppConfig) -> Result<(), SwarmError> {
    if cfg.planner.max_batch_size == 0 {
        return Err(SwarmError::Config("planner.max_batch_size must be > 0".into()));
    }
    if cfg.dispatch.max_parallel == 0 {
        return Err(SwarmError::Config("dispatch.max_parallel must be > 0".into()));
    }
    if cfg.planner.max_turns == 0 {
        return Err(SwarmError::Config("planner.max_turns must be > 0".into()));
    }
    Ok(())
}
