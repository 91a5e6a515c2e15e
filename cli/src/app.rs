//! Wires config, plugins and the events writer around one job run.
use std::sync::Arc;

use swarm_core::api::{start_events_out, AppConfig, JobController, JobOptions, JobOutcome, JobStatus};
use swarm_plugins::factory;

use crate::commands::cli::RunArgs;
use crate::error::CliError;

#[tracing::instrument(name = "cli.run_app", skip_all)]
pub async fn run_app_with_config(run: RunArgs, mut cfg: AppConfig) -> Result<i32, CliError> {
    let description = read_description(&run)?;
    apply_run_overrides(&mut cfg, &run);

    let events_out = start_events_out(&cfg.events_out)
        .await
        .map_err(CliError::Command)?;

    let caps = factory::build_capabilities(&cfg);
    tracing::debug!(capabilities = ?caps, output = %cfg.output.dir, "capabilities built");
    let sink = factory::build_sink(&cfg);
    let options = JobOptions {
        revision_ceiling: run.revision_ceiling,
        max_fixes_per_sweep: run.max_fixes,
    };

    let mut ctl = JobController::new(caps, cfg.clone())
        .with_options(options)
        .with_artifact_sink(sink);
    if let Some(tx) = events_out.clone() {
        ctl = ctl.with_events(Arc::new(tx));
    }

    let outcome = ctl.run(&description).await;
    // Release the controller's sender so the writer can drain.
    drop(ctl);

    if let Some(tx) = events_out {
        let dropped = tx.dropped_count();
        tx.shutdown().await;
        if dropped > 0 {
            tracing::warn!(dropped, "events_out dropped lines");
        }
    }

    if run.json {
        let json = serde_json::to_string_pretty(&outcome)
            .map_err(|e| CliError::Command(format!("serialize outcome: {e}")))?;
        println!("{json}");
    } else {
        print_summary(&outcome, &cfg.output.dir);
    }
    Ok(exit_code_for_status(outcome.status))
}

fn read_description(run: &RunArgs) -> Result<String, CliError> {
    let text = match (&run.description, &run.description_file) {
        (Some(d), _) => d.clone(),
        (None, Some(path)) => std::fs::read_to_string(path)?,
        (None, None) => {
            return Err(CliError::Command(
                "a job description or --description-file is required".to_string(),
            ))
        }
    };
    let text = text.trim().to_string();
    if text.is_empty() {
        return Err(CliError::Command("job description is empty".to_string()));
    }
    Ok(text)
}

fn apply_run_overrides(cfg: &mut AppConfig, run: &RunArgs) {
    if let Some(dir) = &run.output {
        cfg.output.dir = dir.clone();
    }
    if let Some(path) = &run.events {
        cfg.events_out.enabled = true;
        cfg.events_out.path = path.clone();
    }
}

pub fn exit_code_for_status(status: JobStatus) -> i32 {
    match status {
        JobStatus::Success => 0,
        JobStatus::Partial => 2,
        JobStatus::Failed => 3,
    }
}

fn print_summary(outcome: &JobOutcome, output_dir: &str) {
    println!("job {}: {}", outcome.job_id, outcome.status);
    println!(
        "  tasks: {}/{} complete, revision {}, {} cycles, {} waves",
        outcome.completed_count(),
        outcome.handoffs.len(),
        outcome.revision,
        outcome.cycles,
        outcome.waves
    );
    println!("  artifacts: {} in {}", outcome.artifacts.len(), output_dir);
    for handoff in outcome.handoffs.iter().filter(|h| !h.is_complete()) {
        println!("  [{}] {}: {}", handoff.status, handoff.task_id, handoff.summary);
    }
    if let Some(err) = &outcome.error {
        println!("  error: {err}");
    }
}
