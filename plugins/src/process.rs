use std::process::Stdio;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use serde::Serialize;
use swarm_core::api::CommandConfig;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

/// Spawn `cfg.cmd`, write `input` as JSON to stdin and return stdout.
///
/// The child is killed when the timeout elapses. A non-zero exit is an
/// error carrying the tail of stderr.
pub async fn run_json_command<T: Serialize + ?Sized>(cfg: &CommandConfig, input: &T) -> Result<String> {
    let payload = serde_json::to_vec(input).context("serialize command input")?;
    let cmd = shellexpand::tilde(&cfg.cmd).to_string();

    let mut child = Command::new(&cmd)
        .args(&cfg.args)
        .envs(&cfg.envs)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .with_context(|| format!("spawn {cmd}"))?;

    // A child that exits without reading stdin is judged by its exit status.
    if let Some(mut stdin) = child.stdin.take() {
        if let Err(e) = stdin.write_all(&payload).await {
            tracing::debug!(cmd = %cmd, error = %e, "command stdin closed early");
        }
        stdin.shutdown().await.ok();
    }

    let limit = Duration::from_millis(cfg.timeout_ms);
    let output = tokio::time::timeout(limit, child.wait_with_output())
        .await
        .map_err(|_| anyhow!("{cmd} timed out after {} ms", cfg.timeout_ms))?
        .with_context(|| format!("wait for {cmd}"))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!(
            "{cmd} exited with {}: {}",
            output.status.code().unwrap_or(-1),
            tail(stderr.trim(), 512)
        );
    }

    String::from_utf8(output.stdout).context("command stdout is not UTF-8")
}

fn tail(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut start = s.len() - max;
    while !s.is_char_boundary(start) {
        start += 1;
    }
    &s[start..]
}
