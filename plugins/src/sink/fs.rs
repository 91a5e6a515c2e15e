use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use swarm_core::api::{Artifact, ArtifactSinkPlugin};
use tokio::sync::Mutex;

/// Writes artifacts under an output directory. A path keeps the content of
/// the highest revision written to it so far.
pub struct FsArtifactSink {
    root: PathBuf,
    written: Mutex<HashMap<String, u32>>,
}

impl FsArtifactSink {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            written: Mutex::new(HashMap::new()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn target(&self, rel: &str) -> Result<PathBuf> {
        let path = Path::new(rel);
        let safe = !rel.is_empty()
            && path
                .components()
                .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
        if !safe {
            bail!("refusing to write outside the output directory: {rel}");
        }
        Ok(self.root.join(path))
    }
}

#[async_trait]
impl ArtifactSinkPlugin for FsArtifactSink {
    fn name(&self) -> &str {
        "fs"
    }

    async fn write(&self, artifact: &Artifact) -> Result<()> {
        let target = self.target(&artifact.path)?;

        // Held across the write so two revisions of one path cannot interleave.
        let mut written = self.written.lock().await;
        if let Some(&rev) = written.get(&artifact.path) {
            if rev > artifact.revision {
                tracing::debug!(
                    path = %artifact.path,
                    revision = artifact.revision,
                    kept = rev,
                    "stale artifact write skipped"
                );
                return Ok(());
            }
        }

        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("create {}", parent.display()))?;
        }
        tokio::fs::write(&target, artifact.content.as_bytes())
            .await
            .with_context(|| format!("write {}", target.display()))?;
        written.insert(artifact.path.clone(), artifact.revision);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn artifact(path: &str, content: &str, revision: u32) -> Artifact {
        Artifact {
            path: path.into(),
            content: content.into(),
            revision,
            task_id: "t".into(),
        }
    }

    #[tokio::test]
    async fn writes_nested_paths() {
        let dir = tempfile::tempdir().unwrap();
        let sink = FsArtifactSink::new(dir.path());
        sink.write(&artifact("game/player.py", "class Player: ...", 0))
            .await
            .unwrap();
        let content = std::fs::read_to_string(dir.path().join("game/player.py")).unwrap();
        assert_eq!(content, "class Player: ...");
    }

    #[tokio::test]
    async fn lower_revision_never_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let sink = FsArtifactSink::new(dir.path());
        sink.write(&artifact("main.py", "v2", 2)).await.unwrap();
        sink.write(&artifact("main.py", "v1", 1)).await.unwrap();
        sink.write(&artifact("main.py", "v2b", 2)).await.unwrap();
        let content = std::fs::read_to_string(dir.path().join("main.py")).unwrap();
        assert_eq!(content, "v2b");
    }

    #[tokio::test]
    async fn rejects_escaping_paths() {
        let dir = tempfile::tempdir().unwrap();
        let sink = FsArtifactSink::new(dir.path());
        assert!(sink.write(&artifact("../evil.py", "x", 0)).await.is_err());
        assert!(sink.write(&artifact("/etc/passwd", "x", 0)).await.is_err());
        assert!(sink.write(&artifact("", "x", 0)).await.is_err());
    }
}
