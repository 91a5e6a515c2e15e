use async_trait::async_trait;

use crate::executor::artifacts::Artifact;

/// Persists artifacts. Must keep only the highest-revision write per path.
#[async_trait]
pub trait ArtifactSinkPlugin: Send + Sync {
    fn name(&self) -> &str;

    async fn write(&self, artifact: &Artifact) -> anyhow::Result<()>;
}
