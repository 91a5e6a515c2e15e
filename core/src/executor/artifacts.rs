use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::types::{scope_contains, Handoff, Task, TaskId};

/// Content written to one path by one task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    pub path: String,
    pub content: String,
    pub revision: u32,
    pub task_id: TaskId,
}

/// Latest artifact per path. A write with a lower revision than the stored one is ignored.
#[derive(Debug, Clone, Default)]
pub struct ArtifactStore {
    entries: BTreeMap<String, Artifact>,
}

impl ArtifactStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `artifact` unless a higher revision already owns its path.
    pub fn record(&mut self, artifact: Artifact) -> bool {
        if let Some(existing) = self.entries.get(&artifact.path) {
            if existing.revision > artifact.revision {
                return false;
            }
        }
        self.entries.insert(artifact.path.clone(), artifact);
        true
    }

    /// Record every artifact of `handoff` at the task's revision. Returns what was kept.
    pub fn record_handoff(&mut self, task: &Task, handoff: &Handoff) -> Vec<Artifact> {
        let mut accepted = Vec::new();
        for (path, content) in &handoff.artifacts {
            let artifact = Artifact {
                path: path.clone(),
                content: content.clone(),
                revision: task.revision,
                task_id: task.id.clone(),
            };
            if self.record(artifact.clone()) {
                accepted.push(artifact);
            }
        }
        accepted
    }

    pub fn get(&self, path: &str) -> Option<&Artifact> {
        self.entries.get(path)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Artifact> {
        self.entries.values()
    }

    /// Artifacts whose path falls under any claim in `scope`.
    pub fn within_scope(&self, scope: &BTreeSet<String>) -> BTreeMap<String, Artifact> {
        self.entries
            .iter()
            .filter(|(path, _)| scope_contains(scope, path))
            .map(|(path, a)| (path.clone(), a.clone()))
            .collect()
    }

    pub fn written_by<'a>(
        &'a self,
        task_ids: &'a BTreeSet<TaskId>,
    ) -> impl Iterator<Item = &'a Artifact> + 'a {
        self.entries
            .values()
            .filter(move |a| task_ids.contains(&a.task_id))
    }

    /// Every stored path, sorted.
    pub fn paths(&self) -> BTreeSet<String> {
        self.entries.keys().cloned().collect()
    }

    pub fn snapshot(&self) -> BTreeMap<String, Artifact> {
        self.entries.clone()
    }
}
