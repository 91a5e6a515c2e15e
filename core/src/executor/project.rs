//! Bounded views of the project state for planner and worker requests.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::artifacts::ArtifactStore;
use super::types::{Handoff, HandoffStatus, TaskId};

pub const MAX_FILE_TREE_ENTRIES: usize = 500;
pub const MAX_FILE_CONTENT_CHARS: usize = 30_000;
pub const MAX_HANDOFF_SUMMARY_CHARS: usize = 400;
pub const MAX_FILES_PER_HANDOFF: usize = 30;

const BINARY_EXTENSIONS: &[&str] = &[
    "png", "jpg", "jpeg", "gif", "bmp", "ico", "webp", "wav", "mp3", "ogg", "flac", "ttf", "otf",
    "woff", "woff2", "zip", "gz", "tar", "pdf", "exe", "dll", "so", "dylib", "pyc", "class",
];

/// Sorted paths, cut at [`MAX_FILE_TREE_ENTRIES`] with a trailing marker line.
pub fn file_tree(paths: &BTreeSet<String>) -> Vec<String> {
    let mut tree: Vec<String> = paths.iter().take(MAX_FILE_TREE_ENTRIES).cloned().collect();
    if paths.len() > MAX_FILE_TREE_ENTRIES {
        tree.push(format!(
            "... ({} more files)",
            paths.len() - MAX_FILE_TREE_ENTRIES
        ));
    }
    tree
}

/// Paths added and removed between two trees, each sorted.
pub fn tree_delta(
    previous: &BTreeSet<String>,
    current: &BTreeSet<String>,
) -> (Vec<String>, Vec<String>) {
    let added = current.difference(previous).cloned().collect();
    let removed = previous.difference(current).cloned().collect();
    (added, removed)
}

fn is_binary(path: &str) -> bool {
    path.rsplit_once('.')
        .is_some_and(|(_, ext)| BINARY_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
}

/// File content as shown to a worker: binary files become a placeholder and
/// text is cut at [`MAX_FILE_CONTENT_CHARS`].
pub fn file_content(path: &str, content: &str) -> String {
    if is_binary(path) {
        return format!("(binary file, {} bytes)", content.len());
    }
    match content.char_indices().nth(MAX_FILE_CONTENT_CHARS) {
        Some((cut, _)) => format!("{}\n... (truncated)", &content[..cut]),
        None => content.to_string(),
    }
}

/// Contents of every stored artifact under `scope`, bounded per file.
pub fn scoped_contents(store: &ArtifactStore, scope: &BTreeSet<String>) -> BTreeMap<String, String> {
    store
        .within_scope(scope)
        .into_iter()
        .map(|(path, artifact)| {
            let content = file_content(&path, &artifact.content);
            (path, content)
        })
        .collect()
}

/// What a planner sees of a handoff: bounded summary and file list, no content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandoffDigest {
    pub task_id: TaskId,
    pub status: HandoffStatus,
    pub summary: String,
    #[serde(default)]
    pub files_changed: Vec<String>,
    #[serde(default)]
    pub concerns: Vec<String>,
    #[serde(default)]
    pub suggestions: Vec<String>,
}

impl From<&Handoff> for HandoffDigest {
    fn from(handoff: &Handoff) -> Self {
        let mut summary: String = handoff
            .summary
            .chars()
            .take(MAX_HANDOFF_SUMMARY_CHARS)
            .collect();
        if handoff.summary.chars().count() > MAX_HANDOFF_SUMMARY_CHARS {
            summary.push_str("...");
        }

        let mut files_changed: Vec<String> = handoff
            .artifacts
            .keys()
            .take(MAX_FILES_PER_HANDOFF)
            .cloned()
            .collect();
        if handoff.artifacts.len() > MAX_FILES_PER_HANDOFF {
            files_changed.push(format!(
                "... ({} more)",
                handoff.artifacts.len() - MAX_FILES_PER_HANDOFF
            ));
        }

        Self {
            task_id: handoff.task_id.clone(),
            status: handoff.status,
            summary,
            files_changed,
            concerns: handoff.concerns.clone(),
            suggestions: handoff.suggestions.clone(),
        }
    }
}
