use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::executor::project::{file_tree, tree_delta, HandoffDigest};
use crate::executor::traits::{Objective, PlanRequest};
use crate::executor::types::{Handoff, Task, TaskId};

/// Identifies a planning conversation: the root job or a delegated task.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ConversationKey {
    Root,
    Task(TaskId),
}

impl ConversationKey {
    /// Conversation that receives the handoff of a task with this parent.
    pub fn for_parent(parent_id: Option<&str>) -> Self {
        match parent_id {
            Some(id) => ConversationKey::Task(id.to_string()),
            None => ConversationKey::Root,
        }
    }
}

impl fmt::Display for ConversationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConversationKey::Root => f.write_str("root"),
            ConversationKey::Task(id) => write!(f, "task:{id}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversationState {
    /// Still producing batches.
    Active,
    /// Returned an empty batch or ran out of turns; waiting on children.
    Finished,
    /// First turn was empty, so the delegated task runs as a single unit.
    Atomic,
    /// Children aggregated into the parent's handoff.
    Resolved,
}

/// State of one planner or subplanner conversation.
#[derive(Debug, Clone)]
pub struct Conversation {
    pub key: ConversationKey,
    pub objective: Objective,
    pub depth: u32,
    pub scratchpad: String,
    pub turns: u32,
    pub state: ConversationState,
    pub children: Vec<TaskId>,
    /// Handoffs not yet shown to the planner.
    pub inbox: Vec<Handoff>,
    /// Every child handoff received, for aggregation.
    pub received: Vec<Handoff>,
    pub concerns: Vec<String>,
    /// Project tree as of the last completed turn.
    pub seen_tree: Option<BTreeSet<String>>,
}

impl Conversation {
    fn new(key: ConversationKey, objective: Objective, depth: u32) -> Self {
        Self {
            key,
            objective,
            depth,
            scratchpad: String::new(),
            turns: 0,
            state: ConversationState::Active,
            children: Vec::new(),
            inbox: Vec::new(),
            received: Vec::new(),
            concerns: Vec::new(),
            seen_tree: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.state == ConversationState::Active
    }

    /// Request for the next turn against the current project `tree`. The
    /// inbox is drained by the caller on success.
    pub fn request(
        &self,
        max_batch_size: usize,
        feedback: Option<String>,
        tree: &BTreeSet<String>,
    ) -> PlanRequest {
        let (new_files, removed_files) = match &self.seen_tree {
            Some(seen) => tree_delta(seen, tree),
            None => (Vec::new(), Vec::new()),
        };
        PlanRequest {
            objective: self.objective.clone(),
            depth: self.depth,
            turn: self.turns,
            scratchpad: self.scratchpad.clone(),
            prior_handoffs: self.inbox.iter().map(HandoffDigest::from).collect(),
            file_tree: file_tree(tree),
            total_files: tree.len(),
            new_files,
            removed_files,
            feedback,
            max_batch_size,
        }
    }

    /// Record a successful turn. The scratchpad is replaced, never merged.
    pub fn complete_turn(
        &mut self,
        scratchpad: String,
        admitted: Vec<TaskId>,
        tree: BTreeSet<String>,
    ) {
        self.turns += 1;
        self.scratchpad = scratchpad;
        self.inbox.clear();
        self.children.extend(admitted);
        self.seen_tree = Some(tree);
    }
}

/// All conversations of one job, keyed by root or delegated task id.
#[derive(Debug, Default)]
pub struct PlannerArena {
    conversations: BTreeMap<ConversationKey, Conversation>,
}

impl PlannerArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open_root(&mut self, description: impl Into<String>) {
        let key = ConversationKey::Root;
        let objective = Objective::Job {
            description: description.into(),
        };
        self.conversations
            .insert(key.clone(), Conversation::new(key, objective, 0));
    }

    /// Open a subplanner conversation for `task`, which sits at `depth`.
    pub fn open_delegated(&mut self, task: &Task, depth: u32) {
        let key = ConversationKey::Task(task.id.clone());
        let objective = Objective::Task { task: task.clone() };
        self.conversations
            .insert(key.clone(), Conversation::new(key, objective, depth + 1));
    }

    pub fn get(&self, key: &ConversationKey) -> Option<&Conversation> {
        self.conversations.get(key)
    }

    pub fn get_mut(&mut self, key: &ConversationKey) -> Option<&mut Conversation> {
        self.conversations.get_mut(key)
    }

    pub fn is_delegated(&self, task_id: &str) -> bool {
        self.conversations
            .contains_key(&ConversationKey::Task(task_id.to_string()))
    }

    /// Keys of conversations still producing batches, deepest first.
    pub fn active_keys(&self) -> Vec<ConversationKey> {
        let mut keys: Vec<(u32, ConversationKey)> = self
            .conversations
            .values()
            .filter(|c| c.is_active())
            .map(|c| (c.depth, c.key.clone()))
            .collect();
        keys.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(&b.1)));
        keys.into_iter().map(|(_, k)| k).collect()
    }

    /// Delegated conversations that finished planning and have not been resolved.
    pub fn finished_delegations(&self) -> Vec<TaskId> {
        self.conversations
            .values()
            .filter(|c| c.state == ConversationState::Finished)
            .filter_map(|c| match &c.key {
                ConversationKey::Task(id) => Some(id.clone()),
                ConversationKey::Root => None,
            })
            .collect()
    }

    pub fn has_active(&self) -> bool {
        self.conversations.values().any(Conversation::is_active)
    }

    /// Deliver a handoff to the conversation that planned the task.
    pub fn route_handoff(&mut self, parent_id: Option<&str>, handoff: &Handoff) {
        let key = ConversationKey::for_parent(parent_id);
        if let Some(conv) = self.conversations.get_mut(&key) {
            if conv.is_active() {
                conv.inbox.push(handoff.clone());
            }
            conv.received.push(handoff.clone());
        }
    }
}
