//! Planner and subplanner conversations.
//!
//! The planner capability itself is stateless; everything a conversation
//! remembers between turns (scratchpad, pending handoffs, children) lives in
//! the [`PlannerArena`] owned by the job controller.

pub mod arena;
pub mod parse;
pub mod retry;
pub mod subplanner;

pub use arena::{Conversation, ConversationKey, ConversationState, PlannerArena};
pub use parse::{extract_json, parse_planner_response, parse_worker_response};
pub use retry::{with_retries, RetryPolicy};
pub use subplanner::{
    aggregate_handoffs, prepare_children, uncovered_scope, SubplanPolicy, TrivialPredicate,
};
