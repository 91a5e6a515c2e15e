pub mod api;
pub mod config;
pub mod error;
pub mod events_out;
pub mod executor;
pub mod job;
pub mod planner;
pub mod review;
