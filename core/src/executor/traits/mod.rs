pub mod planner;
pub mod reviewer;
pub mod sink;
pub mod worker;

pub use planner::*;
pub use reviewer::*;
pub use sink::*;
pub use worker::*;
