pub mod factory;
pub mod planner;
pub mod process;
pub mod review;
pub mod sink;
pub mod worker;
