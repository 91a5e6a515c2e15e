pub mod batch;
pub mod handoff;
pub mod scope;
pub mod task;

pub use batch::*;
pub use handoff::*;
pub use scope::*;
pub use task::*;
