pub mod command;

pub use command::CommandWorkerPlugin;
