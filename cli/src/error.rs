use swarm_core::api::SwarmError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("job failed: {0}")]
    Job(#[from] SwarmError),
    #[error("command failed: {0}")]
    Command(String),
    #[error("config error: {0}")]
    Config(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("anyhow error: {0}")]
    Anyhow(#[from] anyhow::Error),
}

impl CliError {
    /// 11: config, 20: io or setup, 50: internal.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Config(_) => 11,
            CliError::Job(SwarmError::Config(_)) => 11,
            CliError::Job(SwarmError::Io(_)) => 20,
            CliError::Job(_) => 50,
            CliError::Io(_) => 20,
            CliError::Command(_) => 20,
            CliError::Anyhow(_) => 50,
        }
    }
}
