#[allow(clippy::module_inception)]
pub mod error;
pub mod protocol;
pub mod validation;

pub use error::{SwarmError, WorkerFailure};
pub use protocol::ProtocolError;
pub use validation::ValidationError;
