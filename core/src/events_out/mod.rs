pub mod model;
pub mod sink;
pub mod writer;

pub use crate::config::EventsOutConfig;
pub use model::{preview, EventType, JobEvent};
pub use sink::{EventLog, EventSink, NoopSink};
pub use writer::{start_events_out, EventsOutTx};
