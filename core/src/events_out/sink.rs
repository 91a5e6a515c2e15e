use std::sync::{Arc, Mutex};

use super::model::{EventType, JobEvent};
use super::writer::EventsOutTx;

/// Receives job events. Must not block the caller.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: JobEvent);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl EventSink for NoopSink {
    fn emit(&self, _event: JobEvent) {}
}

/// In-memory event log, shared between clones.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: Arc<Mutex<Vec<JobEvent>>>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<JobEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    pub fn count(&self, event_type: EventType) -> usize {
        self.events
            .lock()
            .map(|e| e.iter().filter(|ev| ev.event_type == event_type).count())
            .unwrap_or(0)
    }
}

impl EventSink for EventLog {
    fn emit(&self, event: JobEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}

impl EventSink for EventsOutTx {
    fn emit(&self, event: JobEvent) {
        match serde_json::to_string(&event) {
            Ok(line) => self.try_send_line(line),
            Err(e) => tracing::warn!(error = %e, "failed to serialize job event"),
        }
    }
}
