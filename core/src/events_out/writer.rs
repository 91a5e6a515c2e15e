use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::model::preview;
use crate::config::EventsOutConfig;

/// Sender half of the JSONL event writer.
#[derive(Clone)]
pub struct EventsOutTx {
    tx: mpsc::Sender<String>,
    dropped: Arc<AtomicU64>,
    drop_when_full: bool,
    handle: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl EventsOutTx {
    pub fn dropped_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    pub async fn send_line(&self, line: String) {
        if self.drop_when_full {
            if self.tx.try_send(line).is_err() {
                self.dropped.fetch_add(1, Ordering::Relaxed);
            }
        } else if self.tx.send(line).await.is_err() {
            // writer closed
        }
    }

    /// Non-blocking send for synchronous callers.
    ///
    /// With `drop_when_full` off, a full channel hands the line to a spawned
    /// sender, so ordering holds only while the channel has room.
    pub fn try_send_line(&self, line: String) {
        match self.tx.try_send(line) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(line)) if !self.drop_when_full => {
                let tx = self.tx.clone();
                tokio::spawn(async move {
                    let _ = tx.send(line).await;
                });
            }
            Err(_) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    /// Close this sender and wait for the writer to flush.
    ///
    /// Other live clones keep the writer open until they are dropped.
    pub async fn shutdown(self) {
        let handle = self.handle.lock().ok().and_then(|mut h| h.take());
        drop(self.tx);
        if let Some(handle) = handle {
            let _ = handle.await;
        }
    }
}

pub async fn start_events_out(cfg: &EventsOutConfig) -> Result<Option<EventsOutTx>, String> {
    if !cfg.enabled || cfg.path.trim().is_empty() {
        return Ok(None);
    }

    let (tx, mut rx) = mpsc::channel::<String>(cfg.channel_capacity.max(1));
    let dropped = Arc::new(AtomicU64::new(0));
    let path = cfg.path.clone();
    let drop_when_full = cfg.drop_when_full;

    let mut writer: Box<dyn tokio::io::AsyncWrite + Unpin + Send> = if path == "stdout:" {
        Box::new(tokio::io::stdout())
    } else {
        let file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(|e| format!("open events_out {path}: {e}"))?;
        Box::new(file)
    };

    let handle = tokio::spawn(async move {
        while let Some(mut line) = rx.recv().await {
            if !line.ends_with('\n') {
                line.push('\n');
            }
            if path == "stdout:" {
                tracing::debug!(
                    target: "swarm.stdout_audit",
                    kind = "events_out",
                    bytes = line.len(),
                    preview = %preview(line.trim_end())
                );
            }
            if writer.write_all(line.as_bytes()).await.is_err() {
                return;
            }
        }

        let _ = writer.flush().await;
    });

    Ok(Some(EventsOutTx {
        tx,
        dropped,
        drop_when_full,
        handle: Arc::new(Mutex::new(Some(handle))),
    }))
}
