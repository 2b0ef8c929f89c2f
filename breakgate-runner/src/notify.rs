//! Notification sinks. Delivery is best-effort: a failing sink is logged,
//! never propagated into the scan or a stop update.

use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Sender};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertKind {
    StopRaised,
    StopAdminReset,
    CandidateReady,
    PositionReview,
    DataDegraded,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub kind: AlertKind,
    pub ticker: Option<String>,
    pub message: String,
}

impl Alert {
    pub fn new(kind: AlertKind, ticker: Option<&str>, message: impl Into<String>) -> Self {
        Self {
            kind,
            ticker: ticker.map(str::to_string),
            message: message.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("notification I/O at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("notification encoding: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("notification channel closed")]
    Closed,
}

pub trait NotificationSink: Send + Sync {
    fn name(&self) -> &str;

    fn send(&self, alert: &Alert) -> Result<(), NotifyError>;
}

/// Send and swallow: errors are logged at `warn`.
pub fn notify_best_effort(sink: &dyn NotificationSink, alert: &Alert) {
    if let Err(e) = sink.send(alert) {
        tracing::warn!(sink = sink.name(), kind = ?alert.kind, error = %e, "notification dropped");
    }
}

/// Writes alerts to the tracing log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl NotificationSink for LogSink {
    fn name(&self) -> &str {
        "log"
    }

    fn send(&self, alert: &Alert) -> Result<(), NotifyError> {
        tracing::info!(
            kind = ?alert.kind,
            ticker = alert.ticker.as_deref().unwrap_or("-"),
            "{}",
            alert.message
        );
        Ok(())
    }
}

/// Collects alerts in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    alerts: Mutex<Vec<Alert>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alerts(&self) -> Vec<Alert> {
        self.alerts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl NotificationSink for MemorySink {
    fn name(&self) -> &str {
        "memory"
    }

    fn send(&self, alert: &Alert) -> Result<(), NotifyError> {
        self.alerts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(alert.clone());
        Ok(())
    }
}

/// Appends one JSON object per line.
#[derive(Debug)]
pub struct JsonLinesSink {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonLinesSink {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            lock: Mutex::new(()),
        }
    }
}

impl NotificationSink for JsonLinesSink {
    fn name(&self) -> &str {
        "jsonl"
    }

    fn send(&self, alert: &Alert) -> Result<(), NotifyError> {
        let line = serde_json::to_string(alert)?;
        let io_err = |source| NotifyError::Io {
            path: self.path.clone(),
            source,
        };
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(io_err)?;
        writeln!(file, "{line}").map_err(io_err)
    }
}

/// Delivers every alert to each inner sink; one failing sink does not
/// stop the others. Returns the first error.
pub struct FanOutSink {
    sinks: Vec<Arc<dyn NotificationSink>>,
}

impl FanOutSink {
    pub fn new(sinks: Vec<Arc<dyn NotificationSink>>) -> Self {
        Self { sinks }
    }
}

impl NotificationSink for FanOutSink {
    fn name(&self) -> &str {
        "fan-out"
    }

    fn send(&self, alert: &Alert) -> Result<(), NotifyError> {
        let mut first_err = None;
        for sink in &self.sinks {
            if let Err(e) = sink.send(alert) {
                first_err.get_or_insert(e);
            }
        }
        first_err.map_or(Ok(()), Err)
    }
}

/// Hands alerts to a background thread so callers never wait on delivery.
/// Dropping the sink drains the queue and joins the thread.
pub struct BackgroundSink {
    tx: Mutex<Option<Sender<Alert>>>,
    handle: Option<JoinHandle<()>>,
}

impl BackgroundSink {
    pub fn spawn(inner: Arc<dyn NotificationSink>) -> std::io::Result<Self> {
        let (tx, rx) = mpsc::channel::<Alert>();
        let handle = thread::Builder::new()
            .name("breakgate-notify".into())
            .spawn(move || {
                for alert in rx {
                    notify_best_effort(inner.as_ref(), &alert);
                }
            })?;
        Ok(Self {
            tx: Mutex::new(Some(tx)),
            handle: Some(handle),
        })
    }
}

impl NotificationSink for BackgroundSink {
    fn name(&self) -> &str {
        "background"
    }

    fn send(&self, alert: &Alert) -> Result<(), NotifyError> {
        let tx = self.tx.lock().unwrap_or_else(PoisonError::into_inner);
        match tx.as_ref() {
            Some(tx) => tx.send(alert.clone()).map_err(|_| NotifyError::Closed),
            None => Err(NotifyError::Closed),
        }
    }
}

impl Drop for BackgroundSink {
    fn drop(&mut self) {
        self.tx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::warn!("notification thread panicked");
            }
        }
    }
}
