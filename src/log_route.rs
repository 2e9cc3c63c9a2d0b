//! Routing of engine log messages.
//!
//! The host's structured report channel is only usable while a render
//! session is open. [`LogRoute`] holds the sink of the active session, if any,
//! and falls back to the console otherwise. The slot is only swapped when a
//! session starts or ends, never while an engine call is in flight.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::error::{BridgeError, Result};

/// Severity tag attached to reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Severity {
    Info,
    Error,
}

impl Severity {
    pub fn from_is_error(is_error: bool) -> Self {
        if is_error {
            Severity::Error
        } else {
            Severity::Info
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Info => "INFO",
            Severity::Error => "ERROR",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Host-visible structured report channel.
pub trait ReportSink: Send + Sync {
    fn report(&self, severity: Severity, message: &str);
}

impl<T> ReportSink for Arc<T>
where
    T: ReportSink + ?Sized,
{
    fn report(&self, severity: Severity, message: &str) {
        (**self).report(severity, message)
    }
}

/// Report sink that keeps every message in memory.
#[derive(Debug, Default)]
pub struct CollectingSink {
    reports: Mutex<Vec<(Severity, String)>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reports(&self) -> Vec<(Severity, String)> {
        self.reports.lock().clone()
    }
}

impl ReportSink for CollectingSink {
    fn report(&self, severity: Severity, message: &str) {
        self.reports.lock().push((severity, message.to_string()));
    }
}

/// Where a message ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Destination {
    Console,
    Report,
}

/// Shared routing slot. Clones share the same slot.
#[derive(Clone, Default)]
pub struct LogRoute {
    active: Arc<Mutex<Option<Arc<dyn ReportSink>>>>,
}

impl fmt::Debug for LogRoute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogRoute")
            .field("session_active", &self.is_attached())
            .finish()
    }
}

impl LogRoute {
    pub fn new() -> Self {
        Self::default()
    }

    /// Routes messages to `sink` until [`detach`](Self::detach). Fails if
    /// another session already owns the route.
    pub fn attach(&self, sink: Arc<dyn ReportSink>) -> Result<()> {
        let mut active = self.active.lock();
        if active.is_some() {
            return Err(BridgeError::SessionActive);
        }
        *active = Some(sink);
        Ok(())
    }

    pub fn detach(&self) {
        self.active.lock().take();
    }

    pub fn is_attached(&self) -> bool {
        self.active.lock().is_some()
    }

    /// Delivers one engine message.
    pub fn route(&self, message: &str, is_error: bool) -> Destination {
        let sink = self.active.lock().clone();
        match sink {
            Some(sink) => {
                sink.report(Severity::from_is_error(is_error), message);
                Destination::Report
            }
            None => {
                if is_error {
                    eprintln!("*ERROR* {message}");
                } else {
                    println!("{message}");
                }
                Destination::Console
            }
        }
    }
}
