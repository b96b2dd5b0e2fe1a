//! Log buffer service
//!
//! Collects the run log in memory. Registered secret values are replaced with
//! a mask before an entry is stored, so nothing written to the buffer can
//! leak a credential.

use dockhand_core::domain::log::LogEntry;
use dockhand_core::domain::secret::Secret;
use std::sync::{Arc, Mutex};

const MASK: &str = "***";

/// Service for managing the run log
pub trait LogBufferService: Send + Sync {
    /// Adds a log entry to the buffer, masking registered secrets
    fn add_entry(&self, entry: LogEntry);

    /// Drains all log entries from the buffer
    fn drain(&self) -> Vec<LogEntry>;

    /// Registers a secret value to be masked from now on
    fn register_secret(&self, secret: &Secret);

    /// Returns `text` with every registered secret masked
    fn redact(&self, text: &str) -> String;
}

/// In-memory implementation of LogBufferService
#[derive(Clone, Default)]
pub struct InMemoryLogBuffer {
    buffer: Arc<Mutex<Vec<LogEntry>>>,
    secrets: Arc<Mutex<Vec<String>>>,
}

impl InMemoryLogBuffer {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LogBufferService for InMemoryLogBuffer {
    fn add_entry(&self, mut entry: LogEntry) {
        entry.message = self.redact(&entry.message);
        let mut buffer = self.buffer.lock().unwrap();
        buffer.push(entry);
    }

    fn drain(&self) -> Vec<LogEntry> {
        let mut buffer = self.buffer.lock().unwrap();
        buffer.drain(..).collect()
    }

    fn register_secret(&self, secret: &Secret) {
        if secret.is_empty() {
            return;
        }
        let mut secrets = self.secrets.lock().unwrap();
        if !secrets.iter().any(|s| s == secret.expose()) {
            secrets.push(secret.expose().to_string());
            // Longest first so a secret containing another is masked whole
            secrets.sort_by_key(|s| std::cmp::Reverse(s.len()));
        }
    }

    fn redact(&self, text: &str) -> String {
        let secrets = self.secrets.lock().unwrap();
        secrets
            .iter()
            .fold(text.to_string(), |acc, secret| acc.replace(secret.as_str(), MASK))
    }
}
