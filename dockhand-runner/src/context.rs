//! Step execution context
//!
//! Everything a step action needs during a run:
//! - The run id and triggering event
//! - The workspace (checkout dir, docker config dir)
//! - The run log, which masks registered secrets

use dockhand_core::domain::log::{LogEntry, LogLevel};
use dockhand_core::domain::secret::Secret;
use dockhand_core::domain::trigger::TriggerEvent;
use std::sync::Arc;
use uuid::Uuid;

use crate::service::LogBufferService;
use crate::workspace::Workspace;

/// Context shared by the steps of one run
pub struct StepContext<'a> {
    pub run_id: Uuid,
    pub event: &'a TriggerEvent,
    pub workspace: &'a Workspace,
    log_buffer: Arc<dyn LogBufferService>,
}

impl<'a> StepContext<'a> {
    pub fn new(
        run_id: Uuid,
        event: &'a TriggerEvent,
        workspace: &'a Workspace,
        log_buffer: Arc<dyn LogBufferService>,
    ) -> Self {
        Self {
            run_id,
            event,
            workspace,
            log_buffer,
        }
    }

    /// Registers a secret with the run log masker
    pub fn mask(&self, secret: &Secret) {
        self.log_buffer.register_secret(secret);
    }

    /// Masks registered secrets in `text`
    pub fn redact(&self, text: &str) -> String {
        self.log_buffer.redact(text)
    }

    /// Writes a message to the run log and mirrors it to tracing
    pub fn log(&self, level: LogLevel, message: impl AsRef<str>) {
        let message = self.redact(message.as_ref());
        match level {
            LogLevel::Debug => tracing::debug!(run_id = %self.run_id, "{}", message),
            LogLevel::Info => tracing::info!(run_id = %self.run_id, "{}", message),
            LogLevel::Warning => tracing::warn!(run_id = %self.run_id, "{}", message),
            LogLevel::Error => tracing::error!(run_id = %self.run_id, "{}", message),
        }
        self.log_buffer.add_entry(LogEntry::now(level, message));
    }

    pub fn log_debug(&self, message: impl AsRef<str>) {
        self.log(LogLevel::Debug, message);
    }

    pub fn log_info(&self, message: impl AsRef<str>) {
        self.log(LogLevel::Info, message);
    }

    pub fn log_warning(&self, message: impl AsRef<str>) {
        self.log(LogLevel::Warning, message);
    }

    pub fn log_error(&self, message: impl AsRef<str>) {
        self.log(LogLevel::Error, message);
    }
}
