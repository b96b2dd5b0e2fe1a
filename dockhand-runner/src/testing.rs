//! Test fixtures for the process-backed actions
//!
//! Provides a provisioned workspace, a step context over it and fake
//! `git`/`docker` executables written as small shell scripts.

use dockhand_core::domain::log::LogEntry;
use dockhand_core::domain::trigger::TriggerEvent;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use uuid::Uuid;

use crate::context::StepContext;
use crate::service::{InMemoryLogBuffer, LogBufferService};
use crate::workspace::Workspace;

pub struct Fixture {
    pub base: PathBuf,
    pub workspace: Workspace,
    pub event: TriggerEvent,
    pub log_buffer: Arc<InMemoryLogBuffer>,
}

impl Fixture {
    pub fn new() -> Self {
        let base = std::env::temp_dir().join(format!("dockhand-fixture-{}", Uuid::new_v4()));
        let workspace = Workspace::provision(&base.join("runs"), Uuid::new_v4()).unwrap();
        Self {
            base,
            workspace,
            event: TriggerEvent::ManualDispatch { git_ref: None },
            log_buffer: Arc::new(InMemoryLogBuffer::new()),
        }
    }

    pub fn context(&self) -> StepContext<'_> {
        StepContext::new(
            Uuid::new_v4(),
            &self.event,
            &self.workspace,
            self.log_buffer.clone(),
        )
    }

    /// Writes an executable `/bin/sh` script and returns its path
    pub fn tool(&self, name: &str, body: &str) -> String {
        write_tool(&self.base.join("bin"), name, body)
    }

    /// File the fake tools append their arguments to
    pub fn calls_file(&self) -> PathBuf {
        self.base.join("calls")
    }

    /// Argument lines recorded by the fake tools
    pub fn calls(&self) -> Vec<String> {
        std::fs::read_to_string(self.calls_file())
            .unwrap_or_default()
            .lines()
            .map(str::to_string)
            .collect()
    }

    pub fn logs(&self) -> Vec<LogEntry> {
        self.log_buffer.drain()
    }
}

impl Drop for Fixture {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.base);
    }
}

pub fn write_tool(dir: &Path, name: &str, body: &str) -> String {
    std::fs::create_dir_all(dir).unwrap();
    let path = dir.join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path.to_string_lossy().into_owned()
}
