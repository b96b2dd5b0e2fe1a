//! External process execution
//!
//! Runs git/docker commands for the actions. Output is captured, and each
//! non-empty line is copied to the run log (masked) at debug level.

use dockhand_core::domain::log::LogLevel;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::context::StepContext;

/// Captured result of a finished command
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Stderr if non-empty, otherwise stdout, trimmed; for error messages
    pub fn diagnostic(&self) -> String {
        let stderr = self.stderr.trim();
        if stderr.is_empty() {
            format!("exit code {}: {}", self.exit_code, self.stdout.trim())
        } else {
            format!("exit code {}: {}", self.exit_code, stderr)
        }
    }
}

/// Renders a command line for logging
pub fn describe(command: &Command) -> String {
    let std = command.as_std();
    std::iter::once(std.get_program())
        .chain(std.get_args())
        .map(|part| part.to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Runs a command to completion, optionally feeding `stdin`
///
/// A non-zero exit is not an error here; callers map it to their step error.
pub async fn run(
    ctx: &StepContext<'_>,
    command: &mut Command,
    stdin: Option<&str>,
) -> std::io::Result<CommandOutput> {
    ctx.log_debug(format!("$ {}", describe(command)));

    command
        .stdin(if stdin.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = command.spawn()?;

    if let Some(input) = stdin {
        if let Some(mut pipe) = child.stdin.take() {
            pipe.write_all(input.as_bytes()).await?;
            pipe.shutdown().await?;
        }
    }

    let output = child.wait_with_output().await?;
    let result = CommandOutput {
        exit_code: output.status.code().unwrap_or(-1),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    };

    for line in result.stdout.lines().chain(result.stderr.lines()) {
        if !line.trim().is_empty() {
            ctx.log(LogLevel::Debug, line);
        }
    }

    if !result.success() {
        ctx.log_debug(format!("command exited with code {}", result.exit_code));
    }

    Ok(result)
}
