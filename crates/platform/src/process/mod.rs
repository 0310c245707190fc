//! Process execution

use async_trait::async_trait;
use ota_errors::PlatformError;
use std::process::ExitStatus;
use tokio::process::Command;
use tracing::debug;

/// Command builder
#[derive(Debug, Clone)]
pub struct PlatformCommand {
    program: String,
    args: Vec<String>,
}

impl PlatformCommand {
    pub fn new(program: &str) -> Self {
        Self {
            program: program.to_string(),
            args: Vec::new(),
        }
    }

    /// Add an argument to the command
    pub fn arg<S: AsRef<str>>(&mut self, arg: S) -> &mut Self {
        self.args.push(arg.as_ref().to_string());
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn get_args(&self) -> &[String] {
        &self.args
    }
}

/// Output from command execution
#[derive(Debug)]
pub struct CommandOutput {
    pub status: ExitStatus,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl CommandOutput {
    /// Stdout as trimmed UTF-8 (lossy)
    #[must_use]
    pub fn stdout_text(&self) -> String {
        String::from_utf8_lossy(&self.stdout).trim().to_string()
    }
}

/// Trait for process execution operations
#[async_trait]
pub trait ProcessOperations: Send + Sync {
    /// Execute a command and return the output
    async fn execute_command(&self, cmd: PlatformCommand) -> Result<CommandOutput, PlatformError>;
}

/// Runs commands on the host with tokio
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemProcess;

#[async_trait]
impl ProcessOperations for SystemProcess {
    async fn execute_command(&self, cmd: PlatformCommand) -> Result<CommandOutput, PlatformError> {
        debug!(program = cmd.program(), args = ?cmd.get_args(), "executing command");
        let output = Command::new(cmd.program())
            .args(cmd.get_args())
            .output()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    PlatformError::CommandNotFound {
                        command: cmd.program().to_string(),
                    }
                } else {
                    PlatformError::ProcessExecutionFailed {
                        command: cmd.program().to_string(),
                        message: e.to_string(),
                    }
                }
            })?;

        Ok(CommandOutput {
            status: output.status,
            stdout: output.stdout,
            stderr: output.stderr,
        })
    }
}
