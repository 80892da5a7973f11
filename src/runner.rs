//! External process execution behind an injectable trait.
//!
//! The assembly pipeline and the probes only see [`CommandRunner`], so tests
//! substitute a scripted runner and assert on command shape without invoking
//! real media tools.

use std::process::{Command, Stdio};

use log::debug;

use crate::error::{Error, Result};

/// Captured output of one finished command.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub success: bool,
}

/// Runs one command to completion, blocking, capturing both streams.
pub trait CommandRunner {
    fn run(&self, cmd: &[String]) -> Result<CommandOutput>;
}

/// The real implementation: spawns the process and waits for it.
#[derive(Debug, Default)]
pub struct ProcessRunner;

impl ProcessRunner {
    pub fn new() -> Self {
        ProcessRunner
    }
}

impl CommandRunner for ProcessRunner {
    fn run(&self, cmd: &[String]) -> Result<CommandOutput> {
        let (program, args) = cmd
            .split_first()
            .ok_or_else(|| Error::CommandFailed("empty command".to_string()))?;

        debug!("running: {}", cmd.join(" "));

        let output = Command::new(program)
            .args(args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .map_err(|e| Error::CommandFailed(format!("failed to spawn {}: {}", program, e)))?;

        Ok(CommandOutput {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            success: output.status.success(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_command_fails() {
        let runner = ProcessRunner::new();
        assert!(matches!(runner.run(&[]), Err(Error::CommandFailed(_))));
    }
}
