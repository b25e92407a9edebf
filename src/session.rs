use std::process::{Child, Command};

use anyhow::{anyhow, Context};

use crate::config::Config;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SessionExit {
    pub code: i32,
}

impl SessionExit {
    pub fn success(&self) -> bool {
        self.code == 0
    }
}

/// Hands control to the chat UI.
pub trait SessionHandoff {
    /// Start the session. Returns once it is running.
    fn spawn(&mut self, config: &Config) -> anyhow::Result<()>;
    /// Block until the session ends.
    fn wait(&mut self) -> anyhow::Result<SessionExit>;
}

/// The chat UI as a child process of the launcher.
pub struct ChatProcess {
    interpreter: String,
    child: Option<Child>,
}

impl ChatProcess {
    pub fn new(interpreter: impl Into<String>) -> Self {
        Self {
            interpreter: interpreter.into(),
            child: None,
        }
    }

    /// The chat UI reads its key from the system keyring itself, so nothing
    /// secret goes on the command line or into the child's environment.
    fn command(&self, config: &Config) -> anyhow::Result<Command> {
        let python = which::which(&self.interpreter)
            .with_context(|| format!("Interpreter {} not found", self.interpreter))?;

        let mut cmd = Command::new(python);
        cmd.arg("-m")
            .arg(&config.launch.module)
            .args(config.launch.extra_args()?);
        Ok(cmd)
    }
}

impl SessionHandoff for ChatProcess {
    fn spawn(&mut self, config: &Config) -> anyhow::Result<()> {
        let mut cmd = self.command(config)?;
        log::debug!(
            "Starting {} -m {}",
            cmd.get_program().to_string_lossy(),
            config.launch.module
        );
        let child = cmd.spawn().context("Failed to start the chat UI")?;
        log::info!("Chat UI running as pid {}", child.id());
        self.child = Some(child);
        Ok(())
    }

    fn wait(&mut self) -> anyhow::Result<SessionExit> {
        let mut child = self
            .child
            .take()
            .ok_or_else(|| anyhow!("Chat UI was never started"))?;
        let status = child.wait()?;
        // Killed by a signal: report it the way a shell would.
        let code = status.code().unwrap_or_else(|| signal_exit_code(&status));
        log::info!("Chat UI exited with {status}");
        Ok(SessionExit { code })
    }
}

#[cfg(unix)]
fn signal_exit_code(status: &std::process::ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;
    status.signal().map_or(1, |signal| 128 + signal)
}

#[cfg(not(unix))]
fn signal_exit_code(_status: &std::process::ExitStatus) -> i32 {
    1
}
