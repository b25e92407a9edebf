use core::fmt;
use std::path::PathBuf;
use std::process::{Command, Stdio};

use serde::Serialize;

/// Oldest Python the chat UI supports.
pub const MIN_RUNTIME_VERSION: RuntimeVersion = RuntimeVersion { major: 3, minor: 14 };

const GUI_TOOLKIT_MODULE: &str = "PyQt6.QtWidgets";

/// The chat package and its compiled core.
const CHAT_BACKEND_MODULES: &[&str] = &["nanogpt_chat", "nanogpt_core"];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Requirement {
    RuntimeVersion,
    GuiToolkit,
    ChatBackend,
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Requirement::RuntimeVersion => write!(f, "Python {MIN_RUNTIME_VERSION} or higher"),
            Requirement::GuiToolkit => write!(f, "PyQt6 installed"),
            Requirement::ChatBackend => write!(f, "nanogpt_chat package compiled"),
        }
    }
}

impl Requirement {
    pub fn remedy(&self) -> String {
        match self {
            Requirement::RuntimeVersion => format!(
                "Install Python {MIN_RUNTIME_VERSION} or newer, or pass its path with --python."
            ),
            Requirement::GuiToolkit => "Install PyQt6: python3 -m pip install PyQt6".to_owned(),
            Requirement::ChatBackend => {
                "Build and install the chat package: maturin develop --release".to_owned()
            }
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct RuntimeVersion {
    pub major: u32,
    pub minor: u32,
}

impl RuntimeVersion {
    /// Parse `python --version` output such as `Python 3.14.0` or `Python 3.13.1rc2`.
    pub fn parse(output: &str) -> Option<Self> {
        let version = output.trim().strip_prefix("Python")?.trim();
        let mut parts = version.split('.');
        let major = parts.next()?.parse().ok()?;
        let minor: String = parts
            .next()?
            .chars()
            .take_while(|c| c.is_ascii_digit())
            .collect();
        Some(Self {
            major,
            minor: minor.parse().ok()?,
        })
    }
}

impl fmt::Display for RuntimeVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// Read-only view of what is installed on this machine.
pub trait Environment {
    fn runtime_version(&self) -> Option<RuntimeVersion>;
    fn gui_toolkit_available(&self) -> bool;
    fn chat_backend_available(&self) -> bool;
}

#[derive(Clone, Debug, Serialize)]
pub struct Check {
    pub requirement: Requirement,
    pub satisfied: bool,
    pub detail: String,
}

/// Outcome of one round of checks. Failed checks are data, not errors.
#[derive(Clone, Debug, Serialize)]
pub struct PreconditionResult {
    pub checks: Vec<Check>,
}

impl PreconditionResult {
    pub fn is_satisfied(&self) -> bool {
        self.checks.iter().all(|check| check.satisfied)
    }

    pub fn unmet(&self) -> Vec<Requirement> {
        self.checks
            .iter()
            .filter(|check| !check.satisfied)
            .map(|check| check.requirement)
            .collect()
    }
}

pub fn check(env: &dyn Environment) -> PreconditionResult {
    let runtime = match env.runtime_version() {
        Some(version) if version >= MIN_RUNTIME_VERSION => Check {
            requirement: Requirement::RuntimeVersion,
            satisfied: true,
            detail: format!("found Python {version}"),
        },
        Some(version) => Check {
            requirement: Requirement::RuntimeVersion,
            satisfied: false,
            detail: format!("found Python {version}, need {MIN_RUNTIME_VERSION} or higher"),
        },
        None => Check {
            requirement: Requirement::RuntimeVersion,
            satisfied: false,
            detail: "no Python interpreter found".to_owned(),
        },
    };

    let toolkit = presence(
        Requirement::GuiToolkit,
        env.gui_toolkit_available(),
        "PyQt6 can be imported",
        "PyQt6 is not importable",
    );
    let backend = presence(
        Requirement::ChatBackend,
        env.chat_backend_available(),
        "nanogpt_chat and nanogpt_core can be imported",
        "nanogpt_chat or its compiled core is missing",
    );

    PreconditionResult {
        checks: vec![runtime, toolkit, backend],
    }
}

fn presence(requirement: Requirement, found: bool, yes: &str, no: &str) -> Check {
    Check {
        requirement,
        satisfied: found,
        detail: if found { yes } else { no }.to_owned(),
    }
}

/// The machine we are running on, probed through the configured interpreter.
pub struct SystemEnvironment {
    interpreter: String,
}

impl SystemEnvironment {
    pub fn new(interpreter: impl Into<String>) -> Self {
        Self {
            interpreter: interpreter.into(),
        }
    }

    fn interpreter_path(&self) -> Option<PathBuf> {
        match which::which(&self.interpreter) {
            Ok(path) => Some(path),
            Err(e) => {
                log::debug!("Interpreter {} not found: {e}", self.interpreter);
                None
            }
        }
    }

    /// Whether `import <modules>` succeeds in the interpreter.
    fn can_import(&self, modules: &[&str]) -> bool {
        let Some(python) = self.interpreter_path() else {
            return false;
        };
        let statement = format!("import {}", modules.join(", "));
        let status = Command::new(&python)
            .args(["-c", &statement])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();
        match status {
            Ok(status) => {
                log::trace!("{} -c {statement:?}: {status}", python.display());
                status.success()
            }
            Err(e) => {
                log::debug!("Failed to run {}: {e}", python.display());
                false
            }
        }
    }
}

impl Environment for SystemEnvironment {
    fn runtime_version(&self) -> Option<RuntimeVersion> {
        let python = self.interpreter_path()?;
        let output = Command::new(&python)
            .arg("--version")
            .stdin(Stdio::null())
            .output()
            .ok()?;
        if !output.status.success() {
            return None;
        }
        // Python 2 printed its version on stderr.
        let text = if output.stdout.is_empty() {
            String::from_utf8_lossy(&output.stderr)
        } else {
            String::from_utf8_lossy(&output.stdout)
        };
        RuntimeVersion::parse(&text)
    }

    fn gui_toolkit_available(&self) -> bool {
        self.can_import(&[GUI_TOOLKIT_MODULE])
    }

    fn chat_backend_available(&self) -> bool {
        self.can_import(CHAT_BACKEND_MODULES)
    }
}
