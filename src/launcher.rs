use core::fmt;

use thiserror::Error;

use crate::config::{Config, ConfigStore};
use crate::credentials::{self, CredentialStore};
use crate::preconditions::{self, Environment, PreconditionResult, Requirement};
use crate::prompt::{self, KeyPrompt};
use crate::session::{SessionExit, SessionHandoff};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LaunchState {
    Idle,
    CheckingPreconditions,
    LoadingConfig,
    AwaitingApiKey,
    Starting,
    Running,
    Failed,
}

#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("Missing requirements: {}", list(.which))]
    PreconditionUnmet { which: Vec<Requirement> },
    #[error("Configuration error: {cause:#}")]
    Configuration { cause: anyhow::Error },
    #[error("Failed to start the chat UI: {reason}")]
    Startup { reason: String },
    #[error("Cancelled before an API key was entered")]
    Cancelled,
}

impl LaunchError {
    pub fn exit_code(&self) -> i32 {
        match self {
            LaunchError::PreconditionUnmet { .. } => 2,
            LaunchError::Configuration { .. } => 3,
            LaunchError::Startup { .. } => 4,
            LaunchError::Cancelled => 130,
        }
    }
}

fn list(which: &[Requirement]) -> String {
    which
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

impl fmt::Display for LaunchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Sequences the startup of the chat application.
///
/// Order is fixed: preconditions, configuration, API key, handoff. Any failure
/// moves the launcher to [`LaunchState::Failed`] and is returned to the caller;
/// nothing is retried.
pub struct Launcher<E, C, P, H> {
    env: E,
    store: ConfigStore,
    credentials: C,
    prompt: P,
    handoff: H,
    history: Vec<LaunchState>,
}

impl<E, C, P, H> Launcher<E, C, P, H>
where
    E: Environment,
    C: CredentialStore,
    P: KeyPrompt,
    H: SessionHandoff,
{
    pub fn new(env: E, store: ConfigStore, credentials: C, prompt: P, handoff: H) -> Self {
        Self {
            env,
            store,
            credentials,
            prompt,
            handoff,
            history: vec![LaunchState::Idle],
        }
    }

    pub fn state(&self) -> LaunchState {
        self.history.last().copied().unwrap_or(LaunchState::Idle)
    }

    /// Every state the launcher has been in, oldest first.
    pub fn history(&self) -> &[LaunchState] {
        &self.history
    }

    /// Run the whole startup flow and wait for the chat session to end.
    pub fn launch(&mut self) -> Result<SessionExit, LaunchError> {
        self.transition(LaunchState::CheckingPreconditions);
        let result = self.check_preconditions();
        if !result.is_satisfied() {
            return Err(self.fail(LaunchError::PreconditionUnmet {
                which: result.unmet(),
            }));
        }

        let config = self.load_configuration()?;
        let config = self.ensure_api_key(config)?;
        self.start(&config)
    }

    /// Inspect the environment. Always fresh; results are never cached.
    pub fn check_preconditions(&self) -> PreconditionResult {
        let result = preconditions::check(&self.env);
        for check in &result.checks {
            log::debug!(
                "{}: {} ({})",
                check.requirement,
                if check.satisfied { "ok" } else { "missing" },
                check.detail
            );
        }
        result
    }

    /// Read the settings file and the stored key, adopting a legacy key file
    /// if one is left over.
    pub fn load_configuration(&mut self) -> Result<Config, LaunchError> {
        self.transition(LaunchState::LoadingConfig);
        match self.read_configuration() {
            Ok(config) => Ok(config),
            Err(cause) => Err(self.fail(LaunchError::Configuration { cause })),
        }
    }

    fn read_configuration(&self) -> anyhow::Result<Config> {
        let mut config = self.store.load()?;
        credentials::migrate_legacy_key(self.store.dir(), &self.credentials)?;
        config.api_key = self.credentials.get_api_key()?;
        Ok(config)
    }

    /// Make sure `config` carries a key, asking the user for one if needed.
    /// A newly entered key is persisted before returning.
    pub fn ensure_api_key(&mut self, mut config: Config) -> Result<Config, LaunchError> {
        if config.has_api_key() {
            return Ok(config);
        }

        self.transition(LaunchState::AwaitingApiKey);
        let key = match prompt::ask_for_key(&mut self.prompt) {
            Ok(Some(key)) => key,
            Ok(None) => return Err(self.fail(LaunchError::Cancelled)),
            Err(e) => {
                return Err(self.fail(LaunchError::Startup {
                    reason: format!("{e:#}"),
                }))
            }
        };

        if let Err(cause) = self.credentials.set_api_key(&key) {
            return Err(self.fail(LaunchError::Configuration { cause }));
        }
        log::info!("Saved API key to the system keyring");
        config.api_key = Some(key);
        Ok(config)
    }

    /// Hand control to the chat session and wait for it to end. Preconditions
    /// are checked again right before the handoff.
    pub fn start(&mut self, config: &Config) -> Result<SessionExit, LaunchError> {
        self.transition(LaunchState::Starting);
        let result = self.check_preconditions();
        if !result.is_satisfied() {
            return Err(self.fail(LaunchError::Startup {
                reason: format!("missing requirements: {}", list(&result.unmet())),
            }));
        }
        if !config.has_api_key() {
            return Err(self.fail(LaunchError::Startup {
                reason: "API key is not set".to_owned(),
            }));
        }

        if let Err(e) = self.handoff.spawn(config) {
            return Err(self.fail(LaunchError::Startup {
                reason: format!("{e:#}"),
            }));
        }
        self.transition(LaunchState::Running);

        match self.handoff.wait() {
            Ok(exit) => Ok(exit),
            Err(e) => Err(self.fail(LaunchError::Startup {
                reason: format!("{e:#}"),
            })),
        }
    }

    fn transition(&mut self, next: LaunchState) {
        log::debug!("Launcher: {} -> {next}", self.state());
        self.history.push(next);
    }

    fn fail(&mut self, error: LaunchError) -> LaunchError {
        self.transition(LaunchState::Failed);
        log::debug!("Launch failed: {error}");
        error
    }
}
