use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::secret::ApiKey;

pub static NANOGPT_API_BASE_URL: Lazy<Url> = Lazy::new(|| {
    Url::parse("https://nano-gpt.com/api/v1").expect("Failed to parse NanoGPT API base URL")
});

pub const CONFIG_PATH_ENV: &str = "NANOGPT_CONFIG";

/// Settings shared with the chat UI.
///
/// The launcher owns `endpoint` and `[launch]`. Everything else in the file
/// (the UI's `[api]` and `[ui]` tables) is carried through untouched.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Filled in from the credential store, never written to the file.
    #[serde(skip)]
    pub api_key: Option<ApiKey>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<Url>,
    #[serde(default)]
    pub launch: LaunchConfig,
    #[serde(flatten)]
    pub extra: toml::Table,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaunchConfig {
    #[serde(default = "default_module")]
    pub module: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub args: Option<String>,
}

fn default_module() -> String {
    "nanogpt_chat.main".to_owned()
}

impl Default for LaunchConfig {
    fn default() -> Self {
        Self {
            module: default_module(),
            args: None,
        }
    }
}

impl LaunchConfig {
    pub fn extra_args(&self) -> anyhow::Result<Vec<String>> {
        match self.args.as_deref() {
            None => Ok(Vec::new()),
            Some(args) => shlex::split(args)
                .ok_or_else(|| anyhow!("Unbalanced quoting in launch.args: {args}")),
        }
    }
}

impl Config {
    pub fn api_key(&self) -> Option<&ApiKey> {
        self.api_key.as_ref().filter(|key| !key.is_empty())
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key().is_some()
    }

    pub fn endpoint(&self) -> &Url {
        self.endpoint.as_ref().unwrap_or(&*NANOGPT_API_BASE_URL)
    }
}

#[derive(Clone, Debug)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `$NANOGPT_CONFIG` when set, otherwise the platform config directory.
    pub fn default_location() -> anyhow::Result<Self> {
        if let Some(path) = std::env::var_os(CONFIG_PATH_ENV).filter(|p| !p.is_empty()) {
            return Ok(Self::at(path));
        }
        Ok(Self::at(Self::default_filepath()?))
    }

    pub fn default_filepath() -> anyhow::Result<PathBuf> {
        Ok(dirs::config_dir()
            .ok_or(anyhow!("Failed to locate appropriate config directory"))?
            .join("nanogpt-chat")
            .join("settings.toml"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// A missing file is an empty config.
    pub fn load(&self) -> anyhow::Result<Config> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                log::debug!("No config at {}, starting empty", self.path.display());
                return Ok(Config::default());
            }
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to read {}", self.path.display()))
            }
        };
        // toml's own Display quotes the offending line, which may be a secret.
        toml::from_str(&text).map_err(|e| {
            let at = e
                .span()
                .map(|span| line_col(&text, span.start))
                .map(|(line, col)| format!(" at line {line}, column {col}"))
                .unwrap_or_default();
            anyhow!(
                "Config file {} is corrupt{at}: {}",
                self.path.display(),
                e.message()
            )
        })
    }

    /// Replace the config file atomically, readable only by the owner on Unix.
    pub fn save(&self, config: &Config) -> anyhow::Result<()> {
        let text = toml::to_string(config)?;
        let dir = self.dir();
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;

        let mut file = tempfile::NamedTempFile::new_in(dir)?;
        file.write_all(text.as_bytes())?;
        file.as_file().sync_all()?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            file.as_file()
                .set_permissions(fs::Permissions::from_mode(0o600))?;
        }
        file.persist(&self.path)
            .with_context(|| format!("Failed to write {}", self.path.display()))?;

        log::debug!("Saved config to {}", self.path.display());
        Ok(())
    }

    pub fn dir(&self) -> &Path {
        match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        }
    }
}

fn line_col(text: &str, offset: usize) -> (usize, usize) {
    let before = text.get(..offset).unwrap_or(text);
    let line = before.matches('\n').count() + 1;
    let col = before.rsplit('\n').next().map_or(0, |l| l.chars().count()) + 1;
    (line, col)
}
