use std::io;

use once_cell::sync::Lazy;
use url::Url;

use crate::secret::ApiKey;

pub static NANOGPT_KEYS_URL: Lazy<Url> = Lazy::new(|| {
    Url::parse("https://nano-gpt.com/api").expect("Failed to parse NanoGPT API keys URL")
});

pub enum PromptOutcome {
    Supplied(ApiKey),
    Cancelled,
}

/// Asks the user for an API key. Blocks until they answer or back out.
pub trait KeyPrompt {
    fn request_api_key(&mut self) -> anyhow::Result<PromptOutcome>;

    fn reject(&mut self, reason: &str);
}

/// Ask until the key is well-formed. `Ok(None)` if the user backed out.
pub fn ask_for_key(prompt: &mut dyn KeyPrompt) -> anyhow::Result<Option<ApiKey>> {
    loop {
        match prompt.request_api_key()? {
            PromptOutcome::Cancelled => return Ok(None),
            PromptOutcome::Supplied(key) => match ApiKey::parse(key.expose()) {
                Ok(key) => return Ok(Some(key)),
                Err(e) => prompt.reject(&e.to_string()),
            },
        }
    }
}

pub struct TerminalPrompt {
    open_browser: bool,
}

impl TerminalPrompt {
    pub fn new() -> Self {
        Self {
            open_browser: false,
        }
    }

    /// Also open the provider's key page before the first prompt.
    pub fn with_browser(mut self, open_browser: bool) -> Self {
        self.open_browser = open_browser;
        self
    }
}

impl Default for TerminalPrompt {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyPrompt for TerminalPrompt {
    fn request_api_key(&mut self) -> anyhow::Result<PromptOutcome> {
        if std::mem::take(&mut self.open_browser) {
            eprintln!("Opening {} to create an API key...", *NANOGPT_KEYS_URL);
            if let Err(e) = webbrowser::open(NANOGPT_KEYS_URL.as_str()) {
                log::warn!("Failed to open browser: {e}");
                eprintln!("Visit {} to create an API key.", *NANOGPT_KEYS_URL);
            }
        }

        eprintln!("An API key is required. Leave empty to cancel.");
        let input = dialoguer::Password::new()
            .with_prompt("NanoGPT API key")
            .allow_empty_password(true)
            .interact();

        match input {
            Ok(text) if text.trim().is_empty() => Ok(PromptOutcome::Cancelled),
            Ok(text) => Ok(PromptOutcome::Supplied(ApiKey::new(text))),
            Err(dialoguer::Error::IO(e))
                if matches!(
                    e.kind(),
                    io::ErrorKind::Interrupted | io::ErrorKind::UnexpectedEof
                ) =>
            {
                Ok(PromptOutcome::Cancelled)
            }
            Err(e) => Err(anyhow::anyhow!("Failed to read API key: {e}")),
        }
    }

    fn reject(&mut self, reason: &str) {
        eprintln!("{reason}");
    }
}
