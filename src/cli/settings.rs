use url::Url;

use crate::config::{Config, ConfigStore};
use crate::credentials::CredentialStore;
use crate::prompt::{self, KeyPrompt};

pub fn login(credentials: &dyn CredentialStore, mut prompt: impl KeyPrompt) -> i32 {
    match store_new_key(credentials, &mut prompt) {
        Ok(true) => {
            println!("API key saved to the system keyring");
            0
        }
        Ok(false) => {
            eprintln!("Cancelled, API key unchanged.");
            130
        }
        Err(e) => {
            eprintln!("Error: {e:#}");
            1
        }
    }
}

pub fn logout(credentials: &dyn CredentialStore) -> i32 {
    match credentials.delete_api_key() {
        Ok(true) => {
            println!("API key removed from the system keyring");
            0
        }
        Ok(false) => {
            println!("No API key stored.");
            0
        }
        Err(e) => {
            eprintln!("Error: {e:#}");
            1
        }
    }
}

/// What `nanogpt config` should change before printing.
#[derive(Default)]
pub struct EndpointUpdate {
    pub endpoint: Option<Url>,
    pub clear: bool,
}

pub fn show(store: &ConfigStore, credentials: &dyn CredentialStore, update: EndpointUpdate) -> i32 {
    match update_and_render(store, credentials, update) {
        Ok(text) => {
            println!("# {}", store.path().display());
            print!("{text}");
            0
        }
        Err(e) => {
            eprintln!("Error: {e:#}");
            1
        }
    }
}

/// Prompt for a key and replace the stored one. `Ok(false)` if the user cancelled.
fn store_new_key(
    credentials: &dyn CredentialStore,
    prompt: &mut dyn KeyPrompt,
) -> anyhow::Result<bool> {
    let Some(key) = prompt::ask_for_key(prompt)? else {
        return Ok(false);
    };
    credentials.set_api_key(&key)?;
    log::info!("Stored new API key");
    Ok(true)
}

fn update_and_render(
    store: &ConfigStore,
    credentials: &dyn CredentialStore,
    update: EndpointUpdate,
) -> anyhow::Result<String> {
    let mut config = store.load()?;
    if update.clear || update.endpoint.is_some() {
        config.endpoint = update.endpoint;
        store.save(&config)?;
    }
    config.api_key = credentials.get_api_key()?;
    render(&config)
}

fn render(config: &Config) -> anyhow::Result<String> {
    let mut text = match config.api_key() {
        Some(key) => format!("# api_key (system keyring): {}\n", key.masked()),
        None => "# api_key is not set, run `nanogpt login`\n".to_owned(),
    };
    if config.endpoint.is_none() {
        text.push_str(&format!("# endpoint (default): {}\n", config.endpoint()));
    }
    text.push_str(&toml::to_string(config)?);
    Ok(text)
}
