use std::fs;
use std::io;
use std::path::Path;

use anyhow::Context;
use keyring::Entry;

use crate::secret::ApiKey;

// Same entry the chat UI reads, so a key stored here is the key it uses.
const SERVICE: &str = "nanogpt-chat";
const ACCOUNT: &str = "api_key";

/// Plaintext file older releases kept the key in, next to the settings file.
const LEGACY_KEY_FILE: &str = "api_key";

/// Where the API key is kept between runs.
pub trait CredentialStore {
    fn get_api_key(&self) -> anyhow::Result<Option<ApiKey>>;
    fn set_api_key(&self, key: &ApiKey) -> anyhow::Result<()>;
    /// Returns whether there was a key to delete.
    fn delete_api_key(&self) -> anyhow::Result<bool>;
}

/// The OS keyring.
pub struct KeyringStore;

impl KeyringStore {
    fn entry() -> anyhow::Result<Entry> {
        Entry::new(SERVICE, ACCOUNT).context("Failed to open the system keyring")
    }
}

impl CredentialStore for KeyringStore {
    fn get_api_key(&self) -> anyhow::Result<Option<ApiKey>> {
        match Self::entry()?.get_password() {
            Ok(key) => Ok(Some(ApiKey::new(key)).filter(|key| !key.is_empty())),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(e).context("Failed to read the API key from the system keyring"),
        }
    }

    fn set_api_key(&self, key: &ApiKey) -> anyhow::Result<()> {
        Self::entry()?
            .set_password(key.expose())
            .context("Failed to store the API key in the system keyring")
    }

    fn delete_api_key(&self) -> anyhow::Result<bool> {
        match Self::entry()?.delete_credential() {
            Ok(()) => Ok(true),
            Err(keyring::Error::NoEntry) => Ok(false),
            Err(e) => Err(e).context("Failed to remove the API key from the system keyring"),
        }
    }
}

/// Move a key from the old plaintext file in `dir` into `credentials`.
///
/// The file wins over whatever the store holds, as it does in the chat UI.
/// It is deleted only after the store accepted the key; a malformed file is
/// left alone.
pub fn migrate_legacy_key(dir: &Path, credentials: &dyn CredentialStore) -> anyhow::Result<bool> {
    let legacy = dir.join(LEGACY_KEY_FILE);
    let text = match fs::read_to_string(&legacy) {
        Ok(text) => text,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(e).with_context(|| format!("Failed to read {}", legacy.display())),
    };
    if text.trim().is_empty() {
        return Ok(false);
    }
    let key = match ApiKey::parse(&text) {
        Ok(key) => key,
        Err(e) => {
            log::warn!("Ignoring legacy key file {}: {e}", legacy.display());
            return Ok(false);
        }
    };

    credentials.set_api_key(&key)?;
    fs::remove_file(&legacy).with_context(|| format!("Failed to remove {}", legacy.display()))?;
    log::info!("Migrated API key from {} to the system keyring", legacy.display());
    Ok(true)
}

#[cfg(test)]
pub use memory::MemoryCredentials;


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legacy_key_file_moves_into_the_store() {
        let dir = tempfile::tempdir().unwrap();
        let legacy = dir.path().join("api_key");
        fs::write(&legacy, "sk-nano-legacy-0123456789\n").unwrap();
        let credentials = MemoryCredentials::default();

        assert!(migrate_legacy_key(dir.path(), &credentials).unwrap());
        assert_eq!(credentials.stored().as_deref(), Some("sk-nano-legacy-0123456789"));
        assert!(!legacy.exists());

        assert!(!migrate_legacy_key(dir.path(), &credentials).unwrap());
    }

    #[test]
    fn legacy_key_file_replaces_the_stored_key() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("api_key"), "sk-nano-legacy-0123456789").unwrap();
        let credentials = MemoryCredentials::with_key("sk-nano-current-0123456789");

        assert!(migrate_legacy_key(dir.path(), &credentials).unwrap());
        assert_eq!(credentials.stored().as_deref(), Some("sk-nano-legacy-0123456789"));
    }

    #[test]
    fn malformed_legacy_key_is_ignored_and_kept() {
        let dir = tempfile::tempdir().unwrap();
        let legacy = dir.path().join("api_key");
        fs::write(&legacy, "short").unwrap();
        let credentials = MemoryCredentials::default();

        assert!(!migrate_legacy_key(dir.path(), &credentials).unwrap());
        assert!(credentials.stored().is_none());
        assert!(legacy.exists());
    }

    #[test]
    fn legacy_file_survives_a_failed_store_write() {
        let dir = tempfile::tempdir().unwrap();
        let legacy = dir.path().join("api_key");
        fs::write(&legacy, "sk-nano-legacy-0123456789").unwrap();
        let credentials = MemoryCredentials::default();
        credentials.fail_writes.set(true);

        assert!(migrate_legacy_key(dir.path(), &credentials).is_err());
        assert!(legacy.exists());
    }

    #[test]
    fn empty_legacy_file_is_not_a_key() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("api_key"), "  \n").unwrap();
        let credentials = MemoryCredentials::default();

        assert!(!migrate_legacy_key(dir.path(), &credentials).unwrap());
        assert!(dir.path().join("api_key").exists());
    }
}
