//! Storage for the pre-shared passphrase.
//!
//! The bridge only needs the parsed key; where it lives is up to the
//! embedding application.

use crate::infrastructure::bluetooth::framer::{EncryptionContext, KEY_LEN};
use anyhow::{Context, Result};
use keyring::Entry;
use std::sync::Mutex;
use tracing::{debug, info};

pub trait CredentialStore: Send + Sync {
    fn load(&self) -> Result<Option<String>>;
    fn save(&self, passphrase: &str) -> Result<()>;
    fn clear(&self) -> Result<()>;

    /// Load and parse in one step; a stored value of the wrong length is
    /// reported as an error rather than ignored.
    fn load_context(&self) -> Result<Option<EncryptionContext>> {
        match self.load()? {
            Some(passphrase) => {
                let context = EncryptionContext::from_passphrase(&passphrase)
                    .context("Stored key is invalid")?;
                Ok(Some(context))
            }
            None => Ok(None),
        }
    }
}

const KEYRING_SERVICE: &str = "hid-relay-bridge";
const KEYRING_ACCOUNT: &str = "relay-key";

/// Keeps the passphrase in the OS credential store
pub struct KeyringCredentialStore {
    service: String,
    account: String,
}

impl Default for KeyringCredentialStore {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyringCredentialStore {
    pub fn new() -> Self {
        Self::with_account(KEYRING_SERVICE, KEYRING_ACCOUNT)
    }

    pub fn with_account(service: &str, account: &str) -> Self {
        Self {
            service: service.to_string(),
            account: account.to_string(),
        }
    }

    fn entry(&self) -> Result<Entry> {
        Entry::new(&self.service, &self.account)
            .with_context(|| format!("Keyring unavailable for {}/{}", self.service, self.account))
    }
}

impl CredentialStore for KeyringCredentialStore {
    fn load(&self) -> Result<Option<String>> {
        let passphrase = missing_as_none(self.entry()?.get_password())
            .context("Failed to read relay key from keyring")?;
        if passphrase.is_some() {
            debug!("Loaded relay key from keyring");
        }
        Ok(passphrase)
    }

    fn save(&self, passphrase: &str) -> Result<()> {
        if passphrase.len() != KEY_LEN {
            anyhow::bail!("Key must be exactly {} bytes", KEY_LEN);
        }
        self.entry()?
            .set_password(passphrase)
            .context("Failed to store relay key in keyring")?;
        info!("Relay key saved to keyring");
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        if missing_as_none(self.entry()?.delete_password())
            .context("Failed to remove relay key from keyring")?
            .is_some()
        {
            info!("Relay key removed from keyring");
        }
        Ok(())
    }
}

/// A missing entry is an empty store, not a failure
fn missing_as_none<T>(result: keyring::Result<T>) -> keyring::Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(keyring::Error::NoEntry) => Ok(None),
        Err(e) => Err(e),
    }
}

#[derive(Default)]
pub struct MemoryCredentialStore {
    passphrase: Mutex<Option<String>>,
}

impl CredentialStore for MemoryCredentialStore {
    fn load(&self) -> Result<Option<String>> {
        let guard = self
            .passphrase
            .lock()
            .map_err(|_| anyhow::anyhow!("Lock error"))?;
        Ok(guard.clone())
    }

    fn save(&self, passphrase: &str) -> Result<()> {
        let mut guard = self
            .passphrase
            .lock()
            .map_err(|_| anyhow::anyhow!("Lock error"))?;
        *guard = Some(passphrase.to_string());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        let mut guard = self
            .passphrase
            .lock()
            .map_err(|_| anyhow::anyhow!("Lock error"))?;
        *guard = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_keyring_entry_is_empty() {
        assert_eq!(
            missing_as_none::<String>(Err(keyring::Error::NoEntry)).unwrap(),
            None
        );
        assert_eq!(
            missing_as_none(Ok("0123456789abcdef".to_string())).unwrap(),
            Some("0123456789abcdef".to_string())
        );
        assert!(missing_as_none::<()>(Err(keyring::Error::NoStorageAccess(
            "locked".into()
        )))
        .is_err());
    }

    #[test]
    fn test_keyring_store_rejects_bad_length_before_writing() {
        let store = KeyringCredentialStore::with_account("hid-relay-bridge-test", "unused");
        let err = store.save("too short").unwrap_err();
        assert!(err.to_string().contains("16 bytes"));
    }

    #[test]
    fn test_memory_store_lifecycle() {
        let store = MemoryCredentialStore::default();
        assert_eq!(store.load().unwrap(), None);
        store.save("0123456789abcdef").unwrap();
        assert_eq!(store.load().unwrap().as_deref(), Some("0123456789abcdef"));
        assert!(store.load_context().unwrap().is_some());
        store.clear().unwrap();
        assert_eq!(store.load().unwrap(), None);
    }

    #[test]
    fn test_invalid_stored_key_is_an_error() {
        let store = MemoryCredentialStore::default();
        store.save("nope").unwrap();
        assert!(store.load_context().is_err());
        store.clear().unwrap();
        assert!(store.load_context().unwrap().is_none());
    }
}
