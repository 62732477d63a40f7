use choosy_core::{KeyValueStore, StoreError};
use keyring::Entry;
use tracing::warn;

/// Stores each key as a separate OS keychain entry under one service name.
pub struct KeyringStore {
    service: String,
}

impl KeyringStore {
    pub fn new(service: &str) -> Self {
        Self {
            service: service.to_string(),
        }
    }

    fn entry(&self, key: &str) -> Result<Entry, StoreError> {
        Entry::new(&self.service, key).map_err(|err| StoreError::Unavailable {
            message: format!("failed to access keyring: {err}"),
        })
    }
}

impl KeyValueStore for KeyringStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        match self.entry(key)?.get_password() {
            Ok(value) => Ok(Some(value)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(err) => Err(StoreError::Internal {
                message: format!("failed to load '{key}' from keychain: {err}"),
            }),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entry(key)?
            .set_password(value)
            .map_err(|err| StoreError::Internal {
                message: format!("failed to store '{key}' in keychain: {err}"),
            })
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        match self.entry(key)?.delete_password() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(err) => {
                warn!(key = %key, "failed to delete keychain entry: {err}");
                Err(StoreError::Internal {
                    message: format!("failed to delete '{key}' from keychain: {err}"),
                })
            }
        }
    }
}
