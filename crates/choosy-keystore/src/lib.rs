#![allow(clippy::pedantic)]
#![allow(clippy::nursery)]
#![deny(clippy::unwrap_used)]
#![allow(clippy::missing_errors_doc)]

use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use choosy_core::KeyValueStore;
use serde::{Deserialize, Serialize};

mod file;
mod keyring_store;

pub use file::FileStore;
pub use keyring_store::KeyringStore;

pub const KEYRING_SERVICE: &str = "choosy";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    #[default]
    Keyring,
    File,
}

impl StoreKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Keyring => "keyring",
            Self::File => "file",
        }
    }
}

impl FromStr for StoreKind {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "keyring" => Ok(Self::Keyring),
            "file" => Ok(Self::File),
            other => Err(format!("unknown credential store: {other} (expected keyring or file)")),
        }
    }
}

/// Opens the backend for `kind`. `file_path` is only used by [`StoreKind::File`].
pub fn open_store(kind: StoreKind, file_path: PathBuf) -> Arc<dyn KeyValueStore> {
    match kind {
        StoreKind::Keyring => Arc::new(KeyringStore::new(KEYRING_SERVICE)),
        StoreKind::File => Arc::new(FileStore::new(file_path)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_kind_parses_case_insensitively() {
        assert_eq!("File".parse::<StoreKind>(), Ok(StoreKind::File));
        assert_eq!(" keyring ".parse::<StoreKind>(), Ok(StoreKind::Keyring));
        assert!("vault".parse::<StoreKind>().is_err());
    }

    #[test]
    fn store_kind_serializes_lowercase() -> Result<(), serde_json::Error> {
        assert_eq!(serde_json::to_string(&StoreKind::File)?, "\"file\"");
        Ok(())
    }
}
