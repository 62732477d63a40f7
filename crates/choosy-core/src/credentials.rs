use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::debug;

use crate::constants::{storage_keys, ACCESS_EXPIRY_MARGIN, REFRESH_TOKEN_TTL};
use crate::store::{KeyValueStore, StoreError};
use crate::TokenResponse;

/// Access and refresh credentials issued together by the token endpoint.
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct CredentialPair {
    pub access_token: String,
    pub refresh_token: String,
    pub access_expires_at: DateTime<Utc>,
    pub refresh_expires_at: DateTime<Utc>,
}

impl CredentialPair {
    /// Builds the pair to persist for a token response received at `now`.
    /// The access expiry already has the safety margin taken off.
    ///
    /// Returns `None` when `expires_in` puts either expiry outside the
    /// representable date range.
    #[must_use]
    pub fn issued(response: &TokenResponse, now: DateTime<Utc>) -> Option<Self> {
        let access_expires_at = Duration::try_seconds(response.expires_in)
            .and_then(|lifetime| now.checked_add_signed(lifetime))
            .and_then(|expires_at| expires_at.checked_sub_signed(ACCESS_EXPIRY_MARGIN))?;
        Some(Self {
            access_token: response.access_token.clone(),
            refresh_token: response.refresh_token.clone(),
            access_expires_at,
            refresh_expires_at: now.checked_add_signed(REFRESH_TOKEN_TTL)?,
        })
    }

    #[must_use]
    pub fn is_access_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.access_expires_at > now
    }

    #[must_use]
    pub fn is_refresh_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.refresh_expires_at > now
    }

    #[must_use]
    pub fn is_access_valid(&self) -> bool {
        self.is_access_valid_at(Utc::now())
    }
}

impl fmt::Debug for CredentialPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialPair")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .field("access_expires_at", &self.access_expires_at)
            .field("refresh_expires_at", &self.refresh_expires_at)
            .finish()
    }
}

/// Reads and writes a [`CredentialPair`] through an injected key-value store.
/// Keys are prefixed with the namespace so several backends can share one store.
#[derive(Clone)]
pub struct CredentialStore {
    backend: Arc<dyn KeyValueStore>,
    namespace: String,
}

impl CredentialStore {
    pub fn new(backend: Arc<dyn KeyValueStore>, namespace: impl Into<String>) -> Self {
        Self {
            backend,
            namespace: namespace.into(),
        }
    }

    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    fn key(&self, name: &str) -> String {
        format!("{}::{}", self.namespace, name)
    }

    /// Returns the stored pair, or `None` unless both tokens are present.
    /// Missing or unreadable expiry timestamps load as already expired.
    pub fn load(&self) -> Result<Option<CredentialPair>, StoreError> {
        let Some(access_token) = self.backend.get(&self.key(storage_keys::ACCESS_TOKEN))? else {
            return Ok(None);
        };
        let Some(refresh_token) = self.backend.get(&self.key(storage_keys::REFRESH_TOKEN))?
        else {
            return Ok(None);
        };
        let access_expires_at = self.load_timestamp(storage_keys::ACCESS_EXPIRES_AT)?;
        let refresh_expires_at = self.load_timestamp(storage_keys::REFRESH_EXPIRES_AT)?;
        Ok(Some(CredentialPair {
            access_token,
            refresh_token,
            access_expires_at,
            refresh_expires_at,
        }))
    }

    pub fn access_token(&self) -> Result<Option<String>, StoreError> {
        self.backend.get(&self.key(storage_keys::ACCESS_TOKEN))
    }

    pub fn save(&self, pair: &CredentialPair) -> Result<(), StoreError> {
        self.backend.set(
            &self.key(storage_keys::ACCESS_EXPIRES_AT),
            &pair.access_expires_at.to_rfc3339(),
        )?;
        self.backend.set(
            &self.key(storage_keys::REFRESH_EXPIRES_AT),
            &pair.refresh_expires_at.to_rfc3339(),
        )?;
        self.backend
            .set(&self.key(storage_keys::REFRESH_TOKEN), &pair.refresh_token)?;
        self.backend
            .set(&self.key(storage_keys::ACCESS_TOKEN), &pair.access_token)?;
        debug!(namespace = %self.namespace, expires_at = %pair.access_expires_at, "stored credentials");
        Ok(())
    }

    /// Removes every credential key, attempting all of them before reporting
    /// the first failure.
    pub fn clear(&self) -> Result<(), StoreError> {
        let mut first_error = None;
        for name in storage_keys::ALL {
            if let Err(err) = self.backend.remove(&self.key(name)) {
                first_error.get_or_insert(err);
            }
        }
        debug!(namespace = %self.namespace, "cleared credentials");
        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn load_timestamp(&self, name: &str) -> Result<DateTime<Utc>, StoreError> {
        let value = self.backend.get(&self.key(name))?;
        Ok(value
            .as_deref()
            .and_then(parse_rfc3339)
            .unwrap_or(DateTime::<Utc>::MIN_UTC))
    }
}

pub fn parse_rfc3339(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryStore;

    fn response(expires_in: i64) -> TokenResponse {
        TokenResponse {
            access_token: "access".to_string(),
            refresh_token: "refresh".to_string(),
            token_type: "Bearer".to_string(),
            expires_in,
        }
    }

    #[test]
    fn issued_pair_subtracts_margin() {
        let now = Utc::now();
        let pair = CredentialPair::issued(&response(7200), now).expect("issued");
        assert_eq!(pair.access_expires_at, now + Duration::seconds(7200 - 300));
        assert_eq!(pair.refresh_expires_at, now + Duration::days(7));
        assert!(pair.is_access_valid_at(now));
        assert!(!pair.is_access_valid_at(now + Duration::seconds(6900)));
    }

    #[test]
    fn short_lived_token_is_never_trusted() {
        let now = Utc::now();
        let pair = CredentialPair::issued(&response(120), now).expect("issued");
        assert!(!pair.is_access_valid_at(now));
    }

    #[test]
    fn out_of_range_lifetime_is_rejected() {
        let now = Utc::now();
        assert!(CredentialPair::issued(&response(i64::MAX), now).is_none());
        assert!(CredentialPair::issued(&response(i64::MIN), now).is_none());
        assert!(CredentialPair::issued(&response(7200), DateTime::<Utc>::MAX_UTC).is_none());
    }

    #[test]
    fn store_roundtrip_and_clear() -> Result<(), StoreError> {
        let backend = Arc::new(MemoryStore::new());
        let store = CredentialStore::new(backend.clone(), "ctx");
        let pair = CredentialPair::issued(&response(7200), Utc::now()).expect("issued");
        store.save(&pair)?;

        let loaded = store.load()?;
        let loaded = loaded.as_ref();
        assert_eq!(loaded.map(|p| p.access_token.as_str()), Some("access"));
        assert_eq!(
            loaded.map(|p| p.access_expires_at.timestamp()),
            Some(pair.access_expires_at.timestamp())
        );
        assert_eq!(backend.get("ctx::access_token")?.as_deref(), Some("access"));

        store.clear()?;
        assert!(store.load()?.is_none());
        assert!(backend.is_empty());
        Ok(())
    }

    #[test]
    fn partial_pair_is_absent() -> Result<(), StoreError> {
        let backend = Arc::new(MemoryStore::new());
        backend.set("ctx::access_token", "access")?;
        let store = CredentialStore::new(backend, "ctx");
        assert!(store.load()?.is_none());
        assert_eq!(store.access_token()?.as_deref(), Some("access"));
        Ok(())
    }

    #[test]
    fn missing_expiry_loads_as_expired() -> Result<(), StoreError> {
        let backend = Arc::new(MemoryStore::new());
        backend.set("ctx::access_token", "access")?;
        backend.set("ctx::refresh_token", "refresh")?;
        backend.set("ctx::token_expires_at", "not-a-date")?;
        let store = CredentialStore::new(backend, "ctx");
        let pair = store.load()?;
        assert_eq!(pair.map(|p| p.is_access_valid()), Some(false));
        Ok(())
    }

    #[test]
    fn debug_redacts_tokens() {
        let pair = CredentialPair::issued(&response(7200), Utc::now()).expect("issued");
        let rendered = format!("{pair:?}");
        assert!(!rendered.contains("access\""));
        assert!(rendered.contains("<redacted>"));
    }
}
