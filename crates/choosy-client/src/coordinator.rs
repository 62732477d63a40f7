use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use choosy_core::{CredentialPair, CredentialStore, TokenGrant};
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use crate::error::ClientError;
use crate::issuer::TokenIssuer;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// This caller performed the refresh call.
    Refreshed,
    /// Another caller's refresh was in flight and succeeded.
    Joined,
    /// The stored credentials were already usable; no network call was made.
    Skipped,
}

type Release = Result<(), ClientError>;

#[derive(Default)]
struct RefreshState {
    in_progress: bool,
    waiters: Vec<oneshot::Sender<Release>>,
}

enum Trigger {
    Expired,
    Rejected(String),
    Forced,
}

/// Single-flight credential refresh.
///
/// At most one refresh grant is in flight per coordinator. Callers that arrive
/// while it runs queue on the waiter list and are released with its outcome.
/// A successful refresh overwrites the stored pair; a failed one clears it.
pub struct RefreshCoordinator {
    state: Mutex<RefreshState>,
    credentials: CredentialStore,
    issuer: TokenIssuer,
}

impl RefreshCoordinator {
    pub fn new(credentials: CredentialStore, issuer: TokenIssuer) -> Self {
        Self {
            state: Mutex::new(RefreshState::default()),
            credentials,
            issuer,
        }
    }

    pub fn credentials(&self) -> &CredentialStore {
        &self.credentials
    }

    pub fn is_refreshing(&self) -> bool {
        self.lock().in_progress
    }

    /// Callers currently suspended on the in-flight refresh.
    pub fn waiter_count(&self) -> usize {
        self.lock().waiters.len()
    }

    /// Refreshes only when stored credentials exist and the access credential
    /// is past its recorded expiry.
    pub async fn ensure_fresh(&self) -> Result<RefreshOutcome, ClientError> {
        match self.credentials.load()? {
            Some(pair) if !pair.is_access_valid() => self.run(Trigger::Expired).await,
            _ => Ok(RefreshOutcome::Skipped),
        }
    }

    /// Refresh after the backend rejected `rejected`. Skipped when the stored
    /// access credential has already been replaced since that token was sent.
    pub async fn refresh(&self, rejected: Option<&str>) -> Result<RefreshOutcome, ClientError> {
        let trigger = match rejected {
            Some(token) => Trigger::Rejected(token.to_string()),
            None => Trigger::Expired,
        };
        self.run(trigger).await
    }

    pub async fn force_refresh(&self) -> Result<RefreshOutcome, ClientError> {
        self.run(Trigger::Forced).await
    }

    async fn run(&self, trigger: Trigger) -> Result<RefreshOutcome, ClientError> {
        loop {
            let waiter = {
                let mut state = self.lock();
                if state.in_progress {
                    let (tx, rx) = oneshot::channel();
                    state.waiters.push(tx);
                    Some(rx)
                } else {
                    if self.already_fresh(&trigger)? {
                        debug!("credentials already refreshed; skipping");
                        return Ok(RefreshOutcome::Skipped);
                    }
                    state.in_progress = true;
                    None
                }
            };

            let Some(waiter) = waiter else {
                return self.lead().await;
            };
            debug!("waiting for in-flight credential refresh");
            match waiter.await {
                Ok(Ok(())) => return Ok(RefreshOutcome::Joined),
                Ok(Err(err)) => return Err(err),
                // The refreshing task was dropped before finishing.
                Err(_) => continue,
            }
        }
    }

    fn already_fresh(&self, trigger: &Trigger) -> Result<bool, ClientError> {
        let pair = self.credentials.load()?;
        Ok(match (trigger, pair) {
            (Trigger::Forced, _) | (_, None) => false,
            (Trigger::Expired, Some(pair)) => pair.is_access_valid(),
            (Trigger::Rejected(token), Some(pair)) => {
                pair.access_token != *token && pair.is_access_valid()
            }
        })
    }

    async fn lead(&self) -> Result<RefreshOutcome, ClientError> {
        let mut guard = LeaderGuard {
            coordinator: self,
            armed: true,
        };
        let result = self.perform().await;
        guard.armed = false;
        self.release(Some(result.clone().map(|_| ())));
        result
    }

    async fn perform(&self) -> Result<RefreshOutcome, ClientError> {
        let Some(pair) = self.credentials.load()? else {
            return Err(ClientError::AuthenticationExpired {
                reason: "no refresh credential stored".to_string(),
            });
        };
        if !pair.is_refresh_valid_at(Utc::now()) {
            self.clear_after_failure();
            return Err(ClientError::AuthenticationExpired {
                reason: "refresh credential expired".to_string(),
            });
        }

        let grant = TokenGrant::RefreshToken {
            refresh_token: pair.refresh_token,
        };
        let issued = self.issuer.exchange(&grant).await.and_then(|response| {
            CredentialPair::issued(&response, Utc::now()).ok_or_else(|| ClientError::Decode {
                message: format!("expires_in out of range: {}", response.expires_in),
            })
        });
        match issued {
            Ok(renewed) => {
                if let Err(err) = self.credentials.save(&renewed) {
                    warn!(namespace = %self.credentials.namespace(), "failed to store refreshed credentials: {err}");
                    self.clear_after_failure();
                    return Err(err.into());
                }
                info!(
                    namespace = %self.credentials.namespace(),
                    expires_at = %renewed.access_expires_at,
                    "access credential refreshed"
                );
                Ok(RefreshOutcome::Refreshed)
            }
            Err(err) => {
                warn!(namespace = %self.credentials.namespace(), "credential refresh failed: {err}");
                self.clear_after_failure();
                Err(ClientError::AuthenticationExpired {
                    reason: err.to_string(),
                })
            }
        }
    }

    fn clear_after_failure(&self) {
        if let Err(err) = self.credentials.clear() {
            warn!(namespace = %self.credentials.namespace(), "failed to clear credentials: {err}");
        }
    }

    /// Resets the in-progress flag and releases every waiter. With `None` the
    /// waiters observe a dropped channel and compete to refresh again.
    fn release(&self, outcome: Option<Release>) {
        let waiters = {
            let mut state = self.lock();
            state.in_progress = false;
            std::mem::take(&mut state.waiters)
        };
        debug!(waiters = waiters.len(), "releasing refresh waiters");
        if let Some(outcome) = outcome {
            for waiter in waiters {
                let _ = waiter.send(outcome.clone());
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, RefreshState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

struct LeaderGuard<'a> {
    coordinator: &'a RefreshCoordinator,
    armed: bool,
}

impl Drop for LeaderGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.coordinator.release(None);
        }
    }
}
