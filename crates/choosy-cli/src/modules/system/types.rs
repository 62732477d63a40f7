use choosy_client::{RequestClient, RetryPolicy};
use choosy_keystore::StoreKind;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Serialize, Deserialize, Default)]
pub struct CliConfig {
    #[serde(default)]
    pub current_context: Option<String>,
    #[serde(default)]
    pub contexts: HashMap<String, CliContext>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct CliContext {
    pub addr: String,
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub timeout_ms: Option<u64>,
    #[serde(default)]
    pub credential_store: Option<StoreKind>,
    #[serde(default)]
    pub retry: Option<RetryPolicy>,
}

impl CliContext {
    pub fn new(addr: impl Into<String>) -> Self {
        Self {
            addr: addr.into(),
            client_id: None,
            timeout_ms: None,
            credential_store: None,
            retry: None,
        }
    }
}

/// Effective settings after merging flags, environment and the config file.
#[derive(Clone, Debug, PartialEq)]
pub struct ResolvedContext {
    pub name: String,
    pub addr: String,
    pub client_id: Option<String>,
    pub timeout_ms: Option<u64>,
    pub credential_store: StoreKind,
    pub retry: Option<RetryPolicy>,
}

pub struct CommandContext {
    pub client: RequestClient,
    pub context_name: String,
    pub addr: String,
}
