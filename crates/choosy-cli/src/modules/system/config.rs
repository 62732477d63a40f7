use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use choosy_client::{ClientConfig, ReqwestTransport, RequestClient};
use choosy_keystore::{open_store, StoreKind};
use tracing::debug;

use super::types::{CliConfig, CliContext, ResolvedContext};
use crate::cli_args::{ConfigArgs, ConfigCommand};
use crate::{DEFAULT_ADDR, DEFAULT_CONTEXT};

pub(crate) fn handle_config_command(
    args: ConfigArgs,
    config: &mut CliConfig,
) -> anyhow::Result<()> {
    match args.command {
        ConfigCommand::SetContext(args) => {
            let entry = config
                .contexts
                .entry(args.name.clone())
                .or_insert_with(|| CliContext::new(DEFAULT_ADDR));
            if let Some(addr) = args.addr {
                entry.addr = addr;
            }
            if let Some(client_id) = args.client_id {
                entry.client_id = Some(client_id);
            }
            if let Some(timeout_ms) = args.timeout_ms {
                entry.timeout_ms = Some(timeout_ms);
            }
            if let Some(store) = args.credential_store {
                entry.credential_store = Some(store);
            }
            if args.max_attempts.is_some() || args.retry_delay_ms.is_some() {
                let mut retry = entry.retry.unwrap_or_default();
                if let Some(max_attempts) = args.max_attempts {
                    if max_attempts == 0 {
                        anyhow::bail!("--max-attempts must be at least 1");
                    }
                    retry.max_attempts = max_attempts;
                }
                if let Some(delay_ms) = args.retry_delay_ms {
                    retry.delay_ms = delay_ms;
                }
                entry.retry = Some(retry);
            }
            config.current_context = Some(args.name);
        }
        ConfigCommand::UseContext(args) => {
            if !config.contexts.contains_key(&args.name) {
                anyhow::bail!("context not found: {}", args.name);
            }
            config.current_context = Some(args.name);
        }
        ConfigCommand::CurrentContext => {
            if let Some(current) = config.current_context.clone() {
                println!("{current}");
            }
        }
        ConfigCommand::GetContexts => {
            let mut names: Vec<_> = config.contexts.keys().cloned().collect();
            names.sort();
            for name in names {
                let marker = if config.current_context.as_ref() == Some(&name) {
                    "*"
                } else {
                    " "
                };
                println!("{marker} {name}");
            }
        }
    }
    Ok(())
}

fn choosy_dir() -> anyhow::Result<PathBuf> {
    let home = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .map_err(|_| anyhow::anyhow!("HOME is not set"))?;
    Ok(Path::new(&home).join(".choosy"))
}

fn config_path() -> anyhow::Result<PathBuf> {
    Ok(choosy_dir()?.join("config.json"))
}

pub(crate) fn credentials_path() -> anyhow::Result<PathBuf> {
    Ok(choosy_dir()?.join("credentials.json"))
}

pub(crate) fn load_config() -> anyhow::Result<CliConfig> {
    let path = config_path()?;
    if !path.exists() {
        return Ok(CliConfig::default());
    }
    let contents = fs::read_to_string(&path)?;
    serde_json::from_str(&contents)
        .map_err(|err| anyhow::anyhow!("invalid config {}: {err}", path.display()))
}

pub(crate) fn save_config(config: &CliConfig) -> anyhow::Result<()> {
    let path = config_path()?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let contents = serde_json::to_string_pretty(config)?;
    fs::write(path, contents)?;
    Ok(())
}

/// Merges flags over the named (or current) context. An explicitly named
/// context must exist unless `--addr` is also given.
pub(crate) fn resolve_context(
    addr_arg: Option<String>,
    context_arg: Option<String>,
    store_arg: Option<StoreKind>,
    timeout_arg: Option<u64>,
    config: &CliConfig,
) -> anyhow::Result<ResolvedContext> {
    let explicit = context_arg.is_some();
    let name = context_arg
        .or_else(|| config.current_context.clone())
        .unwrap_or_else(|| DEFAULT_CONTEXT.to_string());
    let context = config.contexts.get(&name);
    if context.is_none() && explicit && addr_arg.is_none() {
        anyhow::bail!("context not found: {}", name);
    }
    let addr = addr_arg
        .or_else(|| context.map(|ctx| ctx.addr.clone()))
        .unwrap_or_else(|| DEFAULT_ADDR.to_string());
    Ok(ResolvedContext {
        addr,
        client_id: context.and_then(|ctx| ctx.client_id.clone()),
        timeout_ms: timeout_arg.or_else(|| context.and_then(|ctx| ctx.timeout_ms)),
        credential_store: store_arg
            .or_else(|| context.and_then(|ctx| ctx.credential_store))
            .unwrap_or_default(),
        retry: context.and_then(|ctx| ctx.retry),
        name,
    })
}

pub(crate) fn ensure_secure_addr(addr: &str, allow_insecure: bool) -> anyhow::Result<()> {
    if addr.starts_with("http://") && !allow_insecure {
        anyhow::bail!("refusing to use http:// without --insecure");
    }
    Ok(())
}

pub(crate) fn client_config(resolved: &ResolvedContext) -> ClientConfig {
    let mut config = ClientConfig::new(resolved.addr.clone());
    config.namespace = resolved.name.clone();
    config.client_id = resolved.client_id.clone();
    if let Some(timeout_ms) = resolved.timeout_ms {
        config.timeout_ms = timeout_ms;
    }
    config.retry = resolved.retry.unwrap_or_default();
    config
}

pub(crate) fn build_client(
    resolved: &ResolvedContext,
    allow_insecure: bool,
) -> anyhow::Result<RequestClient> {
    let http = reqwest::Client::builder()
        .danger_accept_invalid_certs(allow_insecure)
        .build()?;
    debug!(
        context = %resolved.name,
        addr = %resolved.addr,
        store = resolved.credential_store.as_str(),
        "using context"
    );
    let store = open_store(resolved.credential_store, credentials_path()?);
    Ok(RequestClient::new(
        client_config(resolved),
        Arc::new(ReqwestTransport::new(http)),
        store,
    ))
}
