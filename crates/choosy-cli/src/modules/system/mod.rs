pub(crate) mod args;
pub(crate) mod config;
pub(crate) mod types;

pub(crate) use config::{
    build_client, client_config, ensure_secure_addr, handle_config_command, load_config,
    resolve_context, save_config,
};
pub(crate) use types::{CliConfig, CliContext, CommandContext, ResolvedContext};
