use clap::Parser;

mod cli_args;
mod cli_command;
mod modules;

use crate::cli_args::*;
use crate::cli_command::handle_command;
use crate::modules::auth::handle_login;
use crate::modules::system::{
    build_client, ensure_secure_addr, handle_config_command, load_config, resolve_context,
    save_config, CommandContext,
};
use tracing_subscriber::EnvFilter;

pub(crate) const DEFAULT_ADDR: &str = "https://127.0.0.1:8000";
pub(crate) const DEFAULT_CONTEXT: &str = "default";
pub(crate) const ME_PATH: &str = "/api/users/me";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose)?;
    let mut config = load_config()?;
    let command = match cli.command {
        Command::Config(args) => {
            handle_config_command(args, &mut config)?;
            save_config(&config)?;
            return Ok(());
        }
        command => command,
    };

    let resolved = resolve_context(
        cli.addr,
        cli.context,
        cli.credential_store,
        cli.timeout_ms,
        &config,
    )?;
    ensure_secure_addr(&resolved.addr, cli.insecure)?;
    let client = build_client(&resolved, cli.insecure)?;

    match command {
        Command::Login(args) => {
            handle_login(args, &resolved, &client, &mut config).await?;
            save_config(&config)?;
        }
        command => {
            let ctx = CommandContext {
                client,
                context_name: resolved.name,
                addr: resolved.addr,
            };
            handle_command(command, &ctx).await?;
        }
    }

    Ok(())
}

fn init_logging(verbosity: u8) -> anyhow::Result<()> {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(filter)?)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
    Ok(())
}
