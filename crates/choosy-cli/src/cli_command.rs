use crate::cli_args::*;
use crate::modules::auth::{handle_logout, handle_refresh, handle_status};
use crate::modules::request::{handle_request, handle_whoami};
use crate::modules::system::CommandContext;

pub(crate) async fn handle_command(command: Command, ctx: &CommandContext) -> anyhow::Result<()> {
    match command {
        Command::Logout => handle_logout(ctx)?,
        Command::Refresh => handle_refresh(ctx).await?,
        Command::Status => handle_status(ctx)?,
        Command::Whoami => handle_whoami(ctx).await?,
        Command::Request(args) => handle_request(args, ctx).await?,
        Command::Config(_) | Command::Login(_) => {
            unreachable!()
        }
    }
    Ok(())
}
