use chrono::Utc;
use choosy_client::RequestClient;

use crate::cli_args::LoginArgs;
use crate::modules::system::{CliConfig, CliContext, CommandContext, ResolvedContext};

pub(crate) async fn handle_login(
    args: LoginArgs,
    resolved: &ResolvedContext,
    client: &RequestClient,
    config: &mut CliConfig,
) -> anyhow::Result<()> {
    let code = args.code.trim();
    if code.is_empty() {
        anyhow::bail!("authorization code is required");
    }
    let pair = client.login(code).await?;

    let entry = config
        .contexts
        .entry(resolved.name.clone())
        .or_insert_with(|| CliContext::new(resolved.addr.clone()));
    entry.addr = resolved.addr.clone();
    if entry.credential_store.is_none() {
        entry.credential_store = Some(resolved.credential_store);
    }
    config.current_context = Some(resolved.name.clone());

    println!(
        "Logged in to {} (access expires {})",
        resolved.addr,
        pair.access_expires_at.to_rfc3339()
    );
    Ok(())
}

pub(crate) fn handle_logout(ctx: &CommandContext) -> anyhow::Result<()> {
    ctx.client.logout()?;
    println!("Logged out of {}", ctx.context_name);
    Ok(())
}

pub(crate) async fn handle_refresh(ctx: &CommandContext) -> anyhow::Result<()> {
    let pair = ctx.client.refresh_now().await?;
    println!(
        "Refreshed (access expires {})",
        pair.access_expires_at.to_rfc3339()
    );
    Ok(())
}

pub(crate) fn handle_status(ctx: &CommandContext) -> anyhow::Result<()> {
    println!("context: {}", ctx.context_name);
    println!("addr: {}", ctx.addr);
    let Some(pair) = ctx.client.credentials()? else {
        println!("status: not logged in");
        return Ok(());
    };
    let now = Utc::now();
    let status = if pair.is_access_valid_at(now) {
        "logged in"
    } else if pair.is_refresh_valid_at(now) {
        "access expired (refresh on next request)"
    } else {
        "session expired (run `choosy login`)"
    };
    println!("status: {status}");
    println!("access expires: {}", pair.access_expires_at.to_rfc3339());
    println!("refresh expires: {}", pair.refresh_expires_at.to_rfc3339());
    Ok(())
}
