use choosy_keystore::StoreKind;
use clap::{Args, Subcommand};

#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand)]
pub enum ConfigCommand {
    #[command(about = "Create or update a context")]
    SetContext(SetContextArgs),
    #[command(about = "Set the active context")]
    UseContext(UseContextArgs),
    #[command(about = "Print the active context name")]
    CurrentContext,
    #[command(about = "List known context names")]
    GetContexts,
}

#[derive(Args)]
pub struct SetContextArgs {
    #[arg(help = "Context name")]
    pub name: String,
    #[arg(long, help = "Backend base URL")]
    pub addr: Option<String>,
    #[arg(long, help = "Client id sent with token grants")]
    pub client_id: Option<String>,
    #[arg(long, help = "Per-attempt timeout in milliseconds")]
    pub timeout_ms: Option<u64>,
    #[arg(long, help = "keyring or file")]
    pub credential_store: Option<StoreKind>,
    #[arg(long, help = "Attempts per request, including the first")]
    pub max_attempts: Option<u32>,
    #[arg(long, help = "Fixed delay between attempts in milliseconds")]
    pub retry_delay_ms: Option<u64>,
}

#[derive(Args)]
pub struct UseContextArgs {
    #[arg(help = "Context name")]
    pub name: String,
}
