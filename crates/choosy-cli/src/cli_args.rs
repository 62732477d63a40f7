use choosy_keystore::StoreKind;
use clap::{ArgAction, Parser, Subcommand};

pub use crate::modules::auth::args::*;
pub use crate::modules::request::args::*;
pub use crate::modules::system::args::*;

#[derive(Parser)]
#[command(name = "choosy")]
#[command(about = "Choosy recipe backend client")]
pub struct Cli {
    #[arg(long, env = "CHOOSY_ADDR")]
    pub addr: Option<String>,
    #[arg(long, env = "CHOOSY_CONTEXT")]
    pub context: Option<String>,
    #[arg(long, env = "CHOOSY_CREDENTIAL_STORE", help = "keyring or file")]
    pub credential_store: Option<StoreKind>,
    #[arg(long, help = "Per-attempt timeout in milliseconds")]
    pub timeout_ms: Option<u64>,
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
    #[arg(long, help = "Allow http:// and invalid TLS certificates")]
    pub insecure: bool,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    Config(ConfigArgs),
    #[command(about = "Exchange an authorization code for credentials")]
    Login(LoginArgs),
    #[command(about = "Forget the stored credentials")]
    Logout,
    #[command(about = "Refresh the access credential now")]
    Refresh,
    #[command(about = "Show the stored credential state")]
    Status,
    #[command(about = "Show the logged-in user")]
    Whoami,
    #[command(about = "Send an authenticated request and print the JSON response")]
    Request(RequestArgs),
}
