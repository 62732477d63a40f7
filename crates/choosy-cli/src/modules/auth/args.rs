use clap::Args;

#[derive(Args)]
pub struct LoginArgs {
    #[arg(long, env = "CHOOSY_AUTH_CODE", help = "Authorization code issued to the client")]
    pub code: String,
}
