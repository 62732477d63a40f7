use clap::Args;

#[derive(Args)]
pub struct RequestArgs {
    #[arg(help = "HTTP method (GET, POST, PUT, PATCH, DELETE)")]
    pub method: String,
    #[arg(help = "Path relative to the backend address (e.g. /api/recipes)")]
    pub path: String,
    #[arg(long, conflicts_with = "form", help = "JSON request body")]
    pub data: Option<String>,
    #[arg(long, value_name = "KEY=VALUE", help = "Form-encoded body field")]
    pub form: Vec<String>,
    #[arg(short, long, value_name = "KEY=VALUE", help = "Query parameter")]
    pub query: Vec<String>,
    #[arg(short = 'H', long = "header", value_name = "NAME:VALUE")]
    pub headers: Vec<String>,
    #[arg(long, help = "Per-attempt timeout override in milliseconds")]
    pub timeout_ms: Option<u64>,
    #[arg(long, help = "Print nothing and fail when not logged in instead of calling")]
    pub gated: bool,
    #[arg(long, conflicts_with = "gated", help = "Send without a bearer credential")]
    pub anonymous: bool,
}
