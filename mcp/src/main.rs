use clap::Parser;

use trello_mcp_runtime::ServeArgs;

#[derive(Parser)]
#[command(
    name = "trello-mcp",
    version,
    about = "Trello MCP server — tool bridge over stdio"
)]
struct Cli {
    #[command(flatten)]
    serve: ServeArgs,
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let code = trello_mcp_runtime::run(cli.serve).await;
    std::process::exit(code);
}
