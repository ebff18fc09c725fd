//! stack-convex-auth CLI binary entry point.

use clap::Parser;
use stack_convex_auth::cli::{session, Cli, Commands};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Status => session::handle_status(&cli.session).await,
        Commands::Token(args) => session::handle_token(&cli.session, args.force_refresh).await,
        Commands::Watch(args) => session::handle_watch(&cli.session, args.changes).await,
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
