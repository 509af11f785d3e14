use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use kudos_api::{database::Database, server, state::AppState};

#[derive(Parser)]
#[command(name = "kudos-api", version, about = "Endorsement and share counters for a personal site")]
struct Args {
    /// SQLite database path.
    #[arg(long, env = "KUDOS_DB", default_value = "kudos.db")]
    db: PathBuf,

    /// Port to listen on.
    #[arg(long, env = "KUDOS_PORT", default_value_t = 8080)]
    port: u16,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let store = Database::open(&args.db)?;

    server::start_server(AppState::new(store), args.port).await
}
