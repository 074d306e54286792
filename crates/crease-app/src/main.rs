// Crease entry point.
//
// Startup sequence:
// 1. Parse the command line
// 2. Load config (copying defaults into config/ on first run)
// 3. Initialize tracing (log to file, not terminal)
// 4. Open the database and wrap it in a tournament store
// 5. Run the requested command

mod cli;
mod commands;

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info};

use crease_core::{config, db, logging};
use crease_cricket::SqliteStore;

fn main() {
    let cli = cli::Cli::parse();
    if let Err(e) = run(cli) {
        error!("{:#}", e);
        eprintln!("error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: cli::Cli) -> anyhow::Result<()> {
    // 2. Load config
    let config = config::load_config().context("failed to load configuration")?;

    // 3. Initialize tracing
    let base_dir = std::env::current_dir().context("failed to resolve working directory")?;
    let log_path = logging::init_tracing(&base_dir, &config.logging)?;
    info!(
        "crease starting: tournament={}, log={}",
        config.tournament.name,
        log_path.display()
    );

    // 4. Open database
    let db = db::Database::open(&config.db_path).context("failed to open database")?;
    info!("Database opened at {}", config.db_path);
    let store = SqliteStore::new(Arc::new(db));

    // 5. Run the command
    info!("Running {:?}", cli.command);
    commands::run(cli.command, &config, store)
}
