mod app;
mod cli;
mod config;
mod consts;
mod context;
mod core;
mod error;
mod output;
mod storage;
mod utils;

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use app::CommandContext;
use cli::{Cli, Commands};
use config::Config;
use consts::{DEFAULT_CONTEXT_TIMEOUT_MS, DEFAULT_LOCK_TIMEOUT_MS};
use context::{ContextProvider, NoContext, TmuxContext};
use error::AppError;
use storage::{StoreOptions, open_store};
use utils::init_logging;

fn resolve_state_dir(explicit: Option<PathBuf>) -> Result<PathBuf, AppError> {
    explicit
        .or_else(|| dirs::data_dir().map(|d| d.join("intray")))
        .ok_or(AppError::NoStateDir)
}

fn run(cli: Cli, config: &Config) -> Result<(), AppError> {
    let state_dir = resolve_state_dir(cli.state_dir.clone())?;
    let lock_timeout =
        Duration::from_millis(cli.lock_timeout_ms.unwrap_or(DEFAULT_LOCK_TIMEOUT_MS));

    // The only store instance for this process.
    let store = open_store(&StoreOptions {
        backend: cli.backend(),
        state_dir: state_dir.clone(),
        lock_timeout,
    })?;

    let context: Box<dyn ContextProvider> = match &cli.command {
        Commands::Add(add) if add.no_context => Box::new(NoContext),
        _ => Box::new(TmuxContext::new(Duration::from_millis(
            cli.context_timeout_ms.unwrap_or(DEFAULT_CONTEXT_TIMEOUT_MS),
        ))),
    };

    let ctx = CommandContext {
        store: store.as_ref(),
        context: context.as_ref(),
        state_dir: &state_dir,
        lock_timeout,
        dedup: config.dedup_options(),
        json: cli.json,
        use_color: cli.use_color(),
    };
    app::run(&cli.command, &ctx)
}

fn main() {
    let config = Config::load();
    let cli = Cli::parse().with_config(&config);

    init_logging(cli.debug);
    config.log_outcome();

    if let Err(e) = run(cli, &config) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
