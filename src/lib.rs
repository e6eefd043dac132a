pub mod cli;
pub mod cmd;
pub mod config;
pub mod context;
pub mod deps;
pub mod device;
pub mod driver;
pub mod error;
pub mod event;
pub mod fs;
pub mod hook;
pub mod provider;
pub mod types;

use anyhow::{Context as _, Result};
use clap::Parser as _;
use cmd::IntoCommand as _;
use shadow_rs::shadow;
use tracing_subscriber::{layer::SubscriberExt as _, util::SubscriberInitExt as _};

pub use context::Context;
pub use error::{Error, ErrorPolicy};

shadow!(build);

/// Parse the command line, run the requested command and return the process exit code.
pub async fn run() -> i32 {
    let args = cli::Cli::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if args.verbose {
            "debug".into()
        } else {
            "info".into()
        }
    });
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match run_with_args(args).await {
        Ok(()) => 0,
        Err(e) => {
            tracing::error!("{e:?}");
            error::exit_code_of(&e)
        }
    }
}

async fn run_with_args(args: cli::Cli) -> Result<()> {
    tracing::debug!("Using config file {:?}", args.config);

    let config = config::Config::load(&args.config)
        .await
        .with_context(|| format!("Failed to load config from {:?}", args.config))?;
    let ctx = Context::with_system(config);

    args.command.into_command().run(&ctx).await
}
