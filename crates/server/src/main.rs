use clap::Parser;
use std::process::ExitCode;
use std::sync::Arc;

mod api;
mod config;
mod lifecycle;
mod logging;
mod middleware;
mod runtime;
mod transport;

use config::{Args, ServerConfig};
use lifecycle::{Lifecycle, Phase};

#[tokio::main]
async fn main() -> ExitCode {
    let dotenv = config::load_dotenv();
    let args = Args::parse();
    logging::init(&args.log_level, args.log_format);
    dotenv.log();

    let lifecycle = Arc::new(Lifecycle::new());
    lifecycle.advance(Phase::Configuring);

    let config = match ServerConfig::load(&args) {
        Ok(config) => config,
        Err(err) => {
            tracing::error!("{}", err);
            return ExitCode::FAILURE;
        }
    };

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        transport = ?config.transport,
        "Starting Jellyseerr MCP server"
    );

    match runtime::run(config, lifecycle).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!("{:#}", err);
            ExitCode::FAILURE
        }
    }
}
