use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::error;
use zkqr_server::cli::Cli;
use zkqr_server::{HttpProofVerifier, ServerConfig, app, logging};

#[tokio::main]
async fn main() {
	let cli = Cli::parse();
	logging::init_logging(cli.verbose);

	if let Err(err) = run(cli).await {
		error!(target = "zkqr", error = format!("{err:#}"), "server exited with error");
		eprintln!("error: {err:#}");
		std::process::exit(1);
	}
}

async fn run(cli: Cli) -> anyhow::Result<()> {
	let config = ServerConfig::load(&cli).context("loading configuration")?;
	let verifier = HttpProofVerifier::from_config(&config).context("configuring proof verifier")?;
	app::serve(config, Arc::new(verifier)).await
}
