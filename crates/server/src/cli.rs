use std::path::PathBuf;

use clap::Parser;

/// Root CLI for the zkqr server.
#[derive(Parser, Debug)]
#[command(name = "zkqr")]
#[command(about = "QR login coordinator for zero-knowledge identity proofs")]
#[command(version)]
pub struct Cli {
	/// Increase verbosity (-v info for everything, -vv debug)
	#[arg(short, long, action = clap::ArgAction::Count)]
	pub verbose: u8,

	/// JSON configuration file; environment variables override its values
	#[arg(short, long, value_name = "FILE")]
	pub config: Option<PathBuf>,

	/// Dotenv file loaded before reading the environment
	#[arg(long, value_name = "FILE", default_value = ".env")]
	pub env_file: PathBuf,

	/// Address to bind
	#[arg(long, value_name = "HOST")]
	pub host: Option<String>,

	/// Port to bind
	#[arg(short, long, value_name = "PORT")]
	pub port: Option<u16>,

	/// Refuse to start when required configuration is missing
	#[arg(long)]
	pub strict_config: bool,
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn defaults_without_flags() {
		let cli = Cli::try_parse_from(["zkqr"]).unwrap();

		assert_eq!(cli.verbose, 0);
		assert_eq!(cli.config, None);
		assert_eq!(cli.env_file, PathBuf::from(".env"));
		assert_eq!(cli.host, None);
		assert_eq!(cli.port, None);
		assert!(!cli.strict_config);
	}

	#[test]
	fn parses_bind_and_config_flags() {
		let cli = Cli::try_parse_from([
			"zkqr",
			"-vv",
			"--config",
			"/etc/zkqr.json",
			"--host",
			"127.0.0.1",
			"-p",
			"9090",
			"--strict-config",
		])
		.unwrap();

		assert_eq!(cli.verbose, 2);
		assert_eq!(cli.config, Some(PathBuf::from("/etc/zkqr.json")));
		assert_eq!(cli.host.as_deref(), Some("127.0.0.1"));
		assert_eq!(cli.port, Some(9090));
		assert!(cli.strict_config);
	}

	#[test]
	fn rejects_invalid_port() {
		assert!(Cli::try_parse_from(["zkqr", "--port", "70000"]).is_err());
	}
}
