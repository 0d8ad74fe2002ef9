//! Server configuration.
//!
//! Values are layered, later wins: built-in defaults, the optional JSON file given with
//! `--config`, the environment (a dotenv file is loaded first), then CLI flags.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};
use zkqr::protocol::ProofQuery;

use crate::cli::Cli;

pub const ENV_HOSTED_SERVER_URL: &str = "HOSTED_SERVER_URL";
pub const ENV_FRONTEND_URL: &str = "FRONTEND_URL";
pub const ENV_VERIFIER_DID: &str = "VERIFIER_DID";
pub const ENV_RPC_URL: &str = "RPC_URL_MUMBAI";
pub const ENV_STATE_CONTRACT_ADDRESS: &str = "STATE_CONTRACT_ADDRESS";
pub const ENV_VERIFIER_ENDPOINT: &str = "VERIFIER_ENDPOINT";

/// Identity state contract on Polygon Mumbai.
pub const DEFAULT_STATE_CONTRACT_ADDRESS: &str = "0x134B1BE34911E39A8397ec6289782989729807a4";
pub const DEFAULT_RESOLVER_PREFIX: &str = "polygon:mumbai";

#[derive(Debug, Error)]
pub enum ConfigError {
	#[error("failed to read config file {}", .path.display())]
	Read {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("invalid config file {}: {source}", .path.display())]
	Parse {
		path: PathBuf,
		#[source]
		source: serde_json::Error,
	},

	#[error("failed to load env file {}: {source}", .path.display())]
	EnvFile {
		path: PathBuf,
		#[source]
		source: dotenvy::Error,
	},

	#[error("invalid URL in {key}: {source}")]
	InvalidUrl {
		key: &'static str,
		#[source]
		source: url::ParseError,
	},

	#[error("failed to build HTTP client: {0}")]
	HttpClient(#[source] reqwest::Error),

	#[error("missing required configuration: {}", .0.join(", "))]
	Missing(Vec<&'static str>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerConfig {
	pub host: String,
	pub port: u16,
	/// Public base URL wallets reach this server at; callback URLs are built from it.
	pub hosted_server_url: Option<String>,
	/// Origin allowed to open session sockets and to call the API cross-origin.
	pub frontend_url: Option<String>,
	/// Identity the challenges are issued from.
	pub verifier_did: Option<String>,
	/// RPC node the verification backend reads identity state from.
	pub rpc_url: Option<String>,
	pub state_contract_address: String,
	pub resolver_prefix: String,
	/// Verification backend; without it every proof fails verification.
	pub verifier_endpoint: Option<String>,
	pub verifier_timeout_secs: u64,
	pub accepted_state_transition_delay_secs: u64,
	/// Session lifetime; 0 keeps sessions until shutdown.
	pub session_ttl_secs: u64,
	pub sweep_interval_secs: u64,
	pub proof_query: ProofQuery,
}

impl Default for ServerConfig {
	fn default() -> Self {
		Self {
			host: "0.0.0.0".to_string(),
			port: 8080,
			hosted_server_url: None,
			frontend_url: None,
			verifier_did: None,
			rpc_url: None,
			state_contract_address: DEFAULT_STATE_CONTRACT_ADDRESS.to_string(),
			resolver_prefix: DEFAULT_RESOLVER_PREFIX.to_string(),
			verifier_endpoint: None,
			verifier_timeout_secs: 60,
			accepted_state_transition_delay_secs: 300,
			session_ttl_secs: 900,
			sweep_interval_secs: 60,
			proof_query: ProofQuery::default(),
		}
	}
}

impl ServerConfig {
	/// Resolves the full configuration for a CLI invocation.
	///
	/// Missing required values are logged; with `--strict-config` they are an error.
	pub fn load(cli: &Cli) -> Result<Self, ConfigError> {
		let mut config = match &cli.config {
			Some(path) => Self::from_file(path)?,
			None => Self::default(),
		};

		load_env_file(&cli.env_file)?;
		config.apply_env(|key| std::env::var(key).ok());
		config.apply_cli(cli);

		let missing = config.missing();
		for key in &missing {
			warn!(target = "zkqr.config", key, "required configuration value is missing");
		}
		if cli.strict_config && !missing.is_empty() {
			return Err(ConfigError::Missing(missing));
		}
		Ok(config)
	}

	pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
		let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
			path: path.to_path_buf(),
			source,
		})?;
		serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
			path: path.to_path_buf(),
			source,
		})
	}

	/// Overrides fields from environment variables; empty values are ignored.
	pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
		let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

		if let Some(value) = get(ENV_HOSTED_SERVER_URL) {
			self.hosted_server_url = Some(value);
		}
		if let Some(value) = get(ENV_FRONTEND_URL) {
			self.frontend_url = Some(value);
		}
		if let Some(value) = get(ENV_VERIFIER_DID) {
			self.verifier_did = Some(value);
		}
		if let Some(value) = get(ENV_RPC_URL) {
			self.rpc_url = Some(value);
		}
		if let Some(value) = get(ENV_STATE_CONTRACT_ADDRESS) {
			self.state_contract_address = value;
		}
		if let Some(value) = get(ENV_VERIFIER_ENDPOINT) {
			self.verifier_endpoint = Some(value);
		}
	}

	pub fn apply_cli(&mut self, cli: &Cli) {
		if let Some(host) = &cli.host {
			self.host = host.clone();
		}
		if let Some(port) = cli.port {
			self.port = port;
		}
	}

	/// Environment names of required values that are unset.
	pub fn missing(&self) -> Vec<&'static str> {
		[
			(ENV_HOSTED_SERVER_URL, &self.hosted_server_url),
			(ENV_RPC_URL, &self.rpc_url),
			(ENV_FRONTEND_URL, &self.frontend_url),
			(ENV_VERIFIER_DID, &self.verifier_did),
		]
		.into_iter()
		.filter(|(_, value)| value.as_deref().is_none_or(|v| v.trim().is_empty()))
		.map(|(key, _)| key)
		.collect()
	}

	pub fn bind_addr(&self) -> String {
		format!("{}:{}", self.host, self.port)
	}

	/// Base of every callback URL; falls back to localhost when no public URL is set.
	pub fn callback_base_url(&self) -> String {
		match self.hosted_server_url.as_deref() {
			Some(url) if !url.trim().is_empty() => url.trim().to_string(),
			_ => format!("http://localhost:{}", self.port),
		}
	}

	/// Frontend origin without a trailing slash, as browsers send it.
	pub fn frontend_origin(&self) -> Option<&str> {
		self.frontend_url
			.as_deref()
			.map(|url| url.trim().trim_end_matches('/'))
			.filter(|url| !url.is_empty())
	}

	pub fn verifier_did(&self) -> &str {
		self.verifier_did.as_deref().unwrap_or_default()
	}

	pub fn session_ttl(&self) -> Option<Duration> {
		(self.session_ttl_secs > 0).then(|| Duration::from_secs(self.session_ttl_secs))
	}

	pub fn sweep_interval(&self) -> Duration {
		Duration::from_secs(self.sweep_interval_secs.max(1))
	}

	pub fn verifier_timeout(&self) -> Duration {
		Duration::from_secs(self.verifier_timeout_secs)
	}

	pub fn accepted_state_transition_delay(&self) -> Duration {
		Duration::from_secs(self.accepted_state_transition_delay_secs)
	}
}

fn load_env_file(path: &Path) -> Result<(), ConfigError> {
	match dotenvy::from_path(path) {
		Ok(()) => {
			debug!(target = "zkqr.config", path = %path.display(), "loaded env file");
			Ok(())
		}
		Err(err) if err.not_found() => {
			debug!(target = "zkqr.config", path = %path.display(), "no env file");
			Ok(())
		}
		Err(source) => Err(ConfigError::EnvFile {
			path: path.to_path_buf(),
			source,
		}),
	}
}
