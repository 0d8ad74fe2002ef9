//! [`ProofVerifier`] backed by an HTTP verification service.
//!
//! The service receives the raw token together with the challenge it answers and the
//! on-chain state resolver to check identity state against:
//!
//! ```json
//! {
//!   "token": "<JWZ token>",
//!   "request": { ...authorization request... },
//!   "acceptedStateTransitionDelaySecs": 300,
//!   "stateResolver": { "prefix": "polygon:mumbai", "rpcUrl": "...", "contractAddress": "0x..." }
//! }
//! ```
//!
//! A 2xx answer carries the authorization response, a 4xx answer rejects the proof with
//! its body as the reason, anything else is a backend failure.

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::{debug, warn};
use url::Url;
use zkqr::protocol::{AuthorizationRequest, AuthorizationResponse};
use zkqr::{ProofVerifier, VerifyError, VerifyOptions};

use crate::config::{ConfigError, ENV_VERIFIER_ENDPOINT, ServerConfig};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StateResolver {
	pub prefix: String,
	pub rpc_url: String,
	pub contract_address: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct VerifyRequest<'a> {
	token: &'a str,
	request: &'a AuthorizationRequest,
	accepted_state_transition_delay_secs: u64,
	state_resolver: &'a StateResolver,
}

pub struct HttpProofVerifier {
	client: Client,
	endpoint: Option<Url>,
	resolver: StateResolver,
}

impl HttpProofVerifier {
	pub fn new(client: Client, endpoint: Option<Url>, resolver: StateResolver) -> Self {
		Self {
			client,
			endpoint,
			resolver,
		}
	}

	pub fn from_config(config: &ServerConfig) -> Result<Self, ConfigError> {
		let endpoint = config
			.verifier_endpoint
			.as_deref()
			.filter(|url| !url.trim().is_empty())
			.map(|url| Url::parse(url.trim()))
			.transpose()
			.map_err(|source| ConfigError::InvalidUrl {
				key: ENV_VERIFIER_ENDPOINT,
				source,
			})?;
		if endpoint.is_none() {
			warn!(target = "zkqr", "no verifier endpoint configured, every proof will fail verification");
		}

		let client = Client::builder()
			.timeout(config.verifier_timeout())
			.build()
			.map_err(ConfigError::HttpClient)?;
		let resolver = StateResolver {
			prefix: config.resolver_prefix.clone(),
			rpc_url: config.rpc_url.clone().unwrap_or_default(),
			contract_address: config.state_contract_address.clone(),
		};
		Ok(Self::new(client, endpoint, resolver))
	}
}

#[async_trait]
impl ProofVerifier for HttpProofVerifier {
	async fn verify(
		&self,
		proof: &[u8],
		challenge: &AuthorizationRequest,
		options: &VerifyOptions,
	) -> Result<AuthorizationResponse, VerifyError> {
		let Some(endpoint) = &self.endpoint else {
			return Err(VerifyError::NotConfigured);
		};
		let token = std::str::from_utf8(proof)
			.map_err(|err| VerifyError::Malformed(format!("token is not UTF-8: {err}")))?
			.trim();
		if token.is_empty() {
			return Err(VerifyError::Malformed("empty token".to_string()));
		}

		let body = VerifyRequest {
			token,
			request: challenge,
			accepted_state_transition_delay_secs: options.accepted_state_transition_delay.as_secs(),
			state_resolver: &self.resolver,
		};
		debug!(target = "zkqr.verifier", endpoint = %endpoint, thid = %challenge.thid, "sending proof to verifier");

		let response = self
			.client
			.post(endpoint.clone())
			.json(&body)
			.send()
			.await
			.map_err(|err| VerifyError::Backend(err.to_string()))?;

		let status = response.status();
		if status.is_success() {
			return response
				.json::<AuthorizationResponse>()
				.await
				.map_err(|err| VerifyError::Backend(format!("invalid verifier response: {err}")));
		}

		let text = match response.text().await {
			Ok(text) => text,
			Err(err) => {
				debug!(target = "zkqr.verifier", %status, error = %err, "failed to read verifier error body");
				String::new()
			}
		};
		let reason = if text.trim().is_empty() {
			status.to_string()
		} else {
			text.trim().to_string()
		};
		if status.is_client_error() {
			Err(VerifyError::Rejected(reason))
		} else {
			Err(VerifyError::Backend(reason))
		}
	}
}
