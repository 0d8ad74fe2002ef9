//! Authorization messages exchanged between the verifier and a wallet.
//!
//! The shapes follow the iden3comm plain-JSON envelope: the verifier publishes an
//! [`AuthorizationRequest`] (rendered as a QR code by the frontend), the wallet answers
//! by posting a signed token to the request's callback URL, and the external verifier
//! turns that token into an [`AuthorizationResponse`].
//!
//! # Main Types
//!
//! - [`AuthorizationRequest`] - the challenge presented to the wallet
//! - [`ZeroKnowledgeProofRequest`] - one proof the wallet must produce
//! - [`ProofQuery`] - verifier-side configuration the request scope is built from
//! - [`AuthorizationResponse`] - the verified answer, carrying the authenticated subject

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// Media type of every plain (unencrypted, unsigned) iden3comm message.
pub const PLAIN_MESSAGE_TYPE: &str = "application/iden3comm-plain-json";

/// Protocol message type of an authorization request.
pub const AUTHORIZATION_REQUEST_TYPE: &str = "https://iden3-communication.io/authorization/1.0/request";

/// Challenge presented to a wallet.
///
/// `id` and `thid` both carry the session id so the wallet's answer can be matched
/// back to the browser session that asked for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthorizationRequest {
	pub id: String,
	pub typ: String,
	#[serde(rename = "type")]
	pub kind: String,
	pub thid: String,
	pub body: AuthorizationRequestBody,
	/// Identity of the verifier issuing the request.
	pub from: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizationRequestBody {
	/// Where the wallet posts its token.
	pub callback_url: String,
	/// Human-readable purpose shown by the wallet.
	pub reason: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub message: Option<String>,
	pub scope: Vec<ZeroKnowledgeProofRequest>,
}

/// A single proof the wallet is asked to produce.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZeroKnowledgeProofRequest {
	pub id: u32,
	pub circuit_id: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub optional: Option<bool>,
	/// Credential query, opaque to the coordinator.
	pub query: Value,
}

/// Verifier-side description of what every challenge asks for.
///
/// Loaded from configuration and copied into each [`AuthorizationRequest`] unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProofQuery {
	pub reason: String,
	pub scope: Vec<ZeroKnowledgeProofRequest>,
}

impl Default for ProofQuery {
	/// Age check: prove a KYC credential whose birthday predates 2023-01-01.
	fn default() -> Self {
		Self {
			reason: "Must be born before this year".to_string(),
			scope: vec![ZeroKnowledgeProofRequest {
				id: 1,
				circuit_id: "credentialAtomicQuerySigV2".to_string(),
				optional: None,
				query: json!({
					"allowedIssuers": ["*"],
					"credentialSubject": {
						"birthday": { "$lt": 20230101 }
					},
					"context": "https://raw.githubusercontent.com/iden3/claim-schema-vocab/main/schemas/json-ld/kyc-v3.json-ld",
					"type": "KYCAgeCredential"
				}),
			}],
		}
	}
}

/// Verified answer to an [`AuthorizationRequest`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthorizationResponse {
	pub id: String,
	#[serde(default)]
	pub typ: String,
	#[serde(rename = "type", default)]
	pub kind: String,
	#[serde(default)]
	pub thid: String,
	/// Proofs and public signals, opaque to the coordinator.
	#[serde(default)]
	pub body: Value,
	/// Identifier of the authenticated subject.
	pub from: String,
	#[serde(default, skip_serializing_if = "String::is_empty")]
	pub to: String,
}

impl AuthorizationResponse {
	/// Identifier of the subject the proof authenticated.
	pub fn subject(&self) -> &str {
		&self.from
	}
}
