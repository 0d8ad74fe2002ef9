//! Challenge construction and issuance.

use std::sync::Arc;

use tracing::{debug, info};
use url::Url;
use zkqr_protocol::auth_exchange::{AUTHORIZATION_REQUEST_TYPE, PLAIN_MESSAGE_TYPE};
use zkqr_protocol::{AuthorizationRequest, AuthorizationRequestBody, Notification, ProofQuery, paths};

use crate::coordinator::Coordinator;
use crate::error::Result;
use crate::session::SessionId;

/// Builds the [`AuthorizationRequest`] a wallet answers for one session.
///
/// Output depends only on the session id and the builder's fixed configuration, so
/// building twice for the same session yields the same request.
#[derive(Debug, Clone)]
pub struct ChallengeBuilder {
	verifier_did: String,
	/// Callback route without the session query parameter.
	callback: Url,
	query: ProofQuery,
}

impl ChallengeBuilder {
	pub fn new(verifier_did: impl Into<String>, callback: Url, query: ProofQuery) -> Self {
		Self {
			verifier_did: verifier_did.into(),
			callback,
			query,
		}
	}

	/// Derives the callback from the server's public base URL.
	///
	/// The callback path is appended to the base as-is, so a base with a path prefix
	/// (reverse proxy mount point) keeps it.
	pub fn from_base_url(
		base_url: &str,
		verifier_did: impl Into<String>,
		query: ProofQuery,
	) -> std::result::Result<Self, url::ParseError> {
		let callback = Url::parse(&format!(
			"{}{}",
			base_url.trim_end_matches('/'),
			paths::VERIFICATION_CALLBACK
		))?;
		Ok(Self::new(verifier_did, callback, query))
	}

	/// Callback URL the wallet posts its proof to for `session_id`.
	pub fn callback_url(&self, session_id: &SessionId) -> Url {
		let mut url = self.callback.clone();
		url.query_pairs_mut()
			.clear()
			.append_pair(paths::SESSION_ID_PARAM, session_id.as_str());
		url
	}

	pub fn build(&self, session_id: &SessionId) -> AuthorizationRequest {
		AuthorizationRequest {
			id: session_id.to_string(),
			typ: PLAIN_MESSAGE_TYPE.to_string(),
			kind: AUTHORIZATION_REQUEST_TYPE.to_string(),
			thid: session_id.to_string(),
			body: AuthorizationRequestBody {
				callback_url: self.callback_url(session_id).to_string(),
				reason: self.query.reason.clone(),
				message: None,
				scope: self.query.scope.clone(),
			},
			from: self.verifier_did.clone(),
		}
	}
}

impl Coordinator {
	/// Issues (or re-reads) the challenge for `session_id`.
	///
	/// Creates the session if the id was never bootstrapped, so clients without a
	/// socket can pick their own id. An attached channel sees
	/// [`Notification::ChallengeStarted`] followed by [`Notification::ChallengeIssued`],
	/// except for re-reads while a proof is being verified.
	pub fn issue_challenge(&self, session_id: &str) -> Result<Arc<AuthorizationRequest>> {
		let session_id = SessionId::parse(session_id)?;
		let challenge = self.challenges().build(&session_id);
		let stored = self.registry().store_challenge(&session_id, challenge)?;

		if stored.verifying {
			debug!(target = "zkqr", session_id = %session_id, "challenge re-read during verification");
			return Ok(stored.challenge);
		}

		self.notify(
			&session_id,
			Notification::ChallengeStarted {
				session_id: session_id.to_string(),
			},
		);
		debug!(
			target = "zkqr",
			session_id = %session_id,
			callback = %stored.challenge.body.callback_url,
			fresh = stored.fresh,
			"challenge stored"
		);
		info!(target = "zkqr", session_id = %session_id, "challenge issued");

		self.notify(
			&session_id,
			Notification::ChallengeIssued(Box::new(stored.challenge.as_ref().clone())),
		);
		Ok(stored.challenge)
	}
}
