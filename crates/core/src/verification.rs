//! Proof verification: the external verifier seam and the orchestration around it.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{info, warn};
use zkqr_protocol::{AuthorizationRequest, AuthorizationResponse, ErrorDetail, Notification, SessionStatus};

use crate::coordinator::Coordinator;
use crate::error::{Error, Result, VerifyError};
use crate::session::SessionId;

/// How stale an on-chain identity state may be and still be accepted.
pub const DEFAULT_ACCEPTED_STATE_TRANSITION_DELAY: Duration = Duration::from_secs(5 * 60);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifyOptions {
	pub accepted_state_transition_delay: Duration,
}

impl Default for VerifyOptions {
	fn default() -> Self {
		Self {
			accepted_state_transition_delay: DEFAULT_ACCEPTED_STATE_TRANSITION_DELAY,
		}
	}
}

/// External capability that checks a presented proof against the challenge it answers.
///
/// Implementations own every cryptographic and identity-state decision; the
/// coordinator only records the outcome.
#[async_trait]
pub trait ProofVerifier: Send + Sync {
	async fn verify(
		&self,
		proof: &[u8],
		challenge: &AuthorizationRequest,
		options: &VerifyOptions,
	) -> std::result::Result<AuthorizationResponse, VerifyError>;
}

impl Coordinator {
	/// Verifies the proof a wallet posted for `session_id`.
	///
	/// Fails fast with [`Error::UnknownSession`] when no challenge was issued for the
	/// session. Otherwise the session ends [`SessionStatus::Done`] or
	/// [`SessionStatus::Error`] and an attached channel sees
	/// [`Notification::VerificationStarted`] followed by the outcome.
	///
	/// No registry lock is held while the verifier runs.
	pub async fn verify(&self, session_id: &str, proof: &[u8]) -> Result<AuthorizationResponse> {
		let session_id = SessionId::parse(session_id)?;
		let challenge = self.registry().begin_verification(session_id.as_str())?;

		self.notify(
			&session_id,
			Notification::VerificationStarted {
				session_id: session_id.to_string(),
			},
		);

		match self.verifier().verify(proof, &challenge, self.verify_options()).await {
			Ok(response) => {
				self.record_outcome(&session_id, SessionStatus::Done);
				info!(
					target = "zkqr",
					session_id = %session_id,
					subject = %response.subject(),
					"proof verified"
				);
				self.notify(&session_id, Notification::Verified(Box::new(response.clone())));
				Ok(response)
			}
			Err(err) => {
				self.record_outcome(&session_id, SessionStatus::Error);
				warn!(target = "zkqr", session_id = %session_id, error = %err, "proof verification failed");
				self.notify(
					&session_id,
					Notification::VerificationFailed(ErrorDetail::new(err.to_string())),
				);
				Err(Error::Verification(err))
			}
		}
	}

	fn record_outcome(&self, session_id: &SessionId, status: SessionStatus) {
		if !self.registry().finish(session_id.as_str(), status) {
			// swept while the verifier was running
			warn!(target = "zkqr", session_id = %session_id, %status, "session gone before outcome was recorded");
		}
	}
}
