use std::sync::Arc;

use tracing::{debug, warn};
use zkqr_protocol::{Notification, SessionStatus};

use crate::challenge::ChallengeBuilder;
use crate::registry::SessionRegistry;
use crate::session::SessionId;
use crate::verification::{ProofVerifier, VerifyOptions};

/// Entry point shared by the HTTP routes and the session sockets.
///
/// Cheap to share behind an [`Arc`]; all mutable state lives in the registry.
pub struct Coordinator {
	registry: Arc<SessionRegistry>,
	challenges: ChallengeBuilder,
	verifier: Arc<dyn ProofVerifier>,
	options: VerifyOptions,
}

impl Coordinator {
	pub fn new(registry: Arc<SessionRegistry>, challenges: ChallengeBuilder, verifier: Arc<dyn ProofVerifier>) -> Self {
		Self {
			registry,
			challenges,
			verifier,
			options: VerifyOptions::default(),
		}
	}

	pub fn with_verify_options(mut self, options: VerifyOptions) -> Self {
		self.options = options;
		self
	}

	pub fn registry(&self) -> &Arc<SessionRegistry> {
		&self.registry
	}

	pub fn challenges(&self) -> &ChallengeBuilder {
		&self.challenges
	}

	pub(crate) fn verifier(&self) -> &dyn ProofVerifier {
		self.verifier.as_ref()
	}

	pub(crate) fn verify_options(&self) -> &VerifyOptions {
		&self.options
	}

	/// Status of `session_id`; [`None`] for unknown sessions and sessions without a challenge.
	pub fn status(&self, session_id: &str) -> Option<SessionStatus> {
		self.registry.status(session_id)
	}

	/// Best-effort push to the session's channel. Delivery failures are logged only.
	pub(crate) fn notify(&self, session_id: &SessionId, notification: Notification) {
		let Some(channel) = self.registry.channel(session_id.as_str()) else {
			return;
		};
		if channel.is_closed() {
			// socket gone, detach still pending
			debug!(target = "zkqr.notify", session_id = %session_id, "channel closed, notification dropped");
			return;
		}
		match channel.push(&notification) {
			Ok(()) => debug!(
				target = "zkqr.notify",
				session_id = %session_id,
				op = ?notification.operation(),
				status = %notification.status(),
				"notification queued"
			),
			Err(err) => warn!(
				target = "zkqr.notify",
				session_id = %session_id,
				error = %err,
				"failed to push notification"
			),
		}
	}
}
