use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Failures on the request path of the coordinator.
#[derive(Debug, Error)]
pub enum Error {
	#[error("invalid session id: {0:?}")]
	InvalidSessionId(String),

	/// No challenge has been issued under this id (or it expired).
	#[error("unknown session: {0}")]
	UnknownSession(String),

	#[error("session {0} is already finished")]
	SessionFinished(String),

	#[error("session {0} is already being verified")]
	VerificationInProgress(String),

	#[error(transparent)]
	Verification(#[from] VerifyError),
}

/// Failures reported by a [`ProofVerifier`](crate::ProofVerifier).
#[derive(Debug, Error)]
pub enum VerifyError {
	/// The proof is invalid or the identity state it relies on is stale.
	#[error("proof rejected: {0}")]
	Rejected(String),

	#[error("malformed proof: {0}")]
	Malformed(String),

	/// The verification backend could not be reached or answered garbage.
	#[error("verification backend unavailable: {0}")]
	Backend(String),

	#[error("no verification backend configured")]
	NotConfigured,
}

/// Delivery failure of a single notification.
///
/// Never fatal: callers log it and carry on with the request.
#[derive(Debug, Error)]
pub enum PushError {
	#[error("notification channel closed")]
	Closed,

	#[error("failed to encode notification: {0}")]
	Encode(#[from] serde_json::Error),
}
