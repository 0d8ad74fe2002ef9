//! Wire types shared by the zkqr server and its clients.
//!
//! - [`auth_exchange`] - authorization request/response messages exchanged with the wallet
//! - [`notification`] - messages pushed to the browser over the session socket
//! - [`paths`] - HTTP routes and query parameter names

pub mod auth_exchange;
pub mod notification;

pub use auth_exchange::{
	AuthorizationRequest, AuthorizationRequestBody, AuthorizationResponse, ProofQuery,
	ZeroKnowledgeProofRequest,
};
pub use notification::{
	ErrorDetail, Notification, NotificationEnvelope, Operation, SessionGreeting, SessionStatus,
	SessionStatusReport,
};

/// HTTP routes served by the coordinator.
pub mod paths {
	/// Issues the challenge for a session (`GET`, `?sessionId=`).
	pub const GET_AUTH_QR: &str = "/api/get-auth-qr";
	/// Receives the wallet's presented proof (`POST`, `?sessionId=`, raw body).
	pub const VERIFICATION_CALLBACK: &str = "/api/verification-callback";
	/// WebSocket upgrade that assigns a session id and streams notifications.
	pub const SESSION_SOCKET: &str = "/ws";
	/// Issues a session id without opening a socket.
	pub const NEW_SESSION: &str = "/api/session";
	/// Reports the current status of a session (`GET`, `?sessionId=`).
	pub const SESSION_STATUS: &str = "/api/session-status";
	pub const HEALTH: &str = "/health";

	/// Query parameter carrying the session id on every session-scoped route.
	pub const SESSION_ID_PARAM: &str = "sessionId";
}
