//! Messages pushed to the browser over its session socket.
//!
//! Every [`Notification`] goes out as a JSON envelope:
//!
//! ```text
//! {"fn": "getAuthQr" | "handleVerification", "status": "IN_PROGRESS" | "ERROR" | "DONE", "data": ...}
//! ```
//!
//! `data` depends on the operation and status, so the envelope is only used on the wire.
//! In code each combination is its own [`Notification`] variant with its exact payload.

use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;

use crate::auth_exchange::{AuthorizationRequest, AuthorizationResponse};

/// Flow that produced a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operation {
	#[serde(rename = "getAuthQr")]
	GetAuthQr,
	#[serde(rename = "handleVerification")]
	HandleVerification,
}

/// Lifecycle status of a session.
///
/// A session has no status until its challenge exists; `Done` and `Error` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionStatus {
	InProgress,
	Error,
	Done,
}

impl SessionStatus {
	pub fn is_terminal(self) -> bool {
		matches!(self, SessionStatus::Done | SessionStatus::Error)
	}
}

impl std::fmt::Display for SessionStatus {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			SessionStatus::InProgress => write!(f, "IN_PROGRESS"),
			SessionStatus::Error => write!(f, "ERROR"),
			SessionStatus::Done => write!(f, "DONE"),
		}
	}
}

/// Failure description carried by error notifications.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDetail {
	pub message: String,
}

impl ErrorDetail {
	pub fn new(message: impl Into<String>) -> Self {
		Self {
			message: message.into(),
		}
	}
}

/// A state transition of one session, pushed to its socket if one is attached.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "NotificationEnvelope")]
pub enum Notification {
	/// Challenge construction started.
	ChallengeStarted { session_id: String },
	/// Challenge stored and ready to render.
	ChallengeIssued(Box<AuthorizationRequest>),
	/// A presented proof arrived and is being verified.
	VerificationStarted { session_id: String },
	/// The proof verified.
	Verified(Box<AuthorizationResponse>),
	/// The proof was rejected or could not be verified.
	VerificationFailed(ErrorDetail),
}

impl Notification {
	pub fn operation(&self) -> Operation {
		match self {
			Notification::ChallengeStarted { .. } | Notification::ChallengeIssued(_) => Operation::GetAuthQr,
			Notification::VerificationStarted { .. }
			| Notification::Verified(_)
			| Notification::VerificationFailed(_) => Operation::HandleVerification,
		}
	}

	pub fn status(&self) -> SessionStatus {
		match self {
			Notification::ChallengeStarted { .. } | Notification::VerificationStarted { .. } => {
				SessionStatus::InProgress
			}
			Notification::ChallengeIssued(_) | Notification::Verified(_) => SessionStatus::Done,
			Notification::VerificationFailed(_) => SessionStatus::Error,
		}
	}
}

impl Serialize for Notification {
	fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		let mut envelope = serializer.serialize_struct("Notification", 3)?;
		envelope.serialize_field("fn", &self.operation())?;
		envelope.serialize_field("status", &self.status())?;
		match self {
			Notification::ChallengeStarted { session_id } | Notification::VerificationStarted { session_id } => {
				if session_id.is_empty() {
					envelope.skip_field("data")?;
				} else {
					envelope.serialize_field("data", session_id)?;
				}
			}
			Notification::ChallengeIssued(request) => envelope.serialize_field("data", request)?,
			Notification::Verified(response) => envelope.serialize_field("data", response)?,
			Notification::VerificationFailed(detail) => envelope.serialize_field("data", detail)?,
		}
		envelope.end()
	}
}

/// Untyped form of a notification as it appears on the wire.
///
/// Clients that only care about `fn`/`status` can stop here; [`Notification`]
/// deserializes through this type and rejects impossible combinations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationEnvelope {
	#[serde(rename = "fn")]
	pub operation: Operation,
	pub status: SessionStatus,
	#[serde(default, skip_serializing_if = "Value::is_null")]
	pub data: Value,
}

impl TryFrom<NotificationEnvelope> for Notification {
	type Error = String;

	fn try_from(envelope: NotificationEnvelope) -> Result<Self, Self::Error> {
		let NotificationEnvelope { operation, status, data } = envelope;
		let session_id = |data: Value| match data {
			Value::Null => Ok(String::new()),
			Value::String(id) => Ok(id),
			other => Err(format!("expected session id string, got {other}")),
		};
		let decode_err = |e: serde_json::Error| e.to_string();

		match (operation, status) {
			(Operation::GetAuthQr, SessionStatus::InProgress) => Ok(Notification::ChallengeStarted {
				session_id: session_id(data)?,
			}),
			(Operation::GetAuthQr, SessionStatus::Done) => serde_json::from_value(data)
				.map(|request| Notification::ChallengeIssued(Box::new(request)))
				.map_err(decode_err),
			(Operation::HandleVerification, SessionStatus::InProgress) => {
				Ok(Notification::VerificationStarted {
					session_id: session_id(data)?,
				})
			}
			(Operation::HandleVerification, SessionStatus::Done) => serde_json::from_value(data)
				.map(|response| Notification::Verified(Box::new(response)))
				.map_err(decode_err),
			(Operation::HandleVerification, SessionStatus::Error) => serde_json::from_value(data)
				.map(Notification::VerificationFailed)
				.map_err(decode_err),
			(Operation::GetAuthQr, SessionStatus::Error) => {
				Err("challenge construction has no error notification".to_string())
			}
		}
	}
}

/// First message on a freshly opened session socket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionGreeting {
	pub session_id: String,
}

/// Body of the session status route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStatusReport {
	pub session_id: String,
	/// [`None`] until a challenge has been issued for the session.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub status: Option<SessionStatus>,
}

#[cfg(test)]
mod tests {
	use serde_json::json;

	use super::*;

	#[test]
	fn in_progress_carries_session_id() {
		let value = serde_json::to_value(Notification::ChallengeStarted {
			session_id: "abc".into(),
		})
		.unwrap();
		assert_eq!(value, json!({"fn": "getAuthQr", "status": "IN_PROGRESS", "data": "abc"}));
	}

	#[test]
	fn empty_session_id_omits_data() {
		let value = serde_json::to_value(Notification::VerificationStarted {
			session_id: String::new(),
		})
		.unwrap();
		assert_eq!(value, json!({"fn": "handleVerification", "status": "IN_PROGRESS"}));
	}

	#[test]
	fn failure_carries_error_detail() {
		let value = serde_json::to_value(Notification::VerificationFailed(ErrorDetail::new("stale state"))).unwrap();
		assert_eq!(value["fn"], "handleVerification");
		assert_eq!(value["status"], "ERROR");
		assert_eq!(value["data"]["message"], "stale state");
	}

	#[test]
	fn verified_notification_decodes_from_wire() {
		let raw = r#"{"fn":"handleVerification","status":"DONE","data":{"id":"r","from":"did:subject"}}"#;
		let notification: Notification = serde_json::from_str(raw).unwrap();
		match notification {
			Notification::Verified(response) => assert_eq!(response.subject(), "did:subject"),
			other => panic!("expected Verified, got {other:?}"),
		}
	}

	#[test]
	fn impossible_combination_is_rejected() {
		let raw = r#"{"fn":"getAuthQr","status":"ERROR","data":{"message":"x"}}"#;
		assert!(serde_json::from_str::<Notification>(raw).is_err());
	}

	#[test]
	fn status_report_omits_missing_status() {
		let report = SessionStatusReport {
			session_id: "s".into(),
			status: None,
		};
		assert_eq!(serde_json::to_value(&report).unwrap(), json!({"sessionId": "s"}));
	}
}
