//! HTTP handlers.

use std::sync::Arc;

use axum::Json;
use axum::body::Bytes;
use axum::extract::{Query, State};
use serde::{Deserialize, Serialize};
use tracing::info;
use zkqr::protocol::paths::SESSION_ID_PARAM;
use zkqr::protocol::{AuthorizationRequest, SessionGreeting, SessionStatusReport};

use crate::app::AppState;
use crate::error::ServerError;

#[derive(Debug, Default, Deserialize)]
pub struct SessionQuery {
	#[serde(rename = "sessionId")]
	pub session_id: Option<String>,
}

impl SessionQuery {
	pub fn require(self) -> Result<String, ServerError> {
		self.session_id
			.filter(|id| !id.is_empty())
			.ok_or(ServerError::MissingParam(SESSION_ID_PARAM))
	}
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthReport {
	pub status: String,
	pub sessions: usize,
}

/// `GET /api/get-auth-qr?sessionId=` - the challenge the browser renders as a QR code.
pub async fn get_auth_qr(
	State(state): State<AppState>,
	Query(query): Query<SessionQuery>,
) -> Result<Json<AuthorizationRequest>, ServerError> {
	let session_id = query.require()?;
	let challenge = state.coordinator.issue_challenge(&session_id)?;
	Ok(Json(challenge.as_ref().clone()))
}

/// `POST /api/verification-callback?sessionId=` - the wallet's presented proof.
///
/// Verification runs on its own task so a wallet hanging up mid-request cannot leave
/// the session stuck in verification.
pub async fn verification_callback(
	State(state): State<AppState>,
	Query(query): Query<SessionQuery>,
	body: Bytes,
) -> Result<String, ServerError> {
	let session_id = query.require()?;
	let coordinator = Arc::clone(&state.coordinator);
	let response = tokio::spawn(async move { coordinator.verify(&session_id, &body).await }).await??;

	info!(target = "zkqr", subject = %response.subject(), "user authenticated");
	Ok(format!("User with ID {} Successfully authenticated", response.subject()))
}

/// `GET /api/session` - a fresh session id for clients that poll instead of holding a socket.
pub async fn new_session(State(state): State<AppState>) -> Json<SessionGreeting> {
	let session_id = state.coordinator.new_session();
	Json(SessionGreeting {
		session_id: session_id.to_string(),
	})
}

/// `GET /api/session-status?sessionId=`
pub async fn session_status(
	State(state): State<AppState>,
	Query(query): Query<SessionQuery>,
) -> Result<Json<SessionStatusReport>, ServerError> {
	let session_id = query.require()?;
	if !state.coordinator.registry().contains(&session_id) {
		return Err(zkqr::Error::UnknownSession(session_id).into());
	}
	let status = state.coordinator.status(&session_id);
	Ok(Json(SessionStatusReport { session_id, status }))
}

pub async fn health(State(state): State<AppState>) -> Json<HealthReport> {
	Json(HealthReport {
		status: "ok".to_string(),
		sessions: state.coordinator.registry().len(),
	})
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn require_rejects_absent_and_empty_ids() {
		assert!(matches!(
			SessionQuery::default().require(),
			Err(ServerError::MissingParam("sessionId"))
		));
		let empty = SessionQuery {
			session_id: Some(String::new()),
		};
		assert!(empty.require().is_err());

		let present = SessionQuery {
			session_id: Some("abc".into()),
		};
		assert_eq!(present.require().unwrap(), "abc");
	}
}
