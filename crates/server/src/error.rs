use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::{debug, error};

/// Failure of a single HTTP request, rendered as a plain-text body.
#[derive(Debug, Error)]
pub enum ServerError {
	#[error("missing {0} query parameter")]
	MissingParam(&'static str),

	#[error("origin {0:?} is not allowed")]
	ForbiddenOrigin(String),

	#[error(transparent)]
	Coordinator(#[from] zkqr::Error),

	#[error("verification task failed: {0}")]
	Task(#[from] tokio::task::JoinError),
}

impl ServerError {
	pub fn status(&self) -> StatusCode {
		match self {
			Self::MissingParam(_) => StatusCode::BAD_REQUEST,
			Self::ForbiddenOrigin(_) => StatusCode::FORBIDDEN,
			Self::Coordinator(err) => match err {
				zkqr::Error::InvalidSessionId(_) => StatusCode::BAD_REQUEST,
				zkqr::Error::UnknownSession(_) => StatusCode::NOT_FOUND,
				zkqr::Error::SessionFinished(_) | zkqr::Error::VerificationInProgress(_) => StatusCode::CONFLICT,
				zkqr::Error::Verification(_) => StatusCode::INTERNAL_SERVER_ERROR,
			},
			Self::Task(_) => StatusCode::INTERNAL_SERVER_ERROR,
		}
	}
}

impl IntoResponse for ServerError {
	fn into_response(self) -> Response {
		let status = self.status();
		if matches!(self, Self::Task(_)) {
			error!(target = "zkqr", error = %self, "request failed");
		} else {
			debug!(target = "zkqr", status = status.as_u16(), error = %self, "request rejected");
		}
		(status, self.to_string()).into_response()
	}
}
