//! Session socket: assigns (or resumes) a session and streams its notifications.

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Query, State, WebSocketUpgrade};
use axum::http::HeaderMap;
use axum::http::header::ORIGIN;
use axum::response::{IntoResponse, Response};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::{debug, info, warn};
use zkqr::{ChannelReceiver, NotificationChannel};

use crate::app::AppState;
use crate::error::ServerError;

#[derive(Debug, Default, Deserialize)]
pub struct SocketQuery {
	/// Existing session to re-attach to instead of opening a new one.
	#[serde(rename = "sessionId")]
	pub session_id: Option<String>,
}

/// `GET /ws` upgrade. Only the configured frontend origin may connect.
pub async fn session_socket(
	ws: WebSocketUpgrade,
	State(state): State<AppState>,
	Query(query): Query<SocketQuery>,
	headers: HeaderMap,
) -> Response {
	let origin = headers.get(ORIGIN).and_then(|value| value.to_str().ok()).unwrap_or_default();
	if !state.origin_allowed(origin) {
		warn!(target = "zkqr", origin, "rejected session socket from foreign origin");
		return ServerError::ForbiddenOrigin(origin.to_string()).into_response();
	}

	let resume = query.session_id.filter(|id| !id.is_empty());
	if let Some(id) = &resume {
		if !state.coordinator.registry().contains(id) {
			return ServerError::from(zkqr::Error::UnknownSession(id.clone())).into_response();
		}
	}

	ws.on_upgrade(move |socket| handle_session_socket(socket, state, resume))
}

async fn handle_session_socket(mut socket: WebSocket, state: AppState, resume: Option<String>) {
	let (channel, rx) = NotificationChannel::new();
	let channel_id = channel.id();

	let session_id = match resume {
		Some(id) => match state.coordinator.reattach_channel(&id, channel) {
			Ok(session_id) => session_id,
			Err(err) => {
				// swept between the upgrade request and the handshake
				warn!(target = "zkqr", session_id = %id, error = %err, "cannot resume session");
				let _ = socket.send(Message::Close(None)).await;
				return;
			}
		},
		None => state.coordinator.open_channel(channel),
	};

	let (ws_tx, mut ws_rx) = socket.split();
	let mut send_task = tokio::spawn(forward_notifications(rx, ws_tx));

	let reader = async {
		while let Some(msg) = ws_rx.next().await {
			match msg {
				Ok(Message::Close(_)) => break,
				Ok(_) => {}
				Err(err) => {
					warn!(target = "zkqr", session_id = %session_id, error = %err, "session socket error");
					break;
				}
			}
		}
	};

	tokio::select! {
		_ = &mut send_task => {
			debug!(target = "zkqr", session_id = %session_id, "session channel released");
		}
		_ = reader => {}
	}

	state.coordinator.registry().detach_channel(session_id.as_str(), channel_id);
	send_task.abort();
	info!(target = "zkqr", session_id = %session_id, "session socket closed");
}

/// Writes queued frames to the socket until every sender is gone, then closes it.
async fn forward_notifications(rx: ChannelReceiver, mut ws_tx: futures::stream::SplitSink<WebSocket, Message>) {
	let mut frames = UnboundedReceiverStream::new(rx);
	while let Some(frame) = frames.next().await {
		if ws_tx.send(Message::Text(frame.into())).await.is_err() {
			return;
		}
	}
	let _ = ws_tx.send(Message::Close(None)).await;
}
