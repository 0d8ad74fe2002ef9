//! Session id issuance and channel registration.

use tracing::{info, warn};
use zkqr_protocol::SessionGreeting;

use crate::channel::NotificationChannel;
use crate::coordinator::Coordinator;
use crate::error::{Error, Result};
use crate::session::SessionId;

impl Coordinator {
	/// Opens a new session bound to `channel` and greets it with the session id.
	///
	/// The greeting is the first frame the channel ever receives.
	pub fn open_channel(&self, channel: NotificationChannel) -> SessionId {
		let session_id = self.register_unique(Some(channel.clone()));
		info!(target = "zkqr", session_id = %session_id, "session channel opened");
		greet(&session_id, &channel);
		session_id
	}

	/// Opens a new session without a channel, for clients that only use HTTP.
	pub fn new_session(&self) -> SessionId {
		let session_id = self.register_unique(None);
		info!(target = "zkqr", session_id = %session_id, "session opened");
		session_id
	}

	/// Re-attaches a socket to an existing session, replacing its current channel.
	///
	/// The replaced channel is dropped, which closes the old socket. The greeting is
	/// queued before the channel becomes visible so it stays the first frame.
	pub fn reattach_channel(&self, session_id: &str, channel: NotificationChannel) -> Result<SessionId> {
		let session_id = SessionId::parse(session_id)?;
		if !self.registry().contains(session_id.as_str()) {
			return Err(Error::UnknownSession(session_id.to_string()));
		}
		greet(&session_id, &channel);
		let replaced = self.registry().attach_channel(session_id.as_str(), channel)?;
		info!(
			target = "zkqr",
			session_id = %session_id,
			replaced = replaced.is_some(),
			"session channel reattached"
		);
		Ok(session_id)
	}

	fn register_unique(&self, channel: Option<NotificationChannel>) -> SessionId {
		loop {
			let session_id = SessionId::generate();
			if self.registry().register(session_id.clone(), channel.clone()) {
				return session_id;
			}
			warn!(target = "zkqr", session_id = %session_id, "session id collision, regenerating");
		}
	}
}

fn greet(session_id: &SessionId, channel: &NotificationChannel) {
	let greeting = SessionGreeting {
		session_id: session_id.to_string(),
	};
	if let Err(err) = channel.push(&greeting) {
		warn!(target = "zkqr.notify", session_id = %session_id, error = %err, "failed to send session greeting");
	}
}
