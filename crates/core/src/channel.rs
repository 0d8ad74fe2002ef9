//! Server-to-browser push transport for one session.
//!
//! A [`NotificationChannel`] is the sending half; the socket task owns the matching
//! [`ChannelReceiver`] and writes every frame it yields to the wire. Dropping the last
//! sender (the registry forgetting the channel) ends the receiver, which closes the socket.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;
use tokio::sync::mpsc;

use crate::error::PushError;

static NEXT_CHANNEL_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of a channel, used to tell a replaced channel from its successor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChannelId(u64);

/// Serialized JSON frames, in push order.
pub type ChannelReceiver = mpsc::UnboundedReceiver<String>;

#[derive(Debug, Clone)]
pub struct NotificationChannel {
	id: ChannelId,
	tx: mpsc::UnboundedSender<String>,
}

impl NotificationChannel {
	pub fn new() -> (Self, ChannelReceiver) {
		let (tx, rx) = mpsc::unbounded_channel();
		let id = ChannelId(NEXT_CHANNEL_ID.fetch_add(1, Ordering::SeqCst));
		(Self { id, tx }, rx)
	}

	pub fn id(&self) -> ChannelId {
		self.id
	}

	/// Queues `message` for delivery.
	///
	/// Frames from one caller are delivered in call order.
	pub fn push<T: Serialize + ?Sized>(&self, message: &T) -> Result<(), PushError> {
		let frame = serde_json::to_string(message)?;
		self.tx.send(frame).map_err(|_| PushError::Closed)
	}

	/// True once the socket side has gone away.
	pub fn is_closed(&self) -> bool {
		self.tx.is_closed()
	}
}

#[cfg(test)]
mod tests {
	use serde_json::json;

	use super::*;

	#[test]
	fn frames_arrive_in_push_order() {
		let (channel, mut rx) = NotificationChannel::new();
		channel.push(&json!({"n": 1})).unwrap();
		channel.push(&json!({"n": 2})).unwrap();

		assert_eq!(rx.try_recv().unwrap(), r#"{"n":1}"#);
		assert_eq!(rx.try_recv().unwrap(), r#"{"n":2}"#);
	}

	#[test]
	fn push_after_receiver_dropped_reports_closed() {
		let (channel, rx) = NotificationChannel::new();
		drop(rx);

		assert!(channel.is_closed());
		assert!(matches!(channel.push(&json!({})), Err(PushError::Closed)));
	}

	#[test]
	fn ids_are_distinct() {
		let (a, _rx_a) = NotificationChannel::new();
		let (b, _rx_b) = NotificationChannel::new();
		assert_ne!(a.id(), b.id());
	}
}
