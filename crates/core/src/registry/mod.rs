//! Concurrent store of every live session.
//!
//! Uses [`DashMap`] so each accessor locks only the shard holding its key, and no
//! accessor holds that lock past its own return. Callers never read-then-write across
//! two accessors; every check-then-act sequence lives inside one method.

#[cfg(test)]
mod tests;

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use dashmap::mapref::entry::Entry as MapEntry;
use tracing::debug;
use zkqr_protocol::{AuthorizationRequest, SessionStatus};

use crate::channel::{ChannelId, NotificationChannel};
use crate::error::{Error, Result};
use crate::session::SessionId;

struct SessionEntry {
	/// Bootstrap, challenge, channel attach and verification all refresh this; the TTL
	/// counts from it.
	last_active: Instant,
	status: Option<SessionStatus>,
	challenge: Option<Arc<AuthorizationRequest>>,
	channel: Option<NotificationChannel>,
	/// Set while a proof for this session is with the verifier.
	verifying: bool,
}

impl SessionEntry {
	fn new(channel: Option<NotificationChannel>) -> Self {
		Self {
			last_active: Instant::now(),
			status: None,
			challenge: None,
			channel,
			verifying: false,
		}
	}
}

/// Result of [`SessionRegistry::store_challenge`].
#[derive(Debug, Clone)]
pub struct StoredChallenge {
	pub challenge: Arc<AuthorizationRequest>,
	/// False when an earlier call already stored the challenge.
	pub fresh: bool,
	/// A proof for the session is with the verifier right now.
	pub verifying: bool,
}

/// Owner of all session state: challenge, status and attached channel per session id.
pub struct SessionRegistry {
	entries: DashMap<SessionId, SessionEntry>,
	/// Sessions older than this are dropped by [`sweep_expired`](Self::sweep_expired).
	ttl: Option<Duration>,
}

impl Default for SessionRegistry {
	fn default() -> Self {
		Self::new(None)
	}
}

impl SessionRegistry {
	/// Creates an empty registry; `ttl` of [`None`] keeps sessions until shutdown.
	pub fn new(ttl: Option<Duration>) -> Self {
		Self {
			entries: DashMap::new(),
			ttl,
		}
	}

	/// Inserts a fresh session. Returns false, leaving the existing entry untouched,
	/// if the id is already taken.
	pub fn register(&self, id: SessionId, channel: Option<NotificationChannel>) -> bool {
		match self.entries.entry(id) {
			MapEntry::Occupied(_) => false,
			MapEntry::Vacant(slot) => {
				slot.insert(SessionEntry::new(channel));
				true
			}
		}
	}

	pub fn contains(&self, id: &str) -> bool {
		self.entries.contains_key(id)
	}

	pub fn status(&self, id: &str) -> Option<SessionStatus> {
		self.entries.get(id).and_then(|entry| entry.status)
	}

	#[cfg(test)]
	pub(crate) fn challenge(&self, id: &str) -> Option<Arc<AuthorizationRequest>> {
		self.entries.get(id).and_then(|entry| entry.challenge.clone())
	}

	/// Currently attached channel, if any.
	pub fn channel(&self, id: &str) -> Option<NotificationChannel> {
		self.entries.get(id).and_then(|entry| entry.channel.clone())
	}

	/// Attaches `channel` to an existing session, returning the channel it replaced.
	pub fn attach_channel(&self, id: &str, channel: NotificationChannel) -> Result<Option<NotificationChannel>> {
		let mut entry = self
			.entries
			.get_mut(id)
			.ok_or_else(|| Error::UnknownSession(id.to_string()))?;
		entry.last_active = Instant::now();
		Ok(entry.channel.replace(channel))
	}

	/// Detaches the session's channel if it is still `channel_id`.
	///
	/// A socket that was replaced closes after its successor attached; this leaves the
	/// successor in place.
	pub fn detach_channel(&self, id: &str, channel_id: ChannelId) -> bool {
		let Some(mut entry) = self.entries.get_mut(id) else {
			return false;
		};
		if entry.channel.as_ref().is_some_and(|ch| ch.id() == channel_id) {
			entry.channel = None;
			true
		} else {
			false
		}
	}

	/// Stores the challenge for `id`, creating the session if needed, and marks it
	/// [`SessionStatus::InProgress`].
	///
	/// A challenge is set once: if one is already stored the existing one is returned
	/// and `challenge` is discarded. Terminal sessions fail with
	/// [`Error::SessionFinished`].
	pub fn store_challenge(&self, id: &SessionId, challenge: AuthorizationRequest) -> Result<StoredChallenge> {
		let mut entry = self
			.entries
			.entry(id.clone())
			.or_insert_with(|| SessionEntry::new(None));

		if entry.status.is_some_and(SessionStatus::is_terminal) {
			return Err(Error::SessionFinished(id.to_string()));
		}
		entry.last_active = Instant::now();
		if let Some(existing) = &entry.challenge {
			return Ok(StoredChallenge {
				challenge: Arc::clone(existing),
				fresh: false,
				verifying: entry.verifying,
			});
		}

		let challenge = Arc::new(challenge);
		entry.challenge = Some(Arc::clone(&challenge));
		entry.status = Some(SessionStatus::InProgress);
		Ok(StoredChallenge {
			challenge,
			fresh: true,
			verifying: false,
		})
	}

	/// Claims the session for verification and returns its challenge.
	///
	/// Fails with [`Error::UnknownSession`] when no challenge was ever issued, with
	/// [`Error::SessionFinished`] for terminal sessions and with
	/// [`Error::VerificationInProgress`] while another proof is being checked.
	pub fn begin_verification(&self, id: &str) -> Result<Arc<AuthorizationRequest>> {
		let mut entry = self
			.entries
			.get_mut(id)
			.ok_or_else(|| Error::UnknownSession(id.to_string()))?;

		let challenge = entry
			.challenge
			.clone()
			.ok_or_else(|| Error::UnknownSession(id.to_string()))?;
		if entry.status.is_some_and(SessionStatus::is_terminal) {
			return Err(Error::SessionFinished(id.to_string()));
		}
		if entry.verifying {
			return Err(Error::VerificationInProgress(id.to_string()));
		}

		entry.verifying = true;
		entry.last_active = Instant::now();
		Ok(challenge)
	}

	/// Moves an in-progress session to its terminal `status`.
	///
	/// Returns false if the session vanished or was not in progress.
	pub fn finish(&self, id: &str, status: SessionStatus) -> bool {
		let Some(mut entry) = self.entries.get_mut(id) else {
			return false;
		};
		entry.verifying = false;
		entry.last_active = Instant::now();
		if entry.status != Some(SessionStatus::InProgress) {
			return false;
		}
		entry.status = Some(status);
		true
	}

	/// Drops sessions idle for longer than the TTL. Sessions with a proof under
	/// verification are kept until the verifier answers.
	pub fn sweep_expired(&self) -> usize {
		self.sweep_expired_at(Instant::now())
	}

	pub fn sweep_expired_at(&self, now: Instant) -> usize {
		let Some(ttl) = self.ttl else {
			return 0;
		};
		let mut removed = 0;
		self.entries.retain(|_, entry| {
			let keep = entry.verifying || now.saturating_duration_since(entry.last_active) < ttl;
			if !keep {
				removed += 1;
			}
			keep
		});
		if removed > 0 {
			debug!(target = "zkqr.registry", removed, "swept expired sessions");
		}
		removed
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}
}
