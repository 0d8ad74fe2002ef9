use std::borrow::Borrow;
use std::fmt;
use std::sync::Arc;

use uuid::Uuid;

use crate::error::{Error, Result};

const MAX_SESSION_ID_LEN: usize = 128;

/// Opaque correlation key shared by the HTTP routes and the session socket.
///
/// Hashes and compares like the underlying string, so registry lookups accept `&str`.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(Arc<str>);

impl SessionId {
	/// Fresh random (v4 UUID) id.
	pub fn generate() -> Self {
		Self(Arc::from(Uuid::new_v4().to_string()))
	}

	/// Validates a client-supplied id: non-empty, at most 128 bytes, no whitespace or
	/// control characters.
	pub fn parse(raw: &str) -> Result<Self> {
		let valid = !raw.is_empty()
			&& raw.len() <= MAX_SESSION_ID_LEN
			&& !raw.chars().any(|c| c.is_whitespace() || c.is_control());
		if !valid {
			return Err(Error::InvalidSessionId(raw.chars().take(MAX_SESSION_ID_LEN).collect()));
		}
		Ok(Self(Arc::from(raw)))
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl Borrow<str> for SessionId {
	fn borrow(&self) -> &str {
		&self.0
	}
}

impl AsRef<str> for SessionId {
	fn as_ref(&self) -> &str {
		&self.0
	}
}

impl fmt::Display for SessionId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

impl fmt::Debug for SessionId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "SessionId({})", self.0)
	}
}
