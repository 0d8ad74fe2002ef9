//! Session coordinator for QR-based zero-knowledge login.
//!
//! A browser opens a session (optionally over a socket), asks for a challenge, and a
//! wallet later posts a proof answering it. [`Coordinator`] ties the two entry points
//! together through a shared [`SessionRegistry`] and pushes every state transition to
//! the session's [`NotificationChannel`] when one is attached.
//!
//! Proof verification itself is delegated to a [`ProofVerifier`].

mod bootstrap;
mod challenge;
mod channel;
mod coordinator;
mod error;
mod registry;
mod session;
mod verification;

pub use challenge::ChallengeBuilder;
pub use channel::{ChannelId, ChannelReceiver, NotificationChannel};
pub use coordinator::Coordinator;
pub use error::{Error, PushError, Result, VerifyError};
pub use registry::{SessionRegistry, StoredChallenge};
pub use session::SessionId;
pub use verification::{DEFAULT_ACCEPTED_STATE_TRANSITION_DELAY, ProofVerifier, VerifyOptions};
pub use zkqr_protocol as protocol;
