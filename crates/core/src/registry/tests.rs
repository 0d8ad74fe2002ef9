use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::mpsc::error::TryRecvError;
use zkqr_protocol::{AuthorizationRequest, AuthorizationRequestBody, SessionStatus};

use super::*;

fn request_for(id: &str) -> AuthorizationRequest {
	AuthorizationRequest {
		id: id.to_string(),
		typ: "application/iden3comm-plain-json".to_string(),
		kind: "https://iden3-communication.io/authorization/1.0/request".to_string(),
		thid: id.to_string(),
		body: AuthorizationRequestBody {
			callback_url: format!("http://localhost/cb?sessionId={id}"),
			reason: "test".to_string(),
			message: None,
			scope: Vec::new(),
		},
		from: "did:example:verifier".to_string(),
	}
}

fn sid(raw: &str) -> SessionId {
	SessionId::parse(raw).unwrap()
}

#[test]
fn lookups_of_absent_keys_return_none() {
	let registry = SessionRegistry::default();

	assert!(!registry.contains("missing"));
	assert_eq!(registry.status("missing"), None);
	assert!(registry.challenge("missing").is_none());
	assert!(registry.channel("missing").is_none());
	assert!(!registry.finish("missing", SessionStatus::Done));
}

#[test]
fn register_refuses_duplicate_ids() {
	let registry = SessionRegistry::default();

	assert!(registry.register(sid("a"), None));
	assert!(!registry.register(sid("a"), None));
	assert_eq!(registry.len(), 1);
}

#[test]
fn bootstrapped_session_has_no_status_until_challenge() {
	let registry = SessionRegistry::default();
	registry.register(sid("a"), None);

	assert_eq!(registry.status("a"), None);

	registry.store_challenge(&sid("a"), request_for("a")).unwrap();
	assert_eq!(registry.status("a"), Some(SessionStatus::InProgress));
}

#[test]
fn store_challenge_creates_session_for_http_only_clients() {
	let registry = SessionRegistry::default();

	let stored = registry.store_challenge(&sid("h1"), request_for("h1")).unwrap();

	assert!(stored.fresh);
	assert_eq!(stored.challenge.thid, "h1");
	assert!(registry.contains("h1"));
	assert!(registry.channel("h1").is_none());
}

#[test]
fn challenge_is_set_once() {
	let registry = SessionRegistry::default();
	let first = registry.store_challenge(&sid("a"), request_for("a")).unwrap();

	let mut other = request_for("a");
	other.body.reason = "different".to_string();
	let second = registry.store_challenge(&sid("a"), other).unwrap();

	assert!(first.fresh);
	assert!(!second.fresh);
	assert!(Arc::ptr_eq(&first.challenge, &second.challenge));
	assert_eq!(registry.challenge("a").unwrap().body.reason, "test");
}

#[test]
fn verification_without_challenge_is_unknown_session() {
	let registry = SessionRegistry::default();
	registry.register(sid("a"), None);

	assert!(matches!(registry.begin_verification("a"), Err(Error::UnknownSession(_))));
	assert!(matches!(registry.begin_verification("nope"), Err(Error::UnknownSession(_))));
}

#[test]
fn verification_is_claimed_once() {
	let registry = SessionRegistry::default();
	registry.store_challenge(&sid("a"), request_for("a")).unwrap();

	registry.begin_verification("a").unwrap();
	assert!(matches!(registry.begin_verification("a"), Err(Error::VerificationInProgress(_))));
}

#[test]
fn terminal_status_is_final() {
	let registry = SessionRegistry::default();
	registry.store_challenge(&sid("a"), request_for("a")).unwrap();
	registry.begin_verification("a").unwrap();

	assert!(registry.finish("a", SessionStatus::Done));
	assert_eq!(registry.status("a"), Some(SessionStatus::Done));

	assert!(!registry.finish("a", SessionStatus::Error));
	assert_eq!(registry.status("a"), Some(SessionStatus::Done));
	assert!(matches!(registry.begin_verification("a"), Err(Error::SessionFinished(_))));
	assert!(matches!(
		registry.store_challenge(&sid("a"), request_for("a")),
		Err(Error::SessionFinished(_))
	));
}

#[test]
fn replaced_channel_cannot_detach_successor() {
	let registry = SessionRegistry::default();
	let (first, _rx1) = NotificationChannel::new();
	let (second, _rx2) = NotificationChannel::new();
	registry.register(sid("a"), Some(first.clone()));

	let replaced = registry.attach_channel("a", second.clone()).unwrap();
	assert_eq!(replaced.map(|ch| ch.id()), Some(first.id()));

	assert!(!registry.detach_channel("a", first.id()));
	assert_eq!(registry.channel("a").map(|ch| ch.id()), Some(second.id()));

	assert!(registry.detach_channel("a", second.id()));
	assert!(registry.channel("a").is_none());
}

#[test]
fn attach_to_unknown_session_fails() {
	let registry = SessionRegistry::default();
	let (channel, _rx) = NotificationChannel::new();

	assert!(matches!(registry.attach_channel("nope", channel), Err(Error::UnknownSession(_))));
}

#[test]
fn sweep_drops_only_expired_sessions() {
	let registry = SessionRegistry::new(Some(Duration::from_secs(60)));
	registry.register(sid("old"), None);
	registry.register(sid("fresh"), None);

	assert_eq!(registry.sweep_expired_at(Instant::now()), 0);

	let later = Instant::now() + Duration::from_secs(61);
	assert_eq!(registry.sweep_expired_at(later), 2);
	assert!(registry.is_empty());
}

#[test]
fn sweep_keeps_sessions_under_verification() {
	let registry = SessionRegistry::new(Some(Duration::from_secs(1)));
	registry.store_challenge(&sid("busy"), request_for("busy")).unwrap();
	registry.begin_verification("busy").unwrap();
	registry.register(sid("idle"), None);

	let later = Instant::now() + Duration::from_secs(5);
	assert_eq!(registry.sweep_expired_at(later), 1);
	assert!(registry.contains("busy"));
}

#[test]
fn issuing_a_challenge_restarts_the_ttl() {
	let registry = SessionRegistry::new(Some(Duration::from_millis(300)));
	let (channel, _rx) = NotificationChannel::new();
	registry.register(sid("late"), Some(channel));

	std::thread::sleep(Duration::from_millis(250));
	registry.store_challenge(&sid("late"), request_for("late")).unwrap();
	std::thread::sleep(Duration::from_millis(100));

	assert_eq!(registry.sweep_expired(), 0);
	assert!(registry.contains("late"));
	assert!(registry.channel("late").is_some());
}

#[test]
fn reattaching_and_verifying_restart_the_ttl() {
	let registry = SessionRegistry::new(Some(Duration::from_millis(300)));
	registry.store_challenge(&sid("a"), request_for("a")).unwrap();
	registry.store_challenge(&sid("b"), request_for("b")).unwrap();
	registry.store_challenge(&sid("idle"), request_for("idle")).unwrap();

	std::thread::sleep(Duration::from_millis(250));
	let (channel, _rx) = NotificationChannel::new();
	registry.attach_channel("a", channel).unwrap();
	registry.begin_verification("b").unwrap();
	registry.finish("b", SessionStatus::Done);
	std::thread::sleep(Duration::from_millis(100));

	assert_eq!(registry.sweep_expired(), 1);
	assert!(registry.contains("a"));
	assert!(registry.contains("b"));
	assert!(!registry.contains("idle"));
}

#[test]
fn re_reading_during_verification_reports_it() {
	let registry = SessionRegistry::default();
	registry.store_challenge(&sid("a"), request_for("a")).unwrap();
	registry.begin_verification("a").unwrap();

	let stored = registry.store_challenge(&sid("a"), request_for("a")).unwrap();
	assert!(!stored.fresh);
	assert!(stored.verifying);
}

#[test]
fn sweep_without_ttl_is_noop() {
	let registry = SessionRegistry::new(None);
	registry.register(sid("a"), None);

	assert_eq!(registry.sweep_expired_at(Instant::now() + Duration::from_secs(86_400)), 0);
	assert_eq!(registry.len(), 1);
}

#[test]
fn sweeping_drops_attached_channel() {
	let registry = SessionRegistry::new(Some(Duration::from_secs(1)));
	let (channel, rx) = NotificationChannel::new();
	registry.register(sid("a"), Some(channel));

	registry.sweep_expired_at(Instant::now() + Duration::from_secs(2));

	// the registry held the only sender
	let mut rx = rx;
	assert!(matches!(rx.try_recv(), Err(TryRecvError::Disconnected)));
}
