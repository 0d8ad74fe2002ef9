//! Router assembly and the server loop.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::Router;
use axum::http::{HeaderValue, Method};
use axum::routing::{get, post};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};
use zkqr::protocol::paths;
use zkqr::{ChallengeBuilder, Coordinator, ProofVerifier, SessionRegistry, VerifyOptions};

use crate::config::ServerConfig;
use crate::{routes, ws};

#[derive(Clone)]
pub struct AppState {
	pub coordinator: Arc<Coordinator>,
	frontend_origin: Option<Arc<str>>,
}

impl AppState {
	pub fn new(coordinator: Arc<Coordinator>, frontend_origin: Option<&str>) -> Self {
		Self {
			coordinator,
			frontend_origin: frontend_origin.map(Arc::from),
		}
	}

	/// Builds the coordinator described by `config` around `verifier`.
	pub fn from_config(config: &ServerConfig, verifier: Arc<dyn ProofVerifier>) -> Result<Self> {
		let challenges = ChallengeBuilder::from_base_url(
			&config.callback_base_url(),
			config.verifier_did(),
			config.proof_query.clone(),
		)
		.with_context(|| format!("invalid callback base URL {}", config.callback_base_url()))?;
		let registry = Arc::new(SessionRegistry::new(config.session_ttl()));
		let coordinator = Coordinator::new(registry, challenges, verifier).with_verify_options(VerifyOptions {
			accepted_state_transition_delay: config.accepted_state_transition_delay(),
		});
		Ok(Self::new(Arc::new(coordinator), config.frontend_origin()))
	}

	/// Browsers send `Origin` without a trailing slash; a missing header counts as empty.
	pub fn origin_allowed(&self, origin: &str) -> bool {
		let origin = origin.trim_end_matches('/');
		match self.frontend_origin.as_deref() {
			Some(allowed) => origin == allowed,
			None => origin.is_empty(),
		}
	}

	fn cors_layer(&self) -> Option<CorsLayer> {
		let origin = self.frontend_origin.as_deref()?;
		match HeaderValue::from_str(origin) {
			Ok(origin) => Some(
				CorsLayer::new()
					.allow_origin(origin)
					.allow_methods([Method::GET, Method::POST])
					.allow_headers(Any),
			),
			Err(err) => {
				warn!(target = "zkqr", origin, error = %err, "frontend origin is not a valid header value, CORS disabled");
				None
			}
		}
	}
}

pub fn router(state: AppState) -> Router {
	let cors = state.cors_layer();
	let app = Router::new()
		.route(paths::GET_AUTH_QR, get(routes::get_auth_qr))
		.route(paths::VERIFICATION_CALLBACK, post(routes::verification_callback))
		.route(paths::NEW_SESSION, get(routes::new_session))
		.route(paths::SESSION_STATUS, get(routes::session_status))
		.route(paths::HEALTH, get(routes::health))
		.route(paths::SESSION_SOCKET, get(ws::session_socket))
		.layer(TraceLayer::new_for_http())
		.with_state(state);

	match cors {
		Some(cors) => app.layer(cors),
		None => app,
	}
}

/// Binds the configured address and serves until Ctrl+C or SIGTERM.
pub async fn serve(config: ServerConfig, verifier: Arc<dyn ProofVerifier>) -> Result<()> {
	let state = AppState::from_config(&config, verifier)?;
	let sweeper = config
		.session_ttl()
		.map(|_| spawn_sweeper(Arc::clone(state.coordinator.registry()), config.sweep_interval()));

	let addr = config.bind_addr();
	let listener = TcpListener::bind(&addr)
		.await
		.with_context(|| format!("failed to bind {addr}"))?;
	info!(
		target = "zkqr",
		addr = %addr,
		callback_base = %config.callback_base_url(),
		frontend = config.frontend_origin().unwrap_or("<none>"),
		"listening"
	);

	let result = axum::serve(listener, router(state))
		.with_graceful_shutdown(shutdown_signal())
		.await
		.context("server error");

	if let Some(sweeper) = sweeper {
		sweeper.abort();
	}
	info!(target = "zkqr", "server stopped");
	result
}

/// Periodically drops expired sessions; dropping a session closes its socket.
pub fn spawn_sweeper(registry: Arc<SessionRegistry>, interval: Duration) -> JoinHandle<()> {
	tokio::spawn(async move {
		let mut ticker = tokio::time::interval(interval);
		ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
		loop {
			ticker.tick().await;
			let removed = registry.sweep_expired();
			if removed > 0 {
				info!(target = "zkqr", removed, remaining = registry.len(), "expired sessions swept");
			} else {
				debug!(target = "zkqr", remaining = registry.len(), "sweep found nothing to expire");
			}
		}
	})
}

async fn shutdown_signal() {
	let ctrl_c = async {
		if let Err(err) = tokio::signal::ctrl_c().await {
			warn!(target = "zkqr", error = %err, "failed to listen for Ctrl+C");
			std::future::pending::<()>().await;
		}
	};

	#[cfg(unix)]
	let terminate = async {
		match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
			Ok(mut signal) => {
				signal.recv().await;
			}
			Err(err) => {
				warn!(target = "zkqr", error = %err, "failed to listen for SIGTERM");
				std::future::pending::<()>().await;
			}
		}
	};

	#[cfg(not(unix))]
	let terminate = std::future::pending::<()>();

	tokio::select! {
		_ = ctrl_c => info!(target = "zkqr", "received Ctrl+C, shutting down"),
		_ = terminate => info!(target = "zkqr", "received SIGTERM, shutting down"),
	}
}
