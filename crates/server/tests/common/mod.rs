#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use serde_json::Value;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::protocol::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use zkqr::protocol::{AuthorizationRequest, AuthorizationResponse};
use zkqr::{ProofVerifier, VerifyError, VerifyOptions};
use zkqr_server::{AppState, ServerConfig, app};

pub const FRONTEND: &str = "http://frontend.test";
pub const GOOD_PROOF: &[u8] = b"good-proof";
pub const SUBJECT: &str = "did:iden3:alice";

pub type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Accepts [`GOOD_PROOF`] for [`SUBJECT`], rejects everything else.
#[derive(Default)]
pub struct StubVerifier {
	pub calls: AtomicUsize,
}

impl StubVerifier {
	pub fn calls(&self) -> usize {
		self.calls.load(Ordering::SeqCst)
	}
}

#[async_trait]
impl ProofVerifier for StubVerifier {
	async fn verify(
		&self,
		proof: &[u8],
		challenge: &AuthorizationRequest,
		_options: &VerifyOptions,
	) -> Result<AuthorizationResponse, VerifyError> {
		self.calls.fetch_add(1, Ordering::SeqCst);
		if proof != GOOD_PROOF {
			return Err(VerifyError::Rejected("proof does not match challenge".into()));
		}
		Ok(AuthorizationResponse {
			id: "response".into(),
			typ: String::new(),
			kind: String::new(),
			thid: challenge.thid.clone(),
			body: Value::Null,
			from: SUBJECT.into(),
			to: challenge.from.clone(),
		})
	}
}

pub fn test_config() -> ServerConfig {
	ServerConfig {
		host: "127.0.0.1".into(),
		port: 0,
		hosted_server_url: Some("https://verifier.example".into()),
		frontend_url: Some(FRONTEND.into()),
		verifier_did: Some("did:example:verifier".into()),
		session_ttl_secs: 0,
		..Default::default()
	}
}

pub struct TestServer {
	pub base: String,
	pub ws_base: String,
	pub state: AppState,
	pub verifier: Arc<StubVerifier>,
	pub http: reqwest::Client,
}

/// Spawns the full router on an ephemeral port.
pub async fn spawn_server() -> TestServer {
	let verifier = Arc::new(StubVerifier::default());
	let state = AppState::from_config(&test_config(), verifier.clone()).unwrap();

	let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
	let addr = listener.local_addr().unwrap();
	let router = app::router(state.clone());
	tokio::spawn(async move {
		axum::serve(listener, router).await.unwrap();
	});

	TestServer {
		base: format!("http://{addr}"),
		ws_base: format!("ws://{addr}"),
		state,
		verifier,
		http: reqwest::Client::new(),
	}
}

impl TestServer {
	pub async fn connect(&self, path: &str, origin: Option<&str>) -> Result<Socket, tokio_tungstenite::tungstenite::Error> {
		let mut request = format!("{}{path}", self.ws_base).into_client_request()?;
		if let Some(origin) = origin {
			request
				.headers_mut()
				.insert("Origin", HeaderValue::from_str(origin).unwrap());
		}
		connect_async(request).await.map(|(socket, _)| socket)
	}
}

/// Next JSON text frame, failing the test after five seconds.
pub async fn next_json(socket: &mut Socket) -> Value {
	loop {
		let msg = tokio::time::timeout(Duration::from_secs(5), socket.next())
			.await
			.expect("timed out waiting for frame")
			.expect("socket closed")
			.expect("socket error");
		match msg {
			Message::Text(text) => return serde_json::from_str(&text).unwrap(),
			Message::Close(frame) => panic!("socket closed: {frame:?}"),
			_ => continue,
		}
	}
}

/// Waits for the server to close the socket.
pub async fn expect_closed(socket: &mut Socket) {
	loop {
		match tokio::time::timeout(Duration::from_secs(5), socket.next())
			.await
			.expect("timed out waiting for close")
		{
			None | Some(Err(_)) | Some(Ok(Message::Close(_))) => return,
			Some(Ok(_)) => continue,
		}
	}
}
