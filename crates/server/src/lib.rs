//! HTTP and WebSocket front end for the zkqr session coordinator.
//!
//! [`app::router`] wires the routes to a shared [`zkqr::Coordinator`]; [`app::serve`]
//! runs it with the session sweeper and graceful shutdown.

pub mod app;
pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod routes;
pub mod verifier;
pub mod ws;

pub use app::AppState;
pub use config::{ConfigError, ServerConfig};
pub use error::ServerError;
pub use verifier::HttpProofVerifier;
