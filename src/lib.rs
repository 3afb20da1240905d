//! # cryptal-tasker
//!
//! Multi-account task automation client for the Cryptal vibe-credit reward
//! program.
//!
//! ## Design Philosophy
//!
//! cryptal-tasker is designed to be:
//! - **Sequential by construction** - Accounts and tasks are processed one
//!   at a time; fixed pacing delays bound the request rate
//! - **Outcome-typed** - Expected HTTP/network failures resolve to values,
//!   never to errors escaping the request layer
//! - **Library-first** - No CLI or UI, purely a Rust crate for embedding
//! - **Event-driven** - Consumers subscribe to events and render banners,
//!   tables, or progress bars themselves
//!
//! ## Quick Start
//!
//! ```no_run
//! use cryptal_tasker::{Orchestrator, RunConfig, credentials};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let tokens = credentials::load_tokens("tokens.txt").await?;
//!     let config = RunConfig {
//!         use_proxy: true,
//!         proxies: credentials::load_proxies("proxies.txt").await,
//!         ..Default::default()
//!     };
//!
//!     let orchestrator = Orchestrator::new(config);
//!
//!     // Subscribe to events
//!     let mut events = orchestrator.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("Event: {:?}", event);
//!         }
//!     });
//!
//!     // One deterministic pass; use run_forever for the daily loop
//!     orchestrator.run_cycle(&tokens).await;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Configuration types
pub mod config;
/// Token and proxy file loading
pub mod credentials;
/// Error types
pub mod error;
/// Account and cycle orchestration
pub mod orchestrator;
/// Retrying request executor
pub mod request;
/// Per-account session operations
pub mod session;
/// Proxy-aware request transport construction
pub mod transport;
/// Core types and events
pub mod types;

// Re-export commonly used types
pub use config::{PacingConfig, RetryConfig, RunConfig};
pub use error::{Error, Result};
pub use orchestrator::{NoopPacer, Orchestrator, Pacer, TokioPacer};
pub use request::{ENDPOINT_NOT_FOUND, Method, RequestOutcome};
pub use session::AccountSession;
pub use types::{
    CompletionOutcome, Event, Profile, Statistics, Task, TaskCategory, TaskStatus, TaskTally,
};

/// Run the daily cycle loop until a termination signal arrives.
///
/// Races [`Orchestrator::run_forever`] against a shutdown signal and
/// returns when the signal wins.
///
/// - **Unix:** listens for SIGTERM and SIGINT, with a Ctrl+C fallback if
///   signal registration fails.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
pub async fn run_until_shutdown(orchestrator: &Orchestrator, tokens: &[String]) {
    tokio::select! {
        _ = orchestrator.run_forever(tokens) => {}
        _ = wait_for_signal() => {
            tracing::info!("shutdown signal received, stopping");
        }
    }
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    let sigterm_result = signal(SignalKind::terminate());
    let sigint_result = signal(SignalKind::interrupt());

    match (sigterm_result, sigint_result) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM signal");
                }
                _ = sigint.recv() => {
                    tracing::info!("Received SIGINT signal (Ctrl+C)");
                }
            }
        }
        _ => {
            tracing::warn!("Could not register signal handlers, using ctrl_c fallback");
            tokio::signal::ctrl_c().await.ok();
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::info!("Received Ctrl+C signal");
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C signal");
        }
    }
}
