//! Application wiring for the Whisper messenger: configuration, logging and
//! [`WhisperClient`], which drives activation, send, receive and read
//! receipts against a [`MessagingGateway`].

pub mod client;
pub mod config;
pub mod error;
pub mod gateway;

use tracing_subscriber::{fmt, EnvFilter};

pub use client::{ReceiveOutcome, WhisperClient};
pub use config::ClientConfig;
pub use error::{ClientError, Result};
pub use gateway::MessagingGateway;

/// Install the global `fmt` subscriber. `RUST_LOG` wins over `fallback`.
/// Calling this more than once is harmless.
pub fn init_logging(fallback: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));

    let installed = fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .try_init()
        .is_ok();

    if installed {
        tracing::info!(app = whisper_shared::constants::APP_NAME, "Starting client");
    }
}
