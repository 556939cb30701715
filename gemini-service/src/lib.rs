//! Thin Gemini inference client.
//!
//! Wraps the `generateContent` REST endpoint behind a small typed service:
//! single-prompt request in, plain text out, no streaming. Model-side
//! failures are mapped to distinct error kinds (invalid key, quota,
//! content filter, server) so callers can decide what is worth retrying.

pub mod error_handler;
pub mod services;

pub use error_handler::{AiServiceError, ConfigError, RejectionKind, Result};
pub use services::gemini::{GeminiConfig, GeminiService};
