// Public modules
pub mod blockquote;
pub mod chat;
pub mod client;
pub mod client_logger;
pub mod error;
pub mod observability;
pub mod render;
pub mod types;

// Re-exports
pub use blockquote::strip_blockquote_prefix;
pub use client::{API_KEY_ENV, CompletionClient, CompletionRequest, Gemini, api_key_from_env};
pub use client_logger::{ClientLogger, FileLogger};
pub use error::{Error, Result};
pub use observability::register_biometrics;
pub use render::{DEFAULT_MARKER, PlainTextRenderer, RenderPlan, Renderer, render_reply};
pub use types::*;
