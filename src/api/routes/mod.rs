//! Route handlers for the dashboard server
//!
//! Handlers are organized by domain:
//! - [`files`] — Stored file listing, fetching, deletion, streaming
//! - [`system`] — Dashboard page, health, OpenAPI

mod files;
mod system;

// Re-export all handlers so `routes::function_name` continues to work
pub use files::*;
pub use system::*;
