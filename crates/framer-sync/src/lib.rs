//! Framer Sync - optimistic frame store
//!
//! Wraps the synchronous frame model from `framer-core` in a [`FrameStore`]
//! that applies every edit locally first and then, when a [`FrameBackend`]
//! is configured, persists it remotely:
//! - local-only mode: heuristic evaluation, no network
//! - remote mode: [`HttpBackend`] over reqwest, every call bounded by the
//!   configured timeout
//! - one shared [`SyncStatus`] with `is_loading` and the latest error
//!
//! # Example
//!
//! ```rust
//! use framer_core::{FrameType, FrameUpdate};
//! use framer_sync::{FrameStore, SyncConfig};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), framer_sync::SyncError> {
//! let store = FrameStore::local(SyncConfig::local("alice"));
//! let frame = store.create_frame(FrameType::Bug).await?;
//! let id = frame.id.as_str();
//!
//! store
//!     .update_frame(id, FrameUpdate::new().with_problem_statement("Login fails on Safari"))
//!     .await?;
//! let reviewed = store.submit_for_review(id, None).await?;
//! assert!(reviewed.ai.is_some());
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]

pub mod backend;
pub mod config;
pub mod error;
pub mod http;
pub mod status;
pub mod store;

pub use backend::{BackendResult, FrameBackend};
pub use config::{SyncConfig, SyncMode};
pub use error::{ConfigError, SyncError};
pub use http::HttpBackend;
pub use status::SyncStatus;
pub use store::FrameStore;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
