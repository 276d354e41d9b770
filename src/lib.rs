//! emblem - multi-relay badge client engine for Nostr
//!
//! Opens one WebSocket per configured relay, fans typed queries out to
//! all of them, deduplicates the combined event stream, and lazily
//! resolves the badge dependency graph: award and showcase-listing
//! records reference badge definitions that may not have arrived yet,
//! and may arrive from a different relay than the one that produced the
//! reference.
//!
//! ## Components
//!
//! - **pool**: relay fan-out and the unified inbound stream
//! - **subscription**: query id bookkeeping and bulk cancellation
//! - **engine**: classifier, resolution state machine, session control
//! - **protocol**: bit-exact Nostr wire frames
//! - **identity**: NIP-19 npub codec
//! - **render**: display collaborator interface

pub mod config;
pub mod engine;
pub mod identity;
pub mod pool;
pub mod protocol;
pub mod render;
pub mod subscription;
pub mod types;

pub use config::Args;
pub use engine::BadgeEngine;
pub use pool::{Incoming, RelayPool, Transport};
pub use types::{EmblemError, Result};
