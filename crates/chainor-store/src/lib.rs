//! Blob persistence for Chainor state.
//!
//! Every persisted resource (execution contexts, optimizer stats, feedback
//! logs, retry history, cached results) is a JSON blob keyed by
//! `(namespace, id)`. The core never touches a concrete storage medium
//! directly; it goes through [`BlobStore`] so tests can substitute the
//! in-memory store.
//!
//! # Main types
//!
//! - [`BlobStore`] — The `(namespace, id)` keyed persistence contract.
//! - [`FileBlobStore`] — JSON files on disk, one directory per namespace.
//! - [`MemoryBlobStore`] — In-memory store for tests.
//! - [`ResultCache`] — TTL cache of finished task results.

/// TTL result cache.
pub mod cache;
/// Store trait and implementations.
pub mod store;

pub use cache::ResultCache;
pub use store::{BlobStore, FileBlobStore, MemoryBlobStore};
