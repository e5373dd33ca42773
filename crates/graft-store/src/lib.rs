//! Content-addressed object storage for graft.
//!
//! This crate implements a hash-keyed object store analogous to git's
//! `.git/objects/` directory. Every object is immutable and identified by
//! its BLAKE3 hash, domain-separated by object kind.
//!
//! # Object Types
//!
//! - [`Blob`] -- raw file content
//! - [`Tree`] -- directory listing mapping names to object references
//! - [`Commit`] -- a snapshot with parents, identities and a message
//! - [`Tag`] -- an annotated tag naming another object
//!
//! # Writing
//!
//! Readers go straight to the [`ObjectStore`]. Writers obtain an
//! [`ObjectInserter`] handle, which buffers objects and publishes them on
//! [`ObjectInserter::flush`]. A handle is owned by one thread at a time.
//!
//! # Design Rules
//!
//! 1. Objects are immutable once written (content-addressing guarantees this).
//! 2. Writing identical bytes twice yields the identical id and is harmless.
//! 3. Concurrent reads are always safe.
//! 4. All I/O errors are propagated, never silently ignored.

pub mod error;
pub mod memory;
pub mod object;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use memory::{InMemoryObjectStore, MemoryInserter};
pub use object::{
    Blob, Commit, EntryMode, ObjectKind, Person, StoredObject, Tag, Tree, TreeEntry,
};
pub use traits::{ObjectInserter, ObjectStore};
