//! Hashing primitives for graft.
//!
//! Every stored object is named by a domain-separated BLAKE3 hash, so a blob
//! and a tree with identical bytes never share an identity.

pub mod hasher;

pub use hasher::ContentHasher;
