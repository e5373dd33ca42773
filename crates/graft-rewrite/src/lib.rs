//! History rewriting for graft.
//!
//! Given a repository, [`RepositoryRewriter`] produces a rewritten history
//! (in place or into a separate target) by transforming every tree entry,
//! commit and ref according to a [`RewritePolicy`]. Unchanged content keeps
//! its id.
//!
//! # Architecture
//!
//! - **Entry cache**: memoizes tree entry rewrites, so each distinct entry
//!   is rewritten once across the whole history.
//! - **Commit mapping**: old to new commit ids, filled in topological order
//!   so every parent is mapped before its children.
//! - **Ref cache** and the ref decision table carry branches, tags and
//!   symbolic refs over to the rewritten history.
//! - **Pre-pass**: optionally rewrites all root trees on a worker pool
//!   first, leaving only commit writes to the sequential pass.
//!
//! # Example
//!
//! ```
//! use graft_rewrite::{IdentityPolicy, Repository, RepositoryRewriter, RewriteConfig};
//!
//! let repo = Repository::in_memory();
//! let report = RepositoryRewriter::in_place(repo, RewriteConfig::default(), IdentityPolicy)
//!     .rewrite()
//!     .unwrap();
//! assert!(report.commit_mapping.is_empty());
//! ```

pub mod cache;
pub mod concurrent;
pub mod config;
pub mod context;
pub mod entry;
pub mod error;
pub mod handles;
pub mod mapping;
pub mod policies;
pub mod policy;
pub mod ref_entry;
pub mod ref_update;
pub mod repository;
pub mod rewriter;

#[cfg(test)]
mod testing;

pub use cache::{EntryCache, MemoCache, RefCache};
pub use config::RewriteConfig;
pub use context::{Context, Key};
pub use entry::{Entry, EntrySet};
pub use error::{RewriteError, RewriteResult, WithContext};
pub use mapping::CommitMapping;
pub use policies::{PathFilter, RevisionAnnotator};
pub use policy::{IdentityPolicy, RewritePolicy};
pub use ref_entry::RefEntry;
pub use ref_update::{plan_ref_actions, RefAction};
pub use repository::Repository;
pub use rewriter::{RepositoryRewriter, RewriteReport};
