//! Reference management for graft.
//!
//! Named references (branches, tags, HEAD) are the human-readable entry
//! points into a commit graph, exactly as in git.
//!
//! # Architecture
//!
//! - **Direct refs** point at an object id: a commit for branches, a commit
//!   or annotated tag object for tags.
//! - **Symbolic refs** name another ref. `HEAD` is usually symbolic and names
//!   the current branch.
//!
//! # Modules
//!
//! - [`error`]: Error types for ref operations
//! - [`types`]: The [`Ref`] value
//! - [`traits`]: The [`RefStore`] trait defining the storage interface
//! - [`names`]: Namespace constants and ref-name validation
//! - [`memory`]: In-memory [`InMemoryRefStore`]

pub mod error;
pub mod memory;
pub mod names;
pub mod traits;
pub mod types;

pub use error::{RefError, Result};
pub use memory::InMemoryRefStore;
pub use names::{validate_ref_name, HEAD, R_HEADS, R_TAGS};
pub use traits::RefStore;
pub use types::Ref;
