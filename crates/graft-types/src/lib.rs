//! Foundation types for graft.
//!
//! Every other graft crate depends on `graft-types`. The only identity
//! primitive in the system lives here: [`ObjectId`], the content hash that
//! names every blob, tree, commit and tag.

pub mod error;
pub mod object;

pub use error::TypeError;
pub use object::ObjectId;
