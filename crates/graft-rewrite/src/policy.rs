//! Extension points of the rewrite engine.
//!
//! A [`RewritePolicy`] customizes what gets rewritten. Every hook has a
//! default, so a policy overrides only what it needs.
//!
//! # Purity
//!
//! The engine memoizes entry rewrites. An entry-level hook
//! ([`RewritePolicy::rewrite_name`], [`RewritePolicy::drops_entry`],
//! [`RewritePolicy::rewrite_blob_content`]) must therefore be a pure function of the entry. Without path sensitivity
//! the entry carries only its name and content. A hook that looks at the
//! full path needs the engine configured as path-sensitive.

use graft_refs::{Ref, HEAD, R_HEADS, R_TAGS};
use graft_store::{Commit, Person, Tag};
use graft_types::ObjectId;

use crate::context::Context;
use crate::entry::Entry;
use crate::error::RewriteResult;
use crate::repository::Repository;

/// Hooks consulted by the rewrite engine.
pub trait RewritePolicy: Send + Sync {
    // ---- Traversal ----

    /// Whether a source ref contributes a start point to the walk.
    fn confirm_start_ref(&self, name: &str, _reference: &Ref, _c: &Context) -> bool {
        name == HEAD || name.starts_with(R_HEADS) || name.starts_with(R_TAGS)
    }

    /// Whether a source ref is carried over to the target.
    fn confirm_update_ref(&self, name: &str, reference: &Ref, c: &Context) -> bool {
        self.confirm_start_ref(name, reference, c)
    }

    /// Commits whose ancestry is excluded from the walk. Their ids pass
    /// through unchanged wherever they appear as parents.
    fn collect_uninterestings(
        &self,
        _source: &Repository,
        _c: &Context,
    ) -> RewriteResult<Vec<ObjectId>> {
        Ok(Vec::new())
    }

    // ---- Trees ----

    /// New name for a tree entry.
    fn rewrite_name(&self, name: &str, _entry: &Entry, _c: &Context) -> String {
        name.to_owned()
    }

    /// Whether a file is removed from its tree, decided without reading its
    /// content. Checked before [`RewritePolicy::rewrite_blob_content`].
    fn drops_entry(&self, _entry: &Entry, _c: &Context) -> bool {
        false
    }

    /// Whether [`RewritePolicy::rewrite_blob_content`] may change anything.
    ///
    /// When this is `false` an in-place rewrite skips reading blobs entirely.
    fn rewrites_blob_content(&self) -> bool {
        false
    }

    /// New content for a blob. `None` drops the entry from its tree.
    fn rewrite_blob_content(
        &self,
        content: Vec<u8>,
        _entry: &Entry,
        _c: &Context,
    ) -> Option<Vec<u8>> {
        Some(content)
    }

    // ---- Identities ----

    fn rewrite_person(&self, person: &Person, _c: &Context) -> Person {
        person.clone()
    }

    fn rewrite_author(&self, author: &Person, _commit: &Commit, c: &Context) -> Person {
        self.rewrite_person(author, c)
    }

    fn rewrite_committer(&self, committer: &Person, _commit: &Commit, c: &Context) -> Person {
        self.rewrite_person(committer, c)
    }

    fn rewrite_tagger(&self, tagger: &Person, _tag: &Tag, c: &Context) -> Person {
        self.rewrite_person(tagger, c)
    }

    // ---- Messages ----

    /// Shared message rewrite. Prefixes the original object id.
    fn rewrite_message(&self, message: &str, id: &ObjectId, _c: &Context) -> String {
        format!("orig:{id} {message}")
    }

    fn rewrite_commit_message(
        &self,
        message: &str,
        id: &ObjectId,
        _commit: &Commit,
        c: &Context,
    ) -> String {
        self.rewrite_message(message, id, c)
    }

    fn rewrite_tag_message(&self, message: &str, id: &ObjectId, _tag: &Tag, c: &Context) -> String {
        self.rewrite_message(message, id, c)
    }

    // ---- Ref names ----

    /// New short branch name (without `refs/heads/`).
    fn rewrite_branch_name(&self, name: &str, _c: &Context) -> String {
        name.to_owned()
    }

    /// New short tag name (without `refs/tags/`).
    fn rewrite_tag_name(&self, name: &str, _c: &Context) -> String {
        name.to_owned()
    }

    // ---- Lifecycle ----

    /// Runs once after refs are updated.
    fn clean_up(&self, _c: &Context) -> RewriteResult<()> {
        Ok(())
    }
}

/// The default policy: structure and identities unchanged, messages
/// prefixed with the original id.
#[derive(Clone, Copy, Debug, Default)]
pub struct IdentityPolicy;

impl RewritePolicy for IdentityPolicy {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_start_refs() {
        let p = IdentityPolicy;
        let r = Ref::Direct(ObjectId::from_hash([1; 32]));
        let c = Context::root();
        assert!(p.confirm_start_ref("HEAD", &r, &c));
        assert!(p.confirm_start_ref("refs/heads/main", &r, &c));
        assert!(p.confirm_start_ref("refs/tags/v1", &r, &c));
        assert!(!p.confirm_start_ref("refs/remotes/origin/main", &r, &c));
        assert!(!p.confirm_update_ref("refs/notes/commits", &r, &c));
    }

    #[test]
    fn default_message_carries_origin() {
        let id = ObjectId::from_hash([0xab; 32]);
        let msg = IdentityPolicy.rewrite_message("fix bug", &id, &Context::root());
        assert_eq!(msg, format!("orig:{} fix bug", id.to_hex()));
    }

    #[test]
    fn overriding_person_covers_all_roles() {
        struct Anonymize;
        impl RewritePolicy for Anonymize {
            fn rewrite_person(&self, p: &Person, _c: &Context) -> Person {
                Person::new("anon", "anon@example.com", p.time, p.tz_offset)
            }
        }

        let who = Person::new("Ada", "ada@example.com", 5, 60);
        let commit = Commit {
            tree: ObjectId::from_hash([1; 32]),
            parents: vec![],
            author: who.clone(),
            committer: who.clone(),
            message: String::new(),
        };
        let c = Context::root();
        assert_eq!(Anonymize.rewrite_author(&who, &commit, &c).name, "anon");
        assert_eq!(Anonymize.rewrite_committer(&who, &commit, &c).time, 5);
    }
}
