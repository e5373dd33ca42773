//! Carrying refs over to the rewritten history.
//!
//! Each confirmed source ref is rewritten through the ref cache into a
//! [`RefEntry`], then [`plan_ref_actions`] decides what to do to the target:
//!
//! | rewritten ref        | overwrite           | fresh copy |
//! |----------------------|---------------------|------------|
//! | `Empty`              | delete              | nothing    |
//! | name changed         | rename, then update if the target changed | update |
//! | same name            | update if the target changed | update |
//!
//! All ref reads during the pass come from a snapshot of the source refs
//! taken before the first change, so an in-place run never sees its own
//! updates.

use std::collections::BTreeMap;
use std::sync::PoisonError;

use graft_refs::names::{branch_name, tag_name};
use graft_refs::{Ref, R_HEADS, R_TAGS};
use graft_store::ObjectKind;
use graft_types::ObjectId;
use tracing::{debug, info, warn};

use crate::context::{Context, Key};
use crate::error::{RewriteResult, WithContext};
use crate::policy::RewritePolicy;
use crate::ref_entry::RefEntry;
use crate::rewriter::RepositoryRewriter;

/// A change applied to the target's refs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RefAction {
    Delete { name: String },
    Rename { from: String, to: String },
    Update(RefEntry),
}

/// Decide how to carry `old` over given its rewritten form `new`.
pub fn plan_ref_actions(old: &RefEntry, new: &RefEntry, overwrite: bool) -> Vec<RefAction> {
    let mut actions = Vec::new();
    if new.is_empty() {
        if let (true, Some(name)) = (overwrite, old.name()) {
            actions.push(RefAction::Delete {
                name: name.to_owned(),
            });
        }
        return actions;
    }

    if overwrite {
        if let (Some(from), Some(to)) = (old.name(), new.name()) {
            if from != to {
                actions.push(RefAction::Rename {
                    from: from.to_owned(),
                    to: to.to_owned(),
                });
            }
        }
    }
    if !overwrite || !old.same_target(new) {
        actions.push(RefAction::Update(new.clone()));
    }
    actions
}

impl<P: RewritePolicy> RepositoryRewriter<P> {
    /// Rewrite and apply every ref the policy confirms for update.
    pub fn update_refs(&self, c: &Context) -> RewriteResult<()> {
        let snapshot: BTreeMap<String, Ref> = self.source.list_refs().within(c)?.into_iter().collect();
        let mut applied = 0usize;
        for (name, reference) in &snapshot {
            if !self.policy.confirm_update_ref(name, reference, c) {
                continue;
            }
            let rc = c.with(Key::Ref, name);
            let old = RefEntry::from_ref(name, reference);
            let new = self.get_ref_entry(&old, &snapshot, &rc)?;
            for action in plan_ref_actions(&old, &new, self.config.overwrite) {
                self.apply(&action, &rc)?;
                self.ref_actions
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .push(action);
                applied += 1;
            }
        }
        info!(refs = snapshot.len(), actions = applied, "updated refs");
        Ok(())
    }

    /// Rewrite a ref through the ref cache.
    ///
    /// Symbolic targets are looked up in `refs`. A cycle of symbolic refs
    /// recurses without bound.
    pub fn get_ref_entry(
        &self,
        entry: &RefEntry,
        refs: &BTreeMap<String, Ref>,
        c: &Context,
    ) -> RewriteResult<RefEntry> {
        self.ref_cache
            .get_or_compute(entry, || self.rewrite_ref_entry(entry, refs, c))
    }

    /// Rewrite a ref, bypassing the cache.
    pub fn rewrite_ref_entry(
        &self,
        entry: &RefEntry,
        refs: &BTreeMap<String, Ref>,
        c: &Context,
    ) -> RewriteResult<RefEntry> {
        match entry {
            RefEntry::Empty => Ok(RefEntry::Empty),
            RefEntry::Symbolic { name, target } => Ok(RefEntry::Symbolic {
                name: self.rewrite_ref_name(name, c),
                target: self.rewrite_symbolic_target(target, refs, c)?,
            }),
            RefEntry::Object { name, id } => Ok(match self.rewrite_ref_object(name, id, c)? {
                Some(new_id) => RefEntry::Object {
                    name: self.rewrite_ref_name(name, c),
                    id: new_id,
                },
                None => RefEntry::Empty,
            }),
        }
    }

    fn rewrite_symbolic_target(
        &self,
        target: &str,
        refs: &BTreeMap<String, Ref>,
        c: &Context,
    ) -> RewriteResult<String> {
        let Some(reference) = refs.get(target) else {
            return Ok(self.rewrite_ref_name(target, c));
        };
        let tc = c.with(Key::Ref, target);
        let rewritten = self.get_ref_entry(&RefEntry::from_ref(target, reference), refs, &tc)?;
        Ok(match rewritten.name() {
            Some(name) => name.to_owned(),
            None => {
                warn!(symbolic_target = target, context = %c, "symbolic target was dropped; keeping its name");
                target.to_owned()
            }
        })
    }

    /// New object for a direct ref. `None` when the ref should go away.
    fn rewrite_ref_object(
        &self,
        name: &str,
        id: &ObjectId,
        c: &Context,
    ) -> RewriteResult<Option<ObjectId>> {
        match self.source.object_kind(id).within(c)? {
            ObjectKind::Tag => self.rewrite_tag(id, c),
            ObjectKind::Commit => Ok(Some(self.rewrite_referred_commit(name, id))),
            kind => {
                debug!(ref_name = name, ?kind, "ref to a non-commit passed through");
                Ok(Some(*id))
            }
        }
    }

    fn rewrite_referred_commit(&self, name: &str, id: &ObjectId) -> ObjectId {
        match self.commit_mapping.get(id) {
            Some(new_id) => new_id,
            None => {
                warn!(ref_name = name, commit = %id.short_hex(), "commit was not rewritten; ref passed through");
                *id
            }
        }
    }

    /// Rewrite an annotated tag. `None` when its commit was not rewritten.
    fn rewrite_tag(&self, id: &ObjectId, c: &Context) -> RewriteResult<Option<ObjectId>> {
        let tc = c.with(Key::Tag, id.short_hex());
        let tag = self.source.parse_tag(id).within(&tc)?;
        let object = match tag.object_kind {
            ObjectKind::Commit => match self.commit_mapping.get(&tag.object) {
                Some(new_id) => new_id,
                None => {
                    warn!(tag = %tag.name, commit = %tag.object.short_hex(), "tagged commit was not rewritten; dropping tag");
                    return Ok(None);
                }
            },
            kind => {
                debug!(tag = %tag.name, ?kind, "tag of a non-commit keeps its target");
                tag.object
            }
        };

        let name = self.policy.rewrite_tag_name(&tag.name, &tc);
        let tagger = tag
            .tagger
            .as_ref()
            .map(|tagger| self.policy.rewrite_tagger(tagger, &tag, &tc));
        let message = self.policy.rewrite_tag_message(&tag.message, id, &tag, &tc);
        let new_id = self.write_tag(object, tag.object_kind, name, tagger, message, &tc)?;
        debug!(old = %id.short_hex(), new = %new_id.short_hex(), "rewrote tag");
        Ok(Some(new_id))
    }

    /// Rewrite a full ref name through the branch or tag name hook.
    pub fn rewrite_ref_name(&self, name: &str, c: &Context) -> String {
        if let Some(branch) = branch_name(name) {
            format!("{R_HEADS}{}", self.policy.rewrite_branch_name(branch, c))
        } else if let Some(tag) = tag_name(name) {
            format!("{R_TAGS}{}", self.policy.rewrite_tag_name(tag, c))
        } else {
            name.to_owned()
        }
    }

    // ---- Applying ----

    fn apply(&self, action: &RefAction, c: &Context) -> RewriteResult<()> {
        match action {
            RefAction::Delete { name } => self.apply_ref_delete(name, c),
            RefAction::Rename { from, to } => self.apply_ref_rename(from, to, c),
            RefAction::Update(entry) => self.apply_ref_update(entry, c),
        }
    }

    /// Point the target ref named by `entry` at its target.
    pub fn apply_ref_update(&self, entry: &RefEntry, c: &Context) -> RewriteResult<()> {
        let (Some(name), Some(reference)) = (entry.name(), entry.to_ref()) else {
            return Ok(());
        };
        self.target.refs().write_ref(name, &reference).within(c)?;
        debug!(ref_name = name, value = %reference, "updated ref");
        Ok(())
    }

    /// Rename a target ref, keeping what it points at.
    pub fn apply_ref_rename(&self, from: &str, to: &str, c: &Context) -> RewriteResult<()> {
        self.target.refs().rename_ref(from, to).within(c)?;
        debug!(from, to, "renamed ref");
        Ok(())
    }

    /// Delete a target ref. A ref that is already gone is not an error.
    pub fn apply_ref_delete(&self, name: &str, c: &Context) -> RewriteResult<()> {
        if self.target.refs().delete_ref(name).within(c)? {
            debug!(ref_name = name, "deleted ref");
        } else {
            debug!(ref_name = name, "ref to delete was already gone");
        }
        Ok(())
    }
}
