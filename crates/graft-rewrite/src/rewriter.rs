//! The sequential rewrite engine.
//!
//! A run has two halves. The commit pass walks the source history in
//! topological order and rewrites each commit: parents through the commit
//! mapping, the root tree through the memoized entry rewrite, identities and
//! message through policy hooks. The ref pass (see `ref_update`) then points
//! refs at the rewritten objects.
//!
//! # Invariants
//!
//! - A commit is rewritten only after every parent inside the walk.
//! - Each commit is rewritten at most once.
//! - Entry and ref rewrites are pure functions of their cache keys.
//! - Objects written during a phase become visible when the phase's write
//!   handles are flushed. Reads only ever touch source objects.

use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Mutex, OnceLock, PoisonError, RwLock};

use graft_dag::{CommitGraph, RevWalk};
use graft_store::{Blob, Commit, ObjectKind, Person, StoredObject, Tag, Tree};
use graft_types::ObjectId;
use tracing::{debug, info, trace};

use crate::cache::{EntryCache, MemoCache, RefCache};
use crate::config::RewriteConfig;
use crate::context::{Context, Key};
use crate::entry::{Entry, EntrySet};
use crate::error::{RewriteError, RewriteResult, WithContext};
use crate::handles::HandleTable;
use crate::mapping::CommitMapping;
use crate::policy::{IdentityPolicy, RewritePolicy};
use crate::ref_update::RefAction;
use crate::repository::Repository;

/// Summary of a finished run.
#[derive(Clone, Debug, Default)]
pub struct RewriteReport {
    /// Old commit id to new commit id.
    pub commit_mapping: BTreeMap<ObjectId, ObjectId>,
    /// Distinct entries rewritten.
    pub entries: usize,
    /// Distinct refs rewritten.
    pub refs: usize,
    /// Ref changes applied to the target, in order.
    pub ref_actions: Vec<RefAction>,
}

/// Rewrites the history of one repository into a target.
///
/// The engine is single-use: [`RepositoryRewriter::rewrite`] consumes it.
/// After a failure the target may hold partial results and a new engine is
/// needed.
pub struct RepositoryRewriter<P = IdentityPolicy> {
    pub(crate) source: Repository,
    pub(crate) target: Repository,
    pub(crate) config: RewriteConfig,
    pub(crate) policy: P,
    pub(crate) label: Option<String>,
    pub(crate) commit_mapping: CommitMapping,
    pub(crate) entry_cache: EntryCache,
    pub(crate) ref_cache: RefCache,
    /// Handles of the running phase. `None` outside phases.
    handles: RwLock<Option<Arc<HandleTable>>>,
    /// Commits of the walk, once traversal is prepared.
    walked: OnceLock<HashSet<ObjectId>>,
    pub(crate) ref_actions: Mutex<Vec<RefAction>>,
}

impl<P: RewritePolicy> RepositoryRewriter<P> {
    /// Rewrite `source` into `target`.
    ///
    /// With `config.overwrite` set, `target` must already hold the source's
    /// objects and refs (normally it is the source itself).
    pub fn new(source: Repository, target: Repository, config: RewriteConfig, policy: P) -> Self {
        Self {
            entry_cache: MemoCache::for_concurrency(config.concurrent),
            ref_cache: MemoCache::exclusive(),
            source,
            target,
            config,
            policy,
            label: None,
            commit_mapping: CommitMapping::new(),
            handles: RwLock::new(None),
            walked: OnceLock::new(),
            ref_actions: Mutex::new(Vec::new()),
        }
    }

    /// Rewrite a repository in place. Forces `overwrite`.
    pub fn in_place(repository: Repository, config: RewriteConfig, policy: P) -> Self {
        let config = RewriteConfig {
            overwrite: true,
            ..config
        };
        Self::new(repository.clone(), repository, config, policy)
    }

    /// Name the run in diagnostics.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// The run configuration.
    pub fn config(&self) -> &RewriteConfig {
        &self.config
    }

    /// The policy supplying the rewrite hooks.
    pub fn policy(&self) -> &P {
        &self.policy
    }

    /// Repository the history is read from.
    pub fn source(&self) -> &Repository {
        &self.source
    }

    /// Repository rewritten objects and refs are written to.
    pub fn target(&self) -> &Repository {
        &self.target
    }

    /// Old to new commit ids recorded so far.
    pub fn commit_mapping(&self) -> &CommitMapping {
        &self.commit_mapping
    }

    /// Memoized entry rewrites.
    pub fn entry_cache(&self) -> &EntryCache {
        &self.entry_cache
    }

    fn base_context(&self) -> Context {
        match &self.label {
            Some(label) => Context::root().with(Key::Repo, label),
            None => Context::root(),
        }
    }

    /// Rewrite commits, then refs, then run the clean-up hook.
    pub fn rewrite(self) -> RewriteResult<RewriteReport> {
        let c = self.base_context();
        info!(
            overwrite = self.config.overwrite,
            path_sensitive = self.config.path_sensitive,
            concurrent = self.config.concurrent,
            context = %c,
            "starting rewrite"
        );
        self.rewrite_commits(&c)?;
        self.update_refs(&c)?;
        self.policy.clean_up(&c)?;

        let report = self.report();
        info!(
            commits = report.commit_mapping.len(),
            entries = report.entries,
            refs = report.refs,
            "rewrite finished"
        );
        Ok(report)
    }

    fn report(&self) -> RewriteReport {
        RewriteReport {
            commit_mapping: self.commit_mapping.snapshot(),
            entries: self.entry_cache.len(),
            refs: self.ref_cache.len(),
            ref_actions: self
                .ref_actions
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone(),
        }
    }

    // ---- Traversal ----

    /// Collect the commits to rewrite: reachable from confirmed start refs,
    /// minus the ancestry of the policy's uninteresting commits.
    pub fn prepare_traversal(&self, c: &Context) -> RewriteResult<CommitGraph> {
        let starts = self.collect_starts(c)?;
        let uninteresting = self.policy.collect_uninterestings(&self.source, c)?;

        let mut walk = RevWalk::new(self.source.objects().as_ref());
        for id in &starts {
            walk.mark_start(*id);
        }
        for id in &uninteresting {
            walk.mark_uninteresting(*id);
        }
        let graph = walk.collect()?;
        debug!(
            starts = starts.len(),
            uninteresting = uninteresting.len(),
            commits = graph.len(),
            "prepared traversal"
        );
        Ok(graph)
    }

    fn collect_starts(&self, c: &Context) -> RewriteResult<Vec<ObjectId>> {
        let mut starts = Vec::new();
        for (name, reference) in self.source.list_refs().within(c)? {
            if !self.policy.confirm_start_ref(&name, &reference, c) {
                continue;
            }
            let rc = c.with(Key::Ref, &name);
            let Some(id) = self.source.refs().resolve(&name).within(&rc)? else {
                debug!(ref_name = %name, "unborn ref skipped");
                continue;
            };
            match self.peel_to_commit(id, &rc)? {
                Some(commit) => starts.push(commit),
                None => debug!(ref_name = %name, "ref does not lead to a commit; skipped"),
            }
        }
        Ok(starts)
    }

    /// Follow annotated tags until something other than a tag is reached.
    fn peel_to_commit(&self, mut id: ObjectId, c: &Context) -> RewriteResult<Option<ObjectId>> {
        loop {
            match self.source.object_kind(&id).within(c)? {
                ObjectKind::Commit => return Ok(Some(id)),
                ObjectKind::Tag => id = self.source.parse_tag(&id).within(c)?.object,
                _ => return Ok(None),
            }
        }
    }

    // ---- Commits ----

    fn rewrite_commits(&self, c: &Context) -> RewriteResult<()> {
        let graph = self.prepare_traversal(c)?;
        let walked: HashSet<ObjectId> = graph.commits().iter().map(|n| n.id).collect();
        if self.walked.set(walked).is_err() {
            debug!("traversal was already prepared");
        }

        if self.config.concurrent {
            self.prewarm(&graph, c)?;
        }

        let order = graph.topological_order()?;
        info!(commits = order.len(), "rewriting commits");
        self.in_phase(c, || {
            for node in order {
                let commit = self.source.read_commit(&node.id).within(c)?;
                self.rewrite_commit(node.id, &commit, c)?;
            }
            Ok(())
        })
    }

    /// Rewrite one commit and record the mapping. Returns the new id.
    ///
    /// Every parent inside the walk must already be rewritten.
    pub fn rewrite_commit(
        &self,
        id: ObjectId,
        commit: &Commit,
        c: &Context,
    ) -> RewriteResult<ObjectId> {
        let uc = c.with(Key::Commit, id.short_hex());
        let parents = self.rewrite_parents(id, &commit.parents)?;
        let tree = self.rewrite_root_tree(commit.tree, &uc)?;
        let author = self.policy.rewrite_author(&commit.author, commit, &uc);
        let committer = self.policy.rewrite_committer(&commit.committer, commit, &uc);
        let message = self
            .policy
            .rewrite_commit_message(&commit.message, &id, commit, &uc);

        let new_id = self.write_commit(parents, tree, author, committer, message, &uc)?;
        self.commit_mapping.insert(id, new_id)?;
        debug!(old = %id.short_hex(), new = %new_id.short_hex(), "rewrote commit");
        Ok(new_id)
    }

    fn rewrite_parents(&self, commit: ObjectId, parents: &[ObjectId]) -> RewriteResult<Vec<ObjectId>> {
        parents
            .iter()
            .map(|parent| match self.commit_mapping.get(parent) {
                Some(new) => Ok(new),
                None if self.outside_walk(parent) => Ok(*parent),
                None => Err(RewriteError::MissingParent {
                    commit,
                    parent: *parent,
                }),
            })
            .collect()
    }

    /// Returns `true` for commits the prepared walk excluded. Before a walk
    /// is prepared nothing counts as excluded.
    fn outside_walk(&self, id: &ObjectId) -> bool {
        self.walked.get().is_some_and(|walked| !walked.contains(id))
    }

    // ---- Trees and blobs ----

    /// Rewrite a commit's root tree. A root that rewrites to nothing becomes
    /// the empty tree.
    pub fn rewrite_root_tree(&self, tree: ObjectId, c: &Context) -> RewriteResult<ObjectId> {
        let uc = c.with(Key::Root, tree.short_hex());
        let root = Entry::root(tree, self.config.path_sensitive);
        let new_id = match self.get_entry(&root, &uc)? {
            EntrySet::Present(entry) => entry.id,
            EntrySet::Empty => {
                debug!(context = %uc, "root tree emptied");
                self.write_tree(&[], &uc)?
            }
        };
        trace!(old = %tree.short_hex(), new = %new_id.short_hex(), "rewrote root tree");
        Ok(new_id)
    }

    /// Rewrite an entry through the entry cache.
    pub fn get_entry(&self, entry: &Entry, c: &Context) -> RewriteResult<EntrySet> {
        self.entry_cache
            .get_or_compute(entry, || self.rewrite_entry(entry, c))
    }

    /// Rewrite an entry, bypassing the cache.
    pub fn rewrite_entry(&self, entry: &Entry, c: &Context) -> RewriteResult<EntrySet> {
        let uc = c.with(Key::Path, entry.path());
        let new_id = if entry.is_tree() {
            self.rewrite_tree(entry, &uc)?
        } else if entry.mode.is_blob() {
            self.rewrite_blob(entry, &uc)?
        } else {
            // Submodule commits live in another repository.
            Some(entry.id)
        };
        let Some(new_id) = new_id else {
            return Ok(EntrySet::Empty);
        };

        let name = if entry.is_root() {
            entry.name.clone()
        } else {
            self.policy.rewrite_name(&entry.name, entry, &uc)
        };
        Ok(EntrySet::Present(Entry::new(
            entry.mode,
            name,
            new_id,
            entry.path_context.clone(),
        )))
    }

    /// Rewrite a tree's children. `None` when no child survives.
    fn rewrite_tree(&self, entry: &Entry, c: &Context) -> RewriteResult<Option<ObjectId>> {
        let child_context = self.config.path_sensitive.then(|| entry.path());
        let children = self
            .source
            .read_tree(&entry.id, child_context.as_deref())
            .within(c)?;

        let mut entries = Vec::with_capacity(children.len());
        for child in &children {
            self.get_entry(child, c)?.register_to(&mut entries);
        }
        if entries.is_empty() {
            return Ok(None);
        }
        Ok(Some(self.write_tree(&entries, c)?))
    }

    /// Rewrite a blob. `None` when the policy drops it.
    fn rewrite_blob(&self, entry: &Entry, c: &Context) -> RewriteResult<Option<ObjectId>> {
        if self.policy.drops_entry(entry, c) {
            return Ok(None);
        }
        if self.config.overwrite && !self.policy.rewrites_blob_content() {
            return Ok(Some(entry.id));
        }
        let content = self.source.read_blob(&entry.id).within(c)?;
        match self.policy.rewrite_blob_content(content, entry, c) {
            Some(data) => Ok(Some(self.write_blob(data, c)?)),
            None => Ok(None),
        }
    }

    // ---- Writes ----

    pub fn write_blob(&self, data: Vec<u8>, c: &Context) -> RewriteResult<ObjectId> {
        self.insert(&Blob::new(data).to_stored_object(), c)
    }

    pub fn write_tree(&self, entries: &[Entry], c: &Context) -> RewriteResult<ObjectId> {
        let tree = Tree::new(entries.iter().map(Entry::to_tree_entry).collect());
        self.insert(&tree.to_stored_object().within(c)?, c)
    }

    pub fn write_commit(
        &self,
        parents: Vec<ObjectId>,
        tree: ObjectId,
        author: Person,
        committer: Person,
        message: String,
        c: &Context,
    ) -> RewriteResult<ObjectId> {
        let commit = Commit {
            tree,
            parents,
            author,
            committer,
            message,
        };
        self.insert(&commit.to_stored_object().within(c)?, c)
    }

    pub fn write_tag(
        &self,
        object: ObjectId,
        object_kind: ObjectKind,
        name: String,
        tagger: Option<Person>,
        message: String,
        c: &Context,
    ) -> RewriteResult<ObjectId> {
        let tag = Tag {
            object,
            object_kind,
            name,
            tagger,
            message,
        };
        self.insert(&tag.to_stored_object().within(c)?, c)
    }

    /// Write through the calling thread's handle when a phase is running,
    /// otherwise through a one-shot handle flushed immediately.
    fn insert(&self, object: &StoredObject, c: &Context) -> RewriteResult<ObjectId> {
        let active = self
            .handles
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        match active {
            Some(table) => table.with_handle(|ins| ins.insert(object)).within(c),
            None => {
                let mut ins = self.target.objects().new_inserter();
                let id = ins.insert(object).within(c)?;
                ins.flush().within(c)?;
                Ok(id)
            }
        }
    }

    // ---- Phases ----

    /// Run `work` with writes routed to per-thread handles. The handles are
    /// flushed if `work` succeeds and discarded otherwise.
    pub(crate) fn in_phase<R>(
        &self,
        c: &Context,
        work: impl FnOnce() -> RewriteResult<R>,
    ) -> RewriteResult<R> {
        let table = Arc::new(HandleTable::new(Arc::clone(self.target.objects())));
        self.set_handles(Some(Arc::clone(&table)));
        let result = work();
        self.set_handles(None);

        let value = result?;
        let closed = table.flush_all().within(c)?;
        trace!(handles = closed, "phase complete");
        Ok(value)
    }

    fn set_handles(&self, table: Option<Arc<HandleTable>>) {
        *self.handles.write().unwrap_or_else(PoisonError::into_inner) = table;
    }
}
