//! Parallel pre-pass that fills the entry cache.
//!
//! Tree rewriting depends only on tree content, never on ancestry, so every
//! commit's root tree can be rewritten in any order on any thread. The
//! pre-pass does exactly that. The sequential commit pass that follows then
//! finds every root tree already cached and only writes commits.
//!
//! Workers share the entry cache (sharded when the engine is concurrent)
//! and each writes through its own handle. All handles are flushed before
//! the pre-pass returns.

use graft_dag::CommitGraph;
use rayon::prelude::*;
use rayon::ThreadPoolBuilder;
use tracing::{debug, info};

use crate::context::{Context, Key};
use crate::error::{RewriteError, RewriteResult};
use crate::policy::RewritePolicy;
use crate::rewriter::RepositoryRewriter;

impl<P: RewritePolicy> RepositoryRewriter<P> {
    /// Rewrite the root tree of every commit in `graph` on a worker pool.
    ///
    /// Fails on the first task error; objects written by the pre-pass are
    /// then discarded.
    pub fn prewarm(&self, graph: &CommitGraph, c: &Context) -> RewriteResult<()> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(self.config.threads)
            .thread_name(|i| format!("graft-prewarm-{i}"))
            .build()
            .map_err(|e| RewriteError::Pool(e.to_string()))?;
        let commits = graph.commits();
        info!(
            commits = commits.len(),
            threads = pool.current_num_threads(),
            "prewarming entry cache"
        );

        self.in_phase(c, || {
            pool.install(|| {
                commits.par_iter().try_for_each(|node| {
                    let uc = c.with(Key::Commit, node.id.short_hex());
                    self.rewrite_root_tree(node.tree, &uc).map(drop)
                })
            })
        })?;
        debug!(entries = self.entry_cache.len(), "prewarm finished");
        Ok(())
    }
}
