//! Memo tables for entry and ref rewriting.
//!
//! Lookups are check-then-compute-then-store and deliberately not atomic:
//! two threads missing on the same key may both compute. This is safe because
//! every computation is a pure function of its key and object writes are
//! idempotent. Whichever result lands last wins, and they are identical.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Mutex, PoisonError};

use dashmap::DashMap;

use crate::entry::{Entry, EntrySet};
use crate::ref_entry::RefEntry;

enum Backing<K, V> {
    /// One lock around a plain map, for the sequential engine.
    Exclusive(Mutex<HashMap<K, V>>),
    /// Sharded map for the concurrent pre-pass.
    Concurrent(DashMap<K, V>),
}

/// A memo table from keys to rewrite results.
pub struct MemoCache<K, V> {
    backing: Backing<K, V>,
}

/// Entry cache: source entry to rewritten entry (or removal).
pub type EntryCache = MemoCache<Entry, EntrySet>;

/// Ref cache: source ref to rewritten ref (or removal).
pub type RefCache = MemoCache<RefEntry, RefEntry>;

impl<K, V> MemoCache<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    /// A cache for single-threaded use.
    pub fn exclusive() -> Self {
        Self {
            backing: Backing::Exclusive(Mutex::new(HashMap::new())),
        }
    }

    /// A cache safe for many threads reading and writing at once.
    pub fn concurrent() -> Self {
        Self {
            backing: Backing::Concurrent(DashMap::new()),
        }
    }

    /// Pick the backing for the engine's concurrency setting.
    pub fn for_concurrency(concurrent: bool) -> Self {
        if concurrent {
            Self::concurrent()
        } else {
            Self::exclusive()
        }
    }

    /// Returns `true` for the sharded backing.
    pub fn is_concurrent(&self) -> bool {
        matches!(self.backing, Backing::Concurrent(_))
    }

    /// Cached value for `key`, if any.
    pub fn get(&self, key: &K) -> Option<V> {
        match &self.backing {
            Backing::Exclusive(map) => map
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .get(key)
                .cloned(),
            Backing::Concurrent(map) => map.get(key).map(|v| v.value().clone()),
        }
    }

    /// Store `value` for `key`, replacing any earlier value.
    pub fn insert(&self, key: K, value: V) {
        match &self.backing {
            Backing::Exclusive(map) => {
                map.lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .insert(key, value);
            }
            Backing::Concurrent(map) => {
                map.insert(key, value);
            }
        }
    }

    /// Return the cached value for `key`, computing and storing it on a miss.
    ///
    /// No lock is held while `compute` runs, so it may recurse into this
    /// cache. Errors are returned without caching anything.
    pub fn get_or_compute<E>(
        &self,
        key: &K,
        compute: impl FnOnce() -> Result<V, E>,
    ) -> Result<V, E>
    where
        K: Clone,
    {
        if let Some(hit) = self.get(key) {
            return Ok(hit);
        }
        let value = compute()?;
        self.insert(key.clone(), value.clone());
        Ok(value)
    }

    /// Number of cached keys.
    pub fn len(&self) -> usize {
        match &self.backing {
            Backing::Exclusive(map) => map.lock().unwrap_or_else(PoisonError::into_inner).len(),
            Backing::Concurrent(map) => map.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<K, V> std::fmt::Debug for MemoCache<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoCache")
            .field("concurrent", &self.is_concurrent())
            .field("len", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Barrier};
    use std::thread;

    #[test]
    fn computes_once_per_key_sequentially() {
        for cache in [MemoCache::<u32, String>::exclusive(), MemoCache::concurrent()] {
            let calls = AtomicUsize::new(0);
            for _ in 0..3 {
                let v: Result<String, ()> = cache.get_or_compute(&7, || {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok("seven".to_owned())
                });
                assert_eq!(v.unwrap(), "seven");
            }
            assert_eq!(calls.load(Ordering::SeqCst), 1);
            assert_eq!(cache.len(), 1);
        }
    }

    #[test]
    fn errors_are_not_cached() {
        let cache = MemoCache::<u32, u32>::exclusive();
        let err: Result<u32, &str> = cache.get_or_compute(&1, || Err("boom"));
        assert_eq!(err, Err("boom"));
        assert!(cache.is_empty());
        let ok: Result<u32, &str> = cache.get_or_compute(&1, || Ok(2));
        assert_eq!(ok, Ok(2));
    }

    #[test]
    fn compute_may_recurse() {
        let cache = MemoCache::<u32, u64>::exclusive();
        fn fib(cache: &MemoCache<u32, u64>, n: u32) -> Result<u64, ()> {
            cache.get_or_compute(&n, || {
                if n < 2 {
                    Ok(u64::from(n))
                } else {
                    Ok(fib(cache, n - 1)? + fib(cache, n - 2)?)
                }
            })
        }
        assert_eq!(fib(&cache, 40), Ok(102_334_155));
        assert_eq!(cache.len(), 41);
    }

    #[test]
    fn overlapping_misses_converge() {
        for cache in [MemoCache::<u32, String>::concurrent(), MemoCache::exclusive()] {
            let cache = Arc::new(cache);
            // Both threads are inside `compute` for key 7 at the same time.
            let barrier = Arc::new(Barrier::new(2));
            let calls = Arc::new(AtomicUsize::new(0));
            let racers: Vec<_> = (0..2)
                .map(|_| {
                    let (cache, barrier, calls) = (cache.clone(), barrier.clone(), calls.clone());
                    thread::spawn(move || {
                        cache
                            .get_or_compute(&7, || {
                                calls.fetch_add(1, Ordering::SeqCst);
                                barrier.wait();
                                Ok::<_, ()>("seven".to_owned())
                            })
                            .unwrap()
                    })
                })
                .collect();
            let results: Vec<String> = racers
                .into_iter()
                .map(|h| h.join().expect("racer should not panic"))
                .collect();

            assert_eq!(calls.load(Ordering::SeqCst), 2);
            assert_eq!(results, vec!["seven", "seven"]);
            assert_eq!(cache.len(), 1);
            assert_eq!(cache.get(&7).as_deref(), Some("seven"));
        }
    }

    #[test]
    fn concurrent_racers_agree() {
        let cache = Arc::new(MemoCache::<u32, u32>::concurrent());
        assert!(cache.is_concurrent());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = Arc::clone(&cache);
                thread::spawn(move || {
                    (0..100u32)
                        .map(|k| cache.get_or_compute(&k, || Ok::<_, ()>(k * 2)).unwrap())
                        .sum::<u32>()
                })
            })
            .collect();
        for h in handles {
            assert_eq!(h.join().expect("thread should not panic"), 9900);
        }
        assert_eq!(cache.len(), 100);
    }
}
