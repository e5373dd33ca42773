use std::collections::{BTreeMap, HashMap};
use std::sync::{PoisonError, RwLock};

use graft_types::ObjectId;

use crate::error::{RewriteError, RewriteResult};

/// Old commit id to new commit id. Each key is written at most once.
#[derive(Debug, Default)]
pub struct CommitMapping {
    map: RwLock<HashMap<ObjectId, ObjectId>>,
}

impl CommitMapping {
    /// An empty mapping.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `old` was rewritten to `new`.
    pub fn insert(&self, old: ObjectId, new: ObjectId) -> RewriteResult<()> {
        let mut map = self.map.write().unwrap_or_else(PoisonError::into_inner);
        if map.contains_key(&old) {
            return Err(RewriteError::AlreadyMapped(old));
        }
        map.insert(old, new);
        Ok(())
    }

    /// New id of a rewritten commit.
    pub fn get(&self, old: &ObjectId) -> Option<ObjectId> {
        self.map
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(old)
            .copied()
    }

    /// Returns `true` once `old` has been rewritten.
    pub fn contains(&self, old: &ObjectId) -> bool {
        self.get(old).is_some()
    }

    /// Number of rewritten commits.
    pub fn len(&self) -> usize {
        self.map.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// An ordered copy of every mapping.
    pub fn snapshot(&self) -> BTreeMap<ObjectId, ObjectId> {
        self.map
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(k, v)| (*k, *v))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn oid(b: u8) -> ObjectId {
        ObjectId::from_hash([b; 32])
    }

    #[test]
    fn insert_once() {
        let mapping = CommitMapping::new();
        mapping.insert(oid(1), oid(11)).unwrap();
        assert_eq!(mapping.get(&oid(1)), Some(oid(11)));
        assert!(!mapping.contains(&oid(2)));

        let err = mapping.insert(oid(1), oid(12)).unwrap_err();
        assert!(matches!(err, RewriteError::AlreadyMapped(id) if id == oid(1)));
        assert_eq!(mapping.get(&oid(1)), Some(oid(11)));
    }

    #[test]
    fn snapshot_is_ordered() {
        let mapping = CommitMapping::new();
        mapping.insert(oid(3), oid(30)).unwrap();
        mapping.insert(oid(1), oid(10)).unwrap();
        let keys: Vec<_> = mapping.snapshot().into_keys().collect();
        assert_eq!(keys, vec![oid(1), oid(3)]);
        assert_eq!(mapping.len(), 2);
    }
}
