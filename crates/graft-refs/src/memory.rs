//! In-memory reference store.
//!
//! [`InMemoryRefStore`] stores all refs in a `BTreeMap` protected by a
//! `RwLock`, so listings come out sorted by name.

use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock};

use tracing::debug;

use crate::error::{RefError, Result};
use crate::names::validate_ref_name;
use crate::traits::RefStore;
use crate::types::Ref;

/// An in-memory implementation of [`RefStore`].
#[derive(Debug, Default)]
pub struct InMemoryRefStore {
    refs: RwLock<BTreeMap<String, Ref>>,
}

impl InMemoryRefStore {
    /// Create a new empty ref store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of refs currently stored.
    pub fn len(&self) -> usize {
        self.refs.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Returns `true` if no refs are stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn poisoned<T>(e: PoisonError<T>) -> RefError {
    RefError::Poisoned(e.to_string())
}

impl RefStore for InMemoryRefStore {
    fn read_ref(&self, name: &str) -> Result<Option<Ref>> {
        let refs = self.refs.read().map_err(poisoned)?;
        Ok(refs.get(name).cloned())
    }

    fn write_ref(&self, name: &str, reference: &Ref) -> Result<()> {
        validate_ref_name(name)?;
        if let Ref::Symbolic(target) = reference {
            validate_ref_name(target)?;
        }
        let mut refs = self.refs.write().map_err(poisoned)?;
        refs.insert(name.to_string(), reference.clone());
        debug!(name, value = %reference, "wrote ref");
        Ok(())
    }

    fn delete_ref(&self, name: &str) -> Result<bool> {
        let mut refs = self.refs.write().map_err(poisoned)?;
        Ok(refs.remove(name).is_some())
    }

    fn list_refs(&self, prefix: &str) -> Result<Vec<(String, Ref)>> {
        let refs = self.refs.read().map_err(poisoned)?;
        Ok(refs
            .iter()
            .filter(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }

    fn rename_ref(&self, from: &str, to: &str) -> Result<()> {
        validate_ref_name(to)?;
        let mut refs = self.refs.write().map_err(poisoned)?;
        if refs.contains_key(to) {
            return Err(RefError::AlreadyExists {
                name: to.to_string(),
            });
        }
        let reference = refs.remove(from).ok_or_else(|| RefError::NotFound {
            name: from.to_string(),
        })?;
        refs.insert(to.to_string(), reference);
        debug!(from, to, "renamed ref");
        Ok(())
    }
}
