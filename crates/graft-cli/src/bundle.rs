//! Repository bundles: a whole repository in one JSON file.
//!
//! ```json
//! {
//!   "objects": [{ "id": "<hex>", "kind": "Blob", "data": "<hex>" }],
//!   "refs": { "HEAD": "ref: refs/heads/main", "refs/heads/main": "<hex>" }
//! }
//! ```
//!
//! Object ids are recomputed on load. An `id` field, when present, must
//! match.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context as _};
use graft_refs::{InMemoryRefStore, Ref};
use graft_rewrite::Repository;
use graft_store::{InMemoryObjectStore, ObjectKind, ObjectStore, StoreError, StoredObject};
use graft_types::ObjectId;
use serde::{Deserialize, Serialize};
use tracing::debug;

const SYMBOLIC_PREFIX: &str = "ref: ";

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Bundle {
    #[serde(default)]
    pub objects: Vec<BundleObject>,
    #[serde(default)]
    pub refs: BTreeMap<String, String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BundleObject {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub kind: ObjectKind,
    pub data: String,
}

/// A repository loaded from a bundle, with its concrete stores kept so it
/// can be saved again.
pub struct LoadedRepository {
    pub repo: Repository,
    pub store: InMemoryObjectStore,
    pub refs: Arc<InMemoryRefStore>,
}

impl LoadedRepository {
    pub fn empty() -> Self {
        let store = InMemoryObjectStore::new();
        let refs = Arc::new(InMemoryRefStore::new());
        let repo = Repository::new(Arc::new(store.clone()), refs.clone());
        Self { repo, store, refs }
    }

    fn insert(&self, object: &BundleObject) -> anyhow::Result<ObjectId> {
        let data = hex::decode(&object.data).context("object data is not hex")?;
        let stored = StoredObject::new(object.kind, data);
        let computed = stored.compute_id();
        if let Some(expected) = &object.id {
            let expected = ObjectId::from_hex(expected)?;
            if expected != computed {
                return Err(StoreError::HashMismatch { expected, computed }.into());
            }
        }
        Ok(self.store.write(&stored)?)
    }

    pub fn from_bundle(bundle: &Bundle) -> anyhow::Result<Self> {
        let loaded = Self::empty();
        for object in &bundle.objects {
            loaded.insert(object)?;
        }
        for (name, value) in &bundle.refs {
            let reference = parse_ref(value).with_context(|| format!("ref {name}"))?;
            loaded.repo.set_ref(name, reference)?;
        }
        debug!(objects = loaded.store.len(), refs = bundle.refs.len(), "loaded bundle");
        Ok(loaded)
    }

    pub fn to_bundle(&self) -> anyhow::Result<Bundle> {
        let mut objects = Vec::new();
        for id in self.store.all_ids() {
            let object = self.store.read_existing(&id)?;
            objects.push(BundleObject {
                id: Some(id.to_hex()),
                kind: object.kind,
                data: hex::encode(&object.data),
            });
        }
        let refs = self
            .repo
            .list_refs()?
            .into_iter()
            .map(|(name, reference)| (name, format_ref(&reference)))
            .collect();
        Ok(Bundle { objects, refs })
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let bundle: Bundle = serde_json::from_str(&text)
            .with_context(|| format!("parsing {}", path.display()))?;
        Self::from_bundle(&bundle).with_context(|| format!("loading {}", path.display()))
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let text = serde_json::to_string_pretty(&self.to_bundle()?)?;
        std::fs::write(path, text).with_context(|| format!("writing {}", path.display()))?;
        Ok(())
    }
}

fn parse_ref(value: &str) -> anyhow::Result<Ref> {
    if let Some(target) = value.strip_prefix(SYMBOLIC_PREFIX) {
        let target = target.trim();
        if target.is_empty() {
            bail!("symbolic ref has no target");
        }
        return Ok(Ref::Symbolic(target.to_owned()));
    }
    Ok(Ref::Direct(ObjectId::from_hex(value.trim())?))
}

fn format_ref(reference: &Ref) -> String {
    match reference {
        Ref::Direct(id) => id.to_hex(),
        Ref::Symbolic(target) => format!("{SYMBOLIC_PREFIX}{target}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use graft_refs::RefStore;
    use graft_store::{Blob, Tree, TreeEntry, EntryMode};

    fn sample() -> LoadedRepository {
        let loaded = LoadedRepository::empty();
        let blob = loaded.repo.write_blob(b"hello").unwrap();
        let tree = loaded
            .repo
            .write_tree(vec![TreeEntry::new(EntryMode::Regular, "hello.txt", blob)])
            .unwrap();
        loaded.repo.set_ref("refs/heads/main", Ref::Direct(tree)).unwrap();
        loaded
            .repo
            .set_ref("HEAD", Ref::Symbolic("refs/heads/main".into()))
            .unwrap();
        loaded
    }

    #[test]
    fn save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("repo.json");
        let original = sample();
        original.save(&path).unwrap();

        let loaded = LoadedRepository::load(&path).unwrap();
        assert_eq!(loaded.store.all_ids(), original.store.all_ids());
        assert_eq!(loaded.repo.list_refs().unwrap(), original.repo.list_refs().unwrap());
        assert_eq!(
            loaded.refs.read_ref("HEAD").unwrap(),
            Some(Ref::Symbolic("refs/heads/main".into()))
        );
    }

    #[test]
    fn ids_are_optional_but_checked() {
        let blob = Blob::new(b"x".to_vec()).to_stored_object();
        let mut bundle = Bundle {
            objects: vec![BundleObject {
                id: None,
                kind: ObjectKind::Blob,
                data: hex::encode(&blob.data),
            }],
            refs: BTreeMap::new(),
        };
        let loaded = LoadedRepository::from_bundle(&bundle).unwrap();
        assert!(loaded.store.exists(&blob.compute_id()).unwrap());

        let tree_id = Tree::empty().to_stored_object().unwrap().compute_id();
        bundle.objects[0].id = Some(tree_id.to_hex());
        let err = LoadedRepository::from_bundle(&bundle).err().unwrap();
        assert!(err.downcast_ref::<StoreError>().is_some(), "{err:#}");
    }

    #[test]
    fn malformed_refs_are_rejected() {
        assert!(parse_ref("ref: ").is_err());
        assert!(parse_ref("not-hex").is_err());
        let id = ObjectId::from_bytes(b"x");
        assert_eq!(parse_ref(&format_ref(&Ref::Direct(id))).unwrap(), Ref::Direct(id));
    }

    #[test]
    fn missing_file_reports_path() {
        let err = LoadedRepository::load(Path::new("/nonexistent/graft.json"))
            .err()
            .unwrap();
        assert!(format!("{err:#}").contains("/nonexistent/graft.json"));
    }
}
