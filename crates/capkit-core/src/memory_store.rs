use crate::document::merge_documents;
use crate::{CapkitError, Document, DocumentStore, Result, StoredDocument};
use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{debug, info};

type Collection = BTreeMap<String, Document>;

/// In-process document store keyed by collection path.
///
/// Sub-collections are addressed as `parent/parent_id/sub`, matching the
/// layout of the hosted store. Snapshots use the same paths as top-level keys:
///
/// ```json
/// {
///   "users": { "u1": { "role": "startup" } },
///   "workspaces/u1/modules": { "canvas": { "Problem": "..." } }
/// }
/// ```
///
/// Paths registered through [`InMemoryDocumentStore::fail_on`] return a store
/// error on every access, which lets tests exercise partial outages.
#[derive(Default)]
pub struct InMemoryDocumentStore {
    collections: RwLock<BTreeMap<String, Collection>>,
    faults: RwLock<HashSet<String>>,
    reads: AtomicUsize,
}

pub fn sub_collection_path(
    parent_collection: &str,
    parent_id: &str,
    sub_collection: &str,
) -> String {
    format!("{}/{}/{}", parent_collection, parent_id, sub_collection)
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, collection: &str, id: &str, data: Document) {
        self.collections
            .write()
            .entry(collection.to_string())
            .or_default()
            .insert(id.to_string(), data);
    }

    pub fn insert_sub(
        &self,
        parent_collection: &str,
        parent_id: &str,
        sub_collection: &str,
        id: &str,
        data: Document,
    ) {
        let path = sub_collection_path(parent_collection, parent_id, sub_collection);
        self.insert(&path, id, data);
    }

    /// Makes every access to `path` fail. `path` is either a collection path
    /// or a full document path (`collection/id`).
    pub fn fail_on(&self, path: impl Into<String>) {
        self.faults.write().insert(path.into());
    }

    pub fn clear_faults(&self) {
        self.faults.write().clear();
    }

    /// Number of read calls served so far.
    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::Relaxed)
    }

    pub fn from_snapshot(snapshot: Value) -> Result<Self> {
        let Value::Object(collections) = snapshot else {
            return Err(CapkitError::Decode(
                "snapshot root must be an object of collections".to_string(),
            ));
        };

        let store = Self::new();
        for (path, docs) in collections {
            let Value::Object(docs) = docs else {
                return Err(CapkitError::Decode(format!(
                    "collection {} must be an object of documents",
                    path
                )));
            };
            for (id, doc) in docs {
                match doc {
                    Value::Object(data) => store.insert(&path, &id, data),
                    _ => {
                        return Err(CapkitError::Decode(format!(
                            "document {}/{} is not an object",
                            path, id
                        )))
                    }
                }
            }
        }
        Ok(store)
    }

    pub fn load_snapshot(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let snapshot: Value = serde_json::from_str(&content)?;
        let store = Self::from_snapshot(snapshot)?;
        info!(
            "Loaded snapshot {} ({} collections)",
            path.display(),
            store.collections.read().len()
        );
        Ok(store)
    }

    pub fn to_snapshot(&self) -> Value {
        let collections = self.collections.read();
        let root = collections
            .iter()
            .map(|(path, docs)| {
                let docs = docs
                    .iter()
                    .map(|(id, data)| (id.clone(), Value::Object(data.clone())))
                    .collect::<serde_json::Map<_, _>>();
                (path.clone(), Value::Object(docs))
            })
            .collect::<serde_json::Map<_, _>>();
        Value::Object(root)
    }

    pub fn save_snapshot(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(&self.to_snapshot())?;
        std::fs::write(path, content)?;
        Ok(())
    }

    fn check_fault(&self, collection: &str, id: Option<&str>) -> Result<()> {
        let faults = self.faults.read();
        if faults.contains(collection) {
            return Err(CapkitError::Store(format!("collection {} unavailable", collection)));
        }
        if let Some(id) = id {
            let doc_path = format!("{}/{}", collection, id);
            if faults.contains(&doc_path) {
                return Err(CapkitError::Store(format!("document {} unavailable", doc_path)));
            }
        }
        Ok(())
    }

    fn read(&self, collection: &str, id: &str) -> Result<Option<Document>> {
        self.reads.fetch_add(1, Ordering::Relaxed);
        self.check_fault(collection, Some(id))?;
        Ok(self
            .collections
            .read()
            .get(collection)
            .and_then(|docs| docs.get(id))
            .cloned())
    }

    fn contains(&self, collection: &str, id: &str) -> Result<bool> {
        self.reads.fetch_add(1, Ordering::Relaxed);
        self.check_fault(collection, Some(id))?;
        Ok(self
            .collections
            .read()
            .get(collection)
            .is_some_and(|docs| docs.contains_key(id)))
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn get_document(&self, collection: &str, id: &str) -> Result<Option<Document>> {
        self.read(collection, id)
    }

    async fn list_documents(&self, collection: &str) -> Result<Vec<StoredDocument>> {
        self.reads.fetch_add(1, Ordering::Relaxed);
        self.check_fault(collection, None)?;
        Ok(self
            .collections
            .read()
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .map(|(id, data)| StoredDocument::new(id.clone(), data.clone()))
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn get_sub_document(
        &self,
        parent_collection: &str,
        parent_id: &str,
        sub_collection: &str,
        id: &str,
    ) -> Result<Option<Document>> {
        let path = sub_collection_path(parent_collection, parent_id, sub_collection);
        self.read(&path, id)
    }

    async fn sub_document_exists(
        &self,
        parent_collection: &str,
        parent_id: &str,
        sub_collection: &str,
        id: &str,
    ) -> Result<bool> {
        let path = sub_collection_path(parent_collection, parent_id, sub_collection);
        self.contains(&path, id)
    }

    async fn set_document(
        &self,
        collection: &str,
        id: &str,
        patch: Document,
        merge: bool,
    ) -> Result<()> {
        self.check_fault(collection, Some(id))?;
        let mut collections = self.collections.write();
        let docs = collections.entry(collection.to_string()).or_default();
        match docs.get_mut(id) {
            Some(existing) if merge => merge_documents(existing, patch),
            _ => {
                docs.insert(id.to_string(), patch);
            }
        }
        debug!("set {}/{} (merge: {})", collection, id, merge);
        Ok(())
    }

    async fn update_field(&self, collection: &str, id: &str, patch: Document) -> Result<()> {
        self.check_fault(collection, Some(id))?;
        let mut collections = self.collections.write();
        let existing = collections
            .get_mut(collection)
            .and_then(|docs| docs.get_mut(id))
            .ok_or_else(|| CapkitError::DocumentNotFound(format!("{}/{}", collection, id)))?;
        for (key, value) in patch {
            existing.insert(key, value);
        }
        debug!("updated {}/{}", collection, id);
        Ok(())
    }
}
