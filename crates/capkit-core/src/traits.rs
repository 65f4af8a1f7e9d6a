use crate::{Document, Result, StoredDocument};
use async_trait::async_trait;

/// Backend-agnostic access to the multi-tenant document store.
///
/// Absence is never an error: `get_*` return `Ok(None)` for missing records.
/// Any `Err` is a transport or backend fault for that single call.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get_document(&self, collection: &str, id: &str) -> Result<Option<Document>>;

    async fn list_documents(&self, collection: &str) -> Result<Vec<StoredDocument>>;

    /// Reads `parent_collection/parent_id/sub_collection/id`.
    async fn get_sub_document(
        &self,
        parent_collection: &str,
        parent_id: &str,
        sub_collection: &str,
        id: &str,
    ) -> Result<Option<Document>>;

    /// Writes `patch`; with `merge` the patch is merged into any existing
    /// record, otherwise it replaces it.
    async fn set_document(
        &self,
        collection: &str,
        id: &str,
        patch: Document,
        merge: bool,
    ) -> Result<()>;

    /// Patches fields of an existing record. Fails when the record is missing.
    async fn update_field(&self, collection: &str, id: &str, patch: Document) -> Result<()>;

    async fn sub_document_exists(
        &self,
        parent_collection: &str,
        parent_id: &str,
        sub_collection: &str,
        id: &str,
    ) -> Result<bool> {
        Ok(self
            .get_sub_document(parent_collection, parent_id, sub_collection, id)
            .await?
            .is_some())
    }
}
