//! Curator-facing write operations.

use capkit_core::{Document, DocumentStore, Result, StartupAiEvaluation, StoreConfig};
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, instrument};

#[derive(Clone)]
pub struct AdminActions {
    store: Arc<dyn DocumentStore>,
    layout: StoreConfig,
}

impl AdminActions {
    pub fn new(store: Arc<dyn DocumentStore>, layout: StoreConfig) -> Self {
        Self { store, layout }
    }

    /// Flips `isActive` on an existing user. Returns the new value.
    #[instrument(skip(self))]
    pub async fn toggle_user_access(&self, user_id: &str, current: bool) -> Result<bool> {
        let next = !current;
        self.store
            .update_field(
                &self.layout.users_collection,
                user_id,
                single_field("isActive", Value::Bool(next)),
            )
            .await?;
        info!("User {} active: {}", user_id, next);
        Ok(next)
    }

    /// Flips `isFavorite` on the admin record, creating it when missing.
    /// Returns the new value.
    #[instrument(skip(self))]
    pub async fn toggle_startup_favorite(&self, startup_id: &str, current: bool) -> Result<bool> {
        let next = !current;
        self.store
            .set_document(
                &self.layout.admin_collection,
                startup_id,
                single_field("isFavorite", Value::Bool(next)),
                true,
            )
            .await?;
        info!("Startup {} favorite: {}", startup_id, next);
        Ok(next)
    }

    /// Stores an evaluation on the admin record, leaving other fields intact.
    pub async fn record_ai_evaluation(
        &self,
        startup_id: &str,
        evaluation: &StartupAiEvaluation,
    ) -> Result<()> {
        let value = serde_json::to_value(evaluation)?;
        self.store
            .set_document(
                &self.layout.admin_collection,
                startup_id,
                single_field("aiEvaluation", value),
                true,
            )
            .await
    }
}

fn single_field(key: &str, value: Value) -> Document {
    let mut patch = Document::new();
    patch.insert(key.to_string(), value);
    patch
}
