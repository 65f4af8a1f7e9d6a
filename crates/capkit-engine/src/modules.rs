//! Workspace modules and the shared existence probe used by aggregation and
//! scanning.

use capkit_core::{CapkitError, Document, DocumentStore, Result, StoreConfig};
use futures::future::try_join_all;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A named sub-document under a user's workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum WorkspaceModule {
    Canvas,
    Copywriting,
    Economics,
    Grow,
    MarketResearch,
    Personas,
    ProductDesign,
    Sales,
    Team,
    Mindset,
}

impl WorkspaceModule {
    /// Document id of the module inside the modules sub-collection.
    pub fn doc_id(&self) -> &'static str {
        match self {
            WorkspaceModule::Canvas => "canvas",
            WorkspaceModule::Copywriting => "copywriting",
            WorkspaceModule::Economics => "economics",
            WorkspaceModule::Grow => "grow",
            WorkspaceModule::MarketResearch => "marketResearch",
            WorkspaceModule::Personas => "personas",
            WorkspaceModule::ProductDesign => "productDesign",
            WorkspaceModule::Sales => "sales",
            WorkspaceModule::Team => "team",
            WorkspaceModule::Mindset => "mindset",
        }
    }
}

impl fmt::Display for WorkspaceModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.doc_id())
    }
}

/// How the modules of one user are fetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeOrder {
    /// One read at a time; bounds the load a single user puts on the store.
    Sequential,
    /// All reads in flight at once.
    Concurrent,
}

/// Outcome of probing one module for one user.
#[derive(Debug, Clone, PartialEq)]
pub struct ModuleProbe {
    pub module: WorkspaceModule,
    pub document: Option<Document>,
}

impl ModuleProbe {
    pub fn exists(&self) -> bool {
        self.document.is_some()
    }
}

/// An ordered list of modules probed together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleSet {
    modules: Vec<WorkspaceModule>,
}

impl ModuleSet {
    pub fn new(modules: impl Into<Vec<WorkspaceModule>>) -> Self {
        Self {
            modules: modules.into(),
        }
    }

    /// Blocks joined into a startup profile.
    pub fn profile_blocks() -> Self {
        Self::new([
            WorkspaceModule::Canvas,
            WorkspaceModule::Team,
            WorkspaceModule::Mindset,
        ])
    }

    /// Secondary modules reported as progress flags on a profile.
    pub fn progress() -> Self {
        Self::new([
            WorkspaceModule::Economics,
            WorkspaceModule::ProductDesign,
            WorkspaceModule::Sales,
            WorkspaceModule::Grow,
        ])
    }

    /// Every module tracked by the fleet scan, in report order.
    pub fn program() -> Self {
        Self::new([
            WorkspaceModule::Canvas,
            WorkspaceModule::Copywriting,
            WorkspaceModule::Economics,
            WorkspaceModule::Grow,
            WorkspaceModule::MarketResearch,
            WorkspaceModule::Personas,
            WorkspaceModule::ProductDesign,
            WorkspaceModule::Sales,
            WorkspaceModule::Team,
            WorkspaceModule::Mindset,
        ])
    }

    pub fn modules(&self) -> &[WorkspaceModule] {
        &self.modules
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Reads every module of the set for `user_id`. Results come back in set
    /// order; the first store error aborts the probe.
    pub async fn probe(
        &self,
        store: &dyn DocumentStore,
        layout: &StoreConfig,
        user_id: &str,
        order: ProbeOrder,
    ) -> Result<Vec<ModuleProbe>> {
        match order {
            ProbeOrder::Sequential => {
                let mut probes = Vec::with_capacity(self.modules.len());
                for module in &self.modules {
                    probes.push(probe_one(store, layout, user_id, *module).await?);
                }
                Ok(probes)
            }
            ProbeOrder::Concurrent => {
                try_join_all(
                    self.modules
                        .iter()
                        .map(|module| probe_one(store, layout, user_id, *module)),
                )
                .await
            }
        }
    }

    /// Checks which modules of the set exist for `user_id` without reading
    /// their contents. Returns `(module, exists)` in set order.
    pub async fn presence(
        &self,
        store: &dyn DocumentStore,
        layout: &StoreConfig,
        user_id: &str,
    ) -> Result<Vec<(WorkspaceModule, bool)>> {
        try_join_all(self.modules.iter().map(|module| async move {
            let exists = store
                .sub_document_exists(
                    &layout.workspaces_collection,
                    user_id,
                    &layout.modules_subcollection,
                    module.doc_id(),
                )
                .await?;
            Ok::<_, CapkitError>((*module, exists))
        }))
        .await
    }
}

async fn probe_one(
    store: &dyn DocumentStore,
    layout: &StoreConfig,
    user_id: &str,
    module: WorkspaceModule,
) -> Result<ModuleProbe> {
    let document = store
        .get_sub_document(
            &layout.workspaces_collection,
            user_id,
            &layout.modules_subcollection,
            module.doc_id(),
        )
        .await?;
    Ok(ModuleProbe { module, document })
}
