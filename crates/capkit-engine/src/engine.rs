//! Entry point used by dashboards and the CLI.

use crate::admin::AdminActions;
use crate::aggregator::{AggregateOutcome, ProfileAggregator};
use crate::evaluation::{EvaluationCache, Evaluator};
use crate::scanner::FleetScanner;
use capkit_core::{
    CapkitConfig, CapkitError, DocumentStore, EngineConfig, ProgramStats, Result, StartupProfile,
};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::error;

pub struct InsightsEngine {
    config: EngineConfig,
    aggregator: ProfileAggregator,
    scanner: FleetScanner,
    admin: AdminActions,
}

impl InsightsEngine {
    pub fn new(store: Arc<dyn DocumentStore>, config: &CapkitConfig) -> Self {
        let layout = config.store.clone();
        let engine = config.engine.clone();
        Self {
            aggregator: ProfileAggregator::new(
                store.clone(),
                layout.clone(),
                engine.max_concurrent_users,
            ),
            scanner: FleetScanner::new(store.clone(), layout.clone(), engine.clone()),
            admin: AdminActions::new(store, layout),
            config: engine,
        }
    }

    /// All startup profiles; empty on failure or timeout.
    pub async fn aggregate_startups(&self) -> Vec<StartupProfile> {
        self.aggregate_with_report().await.profiles
    }

    /// Profiles plus the number of users skipped because of read failures.
    pub async fn aggregate_with_report(&self) -> AggregateOutcome {
        let result = with_deadline(self.config.request_timeout(), self.aggregator.try_aggregate());
        match result.await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!("Error aggregating startups: {}", e);
                AggregateOutcome::default()
            }
        }
    }

    /// Module completion statistics; [`ProgramStats::failed`] on failure or
    /// timeout.
    pub async fn scan_program(&self) -> ProgramStats {
        match with_deadline(self.config.request_timeout(), self.scanner.try_scan()).await {
            Ok(stats) => stats,
            Err(e) => {
                error!("Deep scan failed: {}", e);
                ProgramStats::failed()
            }
        }
    }

    pub fn admin(&self) -> &AdminActions {
        &self.admin
    }

    pub fn evaluation_cache(&self, evaluator: Arc<dyn Evaluator>) -> EvaluationCache {
        EvaluationCache::new(evaluator, self.admin.clone())
    }
}

/// Awaits `fut`, failing with [`CapkitError::Timeout`] once `deadline`
/// elapses. `None` waits indefinitely.
pub async fn with_deadline<T, F>(deadline: Option<Duration>, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match deadline {
        Some(limit) => tokio::time::timeout(limit, fut)
            .await
            .map_err(|_| CapkitError::Timeout(limit))?,
        None => fut.await,
    }
}
