//! Cached AI due-diligence evaluations.

use crate::admin::AdminActions;
use async_trait::async_trait;
use capkit_core::{StartupAiEvaluation, StartupProfile};
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, error, instrument, warn};

/// Result type for evaluator calls
pub type EvaluationResult<T> = anyhow::Result<T>;

/// External service that scores a startup profile.
#[async_trait]
pub trait Evaluator: Send + Sync {
    async fn evaluate(&self, profile: &StartupProfile) -> EvaluationResult<StartupAiEvaluation>;

    fn name(&self) -> &str {
        "evaluator"
    }
}

/// Serves stored evaluations and refreshes them through an [`Evaluator`].
pub struct EvaluationCache {
    evaluator: Arc<dyn Evaluator>,
    admin: AdminActions,
}

impl EvaluationCache {
    pub fn new(evaluator: Arc<dyn Evaluator>, admin: AdminActions) -> Self {
        Self { evaluator, admin }
    }

    /// Returns the stored evaluation unless `refresh` is set or none exists.
    ///
    /// Fresh evaluations are stamped and written back to the admin record.
    /// When the evaluator fails the fallback evaluation is returned and
    /// nothing is stored.
    #[instrument(
        skip(self, profile),
        fields(startup = %profile.id, evaluator = self.evaluator.name())
    )]
    pub async fn evaluation_for(
        &self,
        profile: &StartupProfile,
        refresh: bool,
    ) -> StartupAiEvaluation {
        if !refresh {
            if let Some(cached) = &profile.ai_evaluation {
                debug!("Using cached evaluation");
                return cached.clone();
            }
        }

        let mut evaluation = match self.evaluator.evaluate(profile).await {
            Ok(evaluation) => evaluation,
            Err(e) => {
                error!("Evaluation failed: {:#}", e);
                return StartupAiEvaluation::fallback(Utc::now());
            }
        };
        evaluation.confidence_score = evaluation.confidence_score.min(100);
        evaluation.last_updated = Utc::now();

        if let Err(e) = self.admin.record_ai_evaluation(&profile.id, &evaluation).await {
            warn!("Could not store evaluation: {}", e);
        }
        evaluation
    }
}
