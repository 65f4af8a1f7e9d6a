//! Joins identity, workspace and admin documents into startup profiles.

use crate::fanout::fan_out;
use crate::modules::{ModuleProbe, ModuleSet, ProbeOrder, WorkspaceModule};
use crate::name::extract_venture_name;
use crate::readiness::compute_readiness;
use capkit_core::canvas_field::*;
use capkit_core::{
    AdminMetadata, CanvasData, DocumentStore, MindsetData, ProfileReport, Result, StartupProfile,
    StoreConfig, TeamData, UserProfile,
};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

pub const FOUNDER_BIO_PLACEHOLDER: &str = "Profile not yet enriched.";
pub const STRUCTURED_REPORT_PLACEHOLDER: &str = "Structured founder profile available.";

/// Profiles produced by one aggregation, plus users dropped because their
/// documents could not be read.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AggregateOutcome {
    pub profiles: Vec<StartupProfile>,
    pub skipped_users: usize,
}

pub struct ProfileAggregator {
    store: Arc<dyn DocumentStore>,
    layout: StoreConfig,
    max_concurrent: usize,
}

impl ProfileAggregator {
    pub fn new(store: Arc<dyn DocumentStore>, layout: StoreConfig, max_concurrent: usize) -> Self {
        Self {
            store,
            layout,
            max_concurrent: max_concurrent.max(1),
        }
    }

    /// Aggregates every startup. Store failures yield an empty list.
    pub async fn aggregate(&self) -> Vec<StartupProfile> {
        match self.try_aggregate().await {
            Ok(outcome) => outcome.profiles,
            Err(e) => {
                error!("Error aggregating startups: {}", e);
                Vec::new()
            }
        }
    }

    /// Aggregates every startup. Only a failure to list users is returned as
    /// an error; users whose own documents fail are skipped and counted.
    #[instrument(skip(self), fields(users_collection = %self.layout.users_collection))]
    pub async fn try_aggregate(&self) -> Result<AggregateOutcome> {
        let users = self
            .store
            .list_documents(&self.layout.users_collection)
            .await?;
        let total = users.len();

        let results = fan_out(users, self.max_concurrent, |stored| async move {
            let outcome = match UserProfile::from_stored(&stored) {
                Ok(user) => self.build_profile(&user).await,
                Err(e) => Err(e),
            };
            (stored.id, outcome)
        })
        .await;

        let mut outcome = AggregateOutcome::default();
        for (user_id, result) in results {
            match result {
                Ok(Some(profile)) => outcome.profiles.push(profile),
                Ok(None) => {}
                Err(e) => {
                    warn!(user = %user_id, "Skipping user: {}", e);
                    outcome.skipped_users += 1;
                }
            }
        }

        info!(
            "Aggregated {} startups from {} users ({} skipped)",
            outcome.profiles.len(),
            total,
            outcome.skipped_users
        );
        Ok(outcome)
    }

    /// Builds the profile of one user, or `None` when the user is neither a
    /// startup nor has a canvas.
    pub async fn build_profile(&self, user: &UserProfile) -> Result<Option<StartupProfile>> {
        let store = self.store.as_ref();

        let blocks = ModuleSet::profile_blocks()
            .probe(store, &self.layout, &user.id, ProbeOrder::Concurrent)
            .await?;
        let canvas = block(&blocks, WorkspaceModule::Canvas).map(CanvasData::new);
        let team = block(&blocks, WorkspaceModule::Team).map(TeamData::new);
        let mindset = block(&blocks, WorkspaceModule::Mindset).map(MindsetData::new);

        if canvas.is_none() && !user.is_startup() {
            debug!(user = %user.id, "Excluding user without canvas or startup role");
            return Ok(None);
        }

        let progress_set = ModuleSet::progress();
        let (progress, admin) = futures::try_join!(
            progress_set.presence(store, &self.layout, &user.id),
            self.admin_metadata(&user.id)
        )?;

        let mut module_progress: BTreeMap<String, bool> = progress
            .into_iter()
            .map(|(module, exists)| (module.doc_id().to_string(), exists))
            .collect();
        for probe in blocks.iter().filter(|probe| probe.exists()) {
            module_progress.insert(probe.module.doc_id().to_string(), true);
        }

        Ok(Some(assemble_profile(
            user,
            canvas,
            team,
            mindset,
            admin,
            module_progress,
        )))
    }

    async fn admin_metadata(&self, user_id: &str) -> Result<AdminMetadata> {
        match self
            .store
            .get_document(&self.layout.admin_collection, user_id)
            .await?
        {
            Some(doc) => AdminMetadata::from_document(user_id, doc),
            None => Ok(AdminMetadata::default()),
        }
    }
}

fn block(probes: &[ModuleProbe], module: WorkspaceModule) -> Option<capkit_core::Document> {
    probes
        .iter()
        .find(|probe| probe.module == module)
        .and_then(|probe| probe.document.clone())
}

/// Pure join of the fetched documents into the display profile.
pub fn assemble_profile(
    user: &UserProfile,
    canvas: Option<CanvasData>,
    team: Option<TeamData>,
    mindset: Option<MindsetData>,
    admin: AdminMetadata,
    module_progress: BTreeMap<String, bool>,
) -> StartupProfile {
    let c = canvas.as_ref();
    let canvas_text = |field: &str| c.and_then(|c| c.text(field));

    let full_description = match canvas_text(SOLUTION) {
        Some(solution) => format!(
            "Problem: {}\n\nSolution: {}",
            canvas_text(PROBLEM).unwrap_or("N/A"),
            solution
        ),
        None => canvas_text(PRODUCT_DETAIL)
            .unwrap_or("No detailed canvas data available.")
            .to_string(),
    };

    let short_description = canvas_text(UNIQUE_VALUE_PROPOSITION)
        .or_else(|| canvas_text(PROJECT_OVERVIEW))
        .unwrap_or("No Value Proposition defined yet.")
        .to_string();

    let business_model = canvas_text(BUSINESS_MODEL)
        .or_else(|| canvas_text(PRICING))
        .or_else(|| canvas_text(UNIT_ECONOMICS))
        .unwrap_or("Revenue streams not defined.")
        .to_string();

    let traction = canvas_text(NORTH_STAR_METRIC)
        .or_else(|| canvas_text(PRODUCT_MARKET_FIT))
        .unwrap_or("Key metrics not tracked.")
        .to_string();

    let name = extract_venture_name(c, user.name());
    let readiness_score = compute_readiness(c, team.as_ref(), mindset.as_ref());
    let founder_bio = derive_founder_bio(mindset.as_ref(), team.as_ref(), &admin);

    StartupProfile {
        id: user.id.clone(),
        name,
        founder_name: user.name().unwrap_or("Unknown Founder").to_string(),
        founder_bio,
        short_description,
        full_description,
        stage: non_empty(admin.stage).unwrap_or_else(|| "Idea".to_string()),
        sector: non_empty(admin.sector).unwrap_or_else(|| "General".to_string()),
        business_model,
        traction,
        readiness_score,
        is_favorite: admin.is_favorite,
        ask_amount: admin.ask_amount.unwrap_or(0.0),
        ai_evaluation: admin.ai_evaluation,
        canvas,
        team,
        mindset,
        module_progress,
    }
}

/// Founder bio by priority: mindset report, team founder story, admin bio.
pub fn derive_founder_bio(
    mindset: Option<&MindsetData>,
    team: Option<&TeamData>,
    admin: &AdminMetadata,
) -> String {
    if let Some(report) = mindset.and_then(MindsetData::profile_report) {
        return match report {
            ProfileReport::Text(text) => text,
            ProfileReport::Structured(structured) => match structured.description {
                Some(description) => description,
                None => STRUCTURED_REPORT_PLACEHOLDER.to_string(),
            },
        };
    }

    if let Some(story) = team.and_then(|t| t.text(TeamData::FOUNDER_STORY)) {
        return story.to_string();
    }

    admin
        .founder_bio
        .as_deref()
        .filter(|bio| !bio.is_empty())
        .unwrap_or(FOUNDER_BIO_PLACEHOLDER)
        .to_string()
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn map(value: Value) -> capkit_core::Document {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    fn founder(name: Option<&str>) -> UserProfile {
        UserProfile {
            id: "u2".to_string(),
            email: "founder@techflow.com".to_string(),
            display_name: name.map(str::to_string),
            photo_url: None,
            role: Some(capkit_core::UserRole::Startup),
            is_active: true,
            created_at: None,
            last_login: None,
        }
    }

    #[test]
    fn test_bio_prefers_text_report() {
        let mindset = MindsetData::new(map(json!({"profileReport": "Relentless operator"})));
        let team = TeamData::new(map(json!({"Founder Story": "Grew up on a farm"})));
        let bio = derive_founder_bio(Some(&mindset), Some(&team), &AdminMetadata::default());
        assert_eq!(bio, "Relentless operator");
    }

    #[test]
    fn test_bio_uses_structured_description_or_placeholder() {
        let with_description = MindsetData::new(map(json!({
            "profileReport": {"title": "The Builder", "description": "Ships weekly"}
        })));
        assert_eq!(
            derive_founder_bio(Some(&with_description), None, &AdminMetadata::default()),
            "Ships weekly"
        );

        let without_description =
            MindsetData::new(map(json!({"profileReport": {"title": "The Builder"}})));
        assert_eq!(
            derive_founder_bio(Some(&without_description), None, &AdminMetadata::default()),
            STRUCTURED_REPORT_PLACEHOLDER
        );
    }

    #[test]
    fn test_bio_falls_back_through_team_and_admin() {
        let empty_mindset = MindsetData::new(map(json!({"profileReport": ""})));
        let team = TeamData::new(map(json!({"Founder Story": "Grew up on a farm"})));
        assert_eq!(
            derive_founder_bio(Some(&empty_mindset), Some(&team), &AdminMetadata::default()),
            "Grew up on a farm"
        );

        let admin = AdminMetadata {
            founder_bio: Some("Ex-Stripe engineer".to_string()),
            ..AdminMetadata::default()
        };
        assert_eq!(derive_founder_bio(None, None, &admin), "Ex-Stripe engineer");
        assert_eq!(
            derive_founder_bio(None, None, &AdminMetadata::default()),
            FOUNDER_BIO_PLACEHOLDER
        );
    }

    #[test]
    fn test_assemble_without_canvas_uses_defaults() {
        let profile = assemble_profile(
            &founder(Some("Sarah Chen")),
            None,
            None,
            None,
            AdminMetadata::default(),
            BTreeMap::new(),
        );
        assert_eq!(profile.name, "Sarah Chen's Venture");
        assert_eq!(profile.founder_name, "Sarah Chen");
        assert_eq!(profile.readiness_score, 0);
        assert_eq!(profile.stage, "Idea");
        assert_eq!(profile.sector, "General");
        assert_eq!(profile.short_description, "No Value Proposition defined yet.");
        assert_eq!(profile.full_description, "No detailed canvas data available.");
        assert_eq!(profile.business_model, "Revenue streams not defined.");
        assert_eq!(profile.traction, "Key metrics not tracked.");
        assert_eq!(profile.ask_amount, 0.0);
        assert!(!profile.is_favorite);
    }

    #[test]
    fn test_assemble_joins_canvas_and_admin_fields() {
        let canvas = CanvasData::new(map(json!({
            "Solution": "Satellite crop monitoring",
            "Unique Value Proposition": "Predict crop disease early",
            "Pricing": "$50/acre/year",
            "Product - Market Fit": "5 pilot farms",
        })));
        let admin = AdminMetadata {
            stage: Some("Seed".to_string()),
            sector: Some(String::new()),
            is_favorite: true,
            ask_amount: Some(1_500_000.0),
            ..AdminMetadata::default()
        };

        let profile = assemble_profile(
            &founder(None),
            Some(canvas),
            None,
            None,
            admin,
            BTreeMap::from([("canvas".to_string(), true)]),
        );

        assert_eq!(profile.name, "Predict crop disease early");
        assert_eq!(profile.founder_name, "Unknown Founder");
        assert_eq!(
            profile.full_description,
            "Problem: N/A\n\nSolution: Satellite crop monitoring"
        );
        assert_eq!(profile.business_model, "$50/acre/year");
        assert_eq!(profile.traction, "5 pilot farms");
        assert_eq!(profile.stage, "Seed");
        assert_eq!(profile.sector, "General");
        assert_eq!(profile.readiness_score, 25);
        assert!(profile.is_favorite);
        assert_eq!(profile.ask_amount, 1_500_000.0);
    }
}
