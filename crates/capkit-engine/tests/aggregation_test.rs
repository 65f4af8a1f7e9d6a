mod common;

use capkit_core::{InMemoryDocumentStore, StartupProfile, StoreConfig};
use capkit_engine::{InsightsEngine, ProfileAggregator};
use common::{add_user, config, doc, seeded_store};
use serde_json::json;
use std::sync::Arc;

fn by_id(mut profiles: Vec<StartupProfile>) -> Vec<StartupProfile> {
    profiles.sort_by(|a, b| a.id.cmp(&b.id));
    profiles
}

/// Startups written by other clients: native timestamps, epoch millis,
/// null flags and a text ask amount.
fn loosely_typed_store() -> Arc<InMemoryDocumentStore> {
    let store = InMemoryDocumentStore::new();
    let users = [
        (
            "s1",
            json!({"role": "startup", "createdAt": {"seconds": 1_700_000_000, "nanoseconds": 0}}),
        ),
        ("s2", json!({"role": "startup", "createdAt": 1_700_000_000_000i64})),
        ("s3", json!({"role": "startup", "isActive": null})),
        (
            "s4",
            json!({"role": "startup", "lastLogin": {"_seconds": 1_700_000_000}, "isActive": "true"}),
        ),
    ];
    for (id, user) in users {
        store.insert("users", id, doc(user));
    }
    store.insert("startups", "s1", doc(json!({"isFavorite": null, "askAmount": "500000"})));
    Arc::new(store)
}

#[tokio::test]
async fn test_membership_follows_role_and_canvas() {
    let engine = InsightsEngine::new(seeded_store(), &config());
    let profiles = by_id(engine.aggregate_startups().await);

    let ids: Vec<&str> = profiles.iter().map(|p| p.id.as_str()).collect();
    // u1 is an admin without a canvas; u3 is a startup without one; u4 is an
    // investor who filled a canvas.
    assert_eq!(ids, vec!["u2", "u3", "u4"]);
}

#[tokio::test]
async fn test_full_profile_is_joined() {
    let engine = InsightsEngine::new(seeded_store(), &config());
    let profiles = by_id(engine.aggregate_startups().await);
    let sarah = &profiles[0];

    assert_eq!(sarah.name, "AgriSense AI");
    assert_eq!(sarah.founder_name, "Sarah Chen");
    assert_eq!(sarah.founder_bio, "Grew up on a family farm in Iowa.");
    assert_eq!(sarah.readiness_score, 95);
    assert_eq!(sarah.stage, "Seed");
    assert_eq!(sarah.sector, "AgTech");
    assert_eq!(sarah.ask_amount, 1_500_000.0);
    assert!(sarah.is_favorite);
    assert_eq!(sarah.short_description, "Predict crop disease two weeks early");
    assert!(sarah.canvas.is_some() && sarah.team.is_some() && sarah.mindset.is_some());

    let progress = &sarah.module_progress;
    assert_eq!(progress.get("economics"), Some(&true));
    assert_eq!(progress.get("sales"), Some(&true));
    assert_eq!(progress.get("productDesign"), Some(&false));
    assert_eq!(progress.get("grow"), Some(&false));
    assert_eq!(progress.get("canvas"), Some(&true));
}

#[tokio::test]
async fn test_startup_without_workspace_gets_defaults() {
    let engine = InsightsEngine::new(seeded_store(), &config());
    let profiles = by_id(engine.aggregate_startups().await);
    let marcus = &profiles[1];

    assert_eq!(marcus.name, "Marcus Johnson's Venture");
    assert_eq!(marcus.readiness_score, 0);
    assert_eq!(marcus.stage, "Idea");
    assert!(marcus.canvas.is_none());
    assert!(!marcus.module_progress.contains_key("canvas"));
    assert_eq!(marcus.module_progress.len(), 4);
    assert!(marcus.module_progress.values().all(|done| !done));
}

#[tokio::test]
async fn test_investor_canvas_uses_brand_name() {
    let engine = InsightsEngine::new(seeded_store(), &config());
    let profiles = by_id(engine.aggregate_startups().await);
    let ivy = &profiles[2];

    assert_eq!(ivy.name, "Capital Ivy");
    assert_eq!(ivy.readiness_score, 0);
    assert_eq!(ivy.module_progress.get("grow"), Some(&true));
}

#[tokio::test]
async fn test_repeated_runs_agree() {
    let engine = InsightsEngine::new(seeded_store(), &config());
    let first = by_id(engine.aggregate_startups().await);
    let second = by_id(engine.aggregate_startups().await);
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_fan_out_limit_of_one_gives_same_result() {
    let store = seeded_store();
    let wide = ProfileAggregator::new(store.clone(), StoreConfig::default(), 16);
    let narrow = ProfileAggregator::new(store, StoreConfig::default(), 1);
    assert_eq!(
        by_id(wide.aggregate().await),
        by_id(narrow.aggregate().await)
    );
}

#[tokio::test]
async fn test_failing_user_is_skipped_and_counted() {
    let store = seeded_store();
    store.fail_on("workspaces/u3/modules/team");
    let engine = InsightsEngine::new(store, &config());

    let outcome = engine.aggregate_with_report().await;
    assert_eq!(outcome.skipped_users, 1);
    let ids: Vec<String> = by_id(outcome.profiles)
        .into_iter()
        .map(|p| p.id)
        .collect();
    assert_eq!(ids, vec!["u2".to_string(), "u4".to_string()]);
}

#[tokio::test]
async fn test_failing_progress_check_skips_user() {
    let store = seeded_store();
    store.fail_on("workspaces/u2/modules/productDesign");
    let engine = InsightsEngine::new(store, &config());

    let outcome = engine.aggregate_with_report().await;
    assert_eq!(outcome.skipped_users, 1);
    assert!(outcome.profiles.iter().all(|p| p.id != "u2"));
}

#[tokio::test]
async fn test_mistyped_user_fields_do_not_skip_user() {
    let store = seeded_store();
    store.insert("users", "u5", doc(json!({"email": 42, "role": "startup"})));
    let engine = InsightsEngine::new(store, &config());

    let outcome = engine.aggregate_with_report().await;
    assert_eq!(outcome.skipped_users, 0);
    assert_eq!(outcome.profiles.len(), 4);
}

#[tokio::test]
async fn test_store_native_timestamps_and_null_flags_are_aggregated() {
    let store = loosely_typed_store();
    let engine = InsightsEngine::new(store, &config());

    let outcome = engine.aggregate_with_report().await;
    assert_eq!(outcome.skipped_users, 0);

    let profiles = by_id(outcome.profiles);
    let ids: Vec<&str> = profiles.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(ids, vec!["s1", "s2", "s3", "s4"]);

    let s1 = &profiles[0];
    assert!(!s1.is_favorite);
    assert_eq!(s1.ask_amount, 500_000.0);
}

#[tokio::test]
async fn test_unreadable_user_list_yields_empty() {
    let store = seeded_store();
    store.fail_on("users");
    let engine = InsightsEngine::new(store, &config());
    assert!(engine.aggregate_startups().await.is_empty());
}

#[tokio::test]
async fn test_unknown_role_with_canvas_is_included() {
    let store = seeded_store();
    add_user(&store, "u6", "mentor", "Morgan");
    common::add_module(&store, "u6", "canvas", json!({"Problem": "Hiring is slow"}));
    let engine = InsightsEngine::new(store, &config());

    let profiles = engine.aggregate_startups().await;
    let morgan = profiles
        .iter()
        .find(|p| p.id == "u6")
        .expect("u6 should be aggregated");
    assert_eq!(morgan.name, "Project: Hiring is slow");
    assert_eq!(morgan.readiness_score, 10);
}
