#![allow(dead_code)]

use capkit_core::{CapkitConfig, Document, InMemoryDocumentStore};
use serde_json::{json, Value};
use std::sync::Arc;

pub fn doc(value: Value) -> Document {
    match value {
        Value::Object(map) => map,
        other => panic!("expected object, got {}", other),
    }
}

pub fn add_user(store: &InMemoryDocumentStore, id: &str, role: &str, name: &str) {
    store.insert(
        "users",
        id,
        doc(json!({
            "email": format!("{}@capkit.test", id),
            "displayName": name,
            "role": role,
            "isActive": true,
        })),
    );
}

pub fn add_module(store: &InMemoryDocumentStore, user_id: &str, module: &str, data: Value) {
    store.insert_sub("workspaces", user_id, "modules", module, doc(data));
}

/// Four users: two startups with workspaces, one investor with a canvas and
/// one admin with nothing.
pub fn seeded_store() -> Arc<InMemoryDocumentStore> {
    let store = InMemoryDocumentStore::new();

    add_user(&store, "u1", "admin", "Alex Admin");
    add_user(&store, "u2", "startup", "Sarah Chen");
    add_user(&store, "u3", "startup", "Marcus Johnson");
    add_user(&store, "u4", "investor", "Ivy Investor");

    add_module(
        &store,
        "u2",
        "canvas",
        json!({
            "Project Overview": "Project Name: AgriSense AI\nSatellite analytics for farms",
            "Problem": "Farmers lose 30% of crops to late disease detection",
            "Solution": "Satellite and drone imagery with ML diagnosis",
            "Unique Value Proposition": "Predict crop disease two weeks early",
            "Customer Segments": "Mid-size farms in the EU",
            "Revenue Streams": "Per-acre subscription",
            "Key Metrics": "Acres monitored",
        }),
    );
    add_module(
        &store,
        "u2",
        "team",
        json!({"Founder Story": "Grew up on a family farm in Iowa."}),
    );
    add_module(&store, "u2", "mindset", json!({"goals": ["Raise seed round"]}));
    add_module(&store, "u2", "economics", json!({"cac": 120}));
    add_module(&store, "u2", "sales", json!({}));

    add_module(&store, "u4", "canvas", json!({"Brand & Style Guides": "Capital Ivy"}));
    add_module(&store, "u4", "grow", json!({"channels": ["LinkedIn"]}));

    store.insert(
        "startups",
        "u2",
        doc(json!({"stage": "Seed", "sector": "AgTech", "askAmount": 1500000, "isFavorite": true})),
    );

    Arc::new(store)
}

pub fn config() -> CapkitConfig {
    let mut config = CapkitConfig::default();
    config.engine.sample_seed = Some(7);
    config
}
