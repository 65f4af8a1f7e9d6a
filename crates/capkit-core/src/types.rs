use crate::document::{is_present, text_field, Document, StoredDocument};
use crate::error::{CapkitError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Role attached to an identity record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Admin,
    Startup,
    Investor,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Admin => "admin",
            UserRole::Startup => "startup",
            UserRole::Investor => "investor",
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UserRole {
    type Err = CapkitError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "admin" => Ok(UserRole::Admin),
            "startup" => Ok(UserRole::Startup),
            "investor" => Ok(UserRole::Investor),
            other => Err(CapkitError::Decode(format!("unknown user role: {}", other))),
        }
    }
}

// Unknown or malformed roles decode as "no role" rather than failing the user.
fn lenient_role<'de, D>(deserializer: D) -> std::result::Result<Option<UserRole>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Value>::deserialize(deserializer)?;
    Ok(raw
        .as_ref()
        .and_then(Value::as_str)
        .and_then(|s| s.parse().ok()))
}

// Flags follow field presence, so null or a stray string never fails a record.
fn lenient_flag<'de, D>(deserializer: D) -> std::result::Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Value>::deserialize(deserializer)?;
    Ok(is_present(raw.as_ref()))
}

fn lenient_text<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Value>::deserialize(deserializer)?;
    Ok(match raw {
        Some(Value::String(s)) => Some(s),
        _ => None,
    })
}

fn lenient_email<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient_text(deserializer)?.unwrap_or_default())
}

// Amounts are sometimes typed into the dashboard as text, e.g. "500000".
fn lenient_amount<'de, D>(deserializer: D) -> std::result::Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Value>::deserialize(deserializer)?;
    Ok(match raw {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().replace(',', "").parse().ok(),
        _ => None,
    })
}

/// Accepts RFC 3339 strings, `{seconds, nanoseconds}` store timestamps and
/// epoch milliseconds. Anything else decodes as `None`.
fn lenient_timestamp<'de, D>(
    deserializer: D,
) -> std::result::Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Value>::deserialize(deserializer)?;
    Ok(raw.as_ref().and_then(timestamp_from_value))
}

fn timestamp_from_value(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|t| t.with_timezone(&Utc)),
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .and_then(DateTime::<Utc>::from_timestamp_millis),
        Value::Object(map) => {
            let part = |keys: [&str; 2]| keys.iter().find_map(|k| map.get(*k)?.as_i64());
            let seconds = part(["seconds", "_seconds"])?;
            let nanos = part(["nanoseconds", "_nanoseconds"]).unwrap_or(0);
            DateTime::<Utc>::from_timestamp(seconds, u32::try_from(nanos).ok()?)
        }
        _ => None,
    }
}

// A malformed cached evaluation is treated as absent and re-derived on demand.
fn lenient_evaluation<'de, D>(
    deserializer: D,
) -> std::result::Result<Option<StartupAiEvaluation>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Value>::deserialize(deserializer)?;
    Ok(raw.and_then(|v| serde_json::from_value(v).ok()))
}

/// Identity record owned by the auth subsystem. Read-only to the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(default)]
    pub id: String,
    #[serde(default, deserialize_with = "lenient_email")]
    pub email: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub display_name: Option<String>,
    #[serde(default, rename = "photoURL", deserialize_with = "lenient_text")]
    pub photo_url: Option<String>,
    #[serde(default, deserialize_with = "lenient_role")]
    pub role: Option<UserRole>,
    #[serde(default, deserialize_with = "lenient_flag")]
    pub is_active: bool,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub last_login: Option<DateTime<Utc>>,
}

impl UserProfile {
    /// Decodes a user document; the store id always wins over any embedded id.
    pub fn from_stored(stored: &StoredDocument) -> Result<Self> {
        let mut profile: UserProfile = serde_json::from_value(Value::Object(stored.data.clone()))
            .map_err(|e| CapkitError::Decode(format!("user {}: {}", stored.id, e)))?;
        profile.id = stored.id.clone();
        Ok(profile)
    }

    pub fn is_startup(&self) -> bool {
        self.role == Some(UserRole::Startup)
    }

    /// Display name when it is set and non-empty.
    pub fn name(&self) -> Option<&str> {
        self.display_name.as_deref().filter(|n| !n.is_empty())
    }
}

/// Labels of the business canvas worksheet.
pub mod canvas_field {
    pub const PROBLEM: &str = "Problem";
    pub const SOLUTION: &str = "Solution";
    pub const UNIQUE_VALUE_PROPOSITION: &str = "Unique Value Proposition";
    pub const UNFAIR_ADVANTAGE: &str = "Unfair Advantage";
    pub const CUSTOMER_SEGMENTS: &str = "Customer Segments";
    pub const KEY_METRICS: &str = "Key Metrics";
    pub const NORTH_STAR_METRIC: &str = "North Star Metric";
    pub const CHANNELS: &str = "Channels";
    pub const COST_STRUCTURE: &str = "Cost Structure";
    pub const REVENUE_STREAMS: &str = "Revenue Streams";
    pub const BUSINESS_MODEL: &str = "Business Model";
    pub const PRICING: &str = "Pricing";
    pub const UNIT_ECONOMICS: &str = "Unit Economics";
    pub const PRODUCT_MARKET_FIT: &str = "Product - Market Fit";
    pub const PROJECT_OVERVIEW: &str = "Project Overview";
    pub const PRODUCT_DETAIL: &str = "Product Detail";
    pub const PRODUCT_VISION: &str = "Product Vision";
    pub const PRODUCT_WHY: &str = "Product Why";
    pub const COMPETITORS: &str = "Competitors";
    pub const MARKET: &str = "Market";
    pub const BRAND_AND_STYLE_GUIDES: &str = "Brand & Style Guides";
    pub const USE_CASES: &str = "Use Cases";
}

/// Sparse business canvas. Known labels live in [`canvas_field`]; any other key
/// is kept as-is.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CanvasData(Document);

impl CanvasData {
    pub fn new(fields: Document) -> Self {
        Self(fields)
    }

    pub fn text(&self, field: &str) -> Option<&str> {
        text_field(&self.0, field)
    }

    pub fn has(&self, field: &str) -> bool {
        is_present(self.0.get(field))
    }

    pub fn fields(&self) -> &Document {
        &self.0
    }
}

/// Team roster and founder narrative.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TeamData(Document);

impl TeamData {
    pub const FOUNDER_STORY: &'static str = "Founder Story";
    pub const TEAM_MEMBERS: &'static str = "Team Members";

    pub fn new(fields: Document) -> Self {
        Self(fields)
    }

    pub fn text(&self, field: &str) -> Option<&str> {
        text_field(&self.0, field)
    }

    pub fn has(&self, field: &str) -> bool {
        is_present(self.0.get(field))
    }

    pub fn fields(&self) -> &Document {
        &self.0
    }
}

/// Founder psychological profile, stated goals and assessment answers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MindsetData(Document);

impl MindsetData {
    pub const GOALS: &'static str = "goals";
    pub const ASSESSMENT_ANSWERS: &'static str = "assessmentAnswers";
    pub const PROFILE_REPORT: &'static str = "profileReport";

    pub fn new(fields: Document) -> Self {
        Self(fields)
    }

    pub fn has(&self, field: &str) -> bool {
        is_present(self.0.get(field))
    }

    pub fn profile_report(&self) -> Option<ProfileReport> {
        self.0.get(Self::PROFILE_REPORT).and_then(ProfileReport::from_value)
    }

    pub fn fields(&self) -> &Document {
        &self.0
    }
}

/// The mindset profile report is stored either as prose or as a structured
/// object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProfileReport {
    Text(String),
    Structured(StructuredReport),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StructuredReport {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub key_takeaways: Vec<String>,
    #[serde(default)]
    pub co_founder_suggestion: Option<String>,
}

impl StructuredReport {
    fn from_map(map: &Document) -> Self {
        let string = |key: &str| text_field(map, key).map(str::to_string);
        Self {
            title: string("title"),
            description: string("description"),
            key_takeaways: map
                .get("keyTakeaways")
                .and_then(Value::as_array)
                .map(|items| {
                    items
                        .iter()
                        .filter_map(Value::as_str)
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default(),
            co_founder_suggestion: string("coFounderSuggestion"),
        }
    }
}

impl ProfileReport {
    /// Classifies a raw report value. Empty strings and scalars yield `None`;
    /// arrays are treated as an opaque structured report.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) if !s.is_empty() => Some(ProfileReport::Text(s.clone())),
            Value::Object(map) => Some(ProfileReport::Structured(StructuredReport::from_map(map))),
            Value::Array(_) => Some(ProfileReport::Structured(StructuredReport::default())),
            _ => None,
        }
    }
}

/// Admin-curated fields kept outside the user's own workspace.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminMetadata {
    #[serde(default, deserialize_with = "lenient_text")]
    pub stage: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub sector: Option<String>,
    #[serde(default, deserialize_with = "lenient_flag")]
    pub is_favorite: bool,
    #[serde(default, deserialize_with = "lenient_amount")]
    pub ask_amount: Option<f64>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub founder_bio: Option<String>,
    #[serde(default, deserialize_with = "lenient_evaluation")]
    pub ai_evaluation: Option<StartupAiEvaluation>,
}

impl AdminMetadata {
    pub fn from_document(id: &str, doc: Document) -> Result<Self> {
        serde_json::from_value(Value::Object(doc))
            .map_err(|e| CapkitError::Decode(format!("admin metadata {}: {}", id, e)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    Invest,
    Watch,
    Pass,
}

/// Result of the external AI evaluator, cached under the admin metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartupAiEvaluation {
    pub confidence_score: u8,
    pub verdict: Verdict,
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub weaknesses: Vec<String>,
    #[serde(default)]
    pub strategic_analysis: String,
    #[serde(default)]
    pub next_steps: Vec<String>,
    pub last_updated: DateTime<Utc>,
}

impl StartupAiEvaluation {
    /// Placeholder shown when the evaluator could not produce an answer.
    pub fn fallback(now: DateTime<Utc>) -> Self {
        Self {
            confidence_score: 0,
            verdict: Verdict::Watch,
            strengths: Vec::new(),
            weaknesses: vec!["AI Analysis Failed".to_string()],
            strategic_analysis: "Could not generate analysis at this time.".to_string(),
            next_steps: Vec::new(),
            last_updated: now,
        }
    }
}

/// Denormalized view of one startup, rebuilt on every aggregation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartupProfile {
    pub id: String,
    pub name: String,
    pub founder_name: String,
    pub founder_bio: String,
    pub short_description: String,
    pub full_description: String,
    pub stage: String,
    pub sector: String,
    pub business_model: String,
    pub traction: String,
    pub readiness_score: u8,
    pub is_favorite: bool,
    pub ask_amount: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_evaluation: Option<StartupAiEvaluation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub canvas: Option<CanvasData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team: Option<TeamData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mindset: Option<MindsetData>,
    pub module_progress: BTreeMap<String, bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleStats {
    pub name: String,
    pub count: usize,
    pub completion_rate: u32,
}

/// Fleet-wide completion scan result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgramStats {
    pub total_startups: usize,
    pub module_stats: Vec<ModuleStats>,
    pub top_bottleneck: String,
    pub samples: Vec<String>,
    #[serde(default)]
    pub skipped_users: usize,
}

impl ProgramStats {
    pub const NO_BOTTLENECK: &'static str = "None";
    pub const FAILED_BOTTLENECK: &'static str = "Error";

    /// Soft-failure value handed to dashboards when a scan cannot run.
    pub fn failed() -> Self {
        Self {
            total_startups: 0,
            module_stats: Vec::new(),
            top_bottleneck: Self::FAILED_BOTTLENECK.to_string(),
            samples: Vec::new(),
            skipped_users: 0,
        }
    }

    /// Renders the scan as plain text lines suitable for LLM context.
    pub fn context_lines(&self) -> Vec<String> {
        let rates = self
            .module_stats
            .iter()
            .map(|m| format!("{}: {}%", m.name, m.completion_rate))
            .collect::<Vec<_>>()
            .join(", ");

        let mut lines = vec![
            format!("Module Completion Rates: {}", rates),
            format!("Identified Bottleneck: {}", self.top_bottleneck),
            "Random Content Samples from User Modules:".to_string(),
        ];
        lines.extend(self.samples.iter().cloned());
        lines
    }
}
