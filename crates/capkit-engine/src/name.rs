//! Venture name heuristics over free-text canvas fields.

use capkit_core::{canvas_field, CanvasData};
use lazy_static::lazy_static;
use regex::Regex;

/// Brand field length bounds (exclusive), in characters.
const BRAND_MIN_LEN: usize = 2;
const BRAND_MAX_LEN: usize = 50;
/// An overview shorter than this is taken to be the name itself.
const OVERVIEW_AS_NAME_MAX_LEN: usize = 40;
const VALUE_PROPOSITION_MAX_LEN: usize = 30;
const PROBLEM_MAX_LEN: usize = 30;

pub const UNNAMED_VENTURE: &str = "Unnamed Venture";

lazy_static! {
    static ref NAME_PATTERNS: Vec<Regex> = [
        r"(?i)Project Name:\s*([^\n\r]+)",
        r"(?i)Venture Name:\s*([^\n\r]+)",
        r"(?i)Startup Name:\s*([^\n\r]+)",
        r"(?i)Title:\s*([^\n\r]+)",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).unwrap())
    .collect();
}

/// Derives a display name for a venture. Never returns an empty string.
///
/// Rules are tried in order and the first hit wins: a short brand field, a
/// labelled line in the project overview, a short overview, a short value
/// proposition, a short problem statement, and finally the founder's name.
pub fn extract_venture_name(canvas: Option<&CanvasData>, fallback_name: Option<&str>) -> String {
    let fallback_name = fallback_name.filter(|n| !n.is_empty());

    let Some(canvas) = canvas else {
        return match fallback_name {
            Some(name) => format!("{}'s Venture", name),
            None => UNNAMED_VENTURE.to_string(),
        };
    };

    if let Some(brand) = canvas.text(canvas_field::BRAND_AND_STYLE_GUIDES) {
        let len = char_len(brand);
        if len > BRAND_MIN_LEN && len < BRAND_MAX_LEN {
            let name = strip_quotes(brand);
            if !name.is_empty() {
                return name;
            }
        }
    }

    if let Some(overview) = canvas.text(canvas_field::PROJECT_OVERVIEW) {
        if let Some(name) = labelled_name(overview) {
            return name;
        }
        if char_len(overview) < OVERVIEW_AS_NAME_MAX_LEN {
            return overview.to_string();
        }
    }

    if let Some(uvp) = canvas.text(canvas_field::UNIQUE_VALUE_PROPOSITION) {
        if char_len(uvp) < VALUE_PROPOSITION_MAX_LEN {
            return uvp.to_string();
        }
    }

    if let Some(problem) = canvas.text(canvas_field::PROBLEM) {
        if char_len(problem) < PROBLEM_MAX_LEN {
            return format!("Project: {}", problem);
        }
    }

    match fallback_name {
        Some(name) => format!("{}'s Startup", name),
        None => UNNAMED_VENTURE.to_string(),
    }
}

/// First `Label: value` match across the patterns, in pattern order.
fn labelled_name(overview: &str) -> Option<String> {
    NAME_PATTERNS.iter().find_map(|pattern| {
        let captured = pattern.captures(overview)?.get(1)?.as_str().trim();
        if char_len(captured) <= 1 {
            return None;
        }
        let name = strip_quotes(captured);
        (!name.is_empty()).then_some(name)
    })
}

fn strip_quotes(text: &str) -> String {
    text.replace(|c: char| c == '"' || c == '\'', "")
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}
