use capkit_core::canvas_field::*;
use capkit_core::{CanvasData, MindsetData, TeamData};

pub const MAX_READINESS: u32 = 100;

/// Canvas weights. Each group scores once when any of its fields is present.
const CANVAS_WEIGHTS: &[(&[&str], u32)] = &[
    (&[PROBLEM], 10),
    (&[SOLUTION], 10),
    (&[UNIQUE_VALUE_PROPOSITION], 15),
    (&[MARKET, CUSTOMER_SEGMENTS], 10),
    (&[BUSINESS_MODEL, REVENUE_STREAMS], 15),
    (&[UNIT_ECONOMICS, COST_STRUCTURE], 5),
    (&[NORTH_STAR_METRIC, KEY_METRICS], 5),
];

const TEAM_BONUS: u32 = 10;
const MINDSET_BONUS: u32 = 20;

/// Investment-readiness proxy in `0..=100`.
///
/// Without a canvas the startup is not evaluable and scores 0. These weights
/// back scores already cached by the dashboard and must not drift.
pub fn compute_readiness(
    canvas: Option<&CanvasData>,
    team: Option<&TeamData>,
    mindset: Option<&MindsetData>,
) -> u8 {
    let Some(canvas) = canvas else {
        return 0;
    };

    let mut score: u32 = CANVAS_WEIGHTS
        .iter()
        .filter(|(fields, _)| fields.iter().any(|field| canvas.has(field)))
        .map(|(_, weight)| weight)
        .sum();

    if team.is_some_and(|t| t.has(TeamData::FOUNDER_STORY) || t.has(TeamData::TEAM_MEMBERS)) {
        score += TEAM_BONUS;
    }

    if mindset.is_some_and(|m| m.has(MindsetData::GOALS) || m.has(MindsetData::ASSESSMENT_ANSWERS))
    {
        score += MINDSET_BONUS;
    }

    score.min(MAX_READINESS) as u8
}
