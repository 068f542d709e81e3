use crate::types::{SideOutcome, Verdict};

pub const NEUTRAL_SCORE: f64 = 50.0;

/// Strict comparison, no tolerance band: only exact equality is a tie.
pub fn decide_verdict(side_a_score: f64, side_b_score: f64) -> Verdict {
    if side_a_score > side_b_score {
        Verdict::SideAWins
    } else if side_a_score < side_b_score {
        Verdict::SideBWins
    } else {
        Verdict::Tie
    }
}

/// Clamp into [0, 100] and round to two decimals. NaN maps to the neutral score.
pub fn normalize_score(raw: f64) -> f64 {
    if raw.is_nan() {
        return NEUTRAL_SCORE;
    }
    (raw.clamp(0.0, 100.0) * 100.0).round() / 100.0
}

pub fn build_reasoning(a: &SideOutcome, b: &SideOutcome, verdict: Verdict) -> String {
    format!("Side A: {} | Side B: {} | Verdict: {}", a.rationale, b.rationale, verdict)
}
