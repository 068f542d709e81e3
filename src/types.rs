use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebateRequest {
    pub topic: String,
    pub side_a: String,
    pub side_b: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SideOutcome {
    pub score: f64,     // 0..=100
    pub rationale: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    SideAWins,
    SideBWins,
    Tie,
}

impl Verdict {
    pub fn as_text(&self) -> &'static str {
        match self {
            Verdict::SideAWins => "Side A is more persuasive overall.",
            Verdict::SideBWins => "Side B is more persuasive overall.",
            Verdict::Tie => "Both sides were equally persuasive.",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_text())
    }
}

/// What gets fingerprinted and committed on-chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRecord {
    pub topic: String,
    pub side_a_score: f64,
    pub side_b_score: f64,
    pub verdict: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JudgeResponse {
    pub topic: String,
    pub side_a_score: f64,
    pub side_b_score: f64,
    pub verdict: String,
    pub reasoning: String,
    pub transaction_hash: Option<String>,
}
