use crate::config::EvaluatorConfig;
use crate::llm::Llm;
use crate::scoring::{normalize_score, NEUTRAL_SCORE};
use crate::types::SideOutcome;
use anyhow::{anyhow, Result};
use async_openai::types::{
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
};
use regex::Regex;
use serde::Deserialize;
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tracing::warn;

/// Scores one argument. Implementations never fail: an unavailable backend
/// degrades to a neutral score with an explanatory rationale.
#[async_trait::async_trait]
pub trait Evaluator: Send + Sync {
    async fn evaluate(&self, argument: &str, topic: &str) -> SideOutcome;
}

pub fn fallback_outcome(reason: &str) -> SideOutcome {
    SideOutcome {
        score: NEUTRAL_SCORE,
        rationale: format!("Evaluation unavailable ({reason}); neutral score assigned."),
    }
}

pub struct LlmEvaluator {
    llm: Arc<dyn Llm>,
    timeout: Duration,
    max_attempts: u32,
    backoff: Duration,
}

impl LlmEvaluator {
    pub fn new(llm: Arc<dyn Llm>, cfg: &EvaluatorConfig) -> Self {
        Self {
            llm,
            timeout: cfg.timeout(),
            max_attempts: cfg.max_attempts.max(1),
            backoff: Duration::from_millis(500),
        }
    }

    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    async fn attempt(&self, messages: Vec<ChatCompletionRequestMessage>) -> Result<SideOutcome> {
        let text = tokio::time::timeout(self.timeout, self.llm.chat(messages))
            .await
            .map_err(|_| anyhow!("timed out after {:?}", self.timeout))??;
        parse_outcome(&text)
    }
}

#[async_trait::async_trait]
impl Evaluator for LlmEvaluator {
    async fn evaluate(&self, argument: &str, topic: &str) -> SideOutcome {
        let messages = match build_judge_prompt(argument, topic) {
            Ok(m) => m,
            Err(e) => return fallback_outcome(&e.to_string()),
        };

        let mut last_err = None;
        for attempt in 1..=self.max_attempts {
            match self.attempt(messages.clone()).await {
                Ok(outcome) => return outcome,
                Err(e) => {
                    warn!(error = %e, attempt, max_attempts = self.max_attempts, "evaluation attempt failed");
                    last_err = Some(e);
                    if attempt < self.max_attempts {
                        tokio::time::sleep(self.backoff * attempt).await;
                    }
                }
            }
        }
        let reason = last_err.map(|e| e.to_string()).unwrap_or_else(|| "no attempts".into());
        fallback_outcome(&reason)
    }
}

fn build_judge_prompt(argument: &str, topic: &str) -> Result<Vec<ChatCompletionRequestMessage>> {
    let sys = ChatCompletionRequestSystemMessageArgs::default()
        .content(
            "You are an impartial debate judge. Rate how persuasive the argument is on the given topic, \
             considering logic, clarity, relevance and evidence. \
             Return JSON: {\"score\": <number 0-100>, \"rationale\": \"<one sentence>\"}",
        )
        .build()?
        .into();
    let usr = ChatCompletionRequestUserMessageArgs::default()
        .content(format!("Topic:\n{topic}\n\nArgument:\n{argument}"))
        .build()?
        .into();
    Ok(vec![sys, usr])
}

#[derive(Deserialize)]
struct ScoreReply {
    score: f64,
    #[serde(default)]
    rationale: String,
}

/// Accepts the requested JSON (optionally inside a Markdown fence); otherwise
/// takes the first number in the text as the score and the text as rationale.
pub fn parse_outcome(text: &str) -> Result<SideOutcome> {
    let clean = text
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim();

    if let Ok(reply) = serde_json::from_str::<ScoreReply>(clean) {
        if reply.score.is_finite() {
            let rationale = if reply.rationale.trim().is_empty() {
                "No rationale given.".to_string()
            } else {
                reply.rationale.trim().to_string()
            };
            return Ok(SideOutcome { score: normalize_score(reply.score), rationale });
        }
    }

    static NUMBER: OnceLock<Regex> = OnceLock::new();
    let re = NUMBER.get_or_init(|| Regex::new(r"\d+(?:\.\d+)?").expect("static regex"));
    let m = re.find(clean).ok_or_else(|| anyhow!("no score found in reply"))?;
    let score: f64 = m.as_str().parse()?;
    Ok(SideOutcome {
        score: normalize_score(score),
        rationale: clean.lines().next().unwrap_or_default().trim().to_string(),
    })
}
